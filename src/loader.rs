use std::{fs::File, io::BufReader};

use bevy::prelude::*;
use geojson::GeoJson;

use crate::types::PointFeature;

/// Parses a GeoJSON feature collection into point features. Point and
/// MultiPoint geometries are kept, everything else is ignored; the `shape`
/// property and the full property bag carry over.
pub fn points_from_geojson(
    geojson: GeoJson,
) -> Result<Vec<PointFeature>, Box<dyn std::error::Error>> {
    let GeoJson::FeatureCollection(collection) = geojson else {
        return Err("expected a GeoJSON FeatureCollection".into());
    };

    let mut features = Vec::new();
    for (index, feature) in collection.features.into_iter().enumerate() {
        let Some(geometry) = feature.geometry else {
            continue;
        };
        let positions: Vec<[f64; 2]> = match geometry.value {
            geojson::Value::Point(p) => vec![[p[0], p[1]]],
            geojson::Value::MultiPoint(points) => {
                points.into_iter().map(|p| [p[0], p[1]]).collect()
            }
            _ => continue,
        };

        let id = match &feature.id {
            Some(geojson::feature::Id::String(s)) => s.clone(),
            Some(geojson::feature::Id::Number(n)) => n.to_string(),
            None => index.to_string(),
        };
        let properties = feature
            .properties
            .map(serde_json::Value::Object)
            .unwrap_or(serde_json::Value::Null);
        let shape = properties
            .get("shape")
            .and_then(|v| v.as_str())
            .map(str::to_string);

        for (i, [lon, lat]) in positions.iter().enumerate() {
            let mut point = PointFeature::new(
                if positions.len() == 1 {
                    id.clone()
                } else {
                    format!("{id}-{i}")
                },
                *lon,
                *lat,
            );
            point.shape = shape.clone();
            point.properties = properties.clone();
            features.push(point);
        }
    }
    Ok(features)
}

pub fn points_from_str(data: &str) -> Result<Vec<PointFeature>, Box<dyn std::error::Error>> {
    points_from_geojson(data.parse::<GeoJson>()?)
}

pub fn load_point_file(path: &str) -> Result<Vec<PointFeature>, Box<dyn std::error::Error>> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    points_from_geojson(GeoJson::from_reader(reader)?)
}

const RATE_LIMIT_RETRIES: u32 = 3;

/// Fetches a remote GeoJSON point collection. Rate-limited responses are
/// retried a bounded number of times; this runs on the startup path, so a
/// persistently throttled server must not stall launch.
pub fn fetch_point_data(url: &str) -> Vec<PointFeature> {
    for attempt in 0..=RATE_LIMIT_RETRIES {
        let Ok(mut response) = ureq::get(url).call() else {
            return vec![];
        };
        if response.status() == 200 {
            let body = match response.body_mut().read_to_string() {
                Ok(body) => body,
                Err(e) => {
                    info!("error reading response: {e}");
                    return vec![];
                }
            };
            match points_from_str(&body) {
                Ok(features) => return features,
                Err(e) => {
                    info!("error parsing response: {e}");
                    return vec![];
                }
            }
        } else if response.status() == 429 && attempt < RATE_LIMIT_RETRIES {
            info!("rate limited, waiting 5 seconds");
            std::thread::sleep(std::time::Duration::from_secs(5));
        } else {
            warn!("giving up on {url}: status {}", response.status());
            return vec![];
        }
    }
    vec![]
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "id": "pub",
                "geometry": { "type": "Point", "coordinates": [0.1313, 52.1951] },
                "properties": { "shape": "circle", "name": "The Eagle" }
            },
            {
                "type": "Feature",
                "geometry": { "type": "MultiPoint", "coordinates": [[0.1, 52.2], [0.2, 52.3]] },
                "properties": null
            },
            {
                "type": "Feature",
                "geometry": { "type": "LineString", "coordinates": [[0, 0], [1, 1]] },
                "properties": null
            }
        ]
    }"#;

    #[test]
    fn parses_point_and_multipoint_features() {
        let features = points_from_str(SAMPLE).unwrap();
        assert_eq!(features.len(), 3);
        assert_eq!(features[0].id, "pub");
        assert_eq!(features[0].shape.as_deref(), Some("circle"));
        assert_eq!(features[0].position.x(), 0.1313);
        assert_eq!(
            features[0].properties.get("name").and_then(|v| v.as_str()),
            Some("The Eagle")
        );
        // MultiPoint fans out with suffixed ids; the LineString is skipped.
        assert_eq!(features[1].id, "1-0");
        assert_eq!(features[2].id, "1-1");
    }

    #[test]
    fn rejects_non_collections() {
        let geojson = r#"{ "type": "Point", "coordinates": [0, 0] }"#;
        assert!(points_from_str(geojson).is_err());
    }
}
