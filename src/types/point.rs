use bevy::prelude::*;
use rstar::{AABB, RTreeObject};

use super::{Coord, coord::world_to_lat_lon};

/// One input point datum. `position` is stored as (longitude, latitude);
/// `shape` names an icon, a 2D/3D glyph, or is absent; `properties` carries
/// whatever style-relevant data came with the source record.
#[derive(Clone, Debug, PartialEq)]
pub struct PointFeature {
    pub id: String,
    pub position: geo::Point<f64>,
    pub shape: Option<String>,
    pub active: bool,
    pub properties: serde_json::Value,
}

impl PointFeature {
    pub fn new(id: impl Into<String>, long: f64, lat: f64) -> Self {
        Self {
            id: id.into(),
            position: geo::Point::new(long, lat),
            shape: None,
            active: false,
            properties: serde_json::Value::Null,
        }
    }

    pub fn with_shape(mut self, shape: impl Into<String>) -> Self {
        self.shape = Some(shape.into());
        self
    }

    pub fn coord(&self) -> Coord {
        Coord::new(self.position.y(), self.position.x())
    }

    /// Label drawn by the text strategy: an explicit `label`/`name` property,
    /// a cluster count, or the raw shape value.
    pub fn label(&self) -> Option<String> {
        for key in ["label", "name"] {
            if let Some(text) = self.properties.get(key).and_then(|v| v.as_str()) {
                return Some(text.to_string());
            }
        }
        if let Some(count) = self.properties.get("point_count").and_then(|v| v.as_u64()) {
            return Some(count.to_string());
        }
        self.shape.clone()
    }
}

impl RTreeObject for PointFeature {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point([self.position.x(), self.position.y()])
    }
}

/// The layer's current feature collection. Order defines draw order for
/// overlapping points. When clustering is active this holds the clustered
/// view of the source data, not the raw points.
#[derive(Resource, Clone, Debug)]
pub struct PointCollection {
    pub features: Vec<PointFeature>,
    pub respawn: bool,
}

impl Default for PointCollection {
    fn default() -> Self {
        Self {
            features: Vec::new(),
            respawn: true,
        }
    }
}

impl PointCollection {
    pub fn replace(&mut self, features: Vec<PointFeature>) {
        self.features = features;
        self.respawn = true;
    }
}

/// Geographic bounds as `[west, south, east, north]`.
pub type BBox = [f64; 4];

pub fn bbox_from_corners(sw: Coord, ne: Coord) -> BBox {
    [sw.long, sw.lat, ne.long, ne.lat]
}

pub fn bbox_from_world(
    min: Vec2,
    max: Vec2,
    reference: Coord,
    zoom: u32,
    tile_quality: f64,
) -> BBox {
    let sw = world_to_lat_lon(min.x as f64, min.y as f64, reference, zoom, tile_quality);
    let ne = world_to_lat_lon(max.x as f64, max.y as f64, reference, zoom, tile_quality);
    bbox_from_corners(sw, ne)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_prefers_explicit_properties() {
        let mut feature = PointFeature::new("a", 0.0, 0.0).with_shape("unknown-tag");
        feature.properties = serde_json::json!({ "name": "Cambridge" });
        assert_eq!(feature.label().as_deref(), Some("Cambridge"));

        feature.properties = serde_json::json!({ "point_count": 12 });
        assert_eq!(feature.label().as_deref(), Some("12"));

        feature.properties = serde_json::Value::Null;
        assert_eq!(feature.label().as_deref(), Some("unknown-tag"));
    }

    #[test]
    fn envelope_is_the_point_itself() {
        let feature = PointFeature::new("a", 1.5, -2.5);
        let envelope = feature.envelope();
        assert_eq!(envelope.lower(), [1.5, -2.5]);
        assert_eq!(envelope.upper(), [1.5, -2.5]);
    }
}
