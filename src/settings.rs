use bevy::prelude::*;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::cluster::ClusterSource;
use crate::loader::{fetch_point_data, load_point_file};
use crate::types::{PointCollection, PointFeature, PointStyle};

#[derive(Resource, Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub style: PointStyle,
    pub cluster: ClusterSettings,
    pub icons: Vec<IconEntry>,
    pub font: Option<FontSettings>,
    pub data: DataSettings,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterSettings {
    pub enabled: bool,
    pub radius_px: f64,
}

impl Default for ClusterSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            radius_px: 48.0,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IconEntry {
    pub id: String,
    pub path: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct FontSettings {
    pub path: String,
    pub columns: u32,
    pub rows: u32,
    pub charset: String,
}

impl Default for FontSettings {
    fn default() -> Self {
        Self {
            path: String::new(),
            columns: 16,
            rows: 6,
            charset: (' '..='~').collect(),
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSettings {
    pub path: Option<String>,
    pub url: Option<String>,
}

/// Reads `settings.json` from the platform config directory; any problem
/// falls back to defaults with a warning rather than failing startup.
pub fn load_settings() -> Settings {
    let Some(dirs) = ProjectDirs::from("", "", "pointmap") else {
        warn!("no config directory available, using default settings");
        return Settings::default();
    };
    let path = dirs.config_dir().join("settings.json");
    match std::fs::read_to_string(&path) {
        Ok(raw) => match serde_json::from_str(&raw) {
            Ok(settings) => settings,
            Err(e) => {
                warn!("malformed settings at {path:?}: {e}, using defaults");
                Settings::default()
            }
        },
        Err(_) => Settings::default(),
    }
}

/// Replaces the layer's data: the source index gets the raw points and the
/// drawn collection starts from them until the first re-cluster lands.
pub fn seed_points(
    source: &mut ClusterSource,
    collection: &mut PointCollection,
    points: Vec<PointFeature>,
) {
    source.set_points(points.clone());
    collection.replace(points);
}

pub struct SettingsPlugin;

impl Plugin for SettingsPlugin {
    fn build(&self, app: &mut App) {
        let settings = load_settings();
        app.insert_resource(settings.style.clone())
            .insert_resource(settings)
            .add_systems(Startup, apply_settings);
    }
}

pub fn apply_settings(
    settings: Res<Settings>,
    mut source: ResMut<ClusterSource>,
    mut collection: ResMut<PointCollection>,
) {
    source.enabled = settings.cluster.enabled;
    source.radius_px = settings.cluster.radius_px;

    let points = if let Some(path) = &settings.data.path {
        match load_point_file(path) {
            Ok(points) => Some(points),
            Err(e) => {
                warn!("could not load {path:?}: {e}");
                None
            }
        }
    } else if let Some(url) = &settings.data.url {
        Some(fetch_point_data(url))
    } else {
        None
    };

    if let Some(points) = points {
        info!("loaded {} point features", points.len());
        seed_points(&mut source, &mut collection, points);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PaintColor;

    #[test]
    fn settings_parse_with_partial_input() {
        let settings: Settings = serde_json::from_str(
            r#"{
                "style": { "fill": "none", "pointSize": 20.0 },
                "cluster": { "enabled": false },
                "icons": [{ "id": "marker", "path": "icons/marker.png" }]
            }"#,
        )
        .unwrap();
        assert_eq!(settings.style.fill, PaintColor::None);
        assert!(!settings.cluster.enabled);
        // Unspecified fields keep their defaults.
        assert_eq!(settings.cluster.radius_px, 48.0);
        assert_eq!(settings.icons.len(), 1);
        assert!(settings.font.is_none());
    }

    #[test]
    fn default_settings_enable_clustering() {
        let settings = Settings::default();
        assert!(settings.cluster.enabled);
        assert!(settings.data.path.is_none());
    }
}
