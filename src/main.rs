use bevy::{
    prelude::*,
    winit::{UpdateMode, WinitSettings},
};

use pointmap::atlas::AtlasPlugin;
use pointmap::camera::CameraSystemPlugin;
use pointmap::cluster::{ClusterPlugin, ClusterSource};
use pointmap::debug::DebugPlugin;
use pointmap::interaction::InteractionSystemPlugin;
use pointmap::layer::PointLayerPlugin;
use pointmap::settings::{Settings, SettingsPlugin, apply_settings, seed_points};
use pointmap::types::{PointCollection, PointFeature};
use pointmap::STARTING_DISPLACEMENT;

fn main() {
    App::new()
        .add_plugins(DefaultPlugins.set(WindowPlugin {
            primary_window: Some(Window {
                title: "Point Map".to_string(),
                ..Default::default()
            }),
            ..Default::default()
        }))
        .add_plugins(DebugPlugin)
        .insert_resource(WinitSettings {
            unfocused_mode: UpdateMode::Reactive {
                wait: std::time::Duration::from_secs(1),
                react_to_device_events: true,
                react_to_user_events: true,
                react_to_window_events: true,
            },
            ..Default::default()
        })
        .insert_resource(ClearColor(Color::from(Srgba {
            red: 0.9,
            green: 0.9,
            blue: 0.8,
            alpha: 1.0,
        })))
        .add_plugins(CameraSystemPlugin)
        .add_plugins(ClusterPlugin)
        .add_plugins(PointLayerPlugin)
        .add_plugins(SettingsPlugin)
        .add_plugins(AtlasPlugin)
        .add_plugins(InteractionSystemPlugin)
        .add_systems(Startup, seed_sample_data.after(apply_settings))
        .run();
}

/// Deterministic demo data around the starting location when no data source
/// is configured.
fn seed_sample_data(
    settings: Res<Settings>,
    mut source: ResMut<ClusterSource>,
    mut collection: ResMut<PointCollection>,
) {
    if settings.data.path.is_some() || settings.data.url.is_some() || !source.is_empty() {
        return;
    }

    let mut state: u64 = 0x9E37_79B9;
    let mut next = move || {
        state = state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        (state >> 33) as f64 / (1u64 << 31) as f64
    };

    let mut points = Vec::with_capacity(400);
    for i in 0..400 {
        let lat = STARTING_DISPLACEMENT.lat + (next() - 0.5) * 0.4;
        let long = STARTING_DISPLACEMENT.long + (next() - 0.5) * 0.6;
        let mut point = PointFeature::new(format!("sample-{i}"), long, lat).with_shape("circle");
        if i % 50 == 0 {
            point.properties = serde_json::json!({ "name": format!("site {i}") });
        }
        points.push(point);
    }
    info!("seeded {} sample points", points.len());
    seed_points(&mut source, &mut collection, points);
}
