use bevy::{prelude::*, window::PrimaryWindow};

use crate::camera::{MapTransform, ViewportState};
use crate::cluster::ClusterSource;
use crate::loader::load_point_file;
use crate::settings::seed_points;
use crate::types::PointCollection;

const PICK_RADIUS_PX: f32 = 16.0;

pub struct InteractionSystemPlugin;

impl Plugin for InteractionSystemPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Update, handle_mouse).add_systems(Update, file_drop);
    }
}

/// Left click toggles the active state of the nearest point under the
/// cursor; active features redraw with the style's override colour.
fn handle_mouse(
    buttons: Res<ButtonInput<MouseButton>>,
    q_windows: Query<&Window, With<PrimaryWindow>>,
    camera: Query<(&Camera, &GlobalTransform), With<Camera2d>>,
    map: Res<MapTransform>,
    viewport: Res<ViewportState>,
    mut collection: ResMut<PointCollection>,
) {
    if !buttons.just_pressed(MouseButton::Left) {
        return;
    }
    let Ok((camera, camera_transform)) = camera.single() else {
        return;
    };
    let Ok(window) = q_windows.single() else {
        return;
    };
    let Some(position) = window.cursor_position() else {
        return;
    };
    let Ok(world_pos) = camera.viewport_to_world_2d(camera_transform, position) else {
        return;
    };

    let pick_radius = PICK_RADIUS_PX * viewport.px_to_world;
    let mut nearest: Option<(usize, f32)> = None;
    for (index, feature) in collection.features.iter().enumerate() {
        let distance = map.world_pos(feature.coord()).distance(world_pos);
        if distance <= pick_radius && nearest.is_none_or(|(_, best)| distance < best) {
            nearest = Some((index, distance));
        }
    }

    if let Some((index, _)) = nearest {
        let feature = &mut collection.features[index];
        feature.active = !feature.active;
        info!("{} active: {}", feature.id, feature.active);
        collection.respawn = true;
    }
}

/// Dropping a `.geojson` file onto the window replaces the layer's data.
fn file_drop(
    mut evr_dnd: EventReader<FileDragAndDrop>,
    mut collection: ResMut<PointCollection>,
    mut source: ResMut<ClusterSource>,
) {
    for ev in evr_dnd.read() {
        if let FileDragAndDrop::DroppedFile { path_buf, .. } = ev {
            if path_buf.extension().is_some_and(|ext| ext == "geojson") {
                let Some(path) = path_buf.to_str() else {
                    continue;
                };
                match load_point_file(path) {
                    Ok(points) => {
                        info!("loaded {} features from {path}", points.len());
                        seed_points(&mut source, &mut collection, points);
                    }
                    Err(e) => warn!("could not load dropped file {path}: {e}"),
                }
            }
        }
    }
}
