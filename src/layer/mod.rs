pub mod buffer;
mod draw;
mod shape;

pub use draw::*;
pub use shape::*;

use bevy::{prelude::*, render::view::RenderLayers};

use crate::atlas::{FontAtlas, IconAtlas};
use crate::camera::{DragEndEvent, MapTransform, ViewportState, ZoomChangedEvent};
use crate::types::{PointCollection, PointStyle};
use buffer::BuildContext;

/// Entities spawned by the last point-layer draw pass.
#[derive(Component)]
pub struct PointLayerMarker;

pub struct PointLayerPlugin;

impl Plugin for PointLayerPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<PointCollection>()
            .init_resource::<PointStyle>()
            .add_systems(Update, (handle_viewport_events, draw_point_layer).chain());
    }
}

/// Base viewport handling for the layer: any zoom change or completed pan
/// invalidates the drawn meshes. Re-clustering runs separately from the
/// cluster controller with its own readers.
fn handle_viewport_events(
    mut zoom_events: EventReader<ZoomChangedEvent>,
    mut drag_events: EventReader<DragEndEvent>,
    mut collection: ResMut<PointCollection>,
) {
    if zoom_events.is_empty() && drag_events.is_empty() {
        return;
    }
    zoom_events.clear();
    drag_events.clear();
    collection.respawn = true;
}

/// The layer's draw pass: classify once, rebuild every buffer from scratch,
/// replace the registered meshes. Nothing is diffed incrementally.
fn draw_point_layer(
    mut commands: Commands,
    existing: Query<Entity, With<PointLayerMarker>>,
    mut collection: ResMut<PointCollection>,
    style: Res<PointStyle>,
    icons: Option<Res<IconAtlas>>,
    font: Option<Res<FontAtlas>>,
    viewport: Res<ViewportState>,
    map: Res<MapTransform>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<ColorMaterial>>,
) {
    if !collection.respawn {
        return;
    }
    collection.respawn = false;

    for entity in existing.iter() {
        commands.entity(entity).despawn();
    }

    let ctx = BuildContext {
        map: &map,
        px_to_world: viewport.px_to_world,
        canvas: viewport.size,
    };
    let image_ids = icons.as_deref().map(IconAtlas::image_ids).unwrap_or_default();
    let strategy = classify(&collection.features, &image_ids);

    let tagged = assemble(
        strategy,
        &collection.features,
        &style,
        &ctx,
        icons.as_deref(),
        font.as_deref(),
    );
    let count = tagged.len();
    for item in tagged {
        let material = match item.texture {
            Some(texture) => materials.add(ColorMaterial::from(texture)),
            None => materials.add(ColorMaterial::from(Color::WHITE)),
        };
        commands.spawn((
            Mesh2d(meshes.add(item.mesh)),
            MeshMaterial2d(material),
            Transform::from_xyz(0.0, 0.0, item.role.elevation()),
            PointLayerMarker,
            RenderLayers::layer(1),
        ));
    }
    info!(
        "point layer: {:?} strategy, {} features, {} meshes",
        strategy,
        collection.features.len(),
        count
    );
}
