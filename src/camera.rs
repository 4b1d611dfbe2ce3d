use bevy::{prelude::*, render::view::RenderLayers, window::PrimaryWindow};
use bevy_pancam::{DirectionKeys, PanCam, PanCamPlugin};

use crate::{
    BASE_ZOOM, STARTING_DISPLACEMENT, TILE_QUALITY,
    types::{BBox, Coord, bbox_from_world, world_to_lat_lon},
};

/// Fired whenever the continuous viewport zoom has moved far enough from the
/// last reported value to matter for layer redraws and re-clustering.
#[derive(Event, Clone, Copy, Debug)]
pub struct ZoomChangedEvent {
    pub zoom: f64,
}

/// Fired when a pan gesture ends and the camera actually moved.
#[derive(Event, Clone, Copy, Debug, Default)]
pub struct DragEndEvent;

const ZOOM_EVENT_STEP: f64 = 0.2;

/// Web-Mercator projection context shared by every buffer builder: a fixed
/// reference coordinate mapped to the world origin, scaled so one tile at
/// `zoom` spans `tile_quality` world units.
#[derive(Resource, Clone, Copy, Debug)]
pub struct MapTransform {
    pub reference: Coord,
    pub zoom: u32,
    pub tile_quality: f64,
}

impl Default for MapTransform {
    fn default() -> Self {
        Self {
            reference: STARTING_DISPLACEMENT,
            zoom: BASE_ZOOM,
            tile_quality: TILE_QUALITY as f64,
        }
    }
}

impl MapTransform {
    pub fn world_pos(&self, coord: Coord) -> Vec2 {
        coord.to_world(self.reference, self.zoom, self.tile_quality)
    }

    pub fn to_lat_lon(&self, world: Vec2) -> Coord {
        world_to_lat_lon(
            world.x as f64,
            world.y as f64,
            self.reference,
            self.zoom,
            self.tile_quality,
        )
    }
}

/// Per-frame view of the map camera: geographic bounds, continuous zoom and
/// the window size, plus the screen-pixel to world-unit factor buffer
/// builders use for screen-space sizing.
#[derive(Resource, Clone, Copy, Debug)]
pub struct ViewportState {
    pub bounds: BBox,
    pub zoom: f64,
    pub size: Vec2,
    pub px_to_world: f32,
}

impl Default for ViewportState {
    fn default() -> Self {
        Self {
            bounds: [0.0, 0.0, 0.0, 0.0],
            zoom: BASE_ZOOM as f64,
            size: Vec2::ZERO,
            px_to_world: 1.0,
        }
    }
}

pub struct CameraSystemPlugin;

impl Plugin for CameraSystemPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins(PanCamPlugin)
            .init_resource::<MapTransform>()
            .init_resource::<ViewportState>()
            .add_event::<ZoomChangedEvent>()
            .add_event::<DragEndEvent>()
            .add_systems(Startup, setup_camera)
            .add_systems(
                Update,
                (update_viewport, detect_zoom_change, detect_drag_end).chain(),
            );
    }
}

fn setup_camera(mut commands: Commands, map: Res<MapTransform>) {
    let starting = map.world_pos(STARTING_DISPLACEMENT);

    commands.spawn((
        Camera2d,
        RenderLayers::from_layers(&[0, 1]),
        Camera { ..default() },
        Transform {
            translation: Vec3::new(starting.x, starting.y, 1.0),
            ..Default::default()
        },
        PanCam {
            grab_buttons: vec![MouseButton::Middle],
            move_keys: DirectionKeys {
                up: vec![KeyCode::ArrowUp],
                down: vec![KeyCode::ArrowDown],
                left: vec![KeyCode::ArrowLeft],
                right: vec![KeyCode::ArrowRight],
            },
            speed: 400.,
            enabled: true,
            zoom_to_cursor: true,
            min_scale: 0.01,
            max_scale: f32::INFINITY,
            min_x: f32::NEG_INFINITY,
            max_x: f32::INFINITY,
            min_y: f32::NEG_INFINITY,
            max_y: f32::INFINITY,
        },
    ));
}

fn update_viewport(
    mut viewport: ResMut<ViewportState>,
    map: Res<MapTransform>,
    camera: Query<(&Transform, &Projection), With<Camera2d>>,
    q_windows: Query<&Window, With<PrimaryWindow>>,
) {
    let (Ok((transform, projection)), Ok(window)) = (camera.single(), q_windows.single()) else {
        return;
    };
    let Projection::Orthographic(ortho) = projection else {
        return;
    };

    let half = Vec2::new(window.width(), window.height()) * ortho.scale / 2.0;
    let center = transform.translation.truncate();

    viewport.bounds = bbox_from_world(
        center - half,
        center + half,
        map.reference,
        map.zoom,
        map.tile_quality,
    );
    viewport.zoom = map.zoom as f64 - (ortho.scale as f64).log2();
    viewport.size = Vec2::new(window.width(), window.height());
    viewport.px_to_world = ortho.scale;
}

fn detect_zoom_change(
    viewport: Res<ViewportState>,
    mut last_reported: Local<Option<f64>>,
    mut zoom_events: EventWriter<ZoomChangedEvent>,
) {
    let zoom = viewport.zoom;
    match *last_reported {
        Some(last) if (zoom - last).abs() < ZOOM_EVENT_STEP => {}
        _ => {
            if last_reported.is_some() {
                zoom_events.write(ZoomChangedEvent { zoom });
            }
            *last_reported = Some(zoom);
        }
    }
}

/// True when the camera moved on an earlier frame and has now come to rest.
/// Tracking the translation directly covers every pan source the camera has,
/// mouse grabs and key pans alike.
fn pan_settled(last: &mut Option<Vec3>, moving: &mut bool, current: Vec3) -> bool {
    let settled = match *last {
        Some(prev) if prev.distance(current) > f32::EPSILON => {
            *moving = true;
            false
        }
        Some(_) if *moving => {
            *moving = false;
            true
        }
        _ => false,
    };
    *last = Some(current);
    settled
}

fn detect_drag_end(
    camera: Query<&Transform, With<Camera2d>>,
    mut last: Local<Option<Vec3>>,
    mut moving: Local<bool>,
    mut drag_events: EventWriter<DragEndEvent>,
) {
    let Ok(transform) = camera.single() else {
        return;
    };
    if pan_settled(&mut *last, &mut *moving, transform.translation) {
        drag_events.write(DragEndEvent);
    }
}
