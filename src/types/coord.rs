use bevy::math::Vec2;
use serde::{Deserialize, Serialize};

const MERCATOR_HALF_WORLD: f64 = 20037508.34;

#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize, Copy)]
#[serde(rename_all = "camelCase")]
pub struct Coord {
    pub lat: f64,
    #[serde(rename = "lon")]
    pub long: f64,
}

impl Coord {
    pub const fn new(lat: f64, long: f64) -> Self {
        Self { lat, long }
    }

    pub fn to_mercator(&self) -> (f64, f64) {
        let x = self.long * MERCATOR_HALF_WORLD / 180.0;
        let y = self.lat.to_radians().tan().asinh() * MERCATOR_HALF_WORLD / std::f64::consts::PI;
        (x, y)
    }

    /// Projects to world units relative to a reference coordinate, scaled so
    /// one tile at `zoom` spans `tile_quality` units.
    pub fn to_world(&self, reference: Coord, zoom: u32, tile_quality: f64) -> Vec2 {
        let reference = reference.to_mercator();
        let scale = meters_per_unit(zoom, tile_quality);
        let (x, y) = self.to_mercator();
        Vec2 {
            x: ((x - reference.0) / scale) as f32,
            y: ((y - reference.1) / scale) as f32,
        }
    }
}

fn meters_per_unit(zoom: u32, tile_quality: f64) -> f64 {
    let meters_per_tile = MERCATOR_HALF_WORLD * 2.0 / 2.0_f64.powi(zoom as i32);
    meters_per_tile / tile_quality
}

pub fn world_to_lat_lon(
    x_offset: f64,
    y_offset: f64,
    reference: Coord,
    zoom: u32,
    tile_quality: f64,
) -> Coord {
    let reference = reference.to_mercator();
    let scale = meters_per_unit(zoom, tile_quality);

    let global_x = reference.0 + x_offset * scale;
    let global_y = reference.1 + y_offset * scale;

    let lon = global_x / MERCATOR_HALF_WORLD * 180.0;
    let lat = (global_y / MERCATOR_HALF_WORLD * 180.0).to_radians();
    let lat = (2.0 * lat.exp().atan() - std::f64::consts::FRAC_PI_2).to_degrees();

    Coord::new(lat, normalize_longitude(lon))
}

fn normalize_longitude(lon: f64) -> f64 {
    let mut lon = lon;
    while lon > 180.0 {
        lon -= 360.0;
    }
    while lon < -180.0 {
        lon += 360.0;
    }
    lon
}
