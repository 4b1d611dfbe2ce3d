pub mod atlas;
pub mod camera;
pub mod cluster;
pub mod debug;
pub mod interaction;
pub mod layer;
pub mod loader;
pub mod settings;
pub mod types;

use types::Coord;

pub const STARTING_DISPLACEMENT: Coord = Coord::new(52.1951, 0.1313);
pub const BASE_ZOOM: u32 = 14;
// This can be changed, it changes the world size of each tile too.
pub const TILE_QUALITY: i32 = 256;
