mod coord;
mod point;
mod style;

pub use coord::*;
pub use point::*;
pub use style::*;
