mod fill;
mod image;
mod normal;
mod stroke;
mod text;

pub use fill::*;
pub use image::*;
pub use normal::*;
pub use stroke::*;
pub use text::*;

use bevy::prelude::*;
use bevy::render::{render_asset::RenderAssetUsages, render_resource::PrimitiveTopology};

use crate::camera::MapTransform;

/// Everything a buffer builder needs besides features and style: the map
/// projection and the screen-space sizing factors of the current viewport.
#[derive(Clone, Copy, Debug)]
pub struct BuildContext<'a> {
    pub map: &'a MapTransform,
    /// World units per screen pixel at the current zoom.
    pub px_to_world: f32,
    /// Canvas size in pixels, for screen-space text layout.
    pub canvas: Vec2,
}

pub(crate) fn empty_mesh(topology: PrimitiveTopology) -> Mesh {
    Mesh::new(topology, RenderAssetUsages::default())
}

/// Unit-radius outline ring for a glyph name. 3D glyphs map to their 2D
/// footprint. Unknown names fall back to a circle.
pub(crate) fn unit_outline(glyph: &str) -> Vec<Vec2> {
    use std::f32::consts::{FRAC_PI_2, PI};
    match glyph {
        "triangle" => regular_polygon(3, FRAC_PI_2),
        "square" | "cube" | "column" => regular_polygon(4, PI / 4.0),
        "rhombus" => regular_polygon(4, FRAC_PI_2),
        "pentagon" => regular_polygon(5, FRAC_PI_2),
        "hexagon" => regular_polygon(6, FRAC_PI_2),
        "octagon" => regular_polygon(8, PI / 8.0),
        "hexagram" => star(6, 0.5, FRAC_PI_2),
        _ => regular_polygon(32, 0.0),
    }
}

fn regular_polygon(sides: usize, start_angle: f32) -> Vec<Vec2> {
    (0..sides)
        .map(|i| {
            let angle = start_angle + i as f32 * std::f32::consts::TAU / sides as f32;
            Vec2::new(angle.cos(), angle.sin())
        })
        .collect()
}

fn star(points: usize, inner_radius: f32, start_angle: f32) -> Vec<Vec2> {
    (0..points * 2)
        .map(|i| {
            let angle = start_angle + i as f32 * std::f32::consts::PI / points as f32;
            let radius = if i % 2 == 0 { 1.0 } else { inner_radius };
            Vec2::new(angle.cos() * radius, angle.sin() * radius)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outlines_have_expected_vertex_counts() {
        assert_eq!(unit_outline("triangle").len(), 3);
        assert_eq!(unit_outline("square").len(), 4);
        assert_eq!(unit_outline("hexagram").len(), 12);
        assert_eq!(unit_outline("circle").len(), 32);
        // Unknown glyphs and 3D footprints still produce a ring.
        assert_eq!(unit_outline("sphere").len(), 32);
        assert_eq!(unit_outline("cube").len(), 4);
    }

    #[test]
    fn outlines_sit_on_the_unit_circle_or_inside_it() {
        for glyph in ["triangle", "square", "hexagram", "circle"] {
            for v in unit_outline(glyph) {
                assert!(v.length() <= 1.0 + 1e-5, "{glyph} vertex {v:?}");
            }
        }
    }
}
