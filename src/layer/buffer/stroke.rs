use bevy::prelude::*;
use bevy::render::{mesh::Indices, render_resource::PrimitiveTopology};

use super::{BuildContext, empty_mesh, unit_outline};
use crate::layer::shape::first_shape;
use crate::types::{PointFeature, PointStyle};

/// Line-primitive outline of each filled glyph. Built independently of the
/// fill buffer so fill and stroke toggle independently.
pub fn stroke_buffer(features: &[PointFeature], style: &PointStyle, ctx: &BuildContext) -> Mesh {
    let glyph = first_shape(features).unwrap_or("circle");
    let outline = unit_outline(glyph);
    let radius = style.point_size / 2.0 * ctx.px_to_world;
    let color = style.stroke.linear();

    let mut positions: Vec<[f32; 3]> = Vec::with_capacity(features.len() * outline.len());
    let mut colors: Vec<[f32; 4]> = Vec::with_capacity(positions.capacity());
    let mut indices: Vec<u32> = Vec::with_capacity(features.len() * outline.len() * 2);

    for feature in features {
        let center = ctx.map.world_pos(feature.coord());
        let base = positions.len() as u32;
        let ring = outline.len() as u32;
        for v in &outline {
            positions.push([center.x + v.x * radius, center.y + v.y * radius, 0.0]);
            colors.push(color);
        }
        for i in 0..ring {
            indices.push(base + i);
            indices.push(base + (i + 1) % ring);
        }
    }

    empty_mesh(PrimitiveTopology::LineList)
        .with_inserted_attribute(Mesh::ATTRIBUTE_POSITION, positions)
        .with_inserted_attribute(Mesh::ATTRIBUTE_COLOR, colors)
        .with_inserted_indices(Indices::U32(indices))
}
