use bevy::prelude::*;
use bevy::render::{mesh::Indices, render_resource::PrimitiveTopology};

use super::{BuildContext, empty_mesh};
use crate::atlas::IconAtlas;
use crate::layer::shape::first_shape;
use crate::types::{PointFeature, PointStyle};

/// One textured quad per point, uvs resolved from the icon atlas position
/// table. Features whose icon id has no atlas entry are logged and skipped;
/// a missing entry is a configuration defect, not a draw-time error.
pub fn image_buffer(
    features: &[PointFeature],
    atlas: &IconAtlas,
    style: &PointStyle,
    ctx: &BuildContext,
) -> Mesh {
    let fallback = first_shape(features);
    let half = style.point_size / 2.0 * ctx.px_to_world;

    let mut positions: Vec<[f32; 3]> = Vec::with_capacity(features.len() * 4);
    let mut uvs: Vec<[f32; 2]> = Vec::with_capacity(features.len() * 4);
    let mut indices: Vec<u32> = Vec::with_capacity(features.len() * 6);

    for feature in features {
        let Some(id) = feature.shape.as_deref().or(fallback) else {
            continue;
        };
        let Some([u0, v0, u1, v1]) = atlas.position(id) else {
            warn!("no atlas entry for icon {id:?}");
            continue;
        };
        let center = ctx.map.world_pos(feature.coord());
        let base = positions.len() as u32;
        positions.push([center.x - half, center.y - half, 0.0]);
        positions.push([center.x + half, center.y - half, 0.0]);
        positions.push([center.x + half, center.y + half, 0.0]);
        positions.push([center.x - half, center.y + half, 0.0]);
        // Texture v runs top-down, world y bottom-up.
        uvs.push([u0, v1]);
        uvs.push([u1, v1]);
        uvs.push([u1, v0]);
        uvs.push([u0, v0]);
        indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }

    empty_mesh(PrimitiveTopology::TriangleList)
        .with_inserted_attribute(Mesh::ATTRIBUTE_POSITION, positions)
        .with_inserted_attribute(Mesh::ATTRIBUTE_UV_0, uvs)
        .with_inserted_indices(Indices::U32(indices))
}
