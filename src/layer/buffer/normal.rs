use bevy::prelude::*;
use bevy::render::{
    mesh::{Indices, MeshVertexAttribute},
    render_resource::{PrimitiveTopology, VertexFormat},
};

use super::{BuildContext, empty_mesh};
use crate::types::{PointFeature, PointStyle};

/// Per-vertex point size in screen pixels, consumed by a point-primitive
/// pipeline.
pub const ATTRIBUTE_POINT_SIZE: MeshVertexAttribute =
    MeshVertexAttribute::new("Vertex_PointSize", 988_540_917, VertexFormat::Float32);

/// Raw point primitives: position, colour and size only, no glyph or texture
/// lookup. The cheapest strategy.
pub fn normal_buffer(features: &[PointFeature], style: &PointStyle, ctx: &BuildContext) -> Mesh {
    let mut positions: Vec<[f32; 3]> = Vec::with_capacity(features.len());
    let mut colors: Vec<[f32; 4]> = Vec::with_capacity(features.len());
    let mut sizes: Vec<f32> = Vec::with_capacity(features.len());

    for feature in features {
        let center = ctx.map.world_pos(feature.coord());
        positions.push([center.x, center.y, 0.0]);
        colors.push(style.fill_for(feature.active));
        sizes.push(style.point_size);
    }
    let indices = (0..positions.len() as u32).collect();

    empty_mesh(PrimitiveTopology::PointList)
        .with_inserted_attribute(Mesh::ATTRIBUTE_POSITION, positions)
        .with_inserted_attribute(Mesh::ATTRIBUTE_COLOR, colors)
        .with_inserted_attribute(ATTRIBUTE_POINT_SIZE, sizes)
        .with_inserted_indices(Indices::U32(indices))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::MapTransform;
    use bevy::render::mesh::VertexAttributeValues;

    #[test]
    fn one_vertex_per_feature_in_input_order() {
        let map = MapTransform::default();
        let ctx = BuildContext {
            map: &map,
            px_to_world: 1.0,
            canvas: Vec2::splat(512.0),
        };
        let features = vec![
            PointFeature::new("a", 0.13, 52.19),
            PointFeature::new("b", 0.15, 52.21),
        ];
        let style = PointStyle::default();
        let mesh = normal_buffer(&features, &style, &ctx);

        assert_eq!(mesh.primitive_topology(), PrimitiveTopology::PointList);
        let positions = match mesh.attribute(Mesh::ATTRIBUTE_POSITION) {
            Some(VertexAttributeValues::Float32x3(values)) => values.clone(),
            other => panic!("unexpected position attribute: {other:?}"),
        };
        assert_eq!(positions.len(), 2);
        let a = map.world_pos(features[0].coord());
        assert_eq!(positions[0], [a.x, a.y, 0.0]);

        let sizes = match mesh.attribute(ATTRIBUTE_POINT_SIZE) {
            Some(VertexAttributeValues::Float32(values)) => values.clone(),
            other => panic!("unexpected size attribute: {other:?}"),
        };
        assert_eq!(sizes, vec![style.point_size; 2]);
    }
}
