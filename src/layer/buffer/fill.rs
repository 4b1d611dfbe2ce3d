use bevy::prelude::*;
use bevy::render::{mesh::Indices, render_resource::PrimitiveTopology};
use lyon::math::point;
use lyon::path::Path;
use lyon::tessellation::{
    BuffersBuilder, FillOptions, FillTessellator, FillVertex, VertexBuffers,
};

use super::{BuildContext, empty_mesh, unit_outline};
use crate::layer::shape::first_shape;
use crate::types::{PointFeature, PointStyle};

/// Filled-glyph geometry: the collection's glyph is tessellated once at unit
/// scale, then stamped per feature with its resolved fill colour.
pub fn fill_buffer(features: &[PointFeature], style: &PointStyle, ctx: &BuildContext) -> Mesh {
    let glyph = first_shape(features).unwrap_or("circle");
    let (template_verts, template_indices) = glyph_fill_geometry(glyph);
    let radius = style.point_size / 2.0 * ctx.px_to_world;

    let mut positions: Vec<[f32; 3]> = Vec::with_capacity(features.len() * template_verts.len());
    let mut colors: Vec<[f32; 4]> = Vec::with_capacity(positions.capacity());
    let mut indices: Vec<u32> = Vec::with_capacity(features.len() * template_indices.len());

    for feature in features {
        let center = ctx.map.world_pos(feature.coord());
        let color = style.fill_for(feature.active);
        let base = positions.len() as u32;
        for v in &template_verts {
            positions.push([center.x + v[0] * radius, center.y + v[1] * radius, 0.0]);
            colors.push(color);
        }
        indices.extend(template_indices.iter().map(|i| base + i));
    }

    empty_mesh(PrimitiveTopology::TriangleList)
        .with_inserted_attribute(Mesh::ATTRIBUTE_POSITION, positions)
        .with_inserted_attribute(Mesh::ATTRIBUTE_COLOR, colors)
        .with_inserted_indices(Indices::U32(indices))
}

/// Unit-scale triangulation of a glyph outline. Concave glyphs (the star)
/// come out correct because lyon does the ear clipping, not us.
fn glyph_fill_geometry(glyph: &str) -> (Vec<[f32; 2]>, Vec<u32>) {
    let outline = unit_outline(glyph);
    let mut builder = Path::builder();
    builder.begin(point(outline[0].x, outline[0].y));
    for v in &outline[1..] {
        builder.line_to(point(v.x, v.y));
    }
    builder.end(true);
    let path = builder.build();

    let mut geometry: VertexBuffers<[f32; 2], u32> = VertexBuffers::new();
    let mut tessellator = FillTessellator::new();
    let result = tessellator.tessellate_path(
        &path,
        &FillOptions::tolerance(0.01),
        &mut BuffersBuilder::new(&mut geometry, |vertex: FillVertex| {
            let p = vertex.position();
            [p.x, p.y]
        }),
    );
    if let Err(e) = result {
        warn!("glyph {glyph:?} failed to tessellate: {e:?}");
        return (Vec::new(), Vec::new());
    }
    (geometry.vertices, geometry.indices)
}
