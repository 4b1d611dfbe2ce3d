use bevy::prelude::*;
use bevy::render::{mesh::Indices, render_resource::PrimitiveTopology};

use super::{BuildContext, empty_mesh};
use crate::atlas::FontAtlas;
use crate::types::{PointFeature, PointStyle};

/// Glyph-quad label geometry laid out against the font atlas. Labels are
/// centred above their point and sized in screen space via the viewport's
/// pixel-to-world factor; a label wider than the canvas is dropped rather
/// than drawn as a smear across the whole view.
pub fn text_buffer(
    features: &[PointFeature],
    font: &FontAtlas,
    style: &PointStyle,
    ctx: &BuildContext,
) -> Mesh {
    let glyph_h = style.font_size * ctx.px_to_world;
    let glyph_w = glyph_h * font.glyph_aspect;

    let mut positions: Vec<[f32; 3]> = Vec::new();
    let mut uvs: Vec<[f32; 2]> = Vec::new();
    let mut colors: Vec<[f32; 4]> = Vec::new();
    let mut indices: Vec<u32> = Vec::new();

    for feature in features {
        let Some(label) = feature.label() else {
            continue;
        };
        let width_px = label.chars().count() as f32 * style.font_size * font.glyph_aspect;
        if ctx.canvas.x > 0.0 && width_px > ctx.canvas.x {
            continue;
        }

        let center = ctx.map.world_pos(feature.coord());
        let color = style.fill_for(feature.active);
        let total_w = label.chars().count() as f32 * glyph_w;
        let mut cursor = center.x - total_w / 2.0;
        let bottom = center.y + style.point_size / 2.0 * ctx.px_to_world;

        for c in label.chars() {
            let Some([u0, v0, u1, v1]) = font.glyph_uv(c) else {
                cursor += glyph_w;
                continue;
            };
            let base = positions.len() as u32;
            positions.push([cursor, bottom, 0.0]);
            positions.push([cursor + glyph_w, bottom, 0.0]);
            positions.push([cursor + glyph_w, bottom + glyph_h, 0.0]);
            positions.push([cursor, bottom + glyph_h, 0.0]);
            // Texture v runs top-down, world y bottom-up.
            uvs.push([u0, v1]);
            uvs.push([u1, v1]);
            uvs.push([u1, v0]);
            uvs.push([u0, v0]);
            colors.extend_from_slice(&[color; 4]);
            indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
            cursor += glyph_w;
        }
    }

    empty_mesh(PrimitiveTopology::TriangleList)
        .with_inserted_attribute(Mesh::ATTRIBUTE_POSITION, positions)
        .with_inserted_attribute(Mesh::ATTRIBUTE_UV_0, uvs)
        .with_inserted_attribute(Mesh::ATTRIBUTE_COLOR, colors)
        .with_inserted_indices(Indices::U32(indices))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::MapTransform;
    use bevy::render::mesh::VertexAttributeValues;

    fn ctx(map: &MapTransform) -> BuildContext {
        BuildContext {
            map,
            px_to_world: 1.0,
            canvas: Vec2::new(1280.0, 720.0),
        }
    }

    fn labelled(id: &str, text: &str) -> PointFeature {
        let mut feature = PointFeature::new(id, 0.13, 52.19);
        feature.properties = serde_json::json!({ "label": text });
        feature
    }

    #[test]
    fn one_quad_per_character() {
        let map = MapTransform::default();
        let font = FontAtlas::ascii(Handle::default());
        let features = vec![labelled("a", "Hi!")];
        let mesh = text_buffer(&features, &font, &PointStyle::default(), &ctx(&map));

        let positions = match mesh.attribute(Mesh::ATTRIBUTE_POSITION) {
            Some(VertexAttributeValues::Float32x3(values)) => values.len(),
            other => panic!("unexpected position attribute: {other:?}"),
        };
        assert_eq!(positions, 12);
        match mesh.indices() {
            Some(Indices::U32(indices)) => assert_eq!(indices.len(), 18),
            other => panic!("unexpected indices: {other:?}"),
        }
    }

    #[test]
    fn characters_outside_charset_are_skipped() {
        let map = MapTransform::default();
        let font = FontAtlas::ascii(Handle::default());
        let features = vec![labelled("a", "a\u{1F600}b")];
        let mesh = text_buffer(&features, &font, &PointStyle::default(), &ctx(&map));
        let positions = match mesh.attribute(Mesh::ATTRIBUTE_POSITION) {
            Some(VertexAttributeValues::Float32x3(values)) => values.len(),
            other => panic!("unexpected position attribute: {other:?}"),
        };
        assert_eq!(positions, 8);
    }

    #[test]
    fn oversized_labels_are_dropped() {
        let map = MapTransform::default();
        let font = FontAtlas::ascii(Handle::default());
        let features = vec![labelled("a", &"x".repeat(500))];
        let mut narrow = ctx(&map);
        narrow.canvas = Vec2::new(100.0, 100.0);
        let mesh = text_buffer(&features, &font, &PointStyle::default(), &narrow);
        let positions = match mesh.attribute(Mesh::ATTRIBUTE_POSITION) {
            Some(VertexAttributeValues::Float32x3(values)) => values.len(),
            other => panic!("unexpected position attribute: {other:?}"),
        };
        assert_eq!(positions, 0);
    }

    #[test]
    fn builder_is_deterministic() {
        let map = MapTransform::default();
        let font = FontAtlas::ascii(Handle::default());
        let features = vec![labelled("a", "Cambridge")];
        let style = PointStyle::default();
        let a = text_buffer(&features, &font, &style, &ctx(&map));
        let b = text_buffer(&features, &font, &style, &ctx(&map));
        let uv_list = |mesh: &Mesh| match mesh.attribute(Mesh::ATTRIBUTE_UV_0) {
            Some(VertexAttributeValues::Float32x2(values)) => values.clone(),
            other => panic!("unexpected uv attribute: {other:?}"),
        };
        assert_eq!(uv_list(&a), uv_list(&b));
    }
}
