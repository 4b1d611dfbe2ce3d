use std::collections::HashSet;

use crate::types::PointFeature;

/// The four mutually exclusive point draw strategies.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShapeStrategy {
    /// Filled (and optionally stroked) glyph geometry.
    Fill,
    /// Textured quad per point, uvs from the icon atlas.
    Image,
    /// Raw point primitives, the cheapest path.
    Normal,
    /// Glyph-quad text labels from the font atlas.
    Text,
}

/// 2D glyph names the fill strategy can tessellate directly.
pub const GLYPHS_2D: [&str; 8] = [
    "circle", "triangle", "square", "pentagon", "hexagon", "octagon", "hexagram", "rhombus",
];

/// 3D glyph names; drawn here as their 2D footprint.
pub const GLYPHS_3D: [&str; 4] = ["cube", "cylinder", "column", "sphere"];

pub fn is_glyph(shape: &str) -> bool {
    GLYPHS_2D.contains(&shape) || GLYPHS_3D.contains(&shape)
}

/// First defined `shape` value in draw order, if any.
pub fn first_shape(features: &[PointFeature]) -> Option<&str> {
    features.iter().find_map(|f| f.shape.as_deref())
}

/// Picks the draw strategy for a feature collection. Total: every input maps
/// to exactly one strategy.
///
/// The existence check is on the first record only; a collection whose first
/// record has no `shape` renders as raw points regardless of the rest. When
/// the scan finds no defined value at all the collection classifies as text
/// with nothing to lay out, which draws nothing.
pub fn classify(features: &[PointFeature], image_ids: &HashSet<String>) -> ShapeStrategy {
    let Some(first) = features.first() else {
        return ShapeStrategy::Normal;
    };
    if first.shape.is_none() && !has_shape_key(first) {
        return ShapeStrategy::Normal;
    }

    let Some(shape) = first_shape(features) else {
        return ShapeStrategy::Text;
    };

    if is_glyph(shape) {
        ShapeStrategy::Fill
    } else if image_ids.contains(shape) {
        ShapeStrategy::Image
    } else {
        ShapeStrategy::Text
    }
}

// A record can carry the shape key with no value, e.g. `"shape": null` in
// GeoJSON properties. That still counts as "has the key" for the first-record
// shortcut above.
fn has_shape_key(feature: &PointFeature) -> bool {
    feature
        .properties
        .as_object()
        .is_some_and(|map| map.contains_key("shape"))
}
