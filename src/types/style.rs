use bevy::prelude::*;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A style paint slot: either a colour, or the `none` sentinel meaning
/// "do not draw this part". Serialized as `"none"` or a hex string.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PaintColor {
    None,
    Solid(Srgba),
}

impl PaintColor {
    pub fn is_none(&self) -> bool {
        matches!(self, PaintColor::None)
    }

    pub fn srgba(&self) -> Option<Srgba> {
        match self {
            PaintColor::None => None,
            PaintColor::Solid(color) => Some(*color),
        }
    }

    /// Linear RGBA components for vertex colour attributes.
    pub fn linear(&self) -> [f32; 4] {
        match self {
            PaintColor::None => [0.0, 0.0, 0.0, 0.0],
            PaintColor::Solid(color) => {
                let c = LinearRgba::from(*color);
                [c.red, c.green, c.blue, c.alpha]
            }
        }
    }

    pub fn parse(value: &str) -> Result<Self, String> {
        if value.eq_ignore_ascii_case("none") {
            return Ok(PaintColor::None);
        }
        Srgba::hex(value)
            .map(PaintColor::Solid)
            .map_err(|e| format!("bad colour {value:?}: {e}"))
    }
}

impl Serialize for PaintColor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            PaintColor::None => serializer.serialize_str("none"),
            PaintColor::Solid(color) => serializer.serialize_str(&color.to_hex()),
        }
    }
}

impl<'de> Deserialize<'de> for PaintColor {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        PaintColor::parse(&value).map_err(D::Error::custom)
    }
}

/// Resolved style parameters for one draw call. Immutable while drawing;
/// replaced wholesale on style change.
#[derive(Resource, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PointStyle {
    pub fill: PaintColor,
    pub stroke: PaintColor,
    /// Override colour for features in the interaction-active state.
    pub active_fill: PaintColor,
    pub stroke_width: f32,
    /// Point footprint in screen pixels.
    pub point_size: f32,
    pub font_size: f32,
}

impl Default for PointStyle {
    fn default() -> Self {
        Self {
            fill: PaintColor::Solid(Srgba::new(0.0, 0.5, 0.0, 0.75)),
            stroke: PaintColor::Solid(Srgba::new(0.0, 0.3, 0.0, 0.9)),
            active_fill: PaintColor::Solid(Srgba::new(0.9, 0.4, 0.0, 0.9)),
            stroke_width: 1.5,
            point_size: 12.0,
            font_size: 14.0,
        }
    }
}

impl PointStyle {
    /// Fill colour for one feature, honouring the active override.
    pub fn fill_for(&self, active: bool) -> [f32; 4] {
        if active {
            if let PaintColor::Solid(_) = self.active_fill {
                return self.active_fill.linear();
            }
        }
        self.fill.linear()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_none_sentinel_case_insensitively() {
        assert_eq!(PaintColor::parse("none").unwrap(), PaintColor::None);
        assert_eq!(PaintColor::parse("NONE").unwrap(), PaintColor::None);
    }

    #[test]
    fn parses_hex_colours() {
        let paint = PaintColor::parse("#ff0000").unwrap();
        assert_eq!(paint.srgba(), Some(Srgba::new(1.0, 0.0, 0.0, 1.0)));
        assert!(PaintColor::parse("not-a-colour").is_err());
    }

    #[test]
    fn style_round_trips_through_json() {
        let style = PointStyle {
            stroke: PaintColor::None,
            ..Default::default()
        };
        let json = serde_json::to_string(&style).unwrap();
        let back: PointStyle = serde_json::from_str(&json).unwrap();
        assert_eq!(back, style);
    }

    #[test]
    fn active_override_only_applies_when_set() {
        let mut style = PointStyle::default();
        assert_eq!(style.fill_for(true), style.active_fill.linear());
        assert_eq!(style.fill_for(false), style.fill.linear());

        style.active_fill = PaintColor::None;
        assert_eq!(style.fill_for(true), style.fill.linear());
    }
}
