use std::collections::{HashMap, HashSet};

use bevy::prelude::*;
use bevy::render::{
    render_asset::RenderAssetUsages,
    render_resource::{Extent3d, TextureDimension, TextureFormat},
};

use crate::settings::Settings;

const ICON_CELL: u32 = 64;

/// All known icons packed into one texture, with a uv position table keyed by
/// icon id. The id set doubles as the classifier's image-id membership test.
#[derive(Resource, Clone, Debug, Default)]
pub struct IconAtlas {
    pub texture: Handle<Image>,
    positions: HashMap<String, [f32; 4]>,
}

impl IconAtlas {
    pub fn new(texture: Handle<Image>, positions: HashMap<String, [f32; 4]>) -> Self {
        Self { texture, positions }
    }

    pub fn image_ids(&self) -> HashSet<String> {
        self.positions.keys().cloned().collect()
    }

    /// `[u0, v0, u1, v1]` of the icon's cell in the atlas texture.
    pub fn position(&self, id: &str) -> Option<[f32; 4]> {
        self.positions.get(id).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

/// Monospace glyph grid over a font texture. The charset string defines cell
/// order, row-major from the top left.
#[derive(Resource, Clone, Debug)]
pub struct FontAtlas {
    pub texture: Handle<Image>,
    charset: String,
    columns: u32,
    rows: u32,
    /// Width of a glyph cell relative to its height.
    pub glyph_aspect: f32,
}

impl FontAtlas {
    pub fn new(texture: Handle<Image>, charset: String, columns: u32, rows: u32) -> Self {
        Self {
            texture,
            charset,
            columns,
            rows,
            glyph_aspect: 0.6,
        }
    }

    pub fn ascii(texture: Handle<Image>) -> Self {
        let charset: String = (' '..='~').collect();
        Self::new(texture, charset, 16, 6)
    }

    /// `[u0, v0, u1, v1]` of the glyph's cell, or `None` for characters
    /// outside the charset.
    pub fn glyph_uv(&self, c: char) -> Option<[f32; 4]> {
        let index = self.charset.chars().position(|g| g == c)? as u32;
        if index >= self.columns * self.rows {
            return None;
        }
        let col = index % self.columns;
        let row = index / self.columns;
        let w = 1.0 / self.columns as f32;
        let h = 1.0 / self.rows as f32;
        Some([
            col as f32 * w,
            row as f32 * h,
            (col + 1) as f32 * w,
            (row + 1) as f32 * h,
        ])
    }
}

/// Packs icon images into a square-ish grid atlas. Icons are resized to one
/// cell each; the returned table maps icon id to its normalized cell rect.
pub fn pack_icons(
    icons: &[(String, image::RgbaImage)],
    cell: u32,
) -> (image::RgbaImage, HashMap<String, [f32; 4]>) {
    let count = icons.len().max(1) as u32;
    let columns = (count as f64).sqrt().ceil() as u32;
    let rows = count.div_ceil(columns);
    let mut atlas = image::RgbaImage::new(columns * cell, rows * cell);
    let mut positions = HashMap::new();

    for (i, (id, icon)) in icons.iter().enumerate() {
        let col = i as u32 % columns;
        let row = i as u32 / columns;
        let resized =
            image::imageops::resize(icon, cell, cell, image::imageops::FilterType::Triangle);
        image::imageops::overlay(&mut atlas, &resized, (col * cell) as i64, (row * cell) as i64);
        positions.insert(
            id.clone(),
            [
                col as f32 / columns as f32,
                row as f32 / rows as f32,
                (col + 1) as f32 / columns as f32,
                (row + 1) as f32 / rows as f32,
            ],
        );
    }
    (atlas, positions)
}

pub fn rgba_to_bevy_image(data: image::RgbaImage) -> Image {
    let (width, height) = data.dimensions();
    Image::new(
        Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        TextureDimension::D2,
        data.into_raw(),
        TextureFormat::Rgba8UnormSrgb,
        RenderAssetUsages::default(),
    )
}

pub struct AtlasPlugin;

impl Plugin for AtlasPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, load_atlases);
    }
}

fn load_atlases(
    mut commands: Commands,
    settings: Res<Settings>,
    mut images: ResMut<Assets<Image>>,
) {
    let mut icons = Vec::new();
    for entry in &settings.icons {
        match image::open(&entry.path) {
            Ok(icon) => icons.push((entry.id.clone(), icon.to_rgba8())),
            Err(e) => warn!("skipping icon {:?} ({}): {e}", entry.id, entry.path),
        }
    }
    let (atlas, positions) = pack_icons(&icons, ICON_CELL);
    let texture = images.add(rgba_to_bevy_image(atlas));
    info!("icon atlas ready with {} icons", positions.len());
    commands.insert_resource(IconAtlas::new(texture, positions));

    let font = match &settings.font {
        Some(cfg) => match image::open(&cfg.path) {
            Ok(sheet) => {
                let texture = images.add(rgba_to_bevy_image(sheet.to_rgba8()));
                FontAtlas::new(texture, cfg.charset.clone(), cfg.columns, cfg.rows)
            }
            Err(e) => {
                warn!("font atlas {:?} unreadable ({e}), using placeholder", cfg.path);
                FontAtlas::ascii(images.add(placeholder_font_sheet()))
            }
        },
        None => FontAtlas::ascii(images.add(placeholder_font_sheet())),
    };
    commands.insert_resource(font);
}

// Solid glyph boxes; labels stay legible as bars until a real sheet is
// configured.
fn placeholder_font_sheet() -> Image {
    let mut sheet = image::RgbaImage::new(16 * 8, 6 * 8);
    for (x, y, pixel) in sheet.enumerate_pixels_mut() {
        let inset = x % 8 >= 1 && x % 8 < 7 && y % 8 >= 1 && y % 8 < 7;
        *pixel = if inset {
            image::Rgba([255, 255, 255, 220])
        } else {
            image::Rgba([0, 0, 0, 0])
        };
    }
    rgba_to_bevy_image(sheet)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(width: u32, height: u32) -> image::RgbaImage {
        image::RgbaImage::from_pixel(width, height, image::Rgba([10, 20, 30, 255]))
    }

    #[test]
    fn packing_assigns_disjoint_cells() {
        let icons = vec![
            ("marker".to_string(), solid(32, 32)),
            ("flag".to_string(), solid(16, 48)),
            ("dot".to_string(), solid(64, 64)),
        ];
        let (atlas, positions) = pack_icons(&icons, 16);
        assert_eq!(positions.len(), 3);
        assert!(atlas.width() >= 32 && atlas.height() >= 32);
        let marker = positions["marker"];
        let flag = positions["flag"];
        assert_ne!(marker, flag);
        for rect in positions.values() {
            assert!(rect[0] < rect[2] && rect[1] < rect[3]);
            assert!(rect[2] <= 1.0 && rect[3] <= 1.0);
        }
    }

    #[test]
    fn icon_atlas_exposes_id_set() {
        let (_, positions) = pack_icons(&[("marker".to_string(), solid(8, 8))], 8);
        let atlas = IconAtlas::new(Handle::default(), positions);
        assert!(atlas.image_ids().contains("marker"));
        assert!(atlas.position("marker").is_some());
        assert!(atlas.position("missing").is_none());
    }

    #[test]
    fn ascii_font_atlas_covers_printable_range() {
        let font = FontAtlas::ascii(Handle::default());
        assert!(font.glyph_uv('A').is_some());
        assert!(font.glyph_uv('~').is_some());
        assert!(font.glyph_uv('\u{1F600}').is_none());
        // Space is the first cell.
        assert_eq!(font.glyph_uv(' ').unwrap()[0], 0.0);
        assert_eq!(font.glyph_uv(' ').unwrap()[1], 0.0);
    }
}
