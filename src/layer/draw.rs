use bevy::prelude::*;

use super::buffer::{BuildContext, fill_buffer, image_buffer, normal_buffer, stroke_buffer, text_buffer};
use super::shape::ShapeStrategy;
use crate::atlas::{FontAtlas, IconAtlas};
use crate::types::{PointFeature, PointStyle};

/// Draw-order role of one assembled mesh. Line meshes composite after their
/// fill mesh.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MeshRole {
    Fill,
    Line,
}

impl MeshRole {
    /// Z offset used when the mesh is spawned.
    pub fn elevation(&self) -> f32 {
        match self {
            MeshRole::Fill => 1.0,
            MeshRole::Line => 1.5,
        }
    }
}

/// One drawable unit produced by a layer pass.
pub struct TaggedMesh {
    pub role: MeshRole,
    pub mesh: Mesh,
    pub texture: Option<Handle<Image>>,
}

impl TaggedMesh {
    fn plain(role: MeshRole, mesh: Mesh) -> Self {
        Self {
            role,
            mesh,
            texture: None,
        }
    }

    fn textured(mesh: Mesh, texture: Handle<Image>) -> Self {
        Self {
            role: MeshRole::Fill,
            mesh,
            texture: Some(texture),
        }
    }
}

/// Pure render pass: strategy plus inputs in, tagged meshes out. The fill
/// strategy yields zero, one or two meshes depending on the `none` sentinels;
/// every other strategy yields at most one. Image and text need their atlas
/// collaborator; without it the pass logs and draws nothing.
pub fn assemble(
    strategy: ShapeStrategy,
    features: &[PointFeature],
    style: &PointStyle,
    ctx: &BuildContext,
    icons: Option<&IconAtlas>,
    font: Option<&FontAtlas>,
) -> Vec<TaggedMesh> {
    let mut meshes = Vec::new();
    match strategy {
        ShapeStrategy::Fill => {
            if !style.fill.is_none() {
                meshes.push(TaggedMesh::plain(
                    MeshRole::Fill,
                    fill_buffer(features, style, ctx),
                ));
            }
            if !style.stroke.is_none() {
                meshes.push(TaggedMesh::plain(
                    MeshRole::Line,
                    stroke_buffer(features, style, ctx),
                ));
            }
        }
        ShapeStrategy::Image => match icons {
            Some(atlas) if !atlas.is_empty() => {
                meshes.push(TaggedMesh::textured(
                    image_buffer(features, atlas, style, ctx),
                    atlas.texture.clone(),
                ));
            }
            _ => warn!("image strategy selected but no icon atlas is loaded"),
        },
        ShapeStrategy::Normal => {
            meshes.push(TaggedMesh::plain(
                MeshRole::Fill,
                normal_buffer(features, style, ctx),
            ));
        }
        ShapeStrategy::Text => match font {
            Some(font) => {
                meshes.push(TaggedMesh::textured(
                    text_buffer(features, font, style, ctx),
                    font.texture.clone(),
                ));
            }
            None => warn!("text strategy selected but no font atlas is loaded"),
        },
    }
    meshes
}
