//! Flattens the scene graph into an ordered list of draws plus the joint
//! palettes skinned draws need. Pure CPU work; the renderer only uploads it.

use glam::{Mat4, Vec3};

use crate::model::material::{MaterialId, MeshId, Resources};
use crate::model::scene::{SceneGraph, Shadows, Visual};

/// Palette slots hold this many joints; extra joints are dropped.
pub const MAX_JOINTS: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topology {
    Triangles,
    Lines,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawItem {
    pub mesh: MeshId,
    pub material: MaterialId,
    /// Identity for skinned draws; their placement lives in the palette.
    pub model: Mat4,
    /// Index into [`DrawList::palettes`]; 0 is the identity palette.
    pub palette: usize,
    pub topology: Topology,
    pub transparent: bool,
    pub shadows: Shadows,
}

#[derive(Debug, Clone)]
pub struct DrawList {
    /// Opaque draws in graph order, then transparent draws back to front.
    pub items: Vec<DrawItem>,
    pub palettes: Vec<Vec<Mat4>>,
}

impl DrawList {
    pub fn build(scene: &SceneGraph, resources: &Resources, eye: Vec3) -> Self {
        let world = scene.world_matrices();
        let mut palettes = vec![vec![Mat4::IDENTITY]];
        let mut opaque = Vec::new();
        let mut transparent: Vec<(f32, DrawItem)> = Vec::new();

        for (id, node) in scene.iter() {
            let (mesh, material, topology, model, palette) = match node.visual {
                Visual::None => continue,
                Visual::Mesh { mesh, material } => (mesh, material, Topology::Triangles, world[id.0], 0),
                Visual::Lines { mesh, material } => (mesh, material, Topology::Lines, world[id.0], 0),
                Visual::Skinned { mesh, material, skin } => {
                    let mut joints = scene.joint_matrices(skin, &world);
                    joints.truncate(MAX_JOINTS);
                    palettes.push(joints);
                    (mesh, material, Topology::Triangles, Mat4::IDENTITY, palettes.len() - 1)
                }
            };
            if resources.mesh(mesh).is_empty() {
                continue;
            }

            let is_transparent = resources.material(material).transparent;
            let item = DrawItem {
                mesh,
                material,
                model,
                palette,
                topology,
                transparent: is_transparent,
                shadows: node.shadows,
            };
            if is_transparent {
                let distance = world[id.0].transform_point3(Vec3::ZERO).distance_squared(eye);
                transparent.push((distance, item));
            } else {
                opaque.push(item);
            }
        }

        transparent.sort_by(|a, b| b.0.total_cmp(&a.0));
        let mut items = opaque;
        items.extend(transparent.into_iter().map(|(_, item)| item));
        Self { items, palettes }
    }

    /// Draws that go into the shadow maps, with their object slot.
    pub fn casters(&self) -> impl Iterator<Item = (usize, &DrawItem)> {
        self.items.iter().enumerate().filter(|(_, item)| item.shadows.cast && !item.transparent)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
