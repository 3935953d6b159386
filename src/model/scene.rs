use glam::{Mat4, Quat, Vec3};

use crate::model::material::{MaterialId, MeshId};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    pub fn from_translation(translation: Vec3) -> Self {
        Self { translation, ..Default::default() }
    }

    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = Vec3::splat(scale);
        self
    }

    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SkinId(pub usize);

/// What a node draws, if anything.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Visual {
    None,
    Mesh { mesh: MeshId, material: MaterialId },
    Lines { mesh: MeshId, material: MaterialId },
    Skinned { mesh: MeshId, material: MaterialId, skin: SkinId },
}

/// Which shadow maps a node takes part in. Off for new nodes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Shadows {
    pub cast: bool,
    pub receive: bool,
}

impl Shadows {
    pub const CAST: Self = Self { cast: true, receive: false };
    pub const RECEIVE: Self = Self { cast: false, receive: true };
}

#[derive(Debug, Clone)]
pub struct Node {
    pub name: String,
    pub transform: Transform,
    pub visual: Visual,
    pub shadows: Shadows,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
}

/// Joints of a skinned mesh and their inverse bind matrices.
#[derive(Debug, Clone)]
pub struct Skin {
    pub joints: Vec<NodeId>,
    pub inverse_bind: Vec<Mat4>,
}

/// Node arena. Nodes are only ever appended and a parent always has a lower
/// index than its children, so a single forward pass resolves world matrices.
pub struct SceneGraph {
    nodes: Vec<Node>,
    skins: Vec<Skin>,
}

impl SceneGraph {
    pub const ROOT: NodeId = NodeId(0);

    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                name: "scene".to_string(),
                transform: Transform::default(),
                visual: Visual::None,
                shadows: Shadows::default(),
                parent: None,
                children: Vec::new(),
            }],
            skins: Vec::new(),
        }
    }

    pub fn add(&mut self, parent: NodeId, name: &str, transform: Transform, visual: Visual) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            name: name.to_string(),
            transform,
            visual,
            shadows: Shadows::default(),
            parent: Some(parent),
            children: Vec::new(),
        });
        self.nodes[parent.0].children.push(id);
        id
    }

    /// Empty transform-only node, like a three.js `Group`/`Object3D`.
    pub fn add_group(&mut self, parent: NodeId, name: &str, transform: Transform) -> NodeId {
        self.add(parent, name, transform, Visual::None)
    }

    pub fn add_skin(&mut self, skin: Skin) -> SkinId {
        self.skins.push(skin);
        SkinId(self.skins.len() - 1)
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn transform(&self, id: NodeId) -> &Transform {
        &self.nodes[id.0].transform
    }

    pub fn set_shadows(&mut self, id: NodeId, shadows: Shadows) {
        self.nodes[id.0].shadows = shadows;
    }

    pub fn transform_mut(&mut self, id: NodeId) -> &mut Transform {
        &mut self.nodes[id.0].transform
    }

    pub fn set_visual(&mut self, id: NodeId, visual: Visual) {
        self.nodes[id.0].visual = visual;
    }

    pub fn skin(&self, id: SkinId) -> &Skin {
        &self.skins[id.0]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes.iter().enumerate().map(|(i, n)| (NodeId(i), n))
    }

    /// World matrix of every node, indexed by `NodeId`.
    pub fn world_matrices(&self) -> Vec<Mat4> {
        let mut world: Vec<Mat4> = Vec::with_capacity(self.nodes.len());
        for node in &self.nodes {
            let local = node.transform.matrix();
            let m = match node.parent {
                Some(p) => world[p.0] * local,
                None => local,
            };
            world.push(m);
        }
        world
    }

    /// Joint palette for a skin: `world(joint) * inverse_bind`.
    pub fn joint_matrices(&self, skin: SkinId, world: &[Mat4]) -> Vec<Mat4> {
        let skin = &self.skins[skin.0];
        skin.joints
            .iter()
            .zip(&skin.inverse_bind)
            .map(|(joint, ibm)| world[joint.0] * *ibm)
            .collect()
    }
}

impl Default for SceneGraph {
    fn default() -> Self {
        Self::new()
    }
}
