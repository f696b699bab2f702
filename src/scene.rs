use glam::{Mat4, Quat, Vec3};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Terrain,
    Headstone,
    Plant,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Transform {
    pub fn from_translation_scale(translation: Vec3, scale: Vec3) -> Self {
        Self { translation, rotation: Quat::IDENTITY, scale }
    }

    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self { translation: Vec3::ZERO, rotation: Quat::IDENTITY, scale: Vec3::ONE }
    }
}

/// One drawable box in the scene. Everything the installation shows is built from these.
#[derive(Debug, Clone)]
pub struct SceneNode {
    pub name: String,
    pub kind: NodeKind,
    pub transform: Transform,
    pub color: Vec3,
    pub glow: f32,
    pub visible: bool,
}

impl SceneNode {
    pub fn new(name: impl Into<String>, kind: NodeKind, transform: Transform, color: Vec3) -> Self {
        Self { name: name.into(), kind, transform, color, glow: 0.0, visible: true }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Atmosphere {
    pub sky: Vec3,
    pub horizon: Vec3,
    pub fog_color: Vec3,
    pub fog_near: f32,
    pub fog_far: f32,
}

impl Default for Atmosphere {
    fn default() -> Self {
        Self {
            sky: Vec3::new(0.1, 0.1, 0.15),
            horizon: Vec3::new(0.3, 0.3, 0.3),
            fog_color: Vec3::splat(0.2),
            fog_near: 10.0,
            fog_far: 80.0,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Scene {
    nodes: Vec<SceneNode>,
    pub atmosphere: Atmosphere,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, node: SceneNode) -> NodeId {
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }

    pub fn node(&self, id: NodeId) -> Option<&SceneNode> {
        self.nodes.get(id.0)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut SceneNode> {
        self.nodes.get_mut(id.0)
    }

    pub fn nodes(&self) -> &[SceneNode] {
        &self.nodes
    }

    pub fn find(&self, name: &str) -> Option<NodeId> {
        self.nodes.iter().position(|node| node.name == name).map(NodeId)
    }

    pub fn count(&self, kind: NodeKind) -> usize {
        self.nodes.iter().filter(|node| node.kind == kind).count()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
