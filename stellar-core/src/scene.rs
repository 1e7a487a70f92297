/// Flat scene graph: named nodes, lights, helpers and a background
use nalgebra::Point3;
use std::sync::Arc;

use crate::geometry::Mesh;
use crate::lighting::{GridHelper, Lighting};
use crate::transform::NodeTransform;

/// Index of a node inside its [`Scene`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// What a node represents
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Star,
    Flower,
    StarfieldPoint,
}

/// A mesh placed in the world
#[derive(Debug, Clone)]
pub struct SceneNode {
    pub name: String,
    pub kind: NodeKind,
    pub transform: NodeTransform,
    pub mesh: Arc<Mesh>,
}

impl SceneNode {
    pub fn new(name: impl Into<String>, kind: NodeKind, mesh: Arc<Mesh>) -> Self {
        Self {
            name: name.into(),
            kind,
            transform: NodeTransform::default(),
            mesh,
        }
    }

    pub fn with_transform(mut self, transform: NodeTransform) -> Self {
        self.transform = transform;
        self
    }

    /// Nodes are never parented, so the world position is the local one.
    pub fn world_position(&self) -> Point3<f32> {
        self.transform.position
    }
}

/// Decoded background image
#[derive(Debug, Clone, PartialEq)]
pub struct Background {
    pub width: u32,
    pub height: u32,
    /// Row-major RGB pixels
    pub pixels: Vec<[u8; 3]>,
}

impl Background {
    /// Nearest-neighbour sample at normalized `(u, v)`, both in `[0, 1]`.
    pub fn sample(&self, u: f32, v: f32) -> [u8; 3] {
        if self.width == 0 || self.height == 0 || self.pixels.is_empty() {
            return [0, 0, 0];
        }
        let x = ((u.clamp(0.0, 1.0) * self.width as f32) as u32).min(self.width - 1);
        let y = ((v.clamp(0.0, 1.0) * self.height as f32) as u32).min(self.height - 1);
        self.pixels
            .get((y * self.width + x) as usize)
            .copied()
            .unwrap_or([0, 0, 0])
    }
}

/// Everything that gets drawn
#[derive(Debug, Clone, Default)]
pub struct Scene {
    nodes: Vec<SceneNode>,
    pub lighting: Lighting,
    pub grid: Option<GridHelper>,
    /// Draw a marker at the point light's position
    pub show_light_marker: bool,
    pub background: Option<Background>,
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

    /// First node with the given name.
    pub fn find_by_name(&self, name: &str) -> Option<NodeId> {
        self.nodes.iter().position(|n| n.name == name).map(NodeId)
    }

    pub fn nodes(&self) -> &[SceneNode] {
        &self.nodes
    }

    pub fn nodes_of_kind(&self, kind: NodeKind) -> impl Iterator<Item = &SceneNode> {
        self.nodes.iter().filter(move |n| n.kind == kind)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.background = None;
    }
}
