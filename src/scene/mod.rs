pub mod lights;
pub mod materials;
pub mod shapes;
mod teapot;

use glam::{EulerRot, Mat4, Quat, Vec3};
use lights::Light;
use materials::Material;
use shapes::Geometry;
use std::sync::Arc;

/// Name tags used to find the fixed scene members.
pub const OBJECT_TAG: &str = "object";
pub const LIGHT_TAG: &str = "light";
pub const FLOOR_TAG: &str = "floor";
pub const AXES_TAG: &str = "axes";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }

    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }

    /// Applies an XYZ Euler increment in local space.
    pub fn rotate_local(&mut self, x: f32, y: f32) {
        self.rotation = (self.rotation * Quat::from_euler(EulerRot::XYZ, x, y, 0.0)).normalize();
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridHelper {
    pub size: f32,
    pub divisions: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    pub geometry: Arc<Geometry>,
    pub material: Material,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Mesh(Mesh),
    Light(Light),
    Grid(GridHelper),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SceneNode {
    pub id: NodeId,
    pub name: String,
    pub kind: NodeKind,
    pub transform: Transform,
    pub visible: bool,
    pub cast_shadow: bool,
    pub receive_shadow: bool,
}

impl SceneNode {
    pub fn mesh(&self) -> Option<&Mesh> {
        match &self.kind {
            NodeKind::Mesh(mesh) => Some(mesh),
            _ => None,
        }
    }

    pub fn mesh_mut(&mut self) -> Option<&mut Mesh> {
        match &mut self.kind {
            NodeKind::Mesh(mesh) => Some(mesh),
            _ => None,
        }
    }

    pub fn light(&self) -> Option<&Light> {
        match &self.kind {
            NodeKind::Light(light) => Some(light),
            _ => None,
        }
    }

    pub fn light_mut(&mut self) -> Option<&mut Light> {
        match &mut self.kind {
            NodeKind::Light(light) => Some(light),
            _ => None,
        }
    }
}

/// Flat node list owned by the editor; stands in for the render engine's
/// scene. Ids are never reused.
#[derive(Debug, Default)]
pub struct SceneGraph {
    nodes: Vec<SceneNode>,
    next_id: u64,
}

impl SceneGraph {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            next_id: 1,
        }
    }

    pub fn add(&mut self, name: &str, kind: NodeKind, transform: Transform) -> NodeId {
        let id = NodeId(self.next_id.max(1));
        self.next_id = id.0 + 1;
        self.nodes.push(SceneNode {
            id,
            name: name.to_string(),
            kind,
            transform,
            visible: true,
            cast_shadow: false,
            receive_shadow: false,
        });
        id
    }

    #[cfg(test)]
    pub fn remove(&mut self, id: NodeId) -> Option<SceneNode> {
        let index = self.nodes.iter().position(|node| node.id == id)?;
        Some(self.nodes.remove(index))
    }

    /// Removes every node carrying `name`, returning how many were dropped.
    pub fn remove_by_name(&mut self, name: &str) -> usize {
        let before = self.nodes.len();
        self.nodes.retain(|node| node.name != name);
        before - self.nodes.len()
    }

    pub fn get(&self, id: NodeId) -> Option<&SceneNode> {
        self.nodes.iter().find(|node| node.id == id)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut SceneNode> {
        self.nodes.iter_mut().find(|node| node.id == id)
    }

    #[cfg(test)]
    pub fn find_by_name(&self, name: &str) -> Option<&SceneNode> {
        self.nodes.iter().find(|node| node.name == name)
    }

    #[cfg(test)]
    pub fn count_by_name(&self, name: &str) -> usize {
        self.nodes.iter().filter(|node| node.name == name).count()
    }

    pub fn nodes(&self) -> &[SceneNode] {
        &self.nodes
    }

    pub fn lights(&self) -> impl Iterator<Item = &SceneNode> {
        self.nodes
            .iter()
            .filter(|node| matches!(node.kind, NodeKind::Light(_)))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
