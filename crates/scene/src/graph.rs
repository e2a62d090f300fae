//! Scene graph: an arena of nodes with parent/child links.
//!
//! Nodes reference geometry and materials in a [`ResourceStore`](crate::resources::ResourceStore)
//! by id. Removing a node never releases resources; see [`crate::dispose`].

use foundation::arena::Arena;
use foundation::math::Vec3;

use crate::components::{GroupTag, OverlaySprite, Transform};
use crate::entity::NodeId;
use crate::resources::{GeometryId, MaterialId};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GraphError {
    #[error("node {0:?} does not exist")]
    UnknownNode(NodeId),
    #[error("attaching {child:?} under {parent:?} would create a cycle")]
    Cycle { parent: NodeId, child: NodeId },
    #[error("the scene root cannot be detached or removed")]
    RootNode,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MeshComponent {
    pub geometry: GeometryId,
    /// Indexed by the geometry's group `material_index`.
    pub materials: Vec<MaterialId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LineComponent {
    pub geometry: GeometryId,
    pub material: MaterialId,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PointLight {
    pub color: u32,
    pub intensity: f64,
    /// `0` means no attenuation.
    pub distance: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Scene,
    Group,
    Mesh(MeshComponent),
    Line(LineComponent),
    Sprite(OverlaySprite),
    Camera,
    Light(PointLight),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub name: String,
    pub kind: NodeKind,
    pub transform: Transform,
    pub visible: bool,
    pub tag: Option<GroupTag>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl Node {
    pub fn new(kind: NodeKind) -> Self {
        Self {
            name: String::new(),
            kind,
            transform: Transform::identity(),
            visible: true,
            tag: None,
            parent: None,
            children: Vec::new(),
        }
    }

    pub fn group() -> Self {
        Self::new(NodeKind::Group)
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn tagged(mut self, tag: GroupTag) -> Self {
        self.tag = Some(tag);
        self
    }

    pub fn at(mut self, position: Vec3) -> Self {
        self.transform.position = position;
        self
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

#[derive(Debug)]
pub struct SceneGraph {
    nodes: Arena<Node>,
    root: NodeId,
}

impl Default for SceneGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneGraph {
    pub fn new() -> Self {
        let mut nodes = Arena::new();
        let root = NodeId(nodes.alloc(Node::new(NodeKind::Scene).named("scene")));
        Self { nodes, root }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Inserts a detached node.
    pub fn add_node(&mut self, node: Node) -> NodeId {
        let mut node = node;
        node.parent = None;
        node.children.clear();
        NodeId(self.nodes.alloc(node))
    }

    /// Inserts `node` as the last child of `parent`.
    pub fn add_child(&mut self, parent: NodeId, node: Node) -> Result<NodeId, GraphError> {
        if !self.contains(parent) {
            return Err(GraphError::UnknownNode(parent));
        }
        // A fresh node has no parent or children, so no cycle check is needed.
        let id = self.add_node(node);
        self.link(parent, id);
        Ok(id)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains(id.0)
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id)?.parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    /// Moves `child` under `parent`, detaching it from any previous parent first.
    pub fn attach(&mut self, parent: NodeId, child: NodeId) -> Result<(), GraphError> {
        if !self.contains(parent) {
            return Err(GraphError::UnknownNode(parent));
        }
        if !self.contains(child) {
            return Err(GraphError::UnknownNode(child));
        }
        if child == self.root {
            return Err(GraphError::RootNode);
        }
        if self.is_ancestor_or_self(child, parent) {
            return Err(GraphError::Cycle { parent, child });
        }

        self.unlink(child);
        self.link(parent, child);
        Ok(())
    }

    /// Removes `id` from its parent's child list; the subtree stays alive.
    pub fn detach(&mut self, id: NodeId) -> Result<(), GraphError> {
        if !self.contains(id) {
            return Err(GraphError::UnknownNode(id));
        }
        if id == self.root {
            return Err(GraphError::RootNode);
        }
        self.unlink(id);
        Ok(())
    }

    /// Removes one node from the arena. Its children become detached roots.
    pub fn remove_node(&mut self, id: NodeId) -> Result<Node, GraphError> {
        if id == self.root {
            return Err(GraphError::RootNode);
        }
        if !self.contains(id) {
            return Err(GraphError::UnknownNode(id));
        }
        self.unlink(id);
        let node = self.nodes.remove(id.0).ok_or(GraphError::UnknownNode(id))?;
        for child in &node.children {
            if let Some(c) = self.nodes.get_mut(child.0) {
                c.parent = None;
            }
        }
        Ok(node)
    }

    pub fn find_child_by_name(&self, parent: NodeId, name: &str) -> Option<NodeId> {
        self.children(parent)
            .iter()
            .copied()
            .find(|c| self.node(*c).is_some_and(|n| n.name == name))
    }

    /// Pre-order walk of the subtree rooted at `id`, `id` included.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        if !self.contains(id) {
            return out;
        }
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            out.push(current);
            // Reverse so children come out in insertion order.
            for child in self.children(current).iter().rev() {
                stack.push(*child);
            }
        }
        out
    }

    pub fn world_transform(&self, id: NodeId) -> Option<Transform> {
        let mut transform = self.node(id)?.transform;
        let mut cursor = self.parent(id);
        while let Some(parent) = cursor {
            let node = self.node(parent)?;
            transform = transform.then(&node.transform);
            cursor = node.parent;
        }
        Some(transform)
    }

    /// Visible only if every ancestor is visible too.
    pub fn is_effectively_visible(&self, id: NodeId) -> bool {
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            match self.node(current) {
                Some(node) if node.visible => cursor = node.parent,
                _ => return false,
            }
        }
        true
    }

    /// Whether the node is connected to the scene root.
    pub fn is_attached(&self, id: NodeId) -> bool {
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            if current == self.root {
                return true;
            }
            cursor = self.parent(current);
        }
        false
    }

    /// Nearest node (self included) carrying a group tag.
    pub fn tagged_ancestor(&self, id: NodeId) -> Option<(NodeId, &GroupTag)> {
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            let node = self.node(current)?;
            if let Some(tag) = &node.tag {
                return Some((current, tag));
            }
            cursor = node.parent;
        }
        None
    }

    fn is_ancestor_or_self(&self, ancestor: NodeId, id: NodeId) -> bool {
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            if current == ancestor {
                return true;
            }
            cursor = self.parent(current);
        }
        false
    }

    fn link(&mut self, parent: NodeId, child: NodeId) {
        if let Some(node) = self.nodes.get_mut(child.0) {
            node.parent = Some(parent);
        }
        if let Some(node) = self.nodes.get_mut(parent.0) {
            node.children.push(child);
        }
    }

    fn unlink(&mut self, id: NodeId) {
        let Some(parent) = self.nodes.get_mut(id.0).and_then(|n| n.parent.take()) else {
            return;
        };
        if let Some(p) = self.nodes.get_mut(parent.0) {
            p.children.retain(|c| *c != id);
        }
    }
}
