//! Scene graph and hierarchical scene organization.
//!
//! Nodes live in an arena owned by their [`Scene`] and refer to each other by
//! [`NodeId`]. Each node has at most one parent; the scene's synthetic root
//! ([`ROOT_NODE_NAME`]) anchors everything that takes part in update and draw.
//!
//! Update walks the tree top-down: a node recomputes its local matrix, then its
//! world matrix from the parent's freshly computed one, then runs its
//! components, its behaviors and finally its children. Draw walks the same
//! order and hands every component its node's world matrix.

use cgmath::{Matrix4, SquareMatrix};
use serde_json::Value;
use slotmap::SlotMap;

use crate::{
    components::{Behavior, Component},
    data_structures::transform::Transform,
    gpu::shader::Shader,
};

pub const ROOT_NODE_NAME: &str = "__ROOT__";

slotmap::new_key_type! {
    pub struct NodeId;
}

pub struct Node {
    id: NodeId,
    pub name: String,
    pub transform: Transform,
    components: Vec<Box<dyn Component>>,
    behaviors: Vec<Box<dyn Behavior>>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    local_matrix: Matrix4<f32>,
    world_matrix: Matrix4<f32>,
    attached: bool,
    loaded: bool,
}

impl Node {
    fn new(id: NodeId, name: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            transform: Transform::default(),
            components: Vec::new(),
            behaviors: Vec::new(),
            parent: None,
            children: Vec::new(),
            local_matrix: Matrix4::identity(),
            world_matrix: Matrix4::identity(),
            attached: false,
            loaded: false,
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn local_matrix(&self) -> Matrix4<f32> {
        self.local_matrix
    }

    pub fn world_matrix(&self) -> Matrix4<f32> {
        self.world_matrix
    }

    /// Whether the node is reachable from its scene's root.
    pub fn is_attached(&self) -> bool {
        self.attached
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn components(&self) -> &[Box<dyn Component>] {
        &self.components
    }

    pub fn behaviors(&self) -> &[Box<dyn Behavior>] {
        &self.behaviors
    }

    pub fn add_component(&mut self, mut component: Box<dyn Component>) {
        component.set_owner(Some(self.id));
        self.components.push(component);
    }

    pub fn add_behavior(&mut self, mut behavior: Box<dyn Behavior>) {
        behavior.set_owner(Some(self.id));
        self.behaviors.push(behavior);
    }

    pub fn get_component_by_name(&self, name: &str) -> Option<&dyn Component> {
        self.components
            .iter()
            .find(|c| c.name() == Some(name))
            .map(|c| c.as_ref())
    }

    pub fn get_behavior_by_name(&self, name: &str) -> Option<&dyn Behavior> {
        self.behaviors
            .iter()
            .find(|b| b.name() == name)
            .map(|b| b.as_ref())
    }
}

pub struct Scene {
    nodes: SlotMap<NodeId, Node>,
    root: NodeId,
    loaded: bool,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene {
    pub fn new() -> Self {
        let mut nodes = SlotMap::with_key();
        let root = nodes.insert_with_key(|id| {
            let mut node = Node::new(id, ROOT_NODE_NAME);
            node.attached = true;
            node
        });
        Self {
            nodes,
            root,
            loaded: false,
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id)
    }

    /// Creates a detached node; attach it with [`add_child`](Self::add_child).
    pub fn create_node(&mut self, name: &str) -> NodeId {
        self.nodes.insert_with_key(|id| Node::new(id, name))
    }

    /// Makes `child` the last child of `parent`, detaching it from any previous parent.
    ///
    /// A child joining the live tree is marked attached together with its subtree,
    /// and loaded right away if the scene already is.
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) -> anyhow::Result<()> {
        if parent == child || self.is_ancestor(child, parent) {
            anyhow::bail!("Node can't become a child of itself or of its own subtree");
        }
        if !self.nodes.contains_key(parent) || !self.nodes.contains_key(child) {
            anyhow::bail!("Node doesn't belong to this scene");
        }
        self.detach(child);

        let parent_attached = self.nodes[parent].attached;
        self.nodes[parent].children.push(child);
        self.nodes[child].parent = Some(parent);
        if parent_attached {
            self.set_attached(child, true);
            if self.loaded {
                self.load_node(child)?;
            }
        }
        Ok(())
    }

    /// Removes `child` from `parent` and destroys its subtree.
    ///
    /// Returns false when `child` isn't a child of `parent`.
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> bool {
        let is_child = self
            .nodes
            .get(parent)
            .is_some_and(|p| p.children.contains(&child));
        if !is_child {
            log::warn!("You tried to remove a node that isn't a child of the given parent");
            return false;
        }
        self.detach(child);
        self.destroy(child);
        true
    }

    fn detach(&mut self, child: NodeId) {
        if let Some(old_parent) = self.nodes[child].parent.take() {
            if let Some(p) = self.nodes.get_mut(old_parent) {
                p.children.retain(|c| *c != child);
            }
            self.set_attached(child, false);
        }
    }

    fn is_ancestor(&self, ancestor: NodeId, mut node: NodeId) -> bool {
        while let Some(parent) = self.nodes.get(node).and_then(|n| n.parent) {
            if parent == ancestor {
                return true;
            }
            node = parent;
        }
        false
    }

    fn set_attached(&mut self, id: NodeId, attached: bool) {
        let mut stack = vec![id];
        while let Some(id) = stack.pop() {
            let node = &mut self.nodes[id];
            node.attached = attached;
            stack.extend(node.children.iter().copied());
        }
    }

    fn destroy(&mut self, id: NodeId) {
        let mut stack = vec![id];
        while let Some(id) = stack.pop() {
            if let Some(mut node) = self.nodes.remove(id) {
                if node.loaded {
                    for component in node.components.iter_mut() {
                        component.unload();
                    }
                }
                stack.extend(node.children);
            }
        }
    }

    /// Depth-first search from the root, parents before children, siblings in order.
    pub fn get_node_by_name(&self, name: &str) -> Option<NodeId> {
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            let node = &self.nodes[id];
            if node.name == name {
                return Some(id);
            }
            stack.extend(node.children.iter().rev().copied());
        }
        None
    }

    /// Loads every attached node that isn't loaded yet.
    pub fn load(&mut self) -> anyhow::Result<()> {
        self.load_node(self.root)?;
        self.loaded = true;
        Ok(())
    }

    fn load_node(&mut self, id: NodeId) -> anyhow::Result<()> {
        let node = &mut self.nodes[id];
        if !node.loaded {
            for index in 0..node.components.len() {
                if let Err(e) = node.components[index].load() {
                    // the node stays unloaded, release what its earlier components took
                    for component in node.components[..index].iter_mut() {
                        component.unload();
                    }
                    return Err(e);
                }
            }
            node.loaded = true;
        }
        for child in node.children.clone() {
            self.load_node(child)?;
        }
        Ok(())
    }

    /// Unloads every component, attached or not. Nodes stay in place.
    pub fn unload(&mut self) {
        for (_, node) in self.nodes.iter_mut() {
            if node.loaded {
                for component in node.components.iter_mut() {
                    component.unload();
                }
                node.loaded = false;
            }
        }
        self.loaded = false;
    }

    pub fn update(&mut self, time: f32) {
        self.update_node(self.root, Matrix4::identity(), time);
    }

    fn update_node(&mut self, id: NodeId, parent_world: Matrix4<f32>, time: f32) {
        let node = &mut self.nodes[id];
        node.local_matrix = node.transform.matrix();
        node.world_matrix = parent_world * node.local_matrix;
        for component in node.components.iter_mut() {
            component.update(time);
        }
        for behavior in node.behaviors.iter_mut() {
            behavior.update(time, &mut node.transform);
        }
        let world = node.world_matrix;
        for child in node.children.clone() {
            self.update_node(child, world, time);
        }
    }

    pub fn draw(&self, shader: &Shader) -> anyhow::Result<()> {
        self.draw_node(self.root, shader)
    }

    fn draw_node(&self, id: NodeId, shader: &Shader) -> anyhow::Result<()> {
        let node = &self.nodes[id];
        for component in node.components.iter() {
            component.draw(shader, &node.world_matrix)?;
        }
        for child in node.children.iter() {
            self.draw_node(*child, shader)?;
        }
        Ok(())
    }

    /// Passes `user_data` to every behavior of `id`.
    pub fn apply_behaviors(&mut self, id: NodeId, user_data: &Value) -> anyhow::Result<()> {
        let node = self
            .nodes
            .get_mut(id)
            .ok_or_else(|| anyhow::anyhow!("Node doesn't belong to this scene"))?;
        for behavior in node.behaviors.iter_mut() {
            behavior.apply(user_data)?;
        }
        Ok(())
    }
}
