//! Scene graph and hierarchical scene organization.
//!
//! The graph is headless: it stores what each visual object is and where it sits, but leaves
//! drawing to whatever [`crate::driver::RenderSurface`] consumes it. Every node keeps a
//! `(local, world)` transform pair; [`SceneGraph::update_world_transforms`] propagates
//! `parent * local` down the hierarchy once per frame.

use log::warn;

use crate::data_structures::{instance::Instance, mesh::GridMesh};

/// Handle of a visual object inside a [`SceneGraph`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VisualId(usize);

/// What the render surface should draw for a node.
#[derive(Clone, Debug)]
pub enum VisualKind {
    /// Pure transform node without geometry.
    Container,
    Sphere { radius: f32 },
    Terrain(GridMesh),
    /// A skinned model, posed separately through the animation mixer.
    SkinnedMesh { name: String },
}

#[derive(Clone, Debug)]
pub struct Visual {
    pub kind: VisualKind,
    local: Instance,
    world: Instance,
    parent: Option<VisualId>,
    children: Vec<VisualId>,
}

impl Visual {
    pub fn parent(&self) -> Option<VisualId> {
        self.parent
    }

    pub fn children(&self) -> &[VisualId] {
        &self.children
    }
}

/**
 * Flat arena of visual objects.
 *
 * Nodes are never removed during a play session, so a [`VisualId`] stays valid for the lifetime of
 * the graph. Nodes are stored in insertion order and a child is always inserted after its parent,
 * which lets the world transform pass run as a single forward sweep.
 */
#[derive(Clone, Debug)]
pub struct SceneGraph {
    nodes: Vec<Visual>,
    background: [f32; 3],
}

impl SceneGraph {
    pub fn new(background: [f32; 3]) -> Self {
        Self {
            nodes: Vec::new(),
            background,
        }
    }

    pub fn background(&self) -> [f32; 3] {
        self.background
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Add a root node.
    pub fn add(&mut self, kind: VisualKind, local: Instance) -> VisualId {
        self.insert(kind, local, None)
    }

    /// Add a node below `parent`. An unknown parent degrades to a root node.
    pub fn add_child(&mut self, parent: VisualId, kind: VisualKind, local: Instance) -> VisualId {
        if parent.0 >= self.nodes.len() {
            warn!("parent {:?} does not exist, adding the node as a root", parent);
            return self.insert(kind, local, None);
        }
        let id = self.insert(kind, local, Some(parent));
        self.nodes[parent.0].children.push(id);
        id
    }

    fn insert(&mut self, kind: VisualKind, local: Instance, parent: Option<VisualId>) -> VisualId {
        let id = VisualId(self.nodes.len());
        let world = match parent {
            Some(parent) => &self.nodes[parent.0].world * &local,
            None => local,
        };
        self.nodes.push(Visual {
            kind,
            local,
            world,
            parent,
            children: Vec::new(),
        });
        id
    }

    pub fn get(&self, id: VisualId) -> Option<&Visual> {
        self.nodes.get(id.0)
    }

    /// Local transform of a node.
    pub fn transform(&self, id: VisualId) -> Option<&Instance> {
        self.nodes.get(id.0).map(|node| &node.local)
    }

    pub fn transform_mut(&mut self, id: VisualId) -> Option<&mut Instance> {
        self.nodes.get_mut(id.0).map(|node| &mut node.local)
    }

    pub fn set_local_transform(&mut self, id: VisualId, instance: Instance) {
        match self.nodes.get_mut(id.0) {
            Some(node) => node.local = instance,
            None => warn!("tried to transform missing visual {:?}", id),
        }
    }

    pub fn world_transform(&self, id: VisualId) -> Option<&Instance> {
        self.nodes.get(id.0).map(|node| &node.world)
    }

    /// Recompute `world = parent.world * local` for every node.
    pub fn update_world_transforms(&mut self) {
        for idx in 0..self.nodes.len() {
            let world = match self.nodes[idx].parent {
                Some(parent) => &self.nodes[parent.0].world * &self.nodes[idx].local,
                None => self.nodes[idx].local,
            };
            self.nodes[idx].world = world;
        }
    }

    /// `(VisualId, world transform)` pairs in insertion order.
    pub fn world_transforms(&self) -> Vec<(VisualId, Instance)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(idx, node)| (VisualId(idx), node.world))
            .collect()
    }
}

impl Default for SceneGraph {
    fn default() -> Self {
        Self::new([0.0; 3])
    }
}

#[cfg(test)]
mod tests {
    use cgmath::Vector3;

    use super::*;

    #[test]
    fn children_follow_parent() {
        let mut graph = SceneGraph::default();
        let root = graph.add(VisualKind::Container, Instance::from(Vector3::new(1.0, 0.0, 0.0)));
        let child = graph.add_child(
            root,
            VisualKind::Sphere { radius: 1.0 },
            Instance::from(Vector3::new(0.0, 2.0, 0.0)),
        );
        graph.set_local_transform(root, Instance::from(Vector3::new(5.0, 0.0, 0.0)));
        graph.update_world_transforms();
        let world = graph.world_transform(child).unwrap();
        assert_eq!(world.position, Vector3::new(5.0, 2.0, 0.0));
        assert_eq!(graph.get(child).unwrap().parent(), Some(root));
        assert_eq!(graph.get(root).unwrap().children(), &[child]);
    }
}
