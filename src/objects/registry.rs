use serde_json::Value;

use crate::scene_graph::NodeId;

/// An object spawned into the scene, with what it takes to respawn it.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveObject {
    pub root: NodeId,
    pub kind: String,
    pub params: Value,
}

/// Live objects in spawn order.
#[derive(Debug, Default)]
pub struct ObjectRegistry {
    objects: Vec<ActiveObject>,
}

impl ObjectRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, object: ActiveObject) {
        debug_assert!(!self.contains(object.root));
        self.objects.push(object);
    }

    pub fn remove(&mut self, root: NodeId) -> Option<ActiveObject> {
        let index = self.objects.iter().position(|object| object.root == root)?;
        Some(self.objects.remove(index))
    }

    pub fn get(&self, root: NodeId) -> Option<&ActiveObject> {
        self.objects.iter().find(|object| object.root == root)
    }

    pub fn contains(&self, root: NodeId) -> bool {
        self.get(root).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ActiveObject> {
        self.objects.iter()
    }

    pub fn roots(&self) -> Vec<NodeId> {
        self.objects.iter().map(|object| object.root).collect()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}
