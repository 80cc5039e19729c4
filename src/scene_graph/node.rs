use id_arena::Id;

use crate::menu::MenuPanel;
use crate::scene_graph::components::{ActionButton, Anchor, Follower, OrientationPolicy};
use crate::scene_graph::resources::MeshId;
use crate::scene_graph::transform::Transform;

pub type NodeId = Id<SceneNode>;

pub struct SceneNode {
    pub name: String,
    pub transform: Transform,
    pub mesh_id: Option<MeshId>,
    pub parent_id: Option<NodeId>,
    pub child_ids: Vec<NodeId>,
    pub visible: bool,
    pub anchor: Option<Anchor>,
    pub button: Option<ActionButton>,
    pub follower: Option<Follower>,
    pub orientation: OrientationPolicy,
    pub menu: Option<MenuPanel>,
    pub(crate) removed: bool,
}

impl SceneNode {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_mesh(mut self, mesh_id: MeshId) -> Self {
        self.mesh_id = Some(mesh_id);
        self
    }

    pub fn with_anchor(mut self, anchor: Anchor) -> Self {
        self.anchor = Some(anchor);
        self
    }

    pub fn with_button(mut self, button: ActionButton) -> Self {
        self.button = Some(button);
        self
    }

    pub fn with_follower(mut self, follower: Follower) -> Self {
        self.follower = Some(follower);
        self
    }

    pub fn with_orientation(mut self, orientation: OrientationPolicy) -> Self {
        self.orientation = orientation;
        self
    }

    pub fn has_mesh(&self) -> bool {
        self.mesh_id.is_some()
    }

    pub fn is_anchor(&self) -> bool {
        self.anchor.is_some()
    }

    /// An emptied node left behind in the arena after removal.
    pub(crate) fn tombstone() -> Self {
        Self {
            removed: true,
            ..Default::default()
        }
    }
}

impl Default for SceneNode {
    fn default() -> Self {
        Self {
            name: String::new(),
            transform: Transform::default(),
            mesh_id: None,
            parent_id: None,
            child_ids: Vec::new(),
            visible: true,
            anchor: None,
            button: None,
            follower: None,
            orientation: OrientationPolicy::default(),
            menu: None,
            removed: false,
        }
    }
}
