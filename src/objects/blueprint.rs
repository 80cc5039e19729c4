use crate::math::AABB;
use crate::menu::{self, MenuEntry, MenuPanel};
use crate::scene_graph::{
    ActionButton, Anchor, Follower, MeshData, NodeId, OrientationPolicy, Scene, SceneNode,
    Transform,
};

/// Which node an anchor moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnchorTarget {
    Itself,
    /// The top-level node of the object.
    Root,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnchorDesc {
    pub target: AnchorTarget,
    pub bounds: Option<AABB>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MenuDesc {
    pub entries: Vec<MenuEntry>,
    pub page_size: usize,
}

/// Role a node plays in its object's menu, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuRole {
    Slot,
    Arrow,
}

/// Scene-independent description of an object. Built off the frame thread
/// and turned into nodes by [`Blueprint::instantiate`].
#[derive(Debug, Clone, PartialEq)]
pub struct NodeBlueprint {
    pub name: String,
    pub transform: Transform,
    pub mesh: Option<MeshData>,
    pub visible: bool,
    pub anchor: Option<AnchorDesc>,
    pub button: Option<ActionButton>,
    pub follower: Option<Follower>,
    pub orientation: OrientationPolicy,
    pub menu: Option<MenuDesc>,
    pub menu_role: Option<MenuRole>,
    pub children: Vec<NodeBlueprint>,
}

impl NodeBlueprint {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            transform: Transform::default(),
            mesh: None,
            visible: true,
            anchor: None,
            button: None,
            follower: None,
            orientation: OrientationPolicy::default(),
            menu: None,
            menu_role: None,
            children: Vec::new(),
        }
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_mesh(mut self, mesh: MeshData) -> Self {
        self.mesh = Some(mesh);
        self
    }

    pub fn with_anchor(mut self, target: AnchorTarget, bounds: Option<AABB>) -> Self {
        self.anchor = Some(AnchorDesc { target, bounds });
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

    pub fn with_child(mut self, child: NodeBlueprint) -> Self {
        self.children.push(child);
        self
    }

    pub fn add_child(&mut self, child: NodeBlueprint) {
        self.children.push(child);
    }

    pub fn node_count(&self) -> usize {
        1 + self
            .children
            .iter()
            .map(NodeBlueprint::node_count)
            .sum::<usize>()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Blueprint {
    pub root: NodeBlueprint,
}

impl Blueprint {
    pub fn new(root: NodeBlueprint) -> Self {
        Self { root }
    }

    /// Adds the object to `scene` as a new top-level node and returns it.
    pub fn instantiate(self, scene: &mut Scene) -> NodeId {
        let mut menu_nodes = MenuNodes::default();
        let menu = self.root.menu.clone();

        let (node, parts) = split_node(scene, self.root);
        let root = scene.add_node(node);
        finish_node(scene, root, root, parts, &mut menu_nodes);

        if let Some(menu_desc) = menu {
            let mut panel = MenuPanel::new(menu_desc.entries, menu_desc.page_size);
            panel.slots = menu_nodes.slots;
            panel.arrows = menu_nodes.arrows;
            if let Some(node) = scene.get_node_mut(root) {
                node.menu = Some(panel);
            }
            menu::refresh_menu(scene, root);
        }

        root
    }
}

#[derive(Default)]
struct MenuNodes {
    slots: Vec<NodeId>,
    arrows: Vec<NodeId>,
}

/// The parts of a blueprint that can only be applied once the node exists.
struct PendingParts {
    anchor: Option<AnchorDesc>,
    menu_role: Option<MenuRole>,
    children: Vec<NodeBlueprint>,
}

fn split_node(scene: &mut Scene, blueprint: NodeBlueprint) -> (SceneNode, PendingParts) {
    let NodeBlueprint {
        name,
        transform,
        mesh,
        visible,
        anchor,
        button,
        follower,
        orientation,
        menu_role,
        children,
        ..
    } = blueprint;

    let mut node = SceneNode::named(name)
        .with_transform(transform)
        .with_orientation(orientation);
    node.visible = visible;
    node.follower = follower;
    node.button = button;
    if let Some(mesh) = mesh {
        node.mesh_id = Some(scene.meshes.allocate(mesh));
    }

    let parts = PendingParts {
        anchor,
        menu_role,
        children,
    };
    (node, parts)
}

fn finish_node(
    scene: &mut Scene,
    node_id: NodeId,
    root: NodeId,
    parts: PendingParts,
    menu_nodes: &mut MenuNodes,
) {
    if let Some(anchor) = parts.anchor {
        let controlled = match anchor.target {
            AnchorTarget::Root if root != node_id => Some(root),
            _ => None,
        };
        scene.set_anchor(
            node_id,
            Some(Anchor {
                controlled,
                bounds: anchor.bounds,
            }),
        );
    }

    match parts.menu_role {
        Some(MenuRole::Slot) => menu_nodes.slots.push(node_id),
        Some(MenuRole::Arrow) => menu_nodes.arrows.push(node_id),
        None => {}
    }

    for child in parts.children {
        let (node, child_parts) = split_node(scene, child);
        let Some(child_id) = scene.add_child(node_id, node) else {
            continue;
        };
        finish_node(scene, child_id, root, child_parts, menu_nodes);
    }
}
