use std::collections::HashSet;

use glam::{Mat4, Quat, Vec3};
use id_arena::Arena;

use crate::scene_graph::components::Anchor;
use crate::scene_graph::node::{NodeId, SceneNode};
use crate::scene_graph::resources::MeshRegistry;

/// Node tree plus the index sets the per-frame systems iterate.
///
/// Anchors and buttons are indexed in insertion order, which is also the
/// order in which grabs and button presses are resolved. Removed nodes stay
/// in the arena as empty tombstones; `live` lists the others.
pub struct Scene {
    nodes: Arena<SceneNode>,
    pub meshes: MeshRegistry,
    live: Vec<NodeId>,
    roots: Vec<NodeId>,
    anchors: Vec<NodeId>,
    buttons: Vec<NodeId>,
}

impl Scene {
    pub fn new() -> Self {
        Self {
            nodes: Arena::new(),
            meshes: MeshRegistry::new(),
            live: Vec::new(),
            roots: Vec::new(),
            anchors: Vec::new(),
            buttons: Vec::new(),
        }
    }

    /// Adds a top-level node.
    pub fn add_node(&mut self, mut node: SceneNode) -> NodeId {
        node.parent_id = None;
        node.child_ids.clear();
        let node_id = self.insert(node);
        self.roots.push(node_id);
        node_id
    }

    /// Adds `node` under `parent`, or returns `None` if the parent is gone.
    pub fn add_child(&mut self, parent_id: NodeId, mut node: SceneNode) -> Option<NodeId> {
        if !self.is_alive(parent_id) {
            return None;
        }

        node.parent_id = Some(parent_id);
        node.child_ids.clear();
        let node_id = self.insert(node);

        if let Some(parent) = self.nodes.get_mut(parent_id) {
            parent.child_ids.push(node_id);
        }

        Some(node_id)
    }

    fn insert(&mut self, node: SceneNode) -> NodeId {
        let is_anchor = node.anchor.is_some();
        let is_button = node.button.is_some();
        let node_id = self.nodes.alloc(node);
        self.live.push(node_id);

        if is_anchor {
            self.anchors.push(node_id);
        }
        if is_button {
            self.buttons.push(node_id);
        }

        node_id
    }

    pub fn get_node(&self, id: NodeId) -> Option<&SceneNode> {
        self.nodes.get(id).filter(|node| !node.removed)
    }

    pub fn get_node_mut(&mut self, id: NodeId) -> Option<&mut SceneNode> {
        self.nodes.get_mut(id).filter(|node| !node.removed)
    }

    pub fn is_alive(&self, id: NodeId) -> bool {
        self.get_node(id).is_some()
    }

    pub fn get_node_by_name(&self, name: &str) -> Option<NodeId> {
        self.live
            .iter()
            .copied()
            .find(|&id| self.nodes[id].name == name)
    }

    pub fn node_count(&self) -> usize {
        self.live.len()
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn anchors(&self) -> &[NodeId] {
        &self.anchors
    }

    pub fn buttons(&self) -> &[NodeId] {
        &self.buttons
    }

    pub fn set_anchor(&mut self, id: NodeId, anchor: Option<Anchor>) {
        let Some(node) = self.get_node_mut(id) else {
            return;
        };
        let was_anchor = node.anchor.is_some();
        let is_anchor = anchor.is_some();
        node.anchor = anchor;

        if is_anchor && !was_anchor {
            self.anchors.push(id);
        } else if was_anchor && !is_anchor {
            self.anchors.retain(|&anchor_id| anchor_id != id);
        }
    }

    /// Top-level ancestor of `id` (itself for roots).
    pub fn root_of(&self, id: NodeId) -> Option<NodeId> {
        let mut current = id;
        loop {
            let node = self.get_node(current)?;
            match node.parent_id {
                Some(parent_id) => current = parent_id,
                None => return Some(current),
            }
        }
    }

    /// Whether `id` is `ancestor` or one of its descendants.
    pub fn is_within(&self, id: NodeId, ancestor: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(current_id) = current {
            if current_id == ancestor {
                return true;
            }
            current = self.get_node(current_id).and_then(|node| node.parent_id);
        }
        false
    }

    /// `id` and everything below it, parents before children.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut stack = vec![id];

        while let Some(current) = stack.pop() {
            if let Some(node) = self.get_node(current) {
                result.push(current);
                stack.extend(node.child_ids.iter().rev());
            }
        }

        result
    }

    /// A node is visible when it and all of its ancestors are.
    pub fn is_visible(&self, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(current_id) = current {
            match self.get_node(current_id) {
                Some(node) if node.visible => current = node.parent_id,
                _ => return false,
            }
        }
        true
    }

    /// Mesh-bearing nodes that are anchors or direct children of anchors.
    pub fn hover_candidates(&self) -> Vec<NodeId> {
        let mut candidates = Vec::new();

        for &anchor_id in &self.anchors {
            let Some(anchor) = self.get_node(anchor_id) else {
                continue;
            };

            if anchor.has_mesh() && !candidates.contains(&anchor_id) {
                candidates.push(anchor_id);
            }

            for &child_id in &anchor.child_ids {
                let has_mesh = self.get_node(child_id).is_some_and(SceneNode::has_mesh);
                if has_mesh && !candidates.contains(&child_id) {
                    candidates.push(child_id);
                }
            }
        }

        candidates
    }

    pub fn world_matrix(&self, id: NodeId) -> Option<Mat4> {
        let node = self.get_node(id)?;
        let local = node.transform.local_matrix();

        match node.parent_id {
            Some(parent_id) => Some(self.world_matrix(parent_id)? * local),
            None => Some(local),
        }
    }

    fn parent_world_matrix(&self, id: NodeId) -> Option<Mat4> {
        match self.get_node(id)?.parent_id {
            Some(parent_id) => self.world_matrix(parent_id),
            None => Some(Mat4::IDENTITY),
        }
    }

    pub fn world_position(&self, id: NodeId) -> Option<Vec3> {
        self.world_matrix(id)
            .map(|matrix| matrix.transform_point3(Vec3::ZERO))
    }

    pub fn world_rotation(&self, id: NodeId) -> Option<Quat> {
        self.world_matrix(id)
            .map(|matrix| matrix.to_scale_rotation_translation().1.normalize())
    }

    /// Moves a node so its world position is `position` and, if given, its
    /// world rotation is `rotation`. Parents are assumed uniformly scaled.
    pub fn set_world_pose(&mut self, id: NodeId, position: Vec3, rotation: Option<Quat>) {
        let Some(parent_world) = self.parent_world_matrix(id) else {
            return;
        };

        let local_position = parent_world.inverse().transform_point3(position);
        let local_rotation = rotation.map(|rotation| {
            let parent_rotation = parent_world.to_scale_rotation_translation().1;
            (parent_rotation.inverse() * rotation).normalize()
        });

        if let Some(node) = self.get_node_mut(id) {
            node.transform.set_translation(local_position);
            if let Some(local_rotation) = local_rotation {
                node.transform.set_rotation(local_rotation);
            }
        }
    }

    pub fn set_node_translation(&mut self, id: NodeId, translation: Vec3) {
        if let Some(node) = self.get_node_mut(id) {
            node.transform.set_translation(translation);
        }
    }

    pub fn set_node_scale(&mut self, id: NodeId, scale: f32) {
        if let Some(node) = self.get_node_mut(id) {
            node.transform.set_scale(scale);
        }
    }

    /// Removes `id` and its subtree, releasing their meshes. Returns the
    /// number of nodes removed.
    pub fn remove_subtree(&mut self, id: NodeId) -> usize {
        let removed = self.descendants(id);
        if removed.is_empty() {
            return 0;
        }

        if let Some(parent_id) = self.get_node(id).and_then(|node| node.parent_id) {
            if let Some(parent) = self.nodes.get_mut(parent_id) {
                parent.child_ids.retain(|&child_id| child_id != id);
            }
        }

        for &node_id in &removed {
            if let Some(node) = self.nodes.get_mut(node_id) {
                if let Some(mesh_id) = node.mesh_id.take() {
                    self.meshes.release(mesh_id);
                }
                *node = SceneNode::tombstone();
            }
        }

        let removed: HashSet<NodeId> = removed.into_iter().collect();
        self.live.retain(|node_id| !removed.contains(node_id));
        self.roots.retain(|root_id| !removed.contains(root_id));
        self.anchors.retain(|anchor_id| !removed.contains(anchor_id));
        self.buttons.retain(|button_id| !removed.contains(button_id));

        removed.len()
    }

    pub fn early_update(&mut self) {
        for &node_id in &self.live {
            self.nodes[node_id].transform.reset_flags();
        }
    }

    /// Live nodes whose transform changed since the last `early_update`.
    pub fn changed_nodes(&self) -> Vec<NodeId> {
        self.live
            .iter()
            .copied()
            .filter(|&id| self.nodes[id].transform.has_changed())
            .collect()
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec2;

    use super::*;
    use crate::scene_graph::components::{Action, ActionButton};
    use crate::scene_graph::resources::{Geometry, Material, MeshData};
    use crate::scene_graph::transform::Transform;

    fn plane(scene: &mut Scene) -> crate::scene_graph::resources::MeshId {
        scene.meshes.allocate(MeshData {
            geometry: Geometry::Plane {
                size: Vec2::splat(0.1),
            },
            material: Material::color(0xffffff),
        })
    }

    #[test]
    fn world_position_composes_parent_chain() {
        let mut scene = Scene::new();
        let root = scene.add_node(
            SceneNode::named("root").with_transform(Transform::from_translation_rotation(
                Vec3::new(1.0, 0.0, 0.0),
                Quat::from_rotation_y(std::f32::consts::FRAC_PI_2),
            )),
        );
        let child = scene
            .add_child(
                root,
                SceneNode::named("child")
                    .with_transform(Transform::from_translation(Vec3::new(0.0, 0.0, 1.0))),
            )
            .unwrap();

        let position = scene.world_position(child).unwrap();
        assert!((position - Vec3::new(2.0, 0.0, 0.0)).length() < 1e-5);
        assert_eq!(scene.root_of(child), Some(root));
    }

    #[test]
    fn set_world_pose_accounts_for_parent() {
        let mut scene = Scene::new();
        let root = scene.add_node(
            SceneNode::named("root")
                .with_transform(Transform::from_translation(Vec3::new(0.0, 1.0, 0.0))),
        );
        let child = scene.add_child(root, SceneNode::named("child")).unwrap();

        let rotation = Quat::from_rotation_x(0.3);
        scene.set_world_pose(child, Vec3::new(0.5, 1.5, 0.0), Some(rotation));

        let node = scene.get_node(child).unwrap();
        assert!((node.transform.translation() - Vec3::new(0.5, 0.5, 0.0)).length() < 1e-5);
        assert!(scene.world_rotation(child).unwrap().angle_between(rotation) < 1e-4);
    }

    #[test]
    fn remove_subtree_drops_indexes_and_meshes() {
        let mut scene = Scene::new();
        let mesh = plane(&mut scene);
        let root = scene.add_node(
            SceneNode::named("panel")
                .with_mesh(mesh)
                .with_anchor(Anchor::new()),
        );
        let button_mesh = plane(&mut scene);
        let button = scene
            .add_child(
                root,
                SceneNode::named("trash")
                    .with_mesh(button_mesh)
                    .with_button(ActionButton::new(Action::RemoveObject)),
            )
            .unwrap();
        let other = scene.add_node(SceneNode::named("other").with_anchor(Anchor::new()));

        assert_eq!(scene.anchors(), &[root, other]);
        assert_eq!(scene.buttons(), &[button]);
        assert_eq!(scene.meshes.live_meshes(), 2);
        assert_eq!(scene.node_count(), 3);

        assert_eq!(scene.remove_subtree(root), 2);
        assert_eq!(scene.node_count(), 1);
        assert_eq!(scene.get_node_by_name("trash"), None);

        assert!(!scene.is_alive(root));
        assert!(!scene.is_alive(button));
        assert_eq!(scene.anchors(), &[other]);
        assert!(scene.buttons().is_empty());
        assert_eq!(scene.roots(), &[other]);
        assert_eq!(scene.meshes.live_meshes(), 0);
        assert_eq!(scene.remove_subtree(root), 0);
    }

    #[test]
    fn hover_candidates_include_mesh_children_of_anchors() {
        let mut scene = Scene::new();
        let group = scene.add_node(SceneNode::named("group"));
        let seat_mesh = plane(&mut scene);
        let seat = scene
            .add_child(
                group,
                SceneNode::named("seat")
                    .with_mesh(seat_mesh)
                    .with_anchor(Anchor::controlling(group)),
            )
            .unwrap();
        let cube_mesh = plane(&mut scene);
        let cube = scene.add_node(
            SceneNode::named("cube")
                .with_mesh(cube_mesh)
                .with_anchor(Anchor::new()),
        );
        let icon_mesh = plane(&mut scene);
        let icon = scene
            .add_child(cube, SceneNode::named("icon").with_mesh(icon_mesh))
            .unwrap();
        scene.add_child(cube, SceneNode::named("empty")).unwrap();

        assert_eq!(scene.hover_candidates(), vec![seat, cube, icon]);
    }

    #[test]
    fn hidden_parent_hides_children() {
        let mut scene = Scene::new();
        let root = scene.add_node(SceneNode::named("root"));
        let child = scene.add_child(root, SceneNode::named("child")).unwrap();

        assert!(scene.is_visible(child));
        scene.get_node_mut(root).unwrap().visible = false;
        assert!(!scene.is_visible(child));
    }

    #[test]
    fn early_update_clears_change_flags() {
        let mut scene = Scene::new();
        let root = scene.add_node(SceneNode::named("root"));
        assert_eq!(scene.changed_nodes(), vec![root]);

        scene.early_update();
        assert!(scene.changed_nodes().is_empty());

        scene.set_node_scale(root, 1.1);
        assert_eq!(scene.changed_nodes(), vec![root]);
    }

    #[test]
    fn removed_nodes_leave_no_per_frame_work() {
        let mut scene = Scene::new();
        let kept = scene.add_node(SceneNode::named("kept"));
        for _ in 0..10 {
            let cube = scene.add_node(SceneNode::named("cube").with_anchor(Anchor::new()));
            scene.add_child(cube, SceneNode::named("trash"));
            scene.remove_subtree(cube);
        }

        scene.early_update();
        scene.set_node_scale(kept, 1.1);

        assert_eq!(scene.node_count(), 1);
        assert_eq!(scene.changed_nodes(), vec![kept]);
        assert_eq!(scene.get_node_by_name("cube"), None);
        assert_eq!(scene.get_node_by_name("kept"), Some(kept));
    }
}
