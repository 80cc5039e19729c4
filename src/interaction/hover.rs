use glam::Vec3;

use crate::config::HoverConfig;
use crate::scene_graph::Scene;

/// Blends the scale of grabbable meshes toward the hover size while any
/// fingertip is near them, and back to unit size otherwise. Does nothing
/// when no fingertip is tracked.
pub fn resolve_hover(scene: &mut Scene, fingertips: &[Vec3], config: &HoverConfig) {
    if fingertips.is_empty() {
        return;
    }

    for node_id in scene.hover_candidates() {
        let Some(position) = scene.world_position(node_id) else {
            continue;
        };
        let Some(current) = scene.get_node(node_id).map(|node| node.transform.scale()) else {
            continue;
        };

        let hovered = fingertips
            .iter()
            .any(|tip| tip.distance(position) < config.radius);
        let goal = if hovered { config.scale } else { 1.0 };

        if current == goal {
            continue;
        }

        let mut next = current + (goal - current) * config.blend;
        if (goal - next).abs() < 1e-4 {
            next = goal;
        }
        scene.set_node_scale(node_id, next);
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec2;

    use super::*;
    use crate::scene_graph::{Anchor, Geometry, Material, MeshData, SceneNode, Transform};

    fn cube(scene: &mut Scene, position: Vec3) -> crate::scene_graph::NodeId {
        let mesh = scene.meshes.allocate(MeshData {
            geometry: Geometry::Plane {
                size: Vec2::splat(0.15),
            },
            material: Material::color(0x0077ff),
        });
        scene.add_node(
            SceneNode::named("cube")
                .with_transform(Transform::from_translation(position))
                .with_mesh(mesh)
                .with_anchor(Anchor::new()),
        )
    }

    #[test]
    fn hovered_mesh_grows_toward_hover_scale() {
        let mut scene = Scene::new();
        let node = cube(&mut scene, Vec3::new(0.0, 1.0, -0.5));
        let config = HoverConfig::default();

        resolve_hover(&mut scene, &[Vec3::new(0.0, 1.05, -0.5)], &config);
        let scale = scene.get_node(node).unwrap().transform.scale();
        assert!((scale - 1.03).abs() < 1e-5);

        for _ in 0..200 {
            resolve_hover(&mut scene, &[Vec3::new(0.0, 1.05, -0.5)], &config);
        }
        assert_eq!(scene.get_node(node).unwrap().transform.scale(), 1.15);

        for _ in 0..200 {
            resolve_hover(&mut scene, &[Vec3::new(1.0, 1.0, -0.5)], &config);
        }
        assert_eq!(scene.get_node(node).unwrap().transform.scale(), 1.0);
    }

    #[test]
    fn untracked_hands_leave_scale_alone() {
        let mut scene = Scene::new();
        let node = cube(&mut scene, Vec3::ZERO);
        scene.set_node_scale(node, 1.1);

        resolve_hover(&mut scene, &[], &HoverConfig::default());

        assert_eq!(scene.get_node(node).unwrap().transform.scale(), 1.1);
    }

    #[test]
    fn either_hand_counts_as_hovering() {
        let mut scene = Scene::new();
        let node = cube(&mut scene, Vec3::ZERO);

        resolve_hover(
            &mut scene,
            &[Vec3::new(2.0, 0.0, 0.0), Vec3::new(0.05, 0.0, 0.0)],
            &HoverConfig::default(),
        );

        assert!(scene.get_node(node).unwrap().transform.scale() > 1.0);
    }
}
