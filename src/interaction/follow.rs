use crate::camera::Camera;
use crate::config::FollowConfig;
use crate::scene_graph::{NodeId, OrientationPolicy, Scene};

/// Pulls unlocked followers toward the point in front of the viewer and
/// turns billboards among them to face it. Objects for which `is_held`
/// returns true stay where the hand put them.
pub fn update_followers(
    scene: &mut Scene,
    roots: &[NodeId],
    camera: &Camera,
    config: &FollowConfig,
    is_held: impl Fn(&Scene, NodeId) -> bool,
) {
    let goal = camera.point_in_front(config.distance);

    for &root in roots {
        let Some(node) = scene.get_node(root) else {
            continue;
        };
        let Some(follower) = node.follower else {
            continue;
        };
        if follower.locked || is_held(scene, root) {
            continue;
        }

        let billboard = node.orientation == OrientationPolicy::Billboard;
        let Some(position) = scene.world_position(root) else {
            continue;
        };

        let position = position.lerp(goal, config.blend);
        let rotation = if billboard {
            camera.facing_rotation(position)
        } else {
            None
        };
        scene.set_world_pose(root, position, rotation);
    }
}
