use glam::{Vec2, Vec3};

use crate::objects::blueprint::NodeBlueprint;
use crate::scene_graph::{
    Action, ActionButton, ButtonRegion, Geometry, Material, MeshData, Transform,
};

pub const UNLOCKED_COLOR: u32 = 0x00ff00;
pub const LOCKED_COLOR: u32 = 0x0000ff;
pub const TRASH_COLOR: u32 = 0xff0000;

const BUTTON_OPACITY: f32 = 0.5;

pub fn lock_color(locked: bool) -> u32 {
    if locked {
        LOCKED_COLOR
    } else {
        UNLOCKED_COLOR
    }
}

/// Adds the lock and trash buttons along the bottom edge of the front face
/// of a `width` x `height` x `depth` object.
pub fn attach_controls(object: &mut NodeBlueprint, width: f32, height: f32, depth: f32) {
    let size = width * 0.12;
    let spacing = size * 0.7;
    let y = -height / 2.0 + height * 0.1;
    let z = depth / 2.0 + 0.005;

    object.add_child(control_button(
        "lock",
        Action::ToggleLock,
        UNLOCKED_COLOR,
        size,
        Vec3::new(-spacing, y, z),
    ));
    object.add_child(control_button(
        "trash",
        Action::RemoveObject,
        TRASH_COLOR,
        size,
        Vec3::new(spacing, y, z),
    ));
}

fn control_button(
    name: &str,
    action: Action,
    color: u32,
    size: f32,
    position: Vec3,
) -> NodeBlueprint {
    let icon = NodeBlueprint::new(format!("{name} icon"))
        .with_transform(Transform::from_translation(Vec3::new(0.0, 0.0, 0.002)))
        .with_mesh(plane(size * 0.8, Material::translucent(0xffffff, 1.0)));

    NodeBlueprint::new(name)
        .with_transform(Transform::from_translation(position))
        .with_mesh(plane(size, Material::translucent(color, BUTTON_OPACITY)))
        .with_button(
            ActionButton::new(action)
                .with_label(name)
                .with_region(ButtonRegion::rect(Vec2::splat(size))),
        )
        .with_child(icon)
}

pub(crate) fn plane(size: f32, material: Material) -> MeshData {
    MeshData {
        geometry: Geometry::Plane {
            size: Vec2::splat(size),
        },
        material,
    }
}
