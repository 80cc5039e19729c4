use glam::{Mat3, Mat4, Quat, Vec3};

use crate::tracking::HeadPose;

/// The viewer. Looks down its local -Z axis with +Y up.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub position: Vec3,
    pub rotation: Quat,
}

impl Camera {
    pub fn new(position: Vec3, rotation: Quat) -> Self {
        Self { position, rotation }
    }

    pub fn world_matrix(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.rotation, self.position)
    }

    /// Point `distance` units straight ahead of the viewer.
    pub fn point_in_front(&self, distance: f32) -> Vec3 {
        self.world_matrix()
            .transform_point3(Vec3::new(0.0, 0.0, -distance))
    }

    /// Rotation that turns an object at `from` so its +Z axis faces the
    /// viewer. `None` when the object sits on the viewer or straight above
    /// or below it.
    pub fn facing_rotation(&self, from: Vec3) -> Option<Quat> {
        let forward = (self.position - from).try_normalize()?;
        let right = Vec3::Y.cross(forward).try_normalize()?;
        let up = forward.cross(right);

        Some(Quat::from_mat3(&Mat3::from_cols(right, up, forward)).normalize())
    }

    pub fn update_from_head(&mut self, head: &HeadPose) {
        self.position = head.position;
        self.rotation = head.rotation;
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 1.6, 0.0),
            rotation: Quat::IDENTITY,
        }
    }
}
