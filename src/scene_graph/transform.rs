use glam::{Mat4, Quat, Vec3};

#[derive(Debug, Clone, PartialEq)]
pub struct Transform {
    translation: Vec3,
    rotation: Quat,
    scale: f32,
    has_changed_since_last_update: bool,
}

impl Transform {
    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            rotation: Quat::IDENTITY,
            scale: 1.0,
            has_changed_since_last_update: true,
        }
    }

    pub fn from_translation_rotation(translation: Vec3, rotation: Quat) -> Self {
        Self {
            rotation,
            ..Self::from_translation(translation)
        }
    }

    pub fn local_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(
            Vec3::splat(self.scale),
            self.rotation,
            self.translation,
        )
    }

    fn mark_changed(&mut self) {
        self.has_changed_since_last_update = true;
    }

    pub fn set_rotation(&mut self, rotation: Quat) {
        self.rotation = rotation;
        self.mark_changed();
    }

    pub fn set_translation(&mut self, translation: Vec3) {
        self.translation = translation;
        self.mark_changed();
    }

    pub fn set_scale(&mut self, scale: f32) {
        self.scale = scale;
        self.mark_changed();
    }

    pub fn translation(&self) -> Vec3 {
        self.translation
    }

    pub fn rotation(&self) -> Quat {
        self.rotation
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn reset_flags(&mut self) {
        self.has_changed_since_last_update = false;
    }

    pub fn has_changed(&self) -> bool {
        self.has_changed_since_last_update
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::from_translation(Vec3::ZERO)
    }
}
