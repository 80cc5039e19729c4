use glam::{Vec2, Vec3};
use id_arena::{Arena, Id};

pub type MeshId = Id<MeshSlot>;

#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Box { size: Vec3 },
    Plane { size: Vec2 },
    Model { name: String, primitives: usize, vertices: usize },
}

impl Geometry {
    /// Rough vertex count of the uploaded buffers.
    pub fn vertex_count(&self) -> usize {
        match self {
            Geometry::Box { .. } => 24,
            Geometry::Plane { .. } => 4,
            Geometry::Model { vertices, .. } => *vertices,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Texture {
    pub path: String,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub color: u32,
    pub opacity: f32,
    pub texture: Option<Texture>,
}

impl Material {
    pub fn color(color: u32) -> Self {
        Self {
            color,
            opacity: 1.0,
            texture: None,
        }
    }

    pub fn translucent(color: u32, opacity: f32) -> Self {
        Self {
            color,
            opacity,
            texture: None,
        }
    }

    pub fn with_texture(mut self, texture: Option<Texture>) -> Self {
        self.texture = texture;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MeshData {
    pub geometry: Geometry,
    pub material: Material,
}

/// A mesh allocation. The data is dropped when the owning object is removed;
/// the slot itself stays so stale ids resolve to nothing.
pub struct MeshSlot {
    data: Option<MeshData>,
}

/// Meshes and textures the renderer would keep resident on the GPU.
pub struct MeshRegistry {
    slots: Arena<MeshSlot>,
    live_meshes: usize,
    live_textures: usize,
}

impl MeshRegistry {
    pub fn new() -> Self {
        Self {
            slots: Arena::new(),
            live_meshes: 0,
            live_textures: 0,
        }
    }

    pub fn allocate(&mut self, data: MeshData) -> MeshId {
        self.live_meshes += 1;
        if data.material.texture.is_some() {
            self.live_textures += 1;
        }
        self.slots.alloc(MeshSlot { data: Some(data) })
    }

    pub fn get(&self, id: MeshId) -> Option<&MeshData> {
        self.slots.get(id).and_then(|slot| slot.data.as_ref())
    }

    pub fn set_color(&mut self, id: MeshId, color: u32) -> bool {
        match self.slots.get_mut(id).and_then(|slot| slot.data.as_mut()) {
            Some(data) => {
                data.material.color = color;
                true
            }
            None => false,
        }
    }

    /// Returns `false` if the mesh was already released.
    pub fn release(&mut self, id: MeshId) -> bool {
        let Some(data) = self.slots.get_mut(id).and_then(|slot| slot.data.take()) else {
            return false;
        };

        self.live_meshes -= 1;
        if data.material.texture.is_some() {
            self.live_textures -= 1;
        }
        true
    }

    pub fn live_meshes(&self) -> usize {
        self.live_meshes
    }

    pub fn live_textures(&self) -> usize {
        self.live_textures
    }

    pub fn live_vertices(&self) -> usize {
        self.slots
            .iter()
            .filter_map(|(_, slot)| slot.data.as_ref())
            .map(|data| data.geometry.vertex_count())
            .sum()
    }
}

impl Default for MeshRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn release_drops_mesh_and_texture_once() {
        let mut registry = MeshRegistry::new();
        let texture = Texture {
            path: "panel.png".to_string(),
            width: 64,
            height: 64,
        };
        let id = registry.allocate(MeshData {
            geometry: Geometry::Plane {
                size: Vec2::new(0.4, 0.6),
            },
            material: Material::color(0xffffff).with_texture(Some(texture)),
        });

        assert_eq!(registry.live_meshes(), 1);
        assert_eq!(registry.live_textures(), 1);

        assert!(registry.release(id));
        assert!(!registry.release(id));
        assert!(registry.get(id).is_none());
        assert_eq!(registry.live_meshes(), 0);
        assert_eq!(registry.live_textures(), 0);
    }

    #[test]
    fn vertex_totals_skip_released_meshes() {
        let mut registry = MeshRegistry::new();
        let cube = registry.allocate(MeshData {
            geometry: Geometry::Box {
                size: Vec3::splat(0.15),
            },
            material: Material::color(0x0077ff),
        });
        registry.allocate(MeshData {
            geometry: Geometry::Model {
                name: "flower".to_string(),
                primitives: 2,
                vertices: 500,
            },
            material: Material::color(0xffffff),
        });

        assert_eq!(registry.live_vertices(), 524);
        assert!(registry.set_color(cube, 0xff0000));
        registry.release(cube);
        assert_eq!(registry.live_vertices(), 500);
        assert!(!registry.set_color(cube, 0x00ff00));
    }
}
