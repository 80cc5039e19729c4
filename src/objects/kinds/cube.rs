use glam::Vec3;
use serde_json::Value;

use crate::objects::blueprint::{AnchorTarget, Blueprint, NodeBlueprint};
use crate::objects::factory::{param_color, param_f32, FactoryContext};
use crate::objects::kinds::controls::attach_controls;
use crate::scene_graph::{Geometry, Material, MeshData};

pub const KIND: &str = "cubo";

const DEFAULT_SIZE: f32 = 0.15;
const DEFAULT_COLOR: u32 = 0x0077ff;

/// A grabbable cube. Params: `size` (edge length in meters), `color`.
pub fn build(_context: &FactoryContext, params: &Value) -> anyhow::Result<Blueprint> {
    let size = param_f32(params, "size")
        .filter(|size| *size > 0.0)
        .unwrap_or(DEFAULT_SIZE);
    let color = param_color(params, "color").unwrap_or(DEFAULT_COLOR);

    let mut cube = NodeBlueprint::new(KIND)
        .with_mesh(MeshData {
            geometry: Geometry::Box {
                size: Vec3::splat(size),
            },
            material: Material::color(color),
        })
        .with_anchor(AnchorTarget::Itself, None);
    attach_controls(&mut cube, size, size, size);

    Ok(Blueprint::new(cube))
}
