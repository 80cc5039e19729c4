use glam::Vec3;
use serde_json::Value;

use crate::objects::blueprint::{Blueprint, NodeBlueprint};
use crate::objects::factory::{param_f32, FactoryContext};
use crate::objects::kinds::controls::attach_controls;
use crate::scene_graph::{Follower, Geometry, Material, MeshData, OrientationPolicy};

pub const KIND: &str = "megaMurena";

const DEFAULT_WIDTH: f32 = 0.80;
const DEFAULT_HEIGHT: f32 = 0.40;
const DEPTH: f32 = 0.01;

/// A large picture panel that drifts in front of the viewer. It cannot be
/// grabbed, only locked in place or thrown away.
pub fn build(context: &FactoryContext, params: &Value) -> anyhow::Result<Blueprint> {
    let width = param_f32(params, "width").unwrap_or(DEFAULT_WIDTH);
    let height = param_f32(params, "height").unwrap_or(DEFAULT_HEIGHT);

    let mut panel = NodeBlueprint::new(KIND)
        .with_mesh(MeshData {
            geometry: Geometry::Box {
                size: Vec3::new(width, height, DEPTH),
            },
            material: Material::color(0xffffff).with_texture(context.panel_texture()),
        })
        .with_follower(Follower::default())
        .with_orientation(OrientationPolicy::Billboard);
    attach_controls(&mut panel, width, height, DEPTH);

    Ok(Blueprint::new(panel))
}
