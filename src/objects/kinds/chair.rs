use glam::Vec3;
use serde_json::Value;

use crate::objects::blueprint::{AnchorTarget, Blueprint, NodeBlueprint};
use crate::objects::factory::FactoryContext;
use crate::scene_graph::{Geometry, Material, MeshData, Transform};

pub const KIND: &str = "sedia";

const WOOD: u32 = 0x8b4513;

/// A chair made of a seat and a back. Grabbing either part moves the chair.
pub fn build(_context: &FactoryContext, _params: &Value) -> anyhow::Result<Blueprint> {
    let seat = part("seat", Vec3::new(0.2, 0.02, 0.2), Vec3::ZERO);
    let back = part("back", Vec3::new(0.02, 0.2, 0.2), Vec3::new(-0.09, 0.1, 0.0));

    Ok(Blueprint::new(
        NodeBlueprint::new(KIND).with_child(seat).with_child(back),
    ))
}

fn part(name: &str, size: Vec3, position: Vec3) -> NodeBlueprint {
    NodeBlueprint::new(name)
        .with_transform(Transform::from_translation(position))
        .with_mesh(MeshData {
            geometry: Geometry::Box { size },
            material: Material::color(WOOD),
        })
        .with_anchor(AnchorTarget::Root, None)
}
