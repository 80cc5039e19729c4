use glam::{Vec2, Vec3};
use serde_json::Value;

use crate::menu::{self, MenuEntry, MenuSource};
use crate::objects::blueprint::{AnchorTarget, Blueprint, MenuDesc, MenuRole, NodeBlueprint};
use crate::objects::factory::{param_str, FactoryContext};
use crate::objects::kinds::controls::{self, attach_controls};
use crate::scene_graph::{
    Action, ActionButton, ButtonRegion, Follower, Geometry, Material, MeshData,
    OrientationPolicy, Transform,
};

pub const KIND: &str = "controlPanel";

const WIDTH: f32 = 0.45;
const HEIGHT: f32 = 0.60;
const DEPTH: f32 = 0.01;

const SLOT_SIZE: Vec2 = Vec2::new(0.35, 0.08);
const SLOT_TOP: f32 = 0.2;
const SLOT_STEP: f32 = 0.1;
const ARROW_SIZE: f32 = 0.05;
const FACE_OFFSET: f32 = 0.011;

/// The menu panel. `params.texture` overrides the configured panel image.
pub fn build(context: &FactoryContext, params: &Value) -> anyhow::Result<Blueprint> {
    let texture = match param_str(params, "texture") {
        Some(path) => context.load_texture(path.trim_start_matches("./")),
        None => context.panel_texture(),
    };
    let entries = menu_entries(context);
    let page_size = context.menu.page_size.max(1);
    log::debug!("Control panel with {} menu entries", entries.len());

    let mut panel = NodeBlueprint::new(KIND)
        .with_mesh(MeshData {
            geometry: Geometry::Box {
                size: Vec3::new(WIDTH, HEIGHT, DEPTH),
            },
            material: Material::color(0xffffff).with_texture(texture),
        })
        .with_anchor(AnchorTarget::Itself, None)
        .with_follower(Follower::default())
        .with_orientation(OrientationPolicy::Billboard);
    panel.menu = Some(MenuDesc { entries, page_size });

    for index in 0..page_size {
        let y = SLOT_TOP - index as f32 * SLOT_STEP;
        let mut slot = NodeBlueprint::new(format!("menu slot {index}"))
            .with_transform(Transform::from_translation(Vec3::new(0.0, y, FACE_OFFSET)))
            .with_mesh(MeshData {
                geometry: Geometry::Plane { size: SLOT_SIZE },
                material: Material::translucent(0xeeeeee, 0.5),
            })
            .with_button(
                ActionButton::new(Action::Custom("empty menu slot".to_string()))
                    .with_region(ButtonRegion::rect(SLOT_SIZE)),
            );
        slot.menu_role = Some(MenuRole::Slot);
        panel.add_child(slot);
    }

    let arrow_x = SLOT_SIZE.x / 2.0 + ARROW_SIZE / 2.0;
    let bottom_y = SLOT_TOP - (page_size - 1) as f32 * SLOT_STEP;
    panel.add_child(arrow("menu up", -1, Vec3::new(arrow_x, SLOT_TOP, FACE_OFFSET)));
    panel.add_child(arrow("menu down", 1, Vec3::new(arrow_x, bottom_y, FACE_OFFSET)));

    attach_controls(&mut panel, WIDTH, HEIGHT, DEPTH);

    Ok(Blueprint::new(panel))
}

/// Entries from the configured endpoint, or the built-in list when there is
/// none. A failed fetch leaves the menu empty.
fn menu_entries(context: &FactoryContext) -> Vec<MenuEntry> {
    let Some(endpoint) = &context.menu.endpoint else {
        return menu::builtin_entries();
    };

    let source = MenuSource::new(endpoint.as_str(), context.menu.user_id.as_str());
    match source.fetch(&context.http_agent()) {
        Ok(entries) => entries,
        Err(err) => {
            log::warn!("Menu unavailable: {err:#}");
            Vec::new()
        }
    }
}

fn arrow(name: &str, delta: i32, position: Vec3) -> NodeBlueprint {
    let mut arrow = NodeBlueprint::new(name)
        .with_transform(Transform::from_translation(position))
        .with_mesh(controls::plane(ARROW_SIZE, Material::translucent(0xffffff, 1.0)))
        .with_button(
            ActionButton::new(Action::TurnPage(delta))
                .with_label(name)
                .with_region(ButtonRegion::rect(Vec2::splat(ARROW_SIZE))),
        );
    arrow.menu_role = Some(MenuRole::Arrow);
    arrow
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::scene_graph::Scene;

    #[test]
    fn builtin_menu_fills_the_first_slots() {
        let blueprint = build(&FactoryContext::default(), &json!({})).unwrap();
        let mut scene = Scene::new();
        let root = blueprint.instantiate(&mut scene);

        let node = scene.get_node(root).unwrap();
        assert!(node.is_anchor());
        assert_eq!(node.orientation, OrientationPolicy::Billboard);
        assert!(node.follower.is_some());

        let menu = node.menu.clone().unwrap();
        assert_eq!(menu.entries().len(), 3);
        assert_eq!(menu.slots.len(), 4);
        assert_eq!(menu.arrows.len(), 2);

        let first = scene.get_node(menu.slots[0]).unwrap();
        assert_eq!(
            first.button.as_ref().unwrap().action,
            Action::Spawn {
                kind: "sedia".to_string(),
                params: json!({}),
            }
        );
        assert!(!scene.get_node(menu.slots[3]).unwrap().visible);
        for arrow in menu.arrows {
            assert!(!scene.get_node(arrow).unwrap().visible);
        }

        // slots, arrows, lock and trash
        assert_eq!(scene.buttons().len(), 8);
    }

    #[test]
    fn failed_fetch_leaves_the_menu_empty() {
        let mut context = FactoryContext::default();
        context.menu.endpoint = Some("http://127.0.0.1:9".to_string());

        let blueprint = build(&context, &json!({})).unwrap();
        assert!(blueprint.root.menu.as_ref().unwrap().entries.is_empty());
    }
}
