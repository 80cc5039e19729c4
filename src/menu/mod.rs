//! Paginated menu content shown on the control panel.

pub mod client;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::scene_graph::{Action, NodeId, Scene};

pub use client::MenuSource;

/// One actionable menu line as served by the menu endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuEntry {
    #[serde(default)]
    pub id: Value,
    pub label: String,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub params: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl MenuEntry {
    pub fn new(label: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            id: Value::Null,
            label: label.into(),
            kind: Some(kind.into()),
            params: None,
            extra: Map::new(),
        }
    }

    /// Spawns `type` (or the generic loader) with `params`, or with the
    /// entry's remaining fields when no `params` object is given.
    pub fn spawn_action(&self) -> Action {
        let kind = self.kind.clone().unwrap_or_else(|| "generic".to_string());
        let params = self
            .params
            .clone()
            .unwrap_or_else(|| Value::Object(self.extra.clone()));

        Action::Spawn { kind, params }
    }
}

/// Entries shown when no menu endpoint is configured.
pub fn builtin_entries() -> Vec<MenuEntry> {
    vec![
        MenuEntry::new("Sedia", "sedia"),
        MenuEntry::new("Mega Murena", "megaMurena"),
        MenuEntry::new("Mega cubo", "cubo"),
    ]
}

/// Pagination state of a menu panel. `slots` are the button nodes that show
/// the current page; `arrows` the page-turn buttons.
#[derive(Debug, Clone, PartialEq)]
pub struct MenuPanel {
    entries: Vec<MenuEntry>,
    page: usize,
    page_size: usize,
    pub slots: Vec<NodeId>,
    pub arrows: Vec<NodeId>,
}

impl MenuPanel {
    pub fn new(entries: Vec<MenuEntry>, page_size: usize) -> Self {
        Self {
            entries,
            page: 0,
            page_size: page_size.max(1),
            slots: Vec::new(),
            arrows: Vec::new(),
        }
    }

    pub fn entries(&self) -> &[MenuEntry] {
        &self.entries
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_count(&self) -> usize {
        self.entries.len().div_ceil(self.page_size).max(1)
    }

    /// Moves `delta` pages, wrapping at both ends.
    pub fn turn(&mut self, delta: i32) {
        let count = self.page_count() as i64;
        self.page = (self.page as i64 + delta as i64).rem_euclid(count) as usize;
    }

    pub fn current_entries(&self) -> &[MenuEntry] {
        let start = (self.page * self.page_size).min(self.entries.len());
        let end = (start + self.page_size).min(self.entries.len());
        &self.entries[start..end]
    }
}

/// Rewrites the slot buttons of the menu on `menu_root` for its current page.
/// Slots past the last entry and arrows of single-page menus are hidden.
pub fn refresh_menu(scene: &mut Scene, menu_root: NodeId) {
    let Some(menu) = scene.get_node(menu_root).and_then(|node| node.menu.as_ref()) else {
        return;
    };

    let slots = menu.slots.clone();
    let arrows = menu.arrows.clone();
    let entries = menu.current_entries().to_vec();
    let paged = menu.page_count() > 1;

    for (index, slot) in slots.into_iter().enumerate() {
        let Some(node) = scene.get_node_mut(slot) else {
            continue;
        };

        match entries.get(index) {
            Some(entry) => {
                node.visible = true;
                if let Some(button) = node.button.as_mut() {
                    button.action = entry.spawn_action();
                    button.label = Some(entry.label.clone());
                }
            }
            None => node.visible = false,
        }
    }

    for arrow in arrows {
        if let Some(node) = scene.get_node_mut(arrow) {
            node.visible = paged;
        }
    }
}

/// Turns the menu owned by `menu_root` and refreshes its slots.
pub fn turn_page(scene: &mut Scene, menu_root: NodeId, delta: i32) -> bool {
    let Some(menu) = scene
        .get_node_mut(menu_root)
        .and_then(|node| node.menu.as_mut())
    else {
        return false;
    };

    menu.turn(delta);
    log::debug!("Menu page {}/{}", menu.page() + 1, menu.page_count());
    refresh_menu(scene, menu_root);
    true
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::scene_graph::{ActionButton, SceneNode};

    fn entries(count: usize) -> Vec<MenuEntry> {
        (0..count)
            .map(|index| MenuEntry::new(format!("Item {index}"), "cubo"))
            .collect()
    }

    fn menu_scene(entry_count: usize) -> (Scene, NodeId, Vec<NodeId>, NodeId) {
        let mut scene = Scene::new();
        let root = scene.add_node(SceneNode::named("panel"));
        let slots: Vec<_> = (0..4)
            .map(|index| {
                scene
                    .add_child(
                        root,
                        SceneNode::named(format!("slot {index}"))
                            .with_button(ActionButton::new(Action::Custom("empty".into()))),
                    )
                    .unwrap()
            })
            .collect();
        let arrow = scene
            .add_child(
                root,
                SceneNode::named("down").with_button(ActionButton::new(Action::TurnPage(1))),
            )
            .unwrap();

        let mut menu = MenuPanel::new(entries(entry_count), 4);
        menu.slots = slots.clone();
        menu.arrows = vec![arrow];
        scene.get_node_mut(root).unwrap().menu = Some(menu);
        refresh_menu(&mut scene, root);

        (scene, root, slots, arrow)
    }

    fn slot_label(scene: &Scene, slot: NodeId) -> Option<String> {
        scene.get_node(slot).unwrap().button.as_ref().unwrap().label.clone()
    }

    #[test]
    fn pages_wrap_in_both_directions() {
        let mut menu = MenuPanel::new(entries(9), 4);
        assert_eq!(menu.page_count(), 3);

        menu.turn(-1);
        assert_eq!(menu.page(), 2);
        assert_eq!(menu.current_entries().len(), 1);

        menu.turn(2);
        assert_eq!(menu.page(), 1);
        assert_eq!(menu.current_entries()[0].label, "Item 4");
    }

    #[test]
    fn empty_menu_has_one_empty_page() {
        let mut menu = MenuPanel::new(Vec::new(), 4);
        menu.turn(1);
        assert_eq!(menu.page_count(), 1);
        assert!(menu.current_entries().is_empty());
    }

    #[test]
    fn refresh_hides_unused_slots() {
        let (mut scene, root, slots, arrow) = menu_scene(6);

        assert_eq!(slot_label(&scene, slots[0]).as_deref(), Some("Item 0"));
        assert!(scene.get_node(arrow).unwrap().visible);

        assert!(turn_page(&mut scene, root, 1));
        assert_eq!(slot_label(&scene, slots[1]).as_deref(), Some("Item 5"));
        assert!(scene.get_node(slots[1]).unwrap().visible);
        assert!(!scene.get_node(slots[2]).unwrap().visible);
        assert!(!scene.get_node(slots[3]).unwrap().visible);
    }

    #[test]
    fn single_page_hides_arrows() {
        let (scene, _, slots, arrow) = menu_scene(2);
        assert!(!scene.get_node(arrow).unwrap().visible);
        assert!(!scene.get_node(slots[2]).unwrap().visible);
    }

    #[test]
    fn entry_without_params_passes_extra_fields() {
        let entry: MenuEntry = serde_json::from_value(json!({
            "id": 7,
            "label": "Lamp",
            "url": "models/lamp.glb",
            "scale": 0.3
        }))
        .unwrap();

        assert_eq!(
            entry.spawn_action(),
            Action::Spawn {
                kind: "generic".to_string(),
                params: json!({ "url": "models/lamp.glb", "scale": 0.3 }),
            }
        );
    }

    #[test]
    fn entry_with_type_and_params_uses_them() {
        let entry: MenuEntry = serde_json::from_value(json!({
            "id": "c1",
            "label": "Red cube",
            "type": "cubo",
            "params": { "color": 16711680 }
        }))
        .unwrap();

        assert_eq!(
            entry.spawn_action(),
            Action::Spawn {
                kind: "cubo".to_string(),
                params: json!({ "color": 16711680 }),
            }
        );
    }
}
