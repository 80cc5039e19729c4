use std::collections::BTreeMap;
use std::time::Duration;

use glam::Vec3;
use serde_json::{json, Value};

use crate::camera::Camera;
use crate::config::SandboxConfig;
use crate::interaction::{
    resolve_hover, update_followers, ButtonPress, FrameEvents, InteractionResolver,
};
use crate::menu;
use crate::objects::kinds::{control_panel, controls};
use crate::objects::{
    ActiveObject, FactoryContext, ObjectFactory, ObjectLoader, ObjectRegistry, SpawnOrigin,
    SpawnRequest, SpawnResult,
};
use crate::persistence::{self, SnapshotEntry, SnapshotStore};
use crate::scene_graph::{Action, NodeId, Scene};
use crate::tracking::TrackingFrame;

/// The AR session: scene, hands, live objects and their saved snapshot.
pub struct Sandbox {
    pub scene: Scene,
    pub camera: Camera,
    pub interaction: InteractionResolver,
    registry: ObjectRegistry,
    loader: ObjectLoader,
    store: Box<dyn SnapshotStore>,
    config: SandboxConfig,
    /// Restored objects still being built, saved as they were requested.
    pending_restores: BTreeMap<usize, SpawnRequest>,
}

impl Sandbox {
    pub fn new(config: SandboxConfig, store: Box<dyn SnapshotStore>) -> Self {
        Self::with_factory(config, store, ObjectFactory::with_builtin_kinds())
    }

    pub fn with_factory(
        config: SandboxConfig,
        store: Box<dyn SnapshotStore>,
        factory: ObjectFactory,
    ) -> Self {
        let loader = ObjectLoader::new(
            factory,
            FactoryContext::from_config(&config),
            config.loader.threaded,
        );

        Self {
            scene: Scene::new(),
            camera: Camera::default(),
            interaction: InteractionResolver::new(config.interaction.clone()),
            registry: ObjectRegistry::new(),
            loader,
            store,
            config,
            pending_restores: BTreeMap::new(),
        }
    }

    pub fn config(&self) -> &SandboxConfig {
        &self.config
    }

    pub fn registry(&self) -> &ObjectRegistry {
        &self.registry
    }

    /// Objects requested but not yet in the scene.
    pub fn pending_objects(&self) -> usize {
        self.loader.in_flight()
    }

    /// Respawns the saved objects, or a control panel when nothing usable is
    /// saved. Returns the number of objects requested.
    pub fn restore(&mut self) -> usize {
        let requests = match persistence::restore_entries(self.store.as_ref()) {
            Some(entries) => {
                log::info!("Restoring {} objects", entries.len());
                entries
                    .into_iter()
                    .enumerate()
                    .map(|(slot, entry)| SpawnRequest {
                        position: Some(entry.position()),
                        kind: entry.kind,
                        params: entry.params,
                        origin: SpawnOrigin::Restore(slot),
                    })
                    .collect()
            }
            None => {
                log::info!("No saved objects, starting with a control panel");
                vec![SpawnRequest {
                    kind: control_panel::KIND.to_string(),
                    params: json!({ "texture": self.config.assets.panel_texture }),
                    position: None,
                    origin: SpawnOrigin::Restore(0),
                }]
            }
        };

        let count = requests.len();
        for request in requests {
            self.queue(request);
        }
        count
    }

    /// Queues `kind` for construction. It appears at `position`, or in front
    /// of the viewer, once its job finishes.
    pub fn spawn_object(&mut self, kind: &str, params: Value, position: Option<Vec3>) {
        self.queue(SpawnRequest {
            kind: kind.to_string(),
            params,
            position,
            origin: SpawnOrigin::User,
        });
    }

    fn queue(&mut self, mut request: SpawnRequest) {
        if request.params.is_null() {
            request.params = json!({});
        }
        if let SpawnOrigin::Restore(slot) = request.origin {
            self.pending_restores.insert(slot, request.clone());
        }
        self.loader.request(request);
    }

    /// Removes a live object and everything under it. Returns `false` for
    /// nodes that are not registered objects.
    pub fn remove_object(&mut self, root: NodeId) -> bool {
        if !self.registry.contains(root) {
            log::warn!("Ignoring removal of unregistered node {root:?}");
            return false;
        }

        self.interaction.release_within(&self.scene, root);
        let removed_nodes = self.scene.remove_subtree(root);
        if let Some(object) = self.registry.remove(root) {
            log::info!("Removed {} ({removed_nodes} nodes)", object.kind);
        }

        self.persist();
        true
    }

    /// Places every object whose construction finished. Returns how many
    /// were added.
    pub fn load_pending_objects(&mut self) -> usize {
        let results = self.loader.load_pending();
        self.place_all(results)
    }

    /// Like [`Sandbox::load_pending_objects`], but first waits up to
    /// `timeout` for queued jobs to finish.
    pub fn wait_for_pending_objects(&mut self, timeout: Duration) -> usize {
        let results = self.loader.wait_pending(timeout);
        self.place_all(results)
    }

    fn place_all(&mut self, results: Vec<SpawnResult>) -> usize {
        results
            .into_iter()
            .filter_map(|result| self.place(result))
            .count()
    }

    fn place(&mut self, result: SpawnResult) -> Option<NodeId> {
        let SpawnResult { request, blueprint } = result;

        let root = match blueprint {
            Ok(blueprint) => {
                let root = blueprint.instantiate(&mut self.scene);
                let position = request.position.unwrap_or_else(|| {
                    self.camera
                        .point_in_front(self.config.follow.spawn_distance)
                });
                self.scene.set_node_translation(root, position);
                self.registry.register(ActiveObject {
                    root,
                    kind: request.kind.clone(),
                    params: request.params.clone(),
                });
                log::info!("Spawned {} at {position}", request.kind);
                Some(root)
            }
            Err(err) => {
                log::error!("Failed to create {}: {err:#}", request.kind);
                None
            }
        };

        if let SpawnOrigin::Restore(slot) = request.origin {
            self.pending_restores.remove(&slot);
        }
        self.persist();

        root
    }

    /// Current snapshot of the live objects, followed by the restored objects
    /// that are still being built.
    pub fn snapshot(&self) -> Vec<SnapshotEntry> {
        let mut entries = persistence::capture(&self.scene, &self.registry);
        entries.extend(self.pending_restores.values().map(|request| {
            let position = request.position.unwrap_or_else(|| {
                self.camera
                    .point_in_front(self.config.follow.spawn_distance)
            });
            SnapshotEntry {
                kind: request.kind.clone(),
                params: request.params.clone(),
                pos: position.to_array(),
            }
        }));
        entries
    }

    /// Writes the snapshot. Restored objects that have not landed yet keep
    /// their saved entries, so a partial restore loses nothing.
    pub fn persist(&mut self) {
        let result = persistence::encode(&self.snapshot()).and_then(|text| self.store.save(&text));
        if let Err(err) = result {
            log::error!("Failed to save objects: {err:#}");
        }
    }

    /// Runs one frame: finished objects enter the scene, followers drift,
    /// hover and hand interaction are resolved, and fired buttons act.
    pub fn frame(&mut self, frame: &TrackingFrame, now: Duration) -> FrameEvents {
        self.scene.early_update();
        if let Some(head) = &frame.head {
            self.camera.update_from_head(head);
        }

        self.load_pending_objects();

        let roots = self.registry.roots();
        let interaction = &self.interaction;
        update_followers(
            &mut self.scene,
            &roots,
            &self.camera,
            &self.config.follow,
            |scene, root| interaction.is_held(scene, root),
        );

        let fingertips: Vec<Vec3> = [frame.left.index_tip, frame.right.index_tip]
            .into_iter()
            .flatten()
            .collect();
        resolve_hover(&mut self.scene, &fingertips, &self.config.hover);

        let mut events = FrameEvents::new();
        self.interaction
            .resolve_frame(frame, &mut self.scene, now, &mut events);

        for press in &events.presses {
            self.apply_press(press);
        }

        if !events.grab_updates.is_empty() {
            self.persist();
        }

        events
    }

    fn apply_press(&mut self, press: &ButtonPress) {
        log::debug!("{} hand pressed {:?}", press.hand.label(), press.action);

        match &press.action {
            Action::Spawn { kind, params } => self.spawn_object(kind, params.clone(), None),
            Action::RemoveObject => match self.scene.root_of(press.button) {
                Some(root) => {
                    self.remove_object(root);
                }
                None => log::debug!("Trash pressed on a removed object"),
            },
            Action::ToggleLock => self.toggle_lock(press.button),
            Action::TurnPage(delta) => {
                let turned = self
                    .scene
                    .root_of(press.button)
                    .is_some_and(|root| menu::turn_page(&mut self.scene, root, *delta));
                if !turned {
                    log::warn!("Page button without a menu");
                }
            }
            Action::Custom(name) => log::info!("Unhandled action {name}"),
        }
    }

    /// Flips the lock button and the idle follow of the object it sits on.
    fn toggle_lock(&mut self, button_id: NodeId) {
        let Some(root) = self.scene.root_of(button_id) else {
            return;
        };

        let Some(button_node) = self.scene.get_node_mut(button_id) else {
            return;
        };
        let mesh_id = button_node.mesh_id;
        let Some(button) = button_node.button.as_mut() else {
            return;
        };
        button.latched = !button.latched;
        let locked = button.latched;

        if let Some(mesh_id) = mesh_id {
            self.scene.meshes.set_color(mesh_id, controls::lock_color(locked));
        }

        if let Some(follower) = self
            .scene
            .get_node_mut(root)
            .and_then(|node| node.follower.as_mut())
        {
            follower.locked = locked;
        }
        log::info!("{} object {root:?}", if locked { "Locked" } else { "Unlocked" });
    }
}

#[cfg(test)]
mod tests {
    use glam::Quat;

    use super::*;
    use crate::persistence::MemoryStore;
    use crate::tracking::HandPose;

    fn sandbox_with(store: &MemoryStore) -> Sandbox {
        let mut config = SandboxConfig::default();
        config.loader.threaded = false;
        Sandbox::new(config, Box::new(store.clone()))
    }

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    /// Right index fingertip at `tip`, hand open.
    fn touch(tip: Vec3) -> TrackingFrame {
        TrackingFrame {
            right: HandPose::new(tip, tip + Vec3::new(0.1, 0.0, 0.0), Quat::IDENTITY),
            ..TrackingFrame::default()
        }
    }

    fn saved(store: &MemoryStore) -> Vec<SnapshotEntry> {
        persistence::decode(&store.contents().unwrap()).unwrap()
    }

    fn named_in(sandbox: &Sandbox, root: NodeId, name: &str) -> NodeId {
        sandbox
            .scene
            .descendants(root)
            .into_iter()
            .find(|&id| sandbox.scene.get_node(id).unwrap().name == name)
            .unwrap()
    }

    #[test]
    fn empty_store_starts_with_a_control_panel() {
        let store = MemoryStore::new();
        let mut sandbox = sandbox_with(&store);

        assert_eq!(sandbox.restore(), 1);
        assert_eq!(sandbox.load_pending_objects(), 1);

        let entries = saved(&store);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].kind, "controlPanel");
        assert_eq!(entries[0].params["texture"], "texture/image/polipo.png");
        assert_eq!(entries[0].pos, [0.0, 1.6, -0.6]);
    }

    #[test]
    fn saved_objects_are_restored_in_place() {
        let store = MemoryStore::with_contents(
            concat!(
                r#"[{"type":"cubo","params":{"size":0.2},"pos":[0.5,1.0,-1.0]},"#,
                r#"{"type":"sedia","pos":[-0.5,0.0,-1.0]}]"#,
            ),
        );
        let mut sandbox = sandbox_with(&store);

        assert_eq!(sandbox.restore(), 2);
        assert_eq!(sandbox.pending_objects(), 2);
        assert_eq!(sandbox.load_pending_objects(), 2);

        let entries = saved(&store);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].kind, "cubo");
        assert_eq!(entries[0].pos, [0.5, 1.0, -1.0]);
        assert_eq!(entries[1].kind, "sedia");
        assert_eq!(entries[1].params, json!({}));
    }

    #[test]
    fn partial_restore_keeps_unbuilt_entries() {
        let original = concat!(
            r#"[{"type":"cubo","params":{},"pos":[0,1,-1]},"#,
            r#"{"type":"sedia","params":{},"pos":[1,0,-1]}]"#,
        );
        let store = MemoryStore::with_contents(original);
        let expected = persistence::decode(original).unwrap();
        let mut sandbox = sandbox_with(&store);
        sandbox.restore();

        let first = sandbox.loader.load_pending().into_iter().next().unwrap();
        sandbox.place(first);
        assert_eq!(saved(&store), expected);

        sandbox.load_pending_objects();
        assert_eq!(saved(&store), expected);
    }

    #[test]
    fn user_spawn_is_saved_while_restore_is_pending() {
        let store = MemoryStore::with_contents(
            r#"[{"type":"sedia","params":{},"pos":[1,0,-1]}]"#,
        );
        let mut sandbox = sandbox_with(&store);
        sandbox.restore();
        sandbox.spawn_object("cubo", json!({}), Some(Vec3::new(0.0, 1.0, -0.5)));

        let mut results = sandbox.loader.load_pending();
        let user = results
            .iter()
            .position(|result| result.request.origin == SpawnOrigin::User)
            .unwrap();
        sandbox.place(results.remove(user));

        let entries = saved(&store);
        let kinds: Vec<&str> = entries.iter().map(|entry| entry.kind.as_str()).collect();
        assert_eq!(kinds, ["cubo", "sedia"]);
        assert_eq!(entries[1].pos, [1.0, 0.0, -1.0]);

        sandbox.place_all(results);
        assert_eq!(saved(&store).len(), 2);
        assert_eq!(sandbox.registry().len(), 2);
    }

    #[test]
    fn failed_restore_drops_its_entry() {
        let store = MemoryStore::with_contents(
            r#"[{"type":"generic","params":{"url":"missing.glb"},"pos":[0,1,-1]}]"#,
        );
        let mut sandbox = sandbox_with(&store);
        sandbox.restore();

        assert_eq!(sandbox.load_pending_objects(), 0);
        assert_eq!(store.contents().as_deref(), Some("[]"));
    }

    #[test]
    fn trash_button_removes_its_object() {
        let store = MemoryStore::with_contents("[]");
        let mut sandbox = sandbox_with(&store);
        sandbox.spawn_object("cubo", json!({ "size": 0.3 }), Some(Vec3::new(0.0, 1.0, -0.5)));
        sandbox.spawn_object("sedia", Value::Null, Some(Vec3::new(1.0, 0.0, -1.0)));
        sandbox.load_pending_objects();

        let cube = sandbox.registry().roots()[0];
        let trash = named_in(&sandbox, cube, "trash");
        let tip = sandbox.scene.world_position(trash).unwrap();

        let events = sandbox.frame(&touch(tip), ms(0));
        assert_eq!(events.presses.len(), 1);
        assert!(!sandbox.scene.is_alive(cube));
        assert_eq!(sandbox.registry().len(), 1);

        let entries = saved(&store);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].kind, "sedia");
    }

    #[test]
    fn lock_button_stops_idle_follow() {
        let store = MemoryStore::new();
        let mut sandbox = sandbox_with(&store);
        let goal = sandbox.camera.point_in_front(sandbox.config().follow.distance);
        sandbox.spawn_object("megaMurena", json!({}), Some(goal));
        sandbox.frame(&TrackingFrame::default(), ms(0));

        let panel = sandbox.registry().roots()[0];
        let lock = named_in(&sandbox, panel, "lock");
        let tip = sandbox.scene.world_position(lock).unwrap();
        sandbox.frame(&touch(tip), ms(16));

        let node = sandbox.scene.get_node(lock).unwrap();
        assert!(node.button.as_ref().unwrap().latched);
        let mesh = sandbox.scene.meshes.get(node.mesh_id.unwrap()).unwrap();
        assert_eq!(mesh.material.color, controls::LOCKED_COLOR);
        assert!(sandbox.scene.get_node(panel).unwrap().follower.unwrap().locked);

        // Walking away no longer drags the panel along.
        sandbox.camera.position = Vec3::new(2.0, 1.6, 0.0);
        let before = sandbox.scene.world_position(panel).unwrap();
        sandbox.frame(&TrackingFrame::default(), ms(32));
        assert_eq!(sandbox.scene.world_position(panel).unwrap(), before);
    }

    #[test]
    fn menu_slot_spawns_its_entry() {
        let store = MemoryStore::new();
        let mut sandbox = sandbox_with(&store);
        sandbox.restore();
        sandbox.frame(&TrackingFrame::default(), ms(0));

        let panel = sandbox.registry().roots()[0];
        let slot = named_in(&sandbox, panel, "menu slot 2");
        let tip = sandbox.scene.world_position(slot).unwrap();
        let events = sandbox.frame(&touch(tip), ms(16));

        assert_eq!(
            events.presses[0].action,
            Action::Spawn {
                kind: "cubo".to_string(),
                params: json!({}),
            }
        );
        assert_eq!(sandbox.pending_objects(), 1);

        sandbox.frame(&TrackingFrame::default(), ms(32));
        assert_eq!(sandbox.registry().len(), 2);
        assert_eq!(saved(&store)[1].kind, "cubo");
    }

    #[test]
    fn failed_objects_are_dropped() {
        let store = MemoryStore::new();
        let mut sandbox = sandbox_with(&store);
        sandbox.spawn_object("generic", json!({ "url": "missing.glb" }), None);

        assert_eq!(sandbox.load_pending_objects(), 0);
        assert!(sandbox.registry().is_empty());
        assert_eq!(sandbox.pending_objects(), 0);
    }

    #[test]
    fn removing_unknown_nodes_is_refused() {
        let store = MemoryStore::new();
        let mut sandbox = sandbox_with(&store);
        let stray = sandbox
            .scene
            .add_node(crate::scene_graph::SceneNode::named("stray"));

        assert!(!sandbox.remove_object(stray));
        assert!(sandbox.scene.is_alive(stray));
        assert!(store.contents().is_none());
    }
}
