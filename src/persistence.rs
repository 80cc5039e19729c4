//! The `ar_memory` snapshot: which objects exist and where.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Context, Result};
use glam::Vec3;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::objects::ObjectRegistry;
use crate::scene_graph::Scene;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotEntry {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub params: Value,
    pub pos: [f32; 3],
}

impl SnapshotEntry {
    pub fn position(&self) -> Vec3 {
        Vec3::from_array(self.pos)
    }
}

/// One entry per registered object, in spawn order.
pub fn capture(scene: &Scene, registry: &ObjectRegistry) -> Vec<SnapshotEntry> {
    registry
        .iter()
        .filter_map(|object| {
            let position = scene.world_position(object.root)?;
            Some(SnapshotEntry {
                kind: object.kind.clone(),
                params: object.params.clone(),
                pos: position.to_array(),
            })
        })
        .collect()
}

pub fn encode(entries: &[SnapshotEntry]) -> Result<String> {
    Ok(serde_json::to_string(entries)?)
}

pub fn decode(text: &str) -> Result<Vec<SnapshotEntry>> {
    Ok(serde_json::from_str(text)?)
}

/// Key-value slot holding the serialized snapshot.
pub trait SnapshotStore: Send {
    /// `None` when nothing has been saved yet.
    fn load(&self) -> Result<Option<String>>;
    fn save(&mut self, text: &str) -> Result<()>;
}

/// Keeps the snapshot in a file, replaced atomically on every save.
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SnapshotStore for FileStore {
    fn load(&self) -> Result<Option<String>> {
        match fs::read_to_string(&self.path) {
            Ok(text) => Ok(Some(text)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err)
                .with_context(|| format!("Failed to read snapshot {}", self.path.display())),
        }
    }

    fn save(&mut self, text: &str) -> Result<()> {
        let mut temp_path = self.path.clone().into_os_string();
        temp_path.push(".tmp");
        let temp_path = PathBuf::from(temp_path);

        fs::write(&temp_path, text)
            .with_context(|| format!("Failed to write {}", temp_path.display()))?;
        fs::rename(&temp_path, &self.path)
            .with_context(|| format!("Failed to replace snapshot {}", self.path.display()))
    }
}

/// In-memory store. Clones share the same slot.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    slot: Arc<Mutex<Option<String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_contents(text: impl Into<String>) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Some(text.into()))),
        }
    }

    pub fn contents(&self) -> Option<String> {
        self.slot.lock().ok().and_then(|slot| slot.clone())
    }
}

impl SnapshotStore for MemoryStore {
    fn load(&self) -> Result<Option<String>> {
        let slot = self
            .slot
            .lock()
            .map_err(|_| anyhow!("Snapshot slot poisoned"))?;
        Ok(slot.clone())
    }

    fn save(&mut self, text: &str) -> Result<()> {
        let mut slot = self
            .slot
            .lock()
            .map_err(|_| anyhow!("Snapshot slot poisoned"))?;
        *slot = Some(text.to_string());
        Ok(())
    }
}

/// The saved entries, or `None` if nothing usable is stored. Unreadable or
/// malformed data is logged and treated as absent.
pub fn restore_entries(store: &dyn SnapshotStore) -> Option<Vec<SnapshotEntry>> {
    let text = match store.load() {
        Ok(text) => text?,
        Err(err) => {
            log::warn!("Ignoring snapshot: {err:#}");
            return None;
        }
    };

    match decode(&text) {
        Ok(entries) => Some(entries),
        Err(err) => {
            log::warn!("Ignoring malformed snapshot: {err:#}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::objects::ActiveObject;
    use crate::scene_graph::{SceneNode, Transform};

    #[test]
    fn capture_uses_the_wire_format() {
        let mut scene = Scene::new();
        let mut registry = ObjectRegistry::new();
        let root = scene.add_node(
            SceneNode::named("cube")
                .with_transform(Transform::from_translation(Vec3::new(0.1, 1.2, -0.5))),
        );
        registry.register(ActiveObject {
            root,
            kind: "cubo".to_string(),
            params: json!({ "size": 0.2 }),
        });

        let text = encode(&capture(&scene, &registry)).unwrap();
        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value[0]["type"], "cubo");
        assert_eq!(value[0]["params"], json!({ "size": 0.2 }));
        assert_eq!(value[0]["pos"].as_array().unwrap().len(), 3);

        let entries = decode(&text).unwrap();
        assert_eq!(entries[0].pos, [0.1, 1.2, -0.5]);
    }

    #[test]
    fn entries_without_params_decode_as_null() {
        let entries = decode(r#"[{"type": "sedia", "pos": [0, 1, -1]}]"#).unwrap();
        assert_eq!(entries[0].params, Value::Null);
        assert_eq!(entries[0].position(), Vec3::new(0.0, 1.0, -1.0));
    }

    #[test]
    fn malformed_or_missing_snapshots_restore_nothing() {
        assert!(restore_entries(&MemoryStore::new()).is_none());
        assert!(restore_entries(&MemoryStore::with_contents("{not json")).is_none());
        assert!(restore_entries(&MemoryStore::with_contents(r#"[{"type": "cubo"}]"#)).is_none());
        assert_eq!(
            restore_entries(&MemoryStore::with_contents("[]")),
            Some(Vec::new())
        );
    }

    #[test]
    fn file_store_round_trips_and_reports_absence() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::new(dir.path().join("ar_memory.json"));

        assert_eq!(store.load().unwrap(), None);
        store.save("[]").unwrap();
        store.save(r#"[{"type":"cubo","params":{},"pos":[0,0,0]}]"#).unwrap();

        let entries = restore_entries(&store).unwrap();
        assert_eq!(entries.len(), 1);
        assert!(!dir.path().join("ar_memory.json.tmp").exists());
    }
}
