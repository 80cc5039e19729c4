use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

/// Which proximity event fires a button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ButtonTrigger {
    /// Fingertip entering the button volume.
    #[default]
    Touch,
    /// Pinch-down edge with the fingertip within the capture radius.
    PinchDown,
}

/// Where a grabbed object goes relative to the fingertip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum GrabFollow {
    /// Keeps the fingertip-to-object offset captured at grab start.
    #[default]
    PreserveOffset,
    /// Puts the object's origin on the fingertip.
    SnapToFingertip,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InteractionConfig {
    #[serde(default = "InteractionConfig::default_pinch_threshold")]
    pub pinch_threshold: f32,
    #[serde(default = "InteractionConfig::default_touch_radius")]
    pub touch_radius: f32,
    #[serde(default = "InteractionConfig::default_capture_radius")]
    pub capture_radius: f32,
    #[serde(default = "InteractionConfig::default_box_margin")]
    pub box_margin: f32,
    #[serde(default = "InteractionConfig::default_button_cooldown_ms")]
    pub button_cooldown_ms: u64,
    #[serde(default)]
    pub button_trigger: ButtonTrigger,
    #[serde(default)]
    pub grab_follow: GrabFollow,
}

impl InteractionConfig {
    const fn default_pinch_threshold() -> f32 {
        0.035
    }

    const fn default_touch_radius() -> f32 {
        0.025
    }

    const fn default_capture_radius() -> f32 {
        0.07
    }

    const fn default_box_margin() -> f32 {
        0.02
    }

    const fn default_button_cooldown_ms() -> u64 {
        1000
    }
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            pinch_threshold: Self::default_pinch_threshold(),
            touch_radius: Self::default_touch_radius(),
            capture_radius: Self::default_capture_radius(),
            box_margin: Self::default_box_margin(),
            button_cooldown_ms: Self::default_button_cooldown_ms(),
            button_trigger: ButtonTrigger::default(),
            grab_follow: GrabFollow::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct HoverConfig {
    #[serde(default = "HoverConfig::default_radius")]
    pub radius: f32,
    #[serde(default = "HoverConfig::default_scale")]
    pub scale: f32,
    #[serde(default = "HoverConfig::default_blend")]
    pub blend: f32,
}

impl HoverConfig {
    const fn default_radius() -> f32 {
        0.10
    }

    const fn default_scale() -> f32 {
        1.15
    }

    const fn default_blend() -> f32 {
        0.2
    }
}

impl Default for HoverConfig {
    fn default() -> Self {
        Self {
            radius: Self::default_radius(),
            scale: Self::default_scale(),
            blend: Self::default_blend(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct FollowConfig {
    #[serde(default = "FollowConfig::default_distance")]
    pub distance: f32,
    #[serde(default = "FollowConfig::default_blend")]
    pub blend: f32,
    /// How far in front of the viewer objects without a position appear.
    #[serde(default = "FollowConfig::default_spawn_distance")]
    pub spawn_distance: f32,
}

impl FollowConfig {
    const fn default_distance() -> f32 {
        0.45
    }

    const fn default_blend() -> f32 {
        0.1
    }

    const fn default_spawn_distance() -> f32 {
        0.6
    }
}

impl Default for FollowConfig {
    fn default() -> Self {
        Self {
            distance: Self::default_distance(),
            blend: Self::default_blend(),
            spawn_distance: Self::default_spawn_distance(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "StorageConfig::default_snapshot_path")]
    pub snapshot_path: PathBuf,
}

impl StorageConfig {
    fn default_snapshot_path() -> PathBuf {
        PathBuf::from("ar_memory.json")
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            snapshot_path: Self::default_snapshot_path(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MenuConfig {
    /// Base URL of the menu-content endpoint. Without one the panel shows
    /// the built-in entries.
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default = "MenuConfig::default_user_id")]
    pub user_id: String,
    #[serde(default = "MenuConfig::default_page_size")]
    pub page_size: usize,
}

impl MenuConfig {
    fn default_user_id() -> String {
        "guest".to_string()
    }

    const fn default_page_size() -> usize {
        4
    }
}

impl Default for MenuConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            user_id: Self::default_user_id(),
            page_size: Self::default_page_size(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssetConfig {
    #[serde(default = "AssetConfig::default_root")]
    pub root: PathBuf,
    #[serde(default = "AssetConfig::default_panel_texture")]
    pub panel_texture: String,
}

impl AssetConfig {
    fn default_root() -> PathBuf {
        PathBuf::from("assets")
    }

    fn default_panel_texture() -> String {
        "texture/image/polipo.png".to_string()
    }
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            root: Self::default_root(),
            panel_texture: Self::default_panel_texture(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoaderConfig {
    /// Build objects on the rayon pool instead of inline on the frame thread.
    #[serde(default = "LoaderConfig::default_threaded")]
    pub threaded: bool,
    /// Upper bound on each menu or model download.
    #[serde(default = "LoaderConfig::default_http_timeout_ms")]
    pub http_timeout_ms: u64,
}

impl LoaderConfig {
    const fn default_threaded() -> bool {
        true
    }

    const fn default_http_timeout_ms() -> u64 {
        10_000
    }
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            threaded: Self::default_threaded(),
            http_timeout_ms: Self::default_http_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct SandboxConfig {
    #[serde(default)]
    pub interaction: InteractionConfig,
    #[serde(default)]
    pub hover: HoverConfig,
    #[serde(default)]
    pub follow: FollowConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub menu: MenuConfig,
    #[serde(default)]
    pub assets: AssetConfig,
    #[serde(default)]
    pub loader: LoaderConfig,
}

#[derive(Debug, Clone, Default)]
pub struct SandboxConfigOverrides {
    pub snapshot_path: Option<PathBuf>,
    pub user_id: Option<String>,
    pub endpoint: Option<String>,
}

impl SandboxConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        Self::from_json(&text).with_context(|| format!("Failed to parse config {}", path.display()))
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Loads `path` if it exists, otherwise returns the defaults.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            log::info!("No config at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    pub fn apply_overrides(&mut self, overrides: &SandboxConfigOverrides) {
        if let Some(path) = &overrides.snapshot_path {
            self.storage.snapshot_path = path.clone();
        }
        if let Some(user_id) = &overrides.user_id {
            self.menu.user_id = user_id.clone();
        }
        if let Some(endpoint) = &overrides.endpoint {
            self.menu.endpoint = Some(endpoint.clone());
        }
    }
}
