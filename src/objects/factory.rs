use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::bail;
use serde_json::Value;

use crate::config::{MenuConfig, SandboxConfig};
use crate::objects::blueprint::Blueprint;
use crate::objects::kinds;
use crate::scene_graph::Texture;

/// Kind used when a requested kind has no builder.
pub const FALLBACK_KIND: &str = "generic";

/// Everything a builder may need besides its params. Cloned into loader jobs.
#[derive(Debug, Clone)]
pub struct FactoryContext {
    pub asset_root: PathBuf,
    pub panel_texture: String,
    pub menu: MenuConfig,
    pub http_timeout: Duration,
}

impl FactoryContext {
    pub fn from_config(config: &SandboxConfig) -> Self {
        Self {
            asset_root: config.assets.root.clone(),
            panel_texture: config.assets.panel_texture.clone(),
            menu: config.menu.clone(),
            http_timeout: Duration::from_millis(config.loader.http_timeout_ms),
        }
    }

    /// HTTP client whose requests give up after `http_timeout`.
    pub fn http_agent(&self) -> ureq::Agent {
        ureq::Agent::config_builder()
            .timeout_global(Some(self.http_timeout))
            .build()
            .into()
    }

    /// Reads the texture at `relative_path` under the asset root. A missing
    /// or unreadable image yields an untextured surface.
    pub fn load_texture(&self, relative_path: &str) -> Option<Texture> {
        let path = self.asset_root.join(relative_path);

        match image::image_dimensions(&path) {
            Ok((width, height)) => Some(Texture {
                path: relative_path.to_string(),
                width,
                height,
            }),
            Err(err) => {
                log::warn!("Failed to read texture {}: {err}", path.display());
                None
            }
        }
    }

    pub fn panel_texture(&self) -> Option<Texture> {
        self.load_texture(&self.panel_texture)
    }
}

impl Default for FactoryContext {
    fn default() -> Self {
        Self::from_config(&SandboxConfig::default())
    }
}

pub type BuildFn = fn(&FactoryContext, &Value) -> anyhow::Result<Blueprint>;

/// Maps kind names to blueprint builders.
#[derive(Clone, Default)]
pub struct ObjectFactory {
    builders: HashMap<&'static str, BuildFn>,
}

impl ObjectFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// A factory that knows every built-in kind.
    pub fn with_builtin_kinds() -> Self {
        let mut factory = Self::new();
        kinds::register_builtin(&mut factory);
        factory
    }

    pub fn register(&mut self, kind: &'static str, build: BuildFn) {
        if self.builders.insert(kind, build).is_some() {
            log::debug!("Replaced builder for kind {kind}");
        }
    }

    pub fn knows(&self, kind: &str) -> bool {
        self.builders.contains_key(kind)
    }

    /// Builds `kind`, falling back to the generic model loader for unknown
    /// kinds.
    pub fn build(
        &self,
        context: &FactoryContext,
        kind: &str,
        params: &Value,
    ) -> anyhow::Result<Blueprint> {
        let build = match self.builders.get(kind) {
            Some(build) => build,
            None => {
                log::warn!("Unknown object kind {kind}, falling back to {FALLBACK_KIND}");
                match self.builders.get(FALLBACK_KIND) {
                    Some(build) => build,
                    None => bail!("No builder for kind {kind}"),
                }
            }
        };

        build(context, params)
    }
}

pub(crate) fn param_f32(params: &Value, key: &str) -> Option<f32> {
    params.get(key).and_then(Value::as_f64).map(|value| value as f32)
}

pub(crate) fn param_str<'a>(params: &'a Value, key: &str) -> Option<&'a str> {
    params.get(key).and_then(Value::as_str)
}

pub(crate) fn param_bool(params: &Value, key: &str) -> Option<bool> {
    params.get(key).and_then(Value::as_bool)
}

/// Accepts `0x0077ff` style numbers and `"#0077ff"` / `"0x0077ff"` strings.
pub(crate) fn param_color(params: &Value, key: &str) -> Option<u32> {
    match params.get(key)? {
        Value::Number(number) => number.as_u64().and_then(|value| u32::try_from(value).ok()),
        Value::String(text) => {
            let hex = text
                .strip_prefix('#')
                .or_else(|| text.strip_prefix("0x"))
                .unwrap_or(text);
            u32::from_str_radix(hex, 16).ok()
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::objects::blueprint::NodeBlueprint;

    fn build_marker(_: &FactoryContext, params: &Value) -> anyhow::Result<Blueprint> {
        let name = param_str(params, "name").unwrap_or("marker");
        Ok(Blueprint::new(NodeBlueprint::new(name)))
    }

    #[test]
    fn unknown_kinds_use_the_generic_builder() {
        let mut factory = ObjectFactory::new();
        factory.register(FALLBACK_KIND, build_marker);

        let blueprint = factory
            .build(&FactoryContext::default(), "teapot", &json!({ "name": "teapot" }))
            .unwrap();
        assert_eq!(blueprint.root.name, "teapot");
    }

    #[test]
    fn unknown_kind_without_fallback_fails() {
        let factory = ObjectFactory::new();
        assert!(factory
            .build(&FactoryContext::default(), "teapot", &json!({}))
            .is_err());
    }

    #[test]
    fn builtin_kinds_are_registered() {
        let factory = ObjectFactory::with_builtin_kinds();
        for kind in ["controlPanel", "cubo", "sedia", "megaMurena", "sunflower", "generic"] {
            assert!(factory.knows(kind), "{kind}");
        }
    }

    #[test]
    fn colors_accept_numbers_and_hex_strings() {
        let params = json!({
            "a": 0x0077ff,
            "b": "#ff0000",
            "c": "0x00ff00",
            "d": "blue",
            "e": -1,
        });

        assert_eq!(param_color(&params, "a"), Some(0x0077ff));
        assert_eq!(param_color(&params, "b"), Some(0xff0000));
        assert_eq!(param_color(&params, "c"), Some(0x00ff00));
        assert_eq!(param_color(&params, "d"), None);
        assert_eq!(param_color(&params, "e"), None);
        assert_eq!(param_color(&params, "missing"), None);
    }

    #[test]
    fn missing_texture_degrades_to_none() {
        let dir = tempfile::tempdir().unwrap();
        let context = FactoryContext {
            asset_root: dir.path().to_path_buf(),
            ..FactoryContext::default()
        };
        assert!(context.panel_texture().is_none());
    }
}
