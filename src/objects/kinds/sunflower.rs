use serde_json::Value;

use crate::objects::blueprint::Blueprint;
use crate::objects::factory::FactoryContext;
use crate::objects::kinds::generic::{build_model, ModelOptions};

pub const KIND: &str = "sunflower";

pub const MODEL_URL: &str =
    "https://raw.githubusercontent.com/mrdoob/three.js/master/examples/models/gltf/Flower/Flower.glb";

pub fn options() -> ModelOptions {
    ModelOptions {
        scale: 0.5,
        ..ModelOptions::new(MODEL_URL)
    }
}

/// The flower model from the three.js examples, downloaded on demand.
pub fn build(context: &FactoryContext, _params: &Value) -> anyhow::Result<Blueprint> {
    build_model(context, KIND, &options())
}
