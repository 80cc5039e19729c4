use std::path::Path;

use anyhow::{bail, Context};
use glam::{Mat4, Vec3};
use serde_json::Value;

use crate::math::AABB;
use crate::objects::blueprint::{AnchorTarget, Blueprint, NodeBlueprint};
use crate::objects::factory::{param_bool, param_f32, param_str, FactoryContext};
use crate::objects::kinds::controls::attach_controls;
use crate::scene_graph::{
    Follower, Geometry, Material, MeshData, OrientationPolicy, Transform,
};

pub const KIND: &str = "generic";

const MAX_DOWNLOAD_BYTES: u64 = 64 * 1024 * 1024;

/// How a loaded model is wrapped and what it can do.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelOptions {
    pub url: String,
    pub scale: f32,
    pub anchor: bool,
    pub follower: bool,
    pub locked: bool,
    pub billboard: bool,
}

impl ModelOptions {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            scale: 1.0,
            anchor: true,
            follower: false,
            locked: false,
            billboard: false,
        }
    }

    pub fn from_params(params: &Value) -> anyhow::Result<Self> {
        let Some(url) = param_str(params, "url") else {
            bail!("Generic object needs a url param");
        };

        let defaults = Self::new(url);
        Ok(Self {
            scale: param_f32(params, "scale")
                .filter(|scale| *scale > 0.0)
                .unwrap_or(defaults.scale),
            anchor: param_bool(params, "isAnchor").unwrap_or(defaults.anchor),
            follower: param_bool(params, "isFollower").unwrap_or(defaults.follower),
            locked: param_bool(params, "isLocked").unwrap_or(defaults.locked),
            billboard: param_bool(params, "isBillboard").unwrap_or(defaults.billboard),
            ..defaults
        })
    }
}

/// What the scene needs to know about a glTF model.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelSummary {
    pub name: String,
    pub primitives: usize,
    pub vertices: usize,
    /// Bounds of every primitive in model space, node transforms applied.
    pub bounds: AABB,
}

pub fn build(context: &FactoryContext, params: &Value) -> anyhow::Result<Blueprint> {
    let options = ModelOptions::from_params(params)?;
    build_model(context, KIND, &options)
}

/// Loads the model at `options.url` and wraps it in an invisible box sized to
/// its bounds, with the model centered inside.
pub fn build_model(
    context: &FactoryContext,
    name: &str,
    options: &ModelOptions,
) -> anyhow::Result<Blueprint> {
    let document = load_document(context, &options.url)?;
    let summary = summarize(&document, name)
        .with_context(|| format!("Model {} has no geometry", options.url))?;
    log::info!(
        "Loaded {} ({} primitives, {} vertices)",
        options.url,
        summary.primitives,
        summary.vertices
    );

    Ok(wrap_model(&summary, options))
}

fn wrap_model(summary: &ModelSummary, options: &ModelOptions) -> Blueprint {
    let scale = options.scale;
    let size = summary.bounds.size() * scale;
    let center = summary.bounds.center() * scale;

    let mut model_transform = Transform::from_translation(-center);
    model_transform.set_scale(scale);
    let model = NodeBlueprint::new(format!("{} model", summary.name))
        .with_transform(model_transform)
        .with_mesh(MeshData {
            geometry: Geometry::Model {
                name: summary.name.clone(),
                primitives: summary.primitives,
                vertices: summary.vertices,
            },
            material: Material::color(0xffffff),
        });

    let mut container = NodeBlueprint::new(summary.name.clone())
        .with_mesh(MeshData {
            geometry: Geometry::Box { size },
            material: Material::translucent(0xffffff, 0.0),
        })
        .with_child(model);

    if options.anchor {
        container = container.with_anchor(
            AnchorTarget::Itself,
            Some(AABB::from_center_size(Vec3::ZERO, size)),
        );
    }
    if options.follower {
        container = container.with_follower(Follower {
            locked: options.locked,
        });
    }
    if options.billboard {
        container = container.with_orientation(OrientationPolicy::Billboard);
    }

    attach_controls(&mut container, size.x, size.y, size.z);
    Blueprint::new(container)
}

/// Reads a glTF document from an http(s) URL or from a path under the asset
/// root.
pub fn load_document(context: &FactoryContext, url: &str) -> anyhow::Result<gltf::Document> {
    let gltf = if url.starts_with("http://") || url.starts_with("https://") {
        let bytes = context
            .http_agent()
            .get(url)
            .call()
            .with_context(|| format!("Failed to request model {url}"))?
            .into_body()
            .with_config()
            .limit(MAX_DOWNLOAD_BYTES)
            .read_to_vec()
            .with_context(|| format!("Failed to download model {url}"))?;

        gltf::Gltf::from_slice(&bytes).with_context(|| format!("Invalid model {url}"))?
    } else {
        let path = resolve_local(&context.asset_root, url);
        gltf::Gltf::open(&path)
            .with_context(|| format!("Failed to load model {}", path.display()))?
    };

    Ok(gltf.document)
}

fn resolve_local(asset_root: &Path, url: &str) -> std::path::PathBuf {
    let path = Path::new(url.trim_start_matches("./"));
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        asset_root.join(path)
    }
}

pub fn summarize(document: &gltf::Document, name: &str) -> Option<ModelSummary> {
    let scene = document
        .default_scene()
        .or_else(|| document.scenes().next())?;

    let mut summary = Accumulator::default();
    for node in scene.nodes() {
        summary.visit(&node, Mat4::IDENTITY);
    }

    Some(ModelSummary {
        name: name.to_string(),
        primitives: summary.primitives,
        vertices: summary.vertices,
        bounds: summary.bounds?,
    })
}

#[derive(Default)]
struct Accumulator {
    primitives: usize,
    vertices: usize,
    bounds: Option<AABB>,
}

impl Accumulator {
    fn visit(&mut self, node: &gltf::Node, parent: Mat4) {
        let world = parent * Mat4::from_cols_array_2d(&node.transform().matrix());

        if let Some(mesh) = node.mesh() {
            for primitive in mesh.primitives() {
                let Some(positions) = primitive.get(&gltf::Semantic::Positions) else {
                    continue;
                };

                let bounds = primitive.bounding_box();
                let local = AABB::new(Vec3::from(bounds.min), Vec3::from(bounds.max));
                let world_bounds = local.transformed(&world);

                self.primitives += 1;
                self.vertices += positions.count();
                self.bounds = Some(match self.bounds {
                    Some(existing) => existing.union(&world_bounds),
                    None => world_bounds,
                });
            }
        }

        for child in node.children() {
            self.visit(&child, world);
        }
    }
}
