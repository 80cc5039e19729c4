pub mod components;
pub mod node;
pub mod resources;
pub mod scene;
pub mod transform;

pub use components::{
    Action, ActionButton, Anchor, ButtonRegion, Follower, HandSet, OrientationPolicy,
};
pub use node::{NodeId, SceneNode};
pub use resources::{Geometry, Material, MeshData, MeshId, MeshRegistry, Texture};
pub use scene::Scene;
pub use transform::Transform;
