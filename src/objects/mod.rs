pub mod blueprint;
pub mod factory;
pub mod kinds;
pub mod loader;
pub mod registry;

pub use blueprint::{AnchorTarget, Blueprint, MenuDesc, MenuRole, NodeBlueprint};
pub use factory::{FactoryContext, ObjectFactory};
pub use loader::{ObjectLoader, SpawnOrigin, SpawnRequest, SpawnResult};
pub use registry::{ActiveObject, ObjectRegistry};
