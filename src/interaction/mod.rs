//! Per-frame hand interaction: pinch grabs, button presses, hover feedback
//! and the idle follow behaviour of panels.

pub mod controller;
pub mod follow;
pub mod hover;
pub mod resolver;

pub use controller::{Controller, Grab};
pub use follow::update_followers;
pub use hover::resolve_hover;
pub use resolver::{
    is_pinching, ButtonCooldown, ButtonPress, FrameEvents, InteractionResolver, InteractionSink,
};
