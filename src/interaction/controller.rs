use glam::{Quat, Vec3};

use crate::scene_graph::{NodeId, Scene};
use crate::tracking::Handedness;

/// A held object. Offset and rotation are captured together at grab start so
/// the object neither jumps nor snaps its orientation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Grab {
    /// The anchor node that was pinched.
    pub anchor: NodeId,
    /// The node that receives the transform.
    pub target: NodeId,
    /// Target position minus fingertip position at grab start.
    pub offset: Vec3,
    /// Target rotation relative to the wrist at grab start.
    pub init_rotation: Quat,
}

#[derive(Debug, Clone)]
pub struct Controller {
    pub hand: Handedness,
    pub(crate) grab: Option<Grab>,
    pub(crate) last_pinch: bool,
}

impl Controller {
    pub fn new(hand: Handedness) -> Self {
        Self {
            hand,
            grab: None,
            last_pinch: false,
        }
    }

    pub fn grab(&self) -> Option<&Grab> {
        self.grab.as_ref()
    }

    /// The anchor currently held, if any.
    pub fn grabbed_object(&self) -> Option<NodeId> {
        self.grab.map(|grab| grab.anchor)
    }

    pub fn grab_target(&self) -> Option<NodeId> {
        self.grab.map(|grab| grab.target)
    }

    pub fn last_pinch(&self) -> bool {
        self.last_pinch
    }

    pub fn is_holding(&self) -> bool {
        self.grab.is_some()
    }

    pub fn release(&mut self) {
        self.grab = None;
    }

    /// Whether the held anchor or its target lies in the subtree of `root`.
    pub fn is_holding_within(&self, scene: &Scene, root: NodeId) -> bool {
        self.grab.is_some_and(|grab| {
            grab.anchor == root
                || grab.target == root
                || scene.is_within(grab.anchor, root)
                || scene.is_within(grab.target, root)
        })
    }
}
