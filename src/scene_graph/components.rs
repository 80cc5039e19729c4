//! Capabilities a scene node can carry. The interaction systems query these
//! instead of inspecting ad hoc flags.

use glam::{Vec2, Vec3};

use crate::math::AABB;
use crate::scene_graph::node::NodeId;
use crate::tracking::Handedness;

/// What a button does when it fires. Object-relative actions apply to the
/// top-level object that owns the button.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Spawn {
        kind: String,
        params: serde_json::Value,
    },
    RemoveObject,
    ToggleLock,
    TurnPage(i32),
    /// Reported to the host untouched.
    Custom(String),
}

/// Grab point for itself or for another node.
#[derive(Debug, Clone, PartialEq)]
pub struct Anchor {
    pub controlled: Option<NodeId>,
    /// Local-space grab volume. Without one the anchor is grabbed by
    /// distance to its origin.
    pub bounds: Option<AABB>,
}

impl Anchor {
    pub fn new() -> Self {
        Self {
            controlled: None,
            bounds: None,
        }
    }

    pub fn controlling(target: NodeId) -> Self {
        Self {
            controlled: Some(target),
            bounds: None,
        }
    }

    pub fn with_bounds(mut self, bounds: AABB) -> Self {
        self.bounds = Some(bounds);
        self
    }
}

impl Default for Anchor {
    fn default() -> Self {
        Self::new()
    }
}

/// Local-space activation volume of a button.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ButtonRegion {
    /// Rectangle in the local XY plane, centered on the origin.
    Rect { half_extents: Vec2 },
    Box(AABB),
}

impl ButtonRegion {
    pub fn rect(size: Vec2) -> Self {
        ButtonRegion::Rect {
            half_extents: size * 0.5,
        }
    }

    /// `margin` is the tolerance along the plane normal for rectangles and
    /// on every axis for boxes.
    pub fn contains(&self, local: Vec3, margin: f32) -> bool {
        match self {
            ButtonRegion::Rect { half_extents } => {
                local.x.abs() <= half_extents.x
                    && local.y.abs() <= half_extents.y
                    && local.z.abs() <= margin
            }
            ButtonRegion::Box(aabb) => aabb.expanded(Vec3::splat(margin)).contains_point(local),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HandSet {
    left: bool,
    right: bool,
}

impl HandSet {
    pub fn contains(&self, hand: Handedness) -> bool {
        match hand {
            Handedness::Left => self.left,
            Handedness::Right => self.right,
        }
    }

    pub fn set(&mut self, hand: Handedness, value: bool) {
        match hand {
            Handedness::Left => self.left = value,
            Handedness::Right => self.right = value,
        }
    }

    pub fn clear(&mut self, hand: Handedness) {
        self.set(hand, false);
    }

    pub fn is_empty(&self) -> bool {
        !self.left && !self.right
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ActionButton {
    pub action: Action,
    pub label: Option<String>,
    pub region: Option<ButtonRegion>,
    /// Hands currently inside the activation volume.
    pub touching: HandSet,
    /// Toggle state for buttons like the lock.
    pub latched: bool,
}

impl ActionButton {
    pub fn new(action: Action) -> Self {
        Self {
            action,
            label: None,
            region: None,
            touching: HandSet::default(),
            latched: false,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_region(mut self, region: ButtonRegion) -> Self {
        self.region = Some(region);
        self
    }

    pub fn is_being_touched(&self) -> bool {
        !self.touching.is_empty()
    }

    pub fn display_name(&self) -> &str {
        self.label.as_deref().unwrap_or("button")
    }
}

/// Idle behaviour: drift in front of the viewer unless locked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Follower {
    pub locked: bool,
}

/// How a node's orientation is driven while grabbed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OrientationPolicy {
    #[default]
    FollowWrist,
    /// Faces the viewer; grabs never write its rotation.
    Billboard,
    /// Grabs move it without rotating it.
    Locked,
}

impl OrientationPolicy {
    pub fn follows_wrist(self) -> bool {
        matches!(self, OrientationPolicy::FollowWrist)
    }
}
