use std::time::Duration;

use glam::{Quat, Vec3};

use crate::config::{ButtonTrigger, GrabFollow, InteractionConfig};
use crate::interaction::controller::{Controller, Grab};
use crate::scene_graph::{Action, NodeId, Scene};
use crate::tracking::{HandPose, Handedness, TrackingFrame};

pub fn is_pinching(index_tip: Vec3, thumb_tip: Vec3, threshold: f32) -> bool {
    index_tip.distance(thumb_tip) < threshold
}

/// Receives what a resolver pass did. Both hooks run inside the frame, so
/// implementations should only record.
pub trait InteractionSink {
    fn button_pressed(&mut self, hand: Handedness, button: NodeId, action: &Action);

    /// Called every frame a grab is held, after the target has moved.
    fn grab_updated(&mut self, hand: Handedness, target: NodeId);
}

#[derive(Debug, Clone, PartialEq)]
pub struct ButtonPress {
    pub hand: Handedness,
    pub button: NodeId,
    pub action: Action,
}

/// Collects one frame of interaction output.
#[derive(Debug, Default)]
pub struct FrameEvents {
    pub presses: Vec<ButtonPress>,
    pub grab_updates: Vec<NodeId>,
}

impl FrameEvents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.presses.is_empty() && self.grab_updates.is_empty()
    }
}

impl InteractionSink for FrameEvents {
    fn button_pressed(&mut self, hand: Handedness, button: NodeId, action: &Action) {
        self.presses.push(ButtonPress {
            hand,
            button,
            action: action.clone(),
        });
    }

    fn grab_updated(&mut self, _hand: Handedness, target: NodeId) {
        self.grab_updates.push(target);
    }
}

/// Rearm delay shared by every button.
#[derive(Debug, Clone)]
pub struct ButtonCooldown {
    period: Duration,
    last_fired: Option<Duration>,
}

impl ButtonCooldown {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            last_fired: None,
        }
    }

    pub fn is_ready(&self, now: Duration) -> bool {
        self.last_fired
            .map_or(true, |last| now.saturating_sub(last) >= self.period)
    }

    /// Arms the cooldown if it is ready. Returns whether the caller may fire.
    pub fn try_fire(&mut self, now: Duration) -> bool {
        if self.is_ready(now) {
            self.last_fired = Some(now);
            true
        } else {
            false
        }
    }
}

/// Grab, touch and press resolution for both hands.
///
/// Hands are resolved left before right. An object held by one hand is
/// excluded from the other hand's grab scan, so a single anchor within reach
/// of both ends up with the left hand.
pub struct InteractionResolver {
    pub left: Controller,
    pub right: Controller,
    cooldown: ButtonCooldown,
    config: InteractionConfig,
}

impl InteractionResolver {
    pub fn new(config: InteractionConfig) -> Self {
        Self {
            left: Controller::new(Handedness::Left),
            right: Controller::new(Handedness::Right),
            cooldown: ButtonCooldown::new(Duration::from_millis(config.button_cooldown_ms)),
            config,
        }
    }

    pub fn config(&self) -> &InteractionConfig {
        &self.config
    }

    pub fn controller(&self, hand: Handedness) -> &Controller {
        match hand {
            Handedness::Left => &self.left,
            Handedness::Right => &self.right,
        }
    }

    pub fn controllers(&self) -> [&Controller; 2] {
        [&self.left, &self.right]
    }

    pub fn resolve_frame(
        &mut self,
        frame: &TrackingFrame,
        scene: &mut Scene,
        now: Duration,
        sink: &mut impl InteractionSink,
    ) {
        for hand in [Handedness::Left, Handedness::Right] {
            self.resolve_hand(hand, frame.hand(hand), scene, now, sink);
        }
    }

    /// One controller's pass. While any of its joints is untracked the hand
    /// only leaves the buttons it was touching.
    pub fn resolve_hand(
        &mut self,
        hand: Handedness,
        pose: &HandPose,
        scene: &mut Scene,
        now: Duration,
        sink: &mut impl InteractionSink,
    ) {
        let Some((index_tip, thumb_tip, wrist)) = pose.joints() else {
            release_touches(hand, scene);
            return;
        };

        let (controller, other) = match hand {
            Handedness::Left => (&mut self.left, &self.right),
            Handedness::Right => (&mut self.right, &self.left),
        };
        let other_target = other.grab_target();
        let config = &self.config;
        let pinching = is_pinching(index_tip, thumb_tip, config.pinch_threshold);

        match config.button_trigger {
            ButtonTrigger::Touch => {
                resolve_touch_buttons(hand, index_tip, scene, &mut self.cooldown, config, now, sink)
            }
            ButtonTrigger::PinchDown => {
                if pinching && !controller.last_pinch && !controller.is_holding() {
                    resolve_pinch_buttons(
                        hand,
                        index_tip,
                        scene,
                        &mut self.cooldown,
                        config,
                        now,
                        sink,
                    );
                }
            }
        }

        if pinching {
            let mut just_acquired = false;
            if controller.grab.is_none() {
                controller.grab = acquire(scene, index_tip, wrist, other_target, config);
                just_acquired = controller.grab.is_some();
                if let Some(grab) = &controller.grab {
                    log::debug!(
                        "{} hand grabbed {:?} (target {:?})",
                        hand.label(),
                        grab.anchor,
                        grab.target
                    );
                }
            }

            if let Some(grab) = controller.grab {
                if !scene.is_alive(grab.target) {
                    controller.release();
                } else {
                    // The target already sits at tip + offset on the first frame.
                    if !just_acquired {
                        follow(scene, &grab, index_tip, wrist, config.grab_follow);
                    }
                    sink.grab_updated(hand, grab.target);
                }
            }
        } else {
            controller.release();
        }

        controller.last_pinch = pinching;
    }

    /// Drops every grab on `root` or its subtree. Must run before the subtree
    /// leaves the scene.
    pub fn release_within(&mut self, scene: &Scene, root: NodeId) {
        for controller in [&mut self.left, &mut self.right] {
            if controller.is_holding_within(scene, root) {
                controller.release();
            }
        }
    }

    /// Whether either hand holds something in the subtree of `root`.
    pub fn is_held(&self, scene: &Scene, root: NodeId) -> bool {
        self.left.is_holding_within(scene, root) || self.right.is_holding_within(scene, root)
    }
}

fn button_contains(
    scene: &Scene,
    button_id: NodeId,
    point: Vec3,
    config: &InteractionConfig,
) -> bool {
    let Some(node) = scene.get_node(button_id) else {
        return false;
    };
    let Some(button) = &node.button else {
        return false;
    };
    let Some(world) = scene.world_matrix(button_id) else {
        return false;
    };

    match &button.region {
        Some(region) => {
            let local = world.inverse().transform_point3(point);
            region.contains(local, config.box_margin)
        }
        None => world.transform_point3(Vec3::ZERO).distance(point) < config.touch_radius,
    }
}

/// Edge-triggered touch: a button fires when the first hand enters it and
/// rearms once every hand has left.
fn resolve_touch_buttons(
    hand: Handedness,
    index_tip: Vec3,
    scene: &mut Scene,
    cooldown: &mut ButtonCooldown,
    config: &InteractionConfig,
    now: Duration,
    sink: &mut impl InteractionSink,
) {
    let buttons = scene.buttons().to_vec();

    for button_id in buttons {
        let inside =
            scene.is_visible(button_id) && button_contains(scene, button_id, index_tip, config);

        let Some(button) = scene
            .get_node_mut(button_id)
            .and_then(|node| node.button.as_mut())
        else {
            continue;
        };

        if !inside {
            button.touching.clear(hand);
            continue;
        }

        if button.touching.contains(hand) {
            continue;
        }

        let entering = !button.is_being_touched();
        button.touching.set(hand, true);

        // Entries during the cooldown are consumed without firing.
        if entering && cooldown.try_fire(now) {
            log::debug!("Touch on {}", button.display_name());
            sink.button_pressed(hand, button_id, &button.action);
        }
    }
}

/// Clears `hand` from every button so an untracked hand cannot keep one
/// pressed.
fn release_touches(hand: Handedness, scene: &mut Scene) {
    let buttons = scene.buttons().to_vec();
    for button_id in buttons {
        if let Some(button) = scene
            .get_node_mut(button_id)
            .and_then(|node| node.button.as_mut())
        {
            button.touching.clear(hand);
        }
    }
}

fn resolve_pinch_buttons(
    hand: Handedness,
    index_tip: Vec3,
    scene: &Scene,
    cooldown: &mut ButtonCooldown,
    config: &InteractionConfig,
    now: Duration,
    sink: &mut impl InteractionSink,
) {
    let pressed = scene.buttons().iter().copied().find(|&button_id| {
        scene.is_visible(button_id)
            && scene
                .world_position(button_id)
                .is_some_and(|position| position.distance(index_tip) < config.capture_radius)
    });

    let Some(button_id) = pressed else {
        return;
    };
    let Some(button) = scene.get_node(button_id).and_then(|node| node.button.as_ref()) else {
        return;
    };

    if cooldown.try_fire(now) {
        log::debug!("Pinch on {}", button.display_name());
        sink.button_pressed(hand, button_id, &button.action);
    }
}

/// First anchor in index order that the fingertip reaches.
fn acquire(
    scene: &Scene,
    index_tip: Vec3,
    wrist: Quat,
    other_target: Option<NodeId>,
    config: &InteractionConfig,
) -> Option<Grab> {
    for &anchor_id in scene.anchors() {
        if !scene.is_visible(anchor_id) {
            continue;
        }

        let Some(anchor) = scene.get_node(anchor_id).and_then(|node| node.anchor.as_ref()) else {
            continue;
        };

        let target = match anchor.controlled {
            Some(controlled) if scene.is_alive(controlled) => controlled,
            Some(_) => continue,
            None => anchor_id,
        };

        if other_target == Some(target) {
            continue;
        }

        let Some(world) = scene.world_matrix(anchor_id) else {
            continue;
        };

        let reached = match &anchor.bounds {
            Some(bounds) => bounds
                .expanded(Vec3::splat(config.box_margin))
                .contains_world_point(&world, index_tip),
            None => world.transform_point3(Vec3::ZERO).distance(index_tip) < config.capture_radius,
        };

        if !reached {
            continue;
        }

        let (Some(target_position), Some(target_rotation)) =
            (scene.world_position(target), scene.world_rotation(target))
        else {
            continue;
        };

        return Some(Grab {
            anchor: anchor_id,
            target,
            offset: target_position - index_tip,
            init_rotation: (wrist.inverse() * target_rotation).normalize(),
        });
    }

    None
}

fn follow(scene: &mut Scene, grab: &Grab, index_tip: Vec3, wrist: Quat, mode: GrabFollow) {
    let position = match mode {
        GrabFollow::PreserveOffset => index_tip + grab.offset,
        GrabFollow::SnapToFingertip => index_tip,
    };

    let follows_wrist = scene
        .get_node(grab.target)
        .is_some_and(|node| node.orientation.follows_wrist());
    let rotation = follows_wrist.then(|| (wrist * grab.init_rotation).normalize());

    scene.set_world_pose(grab.target, position, rotation);
}
