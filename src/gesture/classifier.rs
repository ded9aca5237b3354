//! Gesture Classifier
//!
//! Per-frame state machine that turns a noisy pinch-distance signal into
//! discrete actions and button commands:
//!
//! - **Hold**: fingertips touching for less than the drag threshold
//! - **Drag**: fingertips touching continuously for at least the drag threshold
//! - **Click**: a contact shorter than the drag threshold that just ended
//!
//! Button commands are edge-triggered: a press is emitted once when a drag
//! starts and a release once when it ends. A short debounce window after the
//! last true contact keeps the contact indicator lit and a held button pressed
//! across single-frame dropouts.

use super::calibration::ClickDistance;
use crate::time::Timestamp;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, trace};

/// Action recognized for one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    #[default]
    None,
    Hold,
    Drag,
    Click,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Hold => "hold",
            Self::Drag => "drag",
            Self::Click => "click",
        }
    }
}

/// Button event to hand to the pointer injector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ButtonCommand {
    #[default]
    None,
    /// Single left click
    Click,
    /// Left button down
    Press,
    /// Left button up
    Release,
}

/// Which button events a frame may produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmissionPolicy {
    /// Every debounced contact clicks, subject to the cooldown
    ClickOnly,
    /// Short contacts click, long contacts press and drag
    ClickAndDrag,
    /// Pointer output is paused; only a held button is let go
    Suppressed,
}

impl EmissionPolicy {
    pub fn from_toggles(dragging_enabled: bool, output_enabled: bool) -> Self {
        match (output_enabled, dragging_enabled) {
            (false, _) => Self::Suppressed,
            (true, true) => Self::ClickAndDrag,
            (true, false) => Self::ClickOnly,
        }
    }
}

/// Timing constants for the state machine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GestureTiming {
    /// Continuous contact needed before a hold becomes a drag
    pub drag_hold: Duration,
    /// Window after the last true contact during which the fingertips still count as touching
    pub debounce: Duration,
    /// Minimum spacing between fired clicks
    pub click_cooldown: Duration,
    /// Absence after which an in-progress gesture is dropped
    pub no_hand_timeout: Duration,
}

impl Default for GestureTiming {
    fn default() -> Self {
        Self {
            drag_hold: Duration::from_millis(200),
            debounce: Duration::from_millis(100),
            click_cooldown: Duration::from_millis(500),
            no_hand_timeout: Duration::from_millis(300),
        }
    }
}

/// Mutable classifier state. Lives for one run-mode session.
#[derive(Debug, Clone, PartialEq)]
pub struct GestureState {
    /// Start of the current contact
    pub contact_started_at: Option<Timestamp>,
    pub last_touch_at: Timestamp,
    pub last_hand_seen_at: Timestamp,
    pub last_click_at: Timestamp,
    pub is_dragging: bool,
    pub current_action: Action,
    /// Debounced contact reported for the last frame with a hand
    pub contact: bool,
    /// The left button is down as far as the injector knows
    pub button_held: bool,
    /// The no-hand timeout has fired and no hand has been seen since
    pub hand_lost: bool,
}

impl GestureState {
    /// Fresh state; every clock starts at `now`, so no click fires in the first cooldown.
    pub fn new(now: Timestamp) -> Self {
        Self {
            contact_started_at: None,
            last_touch_at: now,
            last_hand_seen_at: now,
            last_click_at: now,
            is_dragging: false,
            current_action: Action::None,
            contact: false,
            button_held: false,
            hand_lost: false,
        }
    }
}

/// Everything decided for one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameDecision {
    pub action: Action,
    /// Debounced contact, for the visual indicator
    pub contact: bool,
    pub button: ButtonCommand,
    /// The no-hand timeout fired on this frame
    pub hand_lost: bool,
}

/// Click/hold/drag state machine over pinch distances.
pub struct GestureClassifier {
    click_distance: ClickDistance,
    timing: GestureTiming,
    state: GestureState,
}

impl GestureClassifier {
    pub fn new(click_distance: ClickDistance, timing: GestureTiming, now: Timestamp) -> Self {
        Self {
            click_distance,
            timing,
            state: GestureState::new(now),
        }
    }

    pub fn click_distance(&self) -> ClickDistance {
        self.click_distance
    }

    pub fn timing(&self) -> &GestureTiming {
        &self.timing
    }

    pub fn state(&self) -> &GestureState {
        &self.state
    }

    /// Start over, e.g. when run mode restarts.
    pub fn reset(&mut self, now: Timestamp) {
        self.state = GestureState::new(now);
    }

    /// Classify one frame with a valid hand and update the gesture state.
    pub fn classify(&mut self, distance: f64, now: Timestamp) -> Action {
        let state = &mut self.state;
        state.last_hand_seen_at = now;
        state.hand_lost = false;

        let touching = self.click_distance.is_contact(distance);
        if touching && state.contact_started_at.is_none() {
            state.contact_started_at = Some(now);
        }

        let action = if touching {
            state.last_touch_at = now;
            let held_for = state
                .contact_started_at
                .map(|started| now.duration_since(started))
                .unwrap_or(Duration::ZERO);
            if held_for >= self.timing.drag_hold {
                state.is_dragging = true;
                Action::Drag
            } else {
                Action::Hold
            }
        } else if let Some(started) = state.contact_started_at.take() {
            state.is_dragging = false;
            if now.duration_since(started) < self.timing.drag_hold {
                Action::Click
            } else {
                Action::None
            }
        } else {
            Action::None
        };

        if action != state.current_action {
            trace!(from = state.current_action.as_str(), to = action.as_str(), distance, "Action changed");
        }
        state.current_action = action;
        action
    }

    /// Classify one frame and decide the contact indicator and button command.
    pub fn process(&mut self, distance: f64, now: Timestamp, policy: EmissionPolicy) -> FrameDecision {
        let action = self.classify(distance, now);

        // Within the debounce window the raw distance is replaced by the threshold
        // for everything downstream of the action itself.
        let effective = if now.duration_since(self.state.last_touch_at) < self.timing.debounce {
            self.click_distance.value()
        } else {
            distance
        };
        let contact = self.click_distance.is_contact(effective);
        self.state.contact = contact;
        let should_fire_click =
            contact && now.duration_since(self.state.last_click_at) > self.timing.click_cooldown;

        let button = self.emit(action, contact, should_fire_click, now, policy);
        FrameDecision {
            action,
            contact,
            button,
            hand_lost: false,
        }
    }

    fn emit(
        &mut self,
        action: Action,
        contact: bool,
        should_fire_click: bool,
        now: Timestamp,
        policy: EmissionPolicy,
    ) -> ButtonCommand {
        let dragging = self.state.is_dragging || action == Action::Drag;
        match policy {
            EmissionPolicy::Suppressed => self.release_held(),
            EmissionPolicy::ClickOnly => {
                if self.state.button_held {
                    self.release_held()
                } else if should_fire_click {
                    self.fire_click(now)
                } else {
                    ButtonCommand::None
                }
            }
            EmissionPolicy::ClickAndDrag if self.state.button_held => {
                // A held button is only let go once contact is really over; a
                // short re-contact that ends as a click releases instead of clicking.
                if dragging {
                    ButtonCommand::None
                } else if !contact || action == Action::Click {
                    self.release_held()
                } else {
                    ButtonCommand::None
                }
            }
            EmissionPolicy::ClickAndDrag => {
                if action == Action::Click && should_fire_click {
                    self.fire_click(now)
                } else if dragging {
                    self.state.button_held = true;
                    debug!("Drag started");
                    ButtonCommand::Press
                } else {
                    ButtonCommand::None
                }
            }
        }
    }

    fn fire_click(&mut self, now: Timestamp) -> ButtonCommand {
        self.state.last_click_at = now;
        ButtonCommand::Click
    }

    /// Let go of a held button, if any.
    pub fn release_held(&mut self) -> ButtonCommand {
        if self.state.button_held {
            self.state.button_held = false;
            debug!("Button released");
            ButtonCommand::Release
        } else {
            ButtonCommand::None
        }
    }

    /// Account for a frame without a valid hand.
    ///
    /// Once the hand has been missing longer than the timeout, any gesture in
    /// progress is dropped as if the fingertips had parted, and a held button is
    /// released.
    pub fn hand_missing(&mut self, now: Timestamp) -> FrameDecision {
        if now.duration_since(self.state.last_hand_seen_at) <= self.timing.no_hand_timeout {
            // A short dropout keeps the last reading
            return FrameDecision {
                action: self.state.current_action,
                contact: self.state.contact,
                ..Default::default()
            };
        }

        let newly_lost = !self.state.hand_lost;
        if newly_lost {
            debug!(
                dragging = self.state.is_dragging,
                action = self.state.current_action.as_str(),
                "Hand lost"
            );
        }
        self.state.hand_lost = true;
        self.state.is_dragging = false;
        self.state.current_action = Action::None;
        self.state.contact_started_at = None;
        self.state.contact = false;

        FrameDecision {
            action: Action::None,
            contact: false,
            button: self.release_held(),
            hand_lost: newly_lost,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CLICK: f64 = 0.08;
    const TOUCH: f64 = 0.03;
    const APART: f64 = 0.15;

    fn at(ms: u64) -> Timestamp {
        Timestamp::from_millis(ms)
    }

    fn classifier() -> GestureClassifier {
        GestureClassifier::new(ClickDistance::new(CLICK), GestureTiming::default(), at(0))
    }

    #[test]
    fn test_short_contact_is_click() {
        let mut c = classifier();
        assert_eq!(c.classify(APART, at(1000)), Action::None);
        assert_eq!(c.classify(TOUCH, at(1033)), Action::Hold);
        assert_eq!(c.classify(TOUCH, at(1100)), Action::Hold);
        assert_eq!(c.classify(APART, at(1150)), Action::Click);
        assert!(c.state().contact_started_at.is_none());
        assert!(!c.state().is_dragging);
        assert_eq!(c.classify(APART, at(1200)), Action::None);
    }

    #[test]
    fn test_long_contact_becomes_drag() {
        let mut c = classifier();
        assert_eq!(c.classify(TOUCH, at(1000)), Action::Hold);
        assert_eq!(c.classify(TOUCH, at(1199)), Action::Hold);
        assert_eq!(c.classify(TOUCH, at(1200)), Action::Drag);
        assert!(c.state().is_dragging);
        assert_eq!(c.state().contact_started_at, Some(at(1000)));

        assert_eq!(c.classify(APART, at(1300)), Action::None);
        assert!(!c.state().is_dragging);
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let mut c = classifier();
        assert_eq!(c.classify(CLICK, at(1000)), Action::Hold);
    }

    #[test]
    fn test_click_fires_on_release_frame() {
        let mut c = classifier();
        let policy = EmissionPolicy::ClickAndDrag;
        assert_eq!(c.process(TOUCH, at(1000), policy).button, ButtonCommand::None);
        let release = c.process(APART, at(1050), policy);
        assert_eq!(release.action, Action::Click);
        assert!(release.contact, "debounce keeps the indicator lit");
        assert_eq!(release.button, ButtonCommand::Click);
        assert_eq!(c.state().last_click_at, at(1050));
    }

    #[test]
    fn test_no_click_during_startup_cooldown() {
        let mut c = classifier();
        c.process(TOUCH, at(100), EmissionPolicy::ClickAndDrag);
        let release = c.process(APART, at(150), EmissionPolicy::ClickAndDrag);
        assert_eq!(release.action, Action::Click);
        assert_eq!(release.button, ButtonCommand::None);
    }

    #[test]
    fn test_drag_press_and_single_release() {
        let mut c = classifier();
        let policy = EmissionPolicy::ClickAndDrag;
        let mut buttons = Vec::new();
        for ms in (1000..=1400).step_by(33) {
            buttons.push(c.process(TOUCH, at(ms), policy).button);
        }
        for ms in (1433..=1800).step_by(33) {
            buttons.push(c.process(APART, at(ms), policy).button);
        }

        let presses = buttons.iter().filter(|b| **b == ButtonCommand::Press).count();
        let releases = buttons.iter().filter(|b| **b == ButtonCommand::Release).count();
        let clicks = buttons.iter().filter(|b| **b == ButtonCommand::Click).count();
        assert_eq!((presses, releases, clicks), (1, 1, 0));
        assert!(!c.state().button_held);
    }

    #[test]
    fn test_click_only_policy_repeats_with_cooldown() {
        let mut c = classifier();
        let mut fired = Vec::new();
        for ms in (1000..3000).step_by(50) {
            if c.process(TOUCH, at(ms), EmissionPolicy::ClickOnly).button == ButtonCommand::Click {
                fired.push(ms);
            }
        }
        assert_eq!(fired, vec![1000, 1550, 2100, 2650]);
        assert!(!c.state().button_held);
    }

    #[test]
    fn test_spike_during_drag_keeps_button_held() {
        let mut c = classifier();
        let policy = EmissionPolicy::ClickAndDrag;
        for ms in (1000..=1300).step_by(50) {
            c.process(TOUCH, at(ms), policy);
        }
        assert!(c.state().button_held);

        let spike = c.process(APART, at(1340), policy);
        assert!(spike.contact);
        assert_eq!(spike.button, ButtonCommand::None);

        for ms in (1380..=1700).step_by(40) {
            assert_eq!(c.process(TOUCH, at(ms), policy).button, ButtonCommand::None);
        }
        assert!(c.state().is_dragging);
        assert!(c.state().button_held);
    }

    #[test]
    fn test_short_recontact_while_held_releases_without_click() {
        let mut c = classifier();
        let policy = EmissionPolicy::ClickAndDrag;
        for ms in (1000..=1300).step_by(50) {
            c.process(TOUCH, at(ms), policy);
        }
        c.process(APART, at(1340), policy);
        c.process(TOUCH, at(1380), policy);
        let end = c.process(APART, at(1420), policy);
        assert_eq!(end.action, Action::Click);
        assert_eq!(end.button, ButtonCommand::Release);
    }

    #[test]
    fn test_suppressed_policy_only_releases() {
        let mut c = classifier();
        for ms in (1000..=1300).step_by(50) {
            c.process(TOUCH, at(ms), EmissionPolicy::ClickAndDrag);
        }
        assert_eq!(c.process(TOUCH, at(1350), EmissionPolicy::Suppressed).button, ButtonCommand::Release);
        assert_eq!(c.process(TOUCH, at(1400), EmissionPolicy::Suppressed).button, ButtonCommand::None);
        assert_eq!(c.process(APART, at(1450), EmissionPolicy::Suppressed).button, ButtonCommand::None);
    }

    #[test]
    fn test_hand_missing_timeout_releases() {
        let mut c = classifier();
        for ms in (1000..=1300).step_by(50) {
            c.process(TOUCH, at(ms), EmissionPolicy::ClickAndDrag);
        }
        let early = c.hand_missing(at(1500));
        assert_eq!(early.button, ButtonCommand::None);
        assert!(!early.hand_lost);
        assert!(early.contact);
        assert_eq!(early.action, Action::Drag);
        assert!(c.state().is_dragging);

        let lost = c.hand_missing(at(1601));
        assert!(lost.hand_lost);
        assert!(!lost.contact);
        assert_eq!(lost.button, ButtonCommand::Release);
        assert!(!c.state().is_dragging);
        assert_eq!(c.state().current_action, Action::None);
        assert!(c.state().contact_started_at.is_none());

        let later = c.hand_missing(at(1700));
        assert!(!later.hand_lost);
        assert_eq!(later.button, ButtonCommand::None);
    }

    #[test]
    fn test_emission_policy_from_toggles() {
        assert_eq!(EmissionPolicy::from_toggles(true, true), EmissionPolicy::ClickAndDrag);
        assert_eq!(EmissionPolicy::from_toggles(false, true), EmissionPolicy::ClickOnly);
        assert_eq!(EmissionPolicy::from_toggles(true, false), EmissionPolicy::Suppressed);
    }

    #[test]
    fn test_reset_clears_state() {
        let mut c = classifier();
        c.process(TOUCH, at(1000), EmissionPolicy::ClickAndDrag);
        c.reset(at(5000));
        assert_eq!(c.state(), &GestureState::new(at(5000)));
    }
}
