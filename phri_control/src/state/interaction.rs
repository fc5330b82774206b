//! Interaction state machine: FreeMotion ⇄ Interaction.
//!
//! Evaluated once per force tick on the conditioned force magnitude. A force
//! under the threshold means the arm follows its trajectory; at or above it
//! a human is pushing and joint velocity output is withheld.

use phri_common::control::state::MotionMode;

/// Classification of one conditioned force sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractionEvent {
    /// Force magnitude below the interaction threshold.
    ForceReleased,
    /// Force magnitude at or above the threshold.
    ForceApplied,
}

impl InteractionEvent {
    /// Classify `magnitude` against `threshold`.
    #[inline]
    pub fn classify(magnitude: f64, threshold: f64) -> Self {
        if magnitude < threshold {
            Self::ForceReleased
        } else {
            Self::ForceApplied
        }
    }
}

/// Result of handling one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeTransition {
    /// Mode after the event.
    pub mode: MotionMode,
    /// Mode before the event.
    pub previous: MotionMode,
}

impl ModeTransition {
    #[inline]
    pub fn changed(&self) -> bool {
        self.mode != self.previous
    }
}

/// Tracks the motion mode and the motion-permitted flag.
#[derive(Debug, Clone)]
pub struct InteractionStateMachine {
    mode: MotionMode,
    motion_permitted: bool,
    threshold: f64,
}

impl InteractionStateMachine {
    /// Starts in `FreeMotion` with motion permitted.
    pub const fn new(threshold: f64) -> Self {
        Self {
            mode: MotionMode::FreeMotion,
            motion_permitted: true,
            threshold,
        }
    }

    #[inline]
    pub const fn mode(&self) -> MotionMode {
        self.mode
    }

    #[inline]
    pub const fn motion_permitted(&self) -> bool {
        self.motion_permitted
    }

    #[inline]
    pub const fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Classify `force_magnitude` and apply the resulting event.
    pub fn update(&mut self, force_magnitude: f64) -> ModeTransition {
        self.handle_event(InteractionEvent::classify(force_magnitude, self.threshold))
    }

    /// Apply an event. Every event is accepted from either state.
    pub fn handle_event(&mut self, event: InteractionEvent) -> ModeTransition {
        let previous = self.mode;
        self.mode = match event {
            InteractionEvent::ForceReleased => MotionMode::FreeMotion,
            InteractionEvent::ForceApplied => MotionMode::Interaction,
        };
        self.motion_permitted = self.mode.permits_motion();
        ModeTransition {
            mode: self.mode,
            previous,
        }
    }

    /// Permit motion again without a force tick (after replanning).
    pub fn permit_motion(&mut self) {
        self.motion_permitted = true;
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
