//! Effects returned by the interaction state machines.
//!
//! Components never touch timers, the DOM or the server channel directly.
//! Every transition returns a list of [`Effect`]s that a host runtime
//! applies: [`crate::sim::Simulation`] on a logical clock, or the DOM
//! runtime behind the `web` feature.

use crate::geometry::Rect;
use crate::message::OutboundMessage;

/// What a pending timer is for. A component keeps at most one per kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TimerKind {
    AnimationTick,
    ScrubDebounce,
    /// Long-press threshold for the frame with this index
    LongPress(usize),
}

/// Generation stamp of a scheduled timer; stale stamps are ignored.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerToken(pub u64);

/// Transient feedback classes flashed on a frame card.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Feedback {
    Tap,
    LongPress,
}

impl Feedback {
    pub fn class_name(self) -> &'static str {
        match self {
            Feedback::Tap => "tap-feedback",
            Feedback::LongPress => "long-press-feedback",
        }
    }
}

/// Visual state changes. Hosts map these onto classes and styles.
#[derive(Clone, Debug, PartialEq)]
pub enum Visual {
    HideAllFrames,
    ShowFrame(usize),
    HideFrame(usize),
    /// Frame counter text, `position` is one-based
    Counter { position: usize, total: usize },
    /// Fixed-position selection box in client coordinates
    SelectionBox(Rect),
    RemoveSelectionBox,
    /// Frames currently under the drag rectangle; all others are unmarked
    DragSelecting(Vec<usize>),
    ClearDragSelecting,
    Flash {
        frame_index: usize,
        feedback: Feedback,
        duration_ms: u64,
    },
    Vibrate { duration_ms: u64 },
    /// Scrubber handle and tooltip placed at a normalized position
    ScrubberAt(f64),
    TooltipAt(f64),
    HideTooltip,
    Grabbing(bool),
}

#[derive(Clone, Debug, PartialEq)]
pub enum Effect {
    /// Arm a single-shot timer, replacing any pending timer of the same kind
    Schedule {
        kind: TimerKind,
        token: TimerToken,
        delay_ms: u64,
    },
    Cancel(TimerKind),
    Emit(OutboundMessage),
    Visual(Visual),
    /// Drop every listener the host registered for this component
    DetachListeners,
}

pub type Effects = Vec<Effect>;

/// Anything that owns timers and reacts when one fires.
pub trait TimerTarget {
    fn on_timer(&mut self, kind: TimerKind, token: TimerToken) -> Effects;
}

/// Bookkeeping for one timer purpose.
///
/// Arming always cancels first, so at most one timer per slot is ever
/// outstanding, and only the latest token is accepted when it fires.
#[derive(Clone, Debug, Default)]
pub struct TimerSlot {
    next: u64,
    pending: Option<TimerToken>,
}

impl TimerSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel any pending timer and arm a new one.
    pub fn arm(&mut self, kind: TimerKind, delay_ms: u64, effects: &mut Effects) {
        if self.pending.take().is_some() {
            effects.push(Effect::Cancel(kind));
        }
        self.next += 1;
        let token = TimerToken(self.next);
        self.pending = Some(token);
        effects.push(Effect::Schedule {
            kind,
            token,
            delay_ms,
        });
    }

    /// Cancel unconditionally. Safe to call with nothing pending.
    pub fn cancel(&mut self, kind: TimerKind, effects: &mut Effects) {
        self.pending = None;
        effects.push(Effect::Cancel(kind));
    }

    /// Accept a firing timer if it carries the current token.
    pub fn fire(&mut self, token: TimerToken) -> bool {
        if self.pending == Some(token) {
            self.pending = None;
            true
        } else {
            false
        }
    }

    #[inline]
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arm_replaces_pending() {
        let mut slot = TimerSlot::new();
        let mut effects = Effects::new();
        slot.arm(TimerKind::ScrubDebounce, 50, &mut effects);
        slot.arm(TimerKind::ScrubDebounce, 50, &mut effects);

        assert_eq!(
            effects,
            vec![
                Effect::Schedule {
                    kind: TimerKind::ScrubDebounce,
                    token: TimerToken(1),
                    delay_ms: 50
                },
                Effect::Cancel(TimerKind::ScrubDebounce),
                Effect::Schedule {
                    kind: TimerKind::ScrubDebounce,
                    token: TimerToken(2),
                    delay_ms: 50
                },
            ]
        );
        assert!(!slot.fire(TimerToken(1)));
        assert!(slot.fire(TimerToken(2)));
        assert!(!slot.is_pending());
    }

    #[test]
    fn cancel_is_idempotent() {
        let mut slot = TimerSlot::new();
        let mut effects = Effects::new();
        slot.cancel(TimerKind::AnimationTick, &mut effects);
        slot.cancel(TimerKind::AnimationTick, &mut effects);
        assert_eq!(effects.len(), 2);
        assert!(!slot.is_pending());
    }
}
