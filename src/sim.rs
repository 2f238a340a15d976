//! Deterministic host for the interaction components.
//!
//! [`Simulation`] applies [`Effect`]s against a logical millisecond clock
//! instead of the browser, so timer ordering, cancellation and outbound
//! traffic can be asserted exactly.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::Value;
use tracing::trace;

use crate::effect::{Effect, Effects, TimerKind, TimerTarget, TimerToken, Visual};
use crate::message::{EventSink, OutboundMessage};

/// A component plus everything its effects have done so far.
#[derive(Debug)]
pub struct Simulation<C> {
    component: C,
    now_ms: u64,
    timers: BTreeMap<TimerKind, (u64, TimerToken)>,
    sent: Vec<OutboundMessage>,
    visuals: Vec<Visual>,
    visible: BTreeSet<usize>,
    /// `(time, frame)` for every frame made visible
    shown: Vec<(u64, usize)>,
    detached: bool,
}

impl<C: TimerTarget> Simulation<C> {
    pub fn new(component: C) -> Self {
        Self {
            component,
            now_ms: 0,
            timers: BTreeMap::new(),
            sent: Vec::new(),
            visuals: Vec::new(),
            visible: BTreeSet::new(),
            shown: Vec::new(),
            detached: false,
        }
    }

    /// Run a transition on the component and apply what it returns.
    ///
    /// ```rust
    /// use flipbook_core_view::{DataAttributes, Hook, Simulation, TimelineScrubber};
    ///
    /// let mut sim = Simulation::new(TimelineScrubber::default());
    /// sim.dispatch(|s| s.on_attach(&DataAttributes::from_pairs([("position", "0.5")])));
    /// assert_eq!(sim.component().position(), 0.5);
    /// ```
    pub fn dispatch<F>(&mut self, f: F)
    where
        F: FnOnce(&mut C) -> Effects,
    {
        let effects = f(&mut self.component);
        self.apply(effects);
    }

    pub fn apply(&mut self, effects: Effects) {
        for effect in effects {
            match effect {
                Effect::Schedule {
                    kind,
                    token,
                    delay_ms,
                } => {
                    self.timers.insert(kind, (self.now_ms + delay_ms, token));
                }
                Effect::Cancel(kind) => {
                    self.timers.remove(&kind);
                }
                Effect::Emit(message) => self.sent.push(message),
                Effect::Visual(visual) => self.record_visual(visual),
                Effect::DetachListeners => self.detached = true,
            }
        }
    }

    /// Move the clock forward, firing due timers in deadline order.
    /// Timers scheduled by a firing timer are honored within the same step.
    pub fn advance_by(&mut self, ms: u64) {
        let target = self.now_ms + ms;
        while let Some((kind, deadline, token)) = self.next_due(target) {
            self.timers.remove(&kind);
            self.now_ms = deadline;
            trace!(?kind, at = deadline, "timer fired");
            let effects = self.component.on_timer(kind, token);
            self.apply(effects);
        }
        self.now_ms = target;
    }

    /// Forward everything sent so far to `sink`, oldest first.
    pub fn drain_into(&mut self, sink: &mut impl EventSink) {
        for message in self.sent.drain(..) {
            sink.push(&message);
        }
    }

    pub fn take_sent(&mut self) -> Vec<OutboundMessage> {
        std::mem::take(&mut self.sent)
    }

    #[inline]
    pub fn now_ms(&self) -> u64 {
        self.now_ms
    }

    pub fn component(&self) -> &C {
        &self.component
    }

    pub fn component_mut(&mut self) -> &mut C {
        &mut self.component
    }

    pub fn sent(&self) -> &[OutboundMessage] {
        &self.sent
    }

    pub fn visuals(&self) -> &[Visual] {
        &self.visuals
    }

    /// Frames currently visible.
    pub fn visible_frames(&self) -> Vec<usize> {
        self.visible.iter().copied().collect()
    }

    pub fn shown(&self) -> &[(u64, usize)] {
        &self.shown
    }

    pub fn pending_timers(&self) -> Vec<TimerKind> {
        self.timers.keys().copied().collect()
    }

    pub fn is_detached(&self) -> bool {
        self.detached
    }

    fn next_due(&self, target: u64) -> Option<(TimerKind, u64, TimerToken)> {
        self.timers
            .iter()
            .filter(|(_, (deadline, _))| *deadline <= target)
            .min_by_key(|(kind, (deadline, _))| (*deadline, **kind))
            .map(|(kind, (deadline, token))| (*kind, *deadline, *token))
    }

    fn record_visual(&mut self, visual: Visual) {
        match &visual {
            Visual::HideAllFrames => self.visible.clear(),
            Visual::ShowFrame(index) => {
                self.visible.insert(*index);
                self.shown.push((self.now_ms, *index));
            }
            Visual::HideFrame(index) => {
                self.visible.remove(index);
            }
            _ => {}
        }
        self.visuals.push(visual);
    }
}

/// Sink that keeps every pushed event, for tests and logging hosts.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RecordingSink {
    pub events: Vec<(String, Value)>,
}

impl EventSink for RecordingSink {
    fn push_event(&mut self, event: &str, payload: Value) {
        self.events.push((event.to_string(), payload));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effect::TimerSlot;
    use serde_json::json;

    /// Fires a message each time its timer elapses and re-arms itself.
    #[derive(Default)]
    struct Ticker {
        slot: TimerSlot,
        fired: usize,
    }

    impl Ticker {
        fn start(&mut self, delay_ms: u64) -> Effects {
            let mut effects = Effects::new();
            self.slot.arm(TimerKind::AnimationTick, delay_ms, &mut effects);
            effects
        }
    }

    impl TimerTarget for Ticker {
        fn on_timer(&mut self, _kind: TimerKind, token: TimerToken) -> Effects {
            if !self.slot.fire(token) {
                return Effects::new();
            }
            self.fired += 1;
            let mut effects = vec![Effect::Visual(Visual::ShowFrame(self.fired))];
            self.slot.arm(TimerKind::AnimationTick, 100, &mut effects);
            effects
        }
    }

    #[test]
    fn test_rearming_timer_fires_on_schedule() {
        let mut sim = Simulation::new(Ticker::default());
        sim.dispatch(|t| t.start(100));
        sim.advance_by(350);
        assert_eq!(sim.component().fired, 3);
        assert_eq!(sim.shown(), &[(100, 1), (200, 2), (300, 3)]);
        assert_eq!(sim.now_ms(), 350);
    }

    #[test]
    fn test_cancel_drops_timer() {
        let mut sim = Simulation::new(Ticker::default());
        sim.dispatch(|t| t.start(100));
        sim.apply(vec![Effect::Cancel(TimerKind::AnimationTick)]);
        sim.apply(vec![Effect::Cancel(TimerKind::AnimationTick)]);
        sim.advance_by(1_000);
        assert_eq!(sim.component().fired, 0);
        assert!(sim.pending_timers().is_empty());
    }

    #[test]
    fn test_visibility_tracking() {
        let mut sim = Simulation::new(Ticker::default());
        sim.apply(vec![
            Effect::Visual(Visual::ShowFrame(1)),
            Effect::Visual(Visual::ShowFrame(2)),
            Effect::Visual(Visual::HideFrame(1)),
        ]);
        assert_eq!(sim.visible_frames(), vec![2]);
        sim.apply(vec![Effect::Visual(Visual::HideAllFrames)]);
        assert!(sim.visible_frames().is_empty());
    }

    #[test]
    fn test_drain_into_sink() {
        let mut sim = Simulation::new(Ticker::default());
        sim.apply(vec![
            Effect::Emit(OutboundMessage::TimelineClick { position: 0.25 }),
            Effect::DetachListeners,
        ]);
        let mut sink = RecordingSink::default();
        sim.drain_into(&mut sink);
        assert_eq!(
            sink.events,
            vec![("timeline_click".to_string(), json!({"position": "0.25"}))]
        );
        assert!(sim.sent().is_empty());
        assert!(sim.is_detached());
    }
}
