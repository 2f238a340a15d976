//! Timeline scrubber: pointer position on a horizontal track mapped to a
//! normalized position, with a debounced scrub stream and a final click.

use tracing::debug;

use crate::config::InteractionConfig;
use crate::effect::{Effect, Effects, TimerKind, TimerSlot, TimerTarget, TimerToken, Visual};
use crate::hook::{DataAttributes, Hook};
use crate::message::OutboundMessage;
use crate::parser;

/// Horizontal extent of the track in client coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TrackBounds {
    pub left: f64,
    pub width: f64,
}

impl TrackBounds {
    pub fn new(left: f64, width: f64) -> Self {
        Self { left, width }
    }

    /// Normalized position of `client_x`, clamped into `[0, 1]`.
    ///
    /// A collapsed track (zero or negative width) maps everything to 0.
    ///
    /// ```rust
    /// use flipbook_core_view::TrackBounds;
    ///
    /// let track = TrackBounds::new(100.0, 200.0);
    /// assert_eq!(track.position_at(150.0), 0.25);
    /// assert_eq!(track.position_at(20.0), 0.0);
    /// assert_eq!(track.position_at(900.0), 1.0);
    /// ```
    pub fn position_at(&self, client_x: f64) -> f64 {
        if !(self.width > 0.0) || !client_x.is_finite() {
            return 0.0;
        }
        ((client_x - self.left) / self.width).clamp(0.0, 1.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ScrubInput {
    /// `primary` is false for any button other than the main one
    MouseDown { client_x: f64, primary: bool },
    /// Movement over the track or anywhere in the document while dragging
    MouseMove { client_x: f64 },
    MouseUp { client_x: f64 },
    MouseLeave,
    /// `touches` is the number of active touch points
    TouchStart { client_x: f64, touches: usize },
    TouchMove { client_x: f64, touches: usize },
    TouchEnd,
}

/// Scrubber state owned by one track element.
#[derive(Clone, Debug)]
pub struct TimelineScrubber {
    config: InteractionConfig,
    position: f64,
    dragging: bool,
    /// Position the pending debounce will send
    pending: Option<f64>,
    debounce: TimerSlot,
}

impl Default for TimelineScrubber {
    fn default() -> Self {
        Self::new(InteractionConfig::default())
    }
}

impl TimelineScrubber {
    pub fn new(config: InteractionConfig) -> Self {
        Self {
            config,
            position: 0.0,
            dragging: false,
            pending: None,
            debounce: TimerSlot::new(),
        }
    }

    #[inline]
    pub fn position(&self) -> f64 {
        self.position
    }

    #[inline]
    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    /// Feed one input event against the track's current bounds.
    pub fn handle(&mut self, input: ScrubInput, track: TrackBounds) -> Effects {
        match input {
            ScrubInput::MouseDown { client_x, primary } => {
                if !primary {
                    return Effects::new();
                }
                self.dragging = true;
                let mut effects = vec![Effect::Visual(Visual::Grabbing(true))];
                effects.extend(self.scrub_to(track.position_at(client_x)));
                debug!(position = self.position, "scrub started");
                effects
            }
            ScrubInput::TouchStart { client_x, touches } => {
                if touches != 1 {
                    return Effects::new();
                }
                self.dragging = true;
                self.scrub_to(track.position_at(client_x))
            }
            ScrubInput::MouseMove { client_x } => {
                let position = track.position_at(client_x);
                if self.dragging {
                    self.scrub_to(position)
                } else {
                    vec![Effect::Visual(Visual::TooltipAt(position))]
                }
            }
            ScrubInput::TouchMove { client_x, touches } => {
                if !self.dragging || touches != 1 {
                    return Effects::new();
                }
                self.scrub_to(track.position_at(client_x))
            }
            ScrubInput::MouseUp { client_x } => {
                if !self.dragging {
                    return Effects::new();
                }
                let mut effects = vec![Effect::Visual(Visual::Grabbing(false))];
                effects.extend(self.finish(track.position_at(client_x)));
                effects
            }
            ScrubInput::TouchEnd => {
                if !self.dragging {
                    return Effects::new();
                }
                self.finish(self.position)
            }
            ScrubInput::MouseLeave => {
                if self.dragging {
                    Effects::new()
                } else {
                    vec![Effect::Visual(Visual::HideTooltip)]
                }
            }
        }
    }

    /// Apply a server-driven position. Values within epsilon of the cached
    /// position are ignored so our own scrub echoes do not jump the handle.
    pub fn sync_position(&mut self, position: f64) -> Effects {
        let position = position.clamp(0.0, 1.0);
        if (position - self.position).abs() <= self.config.position_epsilon {
            return Effects::new();
        }
        self.position = position;
        visuals_at(position)
    }

    /// Cancel the pending scrub and detach. Safe to call repeatedly.
    pub fn teardown(&mut self) -> Effects {
        let mut effects = Effects::new();
        self.debounce.cancel(TimerKind::ScrubDebounce, &mut effects);
        self.pending = None;
        self.dragging = false;
        effects.push(Effect::DetachListeners);
        effects
    }

    fn scrub_to(&mut self, position: f64) -> Effects {
        self.position = position;
        self.pending = Some(position);
        let mut effects = visuals_at(position);
        self.debounce.arm(
            TimerKind::ScrubDebounce,
            self.config.scrub_debounce_ms,
            &mut effects,
        );
        effects
    }

    fn finish(&mut self, position: f64) -> Effects {
        self.dragging = false;
        self.position = position;
        self.pending = None;

        let mut effects = visuals_at(position);
        if self.debounce.is_pending() {
            self.debounce.cancel(TimerKind::ScrubDebounce, &mut effects);
        }
        effects.push(Effect::Emit(OutboundMessage::TimelineClick { position }));
        debug!(position, "scrub committed");
        effects
    }
}

fn visuals_at(position: f64) -> Effects {
    vec![
        Effect::Visual(Visual::ScrubberAt(position)),
        Effect::Visual(Visual::TooltipAt(position)),
    ]
}

impl TimerTarget for TimelineScrubber {
    fn on_timer(&mut self, kind: TimerKind, token: TimerToken) -> Effects {
        if kind != TimerKind::ScrubDebounce || !self.debounce.fire(token) {
            return Effects::new();
        }
        match self.pending.take() {
            Some(position) => vec![Effect::Emit(OutboundMessage::TimelineScrub { position })],
            None => Effects::new(),
        }
    }
}

impl Hook for TimelineScrubber {
    fn on_attach(&mut self, attrs: &DataAttributes) -> Effects {
        self.position = attrs
            .get("position")
            .and_then(parser::parse_position)
            .unwrap_or(0.0)
            .clamp(0.0, 1.0);
        visuals_at(self.position)
    }

    fn on_data_change(&mut self, attrs: &DataAttributes) -> Effects {
        let position = attrs
            .get("position")
            .and_then(parser::parse_position)
            .unwrap_or(0.0);
        self.sync_position(position)
    }

    fn on_detach(&mut self) -> Effects {
        self.teardown()
    }
}
