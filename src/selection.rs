//! Multi-modal frame selection: click, shift-click, drag-rectangle and
//! long-press.
//!
//! [`SelectionController`] sits on the frame grid container. On desktop it
//! handles delegated clicks and the drag rectangle itself. On touch devices
//! it routes each touch to a per-frame [`FrameTouchHandler`], which runs the
//! long-press timer for its frame. Both share the range anchor through a
//! [`SelectionContext`]; children only hold a `Weak` reference to it.

use std::cell::Cell;
use std::collections::BTreeMap;
use std::rc::{Rc, Weak};

use tracing::debug;

use crate::config::InteractionConfig;
use crate::effect::{Effect, Effects, Feedback, TimerKind, TimerSlot, TimerTarget, TimerToken, Visual};
use crate::geometry::{Point, Rect};
use crate::hook::{DataAttributes, Hook};
use crate::message::OutboundMessage;

/// Input family, chosen once when the controller is created.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputMode {
    /// Click plus mousedown/mousemove/mouseup
    Desktop,
    /// touchstart/touchmove/touchend; the click path is disabled
    Touch,
}

impl InputMode {
    pub fn detect(touch_capable: bool) -> Self {
        if touch_capable {
            InputMode::Touch
        } else {
            InputMode::Desktop
        }
    }
}

/// What the pointer landed on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HitTarget {
    /// A frame card or its select button
    Frame(usize),
    /// A frame's own action button (e.g. open in a modal); never selects
    FrameAction(usize),
    /// Empty space inside the grid
    GridSpace,
    Outside,
}

/// Raw pointer and touch input in client coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PointerInput {
    Click { target: HitTarget, shift: bool },
    MouseDown { target: HitTarget, at: Point },
    MouseMove { at: Point },
    MouseUp { at: Point },
    TouchStart { target: HitTarget, at: Point },
    TouchMove { at: Point },
    TouchEnd,
}

/// Client rectangle of one frame card.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameRect {
    pub frame_index: usize,
    pub rect: Rect,
}

impl FrameRect {
    pub fn new(frame_index: usize, rect: Rect) -> Self {
        Self { frame_index, rect }
    }
}

/// Source of frame card geometry, queried on every drag recompute.
pub trait FrameLayout {
    fn frame_rects(&self) -> Vec<FrameRect>;
}

impl FrameLayout for Vec<FrameRect> {
    fn frame_rects(&self) -> Vec<FrameRect> {
        self.clone()
    }
}

/// Frame indices whose cards overlap `area`, ascending.
pub fn frames_in(area: &Rect, layout: &dyn FrameLayout) -> Vec<usize> {
    let mut hits: Vec<usize> = layout
        .frame_rects()
        .iter()
        .filter(|card| area.intersects(&card.rect))
        .map(|card| card.frame_index)
        .collect();
    hits.sort_unstable();
    hits.dedup();
    hits
}

/// Shared selection state readable by child handlers.
#[derive(Debug, Default)]
pub struct SelectionContext {
    anchor: Cell<Option<usize>>,
}

impl SelectionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index of the last committed selection, used as the range anchor.
    pub fn anchor(&self) -> Option<usize> {
        self.anchor.get()
    }

    pub fn set_anchor(&self, index: usize) {
        self.anchor.set(Some(index));
    }
}

/// Commit a range from the anchor to `index`, or a plain select when there
/// is no anchor. Either way `index` becomes the new anchor.
fn commit_against_anchor(context: Option<&SelectionContext>, index: usize) -> OutboundMessage {
    let anchor = context.and_then(SelectionContext::anchor);
    if let Some(context) = context {
        context.set_anchor(index);
    }
    match anchor {
        Some(anchor) => OutboundMessage::range_between(anchor, index),
        None => OutboundMessage::SelectFrame {
            frame_index: index,
            shift_key: false,
        },
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TouchState {
    #[default]
    Idle,
    /// Finger down, long-press timer armed
    Pressing,
    /// Threshold reached and the range was committed; release is swallowed
    LongPressed,
}

/// Touch handling for a single frame card.
#[derive(Debug)]
pub struct FrameTouchHandler {
    frame_index: usize,
    context: Weak<SelectionContext>,
    config: InteractionConfig,
    state: TouchState,
    long_press: TimerSlot,
}

impl FrameTouchHandler {
    pub fn new(frame_index: usize, context: Weak<SelectionContext>, config: InteractionConfig) -> Self {
        Self {
            frame_index,
            context,
            config,
            state: TouchState::Idle,
            long_press: TimerSlot::new(),
        }
    }

    #[inline]
    pub fn frame_index(&self) -> usize {
        self.frame_index
    }

    #[inline]
    pub fn state(&self) -> TouchState {
        self.state
    }

    fn timer_kind(&self) -> TimerKind {
        TimerKind::LongPress(self.frame_index)
    }

    pub fn touch_start(&mut self) -> Effects {
        let mut effects = Effects::new();
        self.state = TouchState::Pressing;
        self.long_press
            .arm(self.timer_kind(), self.config.long_press_ms, &mut effects);
        effects
    }

    /// Any movement before the threshold abandons the gesture.
    pub fn touch_move(&mut self) -> Effects {
        let mut effects = Effects::new();
        if self.state == TouchState::Pressing {
            self.long_press.cancel(self.timer_kind(), &mut effects);
            self.state = TouchState::Idle;
            debug!(frame = self.frame_index, "long-press cancelled by movement");
        }
        effects
    }

    pub fn touch_end(&mut self) -> Effects {
        let mut effects = Effects::new();
        match self.state {
            TouchState::Pressing => {
                self.long_press.cancel(self.timer_kind(), &mut effects);
                effects.push(Effect::Visual(Visual::Flash {
                    frame_index: self.frame_index,
                    feedback: Feedback::Tap,
                    duration_ms: self.config.tap_feedback_ms,
                }));
                effects.push(Effect::Emit(OutboundMessage::SelectFrame {
                    frame_index: self.frame_index,
                    shift_key: false,
                }));
                if let Some(context) = self.context.upgrade() {
                    context.set_anchor(self.frame_index);
                }
            }
            TouchState::LongPressed | TouchState::Idle => {}
        }
        self.state = TouchState::Idle;
        effects
    }

    pub fn teardown(&mut self) -> Effects {
        let mut effects = Effects::new();
        self.long_press.cancel(self.timer_kind(), &mut effects);
        self.state = TouchState::Idle;
        effects
    }
}

impl TimerTarget for FrameTouchHandler {
    fn on_timer(&mut self, kind: TimerKind, token: TimerToken) -> Effects {
        let mut effects = Effects::new();
        if kind != self.timer_kind() || !self.long_press.fire(token) {
            return effects;
        }
        if self.state != TouchState::Pressing {
            return effects;
        }

        self.state = TouchState::LongPressed;
        let context = self.context.upgrade();
        let message = commit_against_anchor(context.as_deref(), self.frame_index);
        debug!(frame = self.frame_index, ?message, "long-press committed");

        effects.push(Effect::Emit(message));
        effects.push(Effect::Visual(Visual::Vibrate {
            duration_ms: self.config.haptic_ms,
        }));
        effects.push(Effect::Visual(Visual::Flash {
            frame_index: self.frame_index,
            feedback: Feedback::LongPress,
            duration_ms: self.config.long_press_feedback_ms,
        }));
        effects
    }
}

/// Container-level gesture state.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum GestureState {
    #[default]
    Idle,
    /// Drag rectangle in progress
    Dragging { origin: Point, preview: Vec<usize> },
    /// A touch that started on this frame is down
    Touching(usize),
}

/// Selection controller for a grid of frame cards.
///
/// ## Example
///
/// ```rust
/// use flipbook_core_view::{Effect, FrameRect, HitTarget, InputMode, OutboundMessage, PointerInput, SelectionController};
///
/// let mut selection = SelectionController::new(InputMode::Desktop, Default::default());
/// let layout: Vec<FrameRect> = Vec::new();
/// selection.handle(PointerInput::Click { target: HitTarget::Frame(3), shift: false }, &layout);
/// let effects = selection.handle(PointerInput::Click { target: HitTarget::Frame(7), shift: true }, &layout);
///
/// assert_eq!(effects, vec![Effect::Emit(OutboundMessage::range_between(3, 7))]);
/// ```
#[derive(Debug)]
pub struct SelectionController {
    mode: InputMode,
    config: InteractionConfig,
    context: Rc<SelectionContext>,
    state: GestureState,
    children: BTreeMap<usize, FrameTouchHandler>,
}

impl SelectionController {
    pub fn new(mode: InputMode, config: InteractionConfig) -> Self {
        Self {
            mode,
            config,
            context: Rc::new(SelectionContext::new()),
            state: GestureState::Idle,
            children: BTreeMap::new(),
        }
    }

    #[inline]
    pub fn mode(&self) -> InputMode {
        self.mode
    }

    #[inline]
    pub fn state(&self) -> &GestureState {
        &self.state
    }

    pub fn anchor(&self) -> Option<usize> {
        self.context.anchor()
    }

    /// Non-owning handle for child handlers.
    pub fn context(&self) -> Weak<SelectionContext> {
        Rc::downgrade(&self.context)
    }

    /// Touch handler for a frame card, created on first use.
    pub fn frame_handler(&mut self, frame_index: usize) -> &mut FrameTouchHandler {
        let context = Rc::downgrade(&self.context);
        let config = self.config.clone();
        self.children
            .entry(frame_index)
            .or_insert_with(|| FrameTouchHandler::new(frame_index, context, config))
    }

    /// Feed one input event. `layout` is only queried while dragging.
    pub fn handle(&mut self, input: PointerInput, layout: &dyn FrameLayout) -> Effects {
        match (self.mode, input) {
            (InputMode::Desktop, PointerInput::Click { target, shift }) => self.click(target, shift),
            (InputMode::Desktop, PointerInput::MouseDown { target, at }) => self.drag_start(target, at),
            (InputMode::Desktop, PointerInput::MouseMove { at }) => self.drag_move(at, layout),
            (InputMode::Desktop, PointerInput::MouseUp { at }) => self.drag_end(at, layout),
            (InputMode::Touch, PointerInput::TouchStart { target, .. }) => self.touch_start(target),
            (InputMode::Touch, PointerInput::TouchMove { .. }) => self.touch_move(),
            (InputMode::Touch, PointerInput::TouchEnd) => self.touch_end(),
            (mode, input) => {
                debug!(?mode, ?input, "input ignored in this mode");
                Effects::new()
            }
        }
    }

    fn click(&mut self, target: HitTarget, shift: bool) -> Effects {
        let HitTarget::Frame(index) = target else {
            return Effects::new();
        };

        let message = match self.context.anchor() {
            Some(anchor) if shift => OutboundMessage::range_between(anchor, index),
            _ => OutboundMessage::SelectFrame {
                frame_index: index,
                shift_key: shift,
            },
        };
        self.context.set_anchor(index);
        vec![Effect::Emit(message)]
    }

    fn drag_start(&mut self, target: HitTarget, at: Point) -> Effects {
        if target != HitTarget::GridSpace {
            return Effects::new();
        }
        self.state = GestureState::Dragging {
            origin: at,
            preview: Vec::new(),
        };
        debug!(x = at.x, y = at.y, "drag selection started");
        vec![Effect::Visual(Visual::SelectionBox(Rect::from_corners(at, at)))]
    }

    fn drag_move(&mut self, at: Point, layout: &dyn FrameLayout) -> Effects {
        let GestureState::Dragging { origin, preview } = &mut self.state else {
            return Effects::new();
        };

        let area = Rect::from_corners(*origin, at);
        let hits = frames_in(&area, layout);
        *preview = hits.clone();

        vec![
            Effect::Visual(Visual::SelectionBox(area)),
            Effect::Visual(Visual::DragSelecting(hits.clone())),
            Effect::Emit(OutboundMessage::PreviewFrameSelection { indices: hits }),
        ]
    }

    fn drag_end(&mut self, at: Point, layout: &dyn FrameLayout) -> Effects {
        let GestureState::Dragging { origin, .. } = std::mem::take(&mut self.state) else {
            return Effects::new();
        };

        let hits = frames_in(&Rect::from_corners(origin, at), layout);
        let mut effects = vec![
            Effect::Visual(Visual::ClearDragSelecting),
            Effect::Visual(Visual::RemoveSelectionBox),
        ];
        if let Some(message) = OutboundMessage::range_of(hits) {
            if let OutboundMessage::SelectFrameRange { end_index, .. } = &message {
                self.context.set_anchor(*end_index);
            }
            effects.push(Effect::Emit(message));
        }
        debug!(?effects, "drag selection ended");
        effects
    }

    fn touch_start(&mut self, target: HitTarget) -> Effects {
        let HitTarget::Frame(index) = target else {
            return Effects::new();
        };
        let mut effects = Effects::new();
        if let GestureState::Touching(previous) = self.state {
            if previous != index {
                effects.extend(self.frame_handler(previous).teardown());
            }
        }
        self.state = GestureState::Touching(index);
        effects.extend(self.frame_handler(index).touch_start());
        effects
    }

    fn touch_move(&mut self) -> Effects {
        match self.state {
            GestureState::Touching(index) => self.frame_handler(index).touch_move(),
            _ => Effects::new(),
        }
    }

    fn touch_end(&mut self) -> Effects {
        match std::mem::take(&mut self.state) {
            GestureState::Touching(index) => self.frame_handler(index).touch_end(),
            _ => Effects::new(),
        }
    }

    /// Cancel every timer, drop any drag box and detach listeners.
    pub fn teardown(&mut self) -> Effects {
        let mut effects = Effects::new();
        if matches!(self.state, GestureState::Dragging { .. }) {
            effects.push(Effect::Visual(Visual::ClearDragSelecting));
            effects.push(Effect::Visual(Visual::RemoveSelectionBox));
        }
        self.state = GestureState::Idle;
        for child in self.children.values_mut() {
            effects.extend(child.teardown());
        }
        effects.push(Effect::DetachListeners);
        effects
    }
}

impl TimerTarget for SelectionController {
    fn on_timer(&mut self, kind: TimerKind, token: TimerToken) -> Effects {
        match kind {
            TimerKind::LongPress(index) => match self.children.get_mut(&index) {
                Some(child) => child.on_timer(kind, token),
                None => Effects::new(),
            },
            _ => Effects::new(),
        }
    }
}

impl Hook for SelectionController {
    fn on_attach(&mut self, _attrs: &DataAttributes) -> Effects {
        debug!(mode = ?self.mode, "frame selection attached");
        Effects::new()
    }

    /// The anchor survives re-renders; only gesture state bound to old
    /// elements is dropped.
    fn on_data_change(&mut self, _attrs: &DataAttributes) -> Effects {
        let mut effects = Effects::new();
        if matches!(self.state, GestureState::Dragging { .. }) {
            return effects;
        }
        let live = match self.state {
            GestureState::Touching(index) => Some(index),
            _ => None,
        };
        self.children.retain(|index, child| {
            if Some(*index) == live {
                true
            } else {
                effects.extend(child.teardown());
                false
            }
        });
        effects
    }

    fn on_detach(&mut self) -> Effects {
        self.teardown()
    }
}
