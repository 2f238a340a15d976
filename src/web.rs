//! Browser host for the interaction components.
//!
//! [`WebRuntime`] owns one component, applies its [`Effect`]s to the DOM,
//! backs timers with `setTimeout` and keeps every registered listener so
//! `DetachListeners` can remove them. The `*Hook` types are the
//! `wasm-bindgen` surface a page's hook glue calls into.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;

use gloo_timers::callback::Timeout;
use serde_json::Value;
use tracing::warn;
use wasm_bindgen::prelude::*;
use web_sys::{Element, Event, EventTarget, HtmlElement, HtmlInputElement, MouseEvent, NodeList, TouchEvent};

use crate::animation::AnimationPlayer;
use crate::config::InteractionConfig;
use crate::effect::{Effect, Effects, TimerKind, TimerTarget, TimerToken, Visual};
use crate::error::{Error, Result};
use crate::export::{DownloadUrlFactory, GifAssembler, GifCrateEncoder, GifRequest, GifSession, SystemClock};
use crate::geometry::{Point, Rect};
use crate::hook::{DataAttributes, Hook};
use crate::message::{EventSink, OutboundMessage};
use crate::scrubber::{ScrubInput, TimelineScrubber, TrackBounds};
use crate::selection::{FrameLayout, FrameRect, HitTarget, InputMode, PointerInput, SelectionController};
use crate::slider::{AnimatorRegistry, SpeedSlider, SPEED_DISPLAY_ID};

/// Attributes read from an element's `data-*` set.
const DATA_KEYS: [&str; 6] = [
    "animation-container",
    "frames",
    "selected-indices",
    "frame-timestamps",
    "animation-speed",
    "position",
];

const SELECTION_BOX_STYLE: &str = "position: fixed; border: 2px dashed #3b82f6; \
    background: rgba(59, 130, 246, 0.1); pointer-events: none; z-index: 1000;";

/// Whether the page should use the touch input family.
pub fn is_touch_capable() -> bool {
    let Some(window) = web_sys::window() else {
        return false;
    };
    js_sys::Reflect::has(&window, &JsValue::from_str("ontouchstart")).unwrap_or(false)
        || window.navigator().max_touch_points() > 0
}

pub fn read_data_attributes(element: &Element) -> DataAttributes {
    let mut attrs = DataAttributes::new();
    for key in DATA_KEYS {
        if let Some(value) = element.get_attribute(&format!("data-{key}")) {
            attrs.set(key, value);
        }
    }
    attrs
}

fn elements(list: NodeList) -> Vec<Element> {
    (0..list.length())
        .filter_map(|i| list.get(i))
        .filter_map(|node| node.dyn_into::<Element>().ok())
        .collect()
}

fn query_all(root: &Element, selector: &str) -> Vec<Element> {
    root.query_selector_all(selector).map(elements).unwrap_or_default()
}

fn frame_index_of(element: &Element) -> Option<usize> {
    element.get_attribute("data-frame-index")?.trim().parse().ok()
}

/// Frame cards under `root` with the index of their select button.
pub fn frame_cards(root: &Element) -> Vec<(usize, Element)> {
    query_all(root, ".frame-card")
        .into_iter()
        .filter_map(|card| {
            let index = frame_index_of(&card).or_else(|| {
                card.query_selector("[data-frame-index]")
                    .ok()
                    .flatten()
                    .and_then(|el| frame_index_of(&el))
            })?;
            Some((index, card))
        })
        .collect()
}

/// Client rectangles of every frame card, measured now.
pub fn frame_layout(root: &Element) -> Vec<FrameRect> {
    frame_cards(root)
        .into_iter()
        .map(|(index, card)| {
            let r = card.get_bounding_client_rect();
            FrameRect::new(index, Rect::new(r.left(), r.top(), r.right(), r.bottom()))
        })
        .collect()
}

/// Frame cards under an element, measured only when the controller asks.
struct DomLayout<'a>(&'a Element);

impl FrameLayout for DomLayout<'_> {
    fn frame_rects(&self) -> Vec<FrameRect> {
        frame_layout(self.0)
    }
}

/// Classify an event target for the selection controller.
pub fn resolve_hit(target: Option<EventTarget>, root: &Element, mode: InputMode) -> HitTarget {
    let Some(element) = target.and_then(|t| t.dyn_into::<Element>().ok()) else {
        return HitTarget::Outside;
    };
    let closest = |selector: &str| element.closest(selector).ok().flatten();

    if let Some(button) = closest(".frame-select-btn") {
        if let Some(index) = frame_index_of(&button) {
            return HitTarget::Frame(index);
        }
    }
    if let Some(card) = closest(".frame-card") {
        let index = frame_cards(root)
            .into_iter()
            .find(|(_, c)| c == &card)
            .map(|(index, _)| index);
        return match (index, mode, closest("button, a")) {
            (Some(index), InputMode::Touch, None) => HitTarget::Frame(index),
            (Some(index), _, _) => HitTarget::FrameAction(index),
            (None, _, _) => HitTarget::Outside,
        };
    }
    let node: &web_sys::Node = element.as_ref();
    if root.contains(Some(node)) {
        HitTarget::GridSpace
    } else {
        HitTarget::Outside
    }
}

fn set_classes(element: &Element, add: &str, remove: &str) {
    let list = element.class_list();
    let _ = list.remove_1(remove);
    let _ = list.add_1(add);
}

fn set_style(element: &HtmlElement, name: &str, value: &str) {
    let _ = element.style().set_property(name, value);
}

fn percent(position: f64) -> String {
    format!("{}%", position * 100.0)
}

/// Forwards outbound messages to a JS `pushEvent(name, payload)` function.
#[derive(Clone)]
pub struct JsEventSink(js_sys::Function);

impl JsEventSink {
    pub fn new(push_event: js_sys::Function) -> Self {
        Self(push_event)
    }
}

impl EventSink for JsEventSink {
    fn push_event(&mut self, event: &str, payload: Value) {
        let payload = js_sys::JSON::parse(&payload.to_string()).unwrap_or(JsValue::NULL);
        if let Err(e) = self.0.call2(&JsValue::NULL, &JsValue::from_str(event), &payload) {
            warn!(event, error = ?e, "push_event failed");
        }
    }
}

/// Elements the visuals write to, looked up when the component mounts or
/// the server re-renders.
#[derive(Default)]
struct DomView {
    frames: Vec<Element>,
    counter: Option<Element>,
    scrubber: Option<HtmlElement>,
    tooltip: Option<HtmlElement>,
    selection_box: Option<HtmlElement>,
}

impl DomView {
    fn scan(root: &HtmlElement) -> Self {
        let document = web_sys::window().and_then(|w| w.document());
        let counter = document.and_then(|d| {
            let id = root.id().replace("animation-container", "frame-counter");
            if id.is_empty() {
                None
            } else {
                d.get_element_by_id(&id)
            }
        });
        let html = |selector: &str| {
            root.query_selector(selector)
                .ok()
                .flatten()
                .and_then(|el| el.dyn_into::<HtmlElement>().ok())
        };
        Self {
            frames: query_all(root, "[data-frame-index]"),
            counter,
            scrubber: html(".timeline-scrubber"),
            tooltip: html(".timeline-tooltip"),
            selection_box: None,
        }
    }
}

struct Listener {
    target: EventTarget,
    event: &'static str,
    callback: Closure<dyn FnMut(Event)>,
}

struct Shared<C> {
    root: HtmlElement,
    component: RefCell<C>,
    view: RefCell<DomView>,
    timers: RefCell<BTreeMap<TimerKind, Timeout>>,
    flashes: RefCell<BTreeMap<u64, Timeout>>,
    next_flash: Cell<u64>,
    /// Timeout whose callback ran last. It cannot be dropped from inside
    /// its own callback, so it is released when the next one fires.
    spent: RefCell<Option<Timeout>>,
    listeners: RefCell<Vec<Listener>>,
    sink: JsEventSink,
}

impl<C> Shared<C> {
    fn retire(&self, fired: Option<Timeout>) {
        if let Some(fired) = fired {
            let previous = self.spent.replace(Some(fired));
            drop(previous);
        }
    }
}

/// One component bound to one element.
pub struct WebRuntime<C> {
    shared: Rc<Shared<C>>,
}

impl<C> Clone for WebRuntime<C> {
    fn clone(&self) -> Self {
        Self {
            shared: Rc::clone(&self.shared),
        }
    }
}

impl<C: TimerTarget + 'static> WebRuntime<C> {
    pub fn new(component: C, root: HtmlElement, push_event: js_sys::Function) -> Self {
        let view = DomView::scan(&root);
        Self {
            shared: Rc::new(Shared {
                root,
                component: RefCell::new(component),
                view: RefCell::new(view),
                timers: RefCell::new(BTreeMap::new()),
                flashes: RefCell::new(BTreeMap::new()),
                next_flash: Cell::new(0),
                spent: RefCell::new(None),
                listeners: RefCell::new(Vec::new()),
                sink: JsEventSink::new(push_event),
            }),
        }
    }

    pub fn root(&self) -> &HtmlElement {
        &self.shared.root
    }

    /// Look the visual targets up again after a re-render.
    pub fn rescan(&self) {
        let mut view = self.shared.view.borrow_mut();
        let selection_box = view.selection_box.take();
        *view = DomView::scan(&self.shared.root);
        view.selection_box = selection_box;
    }

    pub fn dispatch<F>(&self, f: F)
    where
        F: FnOnce(&mut C) -> Effects,
    {
        let effects = {
            let mut component = self.shared.component.borrow_mut();
            f(&mut component)
        };
        self.apply(effects);
    }

    /// Register a listener that lives until `DetachListeners`.
    pub fn listen<F>(&self, target: &EventTarget, event: &'static str, mut handler: F)
    where
        F: FnMut(&WebRuntime<C>, Event) + 'static,
    {
        let weak = Rc::downgrade(&self.shared);
        let callback = Closure::<dyn FnMut(Event)>::new(move |e: Event| {
            if let Some(shared) = weak.upgrade() {
                handler(&WebRuntime { shared }, e);
            }
        });
        match target.add_event_listener_with_callback(event, callback.as_ref().unchecked_ref()) {
            Ok(()) => self.shared.listeners.borrow_mut().push(Listener {
                target: target.clone(),
                event,
                callback,
            }),
            Err(e) => warn!(event, error = ?e, "addEventListener failed"),
        }
    }

    pub fn apply(&self, effects: Effects) {
        for effect in effects {
            match effect {
                Effect::Schedule {
                    kind,
                    token,
                    delay_ms,
                } => self.schedule(kind, token, delay_ms),
                Effect::Cancel(kind) => {
                    self.shared.timers.borrow_mut().remove(&kind);
                }
                Effect::Emit(message) => self.shared.sink.clone().push(&message),
                Effect::Visual(visual) => self.render(visual),
                Effect::DetachListeners => self.detach(),
            }
        }
    }

    fn schedule(&self, kind: TimerKind, token: TimerToken, delay_ms: u64) {
        let weak = Rc::downgrade(&self.shared);
        let timeout = Timeout::new(delay_ms.min(u32::MAX as u64) as u32, move || {
            let Some(shared) = weak.upgrade() else {
                return;
            };
            let fired = shared.timers.borrow_mut().remove(&kind);
            shared.retire(fired);
            WebRuntime { shared }.dispatch(|c| c.on_timer(kind, token));
        });
        self.shared.timers.borrow_mut().insert(kind, timeout);
    }

    fn detach(&self) {
        self.shared.timers.borrow_mut().clear();
        self.shared.flashes.borrow_mut().clear();
        for listener in self.shared.listeners.borrow_mut().drain(..) {
            let _ = listener
                .target
                .remove_event_listener_with_callback(listener.event, listener.callback.as_ref().unchecked_ref());
        }
        if let Some(selection_box) = self.shared.view.borrow_mut().selection_box.take() {
            selection_box.remove();
        }
    }

    fn render(&self, visual: Visual) {
        let root = &self.shared.root;
        let mut view = self.shared.view.borrow_mut();
        match visual {
            Visual::HideAllFrames => {
                for frame in &view.frames {
                    set_classes(frame, "opacity-0", "opacity-100");
                }
            }
            Visual::ShowFrame(index) => {
                if let Some(frame) = view.frames.get(index) {
                    set_classes(frame, "opacity-100", "opacity-0");
                }
            }
            Visual::HideFrame(index) => {
                if let Some(frame) = view.frames.get(index) {
                    set_classes(frame, "opacity-0", "opacity-100");
                }
            }
            Visual::Counter { position, total } => {
                if let Some(counter) = &view.counter {
                    counter.set_text_content(Some(&format!("{position}/{total}")));
                }
            }
            Visual::SelectionBox(rect) => {
                if view.selection_box.is_none() {
                    view.selection_box = create_selection_box();
                }
                if let Some(selection_box) = &view.selection_box {
                    set_style(selection_box, "left", &format!("{}px", rect.left));
                    set_style(selection_box, "top", &format!("{}px", rect.top));
                    set_style(selection_box, "width", &format!("{}px", rect.width()));
                    set_style(selection_box, "height", &format!("{}px", rect.height()));
                }
            }
            Visual::RemoveSelectionBox => {
                if let Some(selection_box) = view.selection_box.take() {
                    selection_box.remove();
                }
            }
            Visual::DragSelecting(indices) => {
                for (index, card) in frame_cards(root) {
                    let _ = card
                        .class_list()
                        .toggle_with_force("drag-selecting", indices.contains(&index));
                }
            }
            Visual::ClearDragSelecting => {
                for card in query_all(root, ".drag-selecting") {
                    let _ = card.class_list().remove_1("drag-selecting");
                }
            }
            Visual::Flash {
                frame_index,
                feedback,
                duration_ms,
            } => {
                let Some((_, card)) = frame_cards(root).into_iter().find(|(i, _)| *i == frame_index) else {
                    return;
                };
                let class = feedback.class_name();
                let _ = card.class_list().add_1(class);
                let id = self.shared.next_flash.get();
                self.shared.next_flash.set(id.wrapping_add(1));
                let weak = Rc::downgrade(&self.shared);
                let timeout = Timeout::new(duration_ms.min(u32::MAX as u64) as u32, move || {
                    let _ = card.class_list().remove_1(class);
                    if let Some(shared) = weak.upgrade() {
                        let fired = shared.flashes.borrow_mut().remove(&id);
                        shared.retire(fired);
                    }
                });
                self.shared.flashes.borrow_mut().insert(id, timeout);
            }
            Visual::Vibrate { duration_ms } => {
                if let Some(window) = web_sys::window() {
                    window
                        .navigator()
                        .vibrate_with_duration(duration_ms.min(u32::MAX as u64) as u32);
                }
            }
            Visual::ScrubberAt(position) => {
                if let Some(scrubber) = &view.scrubber {
                    set_style(scrubber, "left", &percent(position));
                }
            }
            Visual::TooltipAt(position) => {
                if let Some(tooltip) = &view.tooltip {
                    set_style(tooltip, "left", &percent(position));
                    set_style(tooltip, "opacity", "1");
                }
            }
            Visual::HideTooltip => {
                if let Some(tooltip) = &view.tooltip {
                    set_style(tooltip, "opacity", "0");
                }
            }
            Visual::Grabbing(on) => {
                let _ = root.class_list().toggle_with_force("cursor-grabbing", on);
            }
        }
    }
}

fn create_selection_box() -> Option<HtmlElement> {
    let document = web_sys::window()?.document()?;
    let element = document
        .create_element("div")
        .ok()?
        .dyn_into::<HtmlElement>()
        .ok()?;
    element.set_class_name("frame-selection-box");
    let _ = element.set_attribute("style", SELECTION_BOX_STYLE);
    document.body()?.append_child(&element).ok()?;
    Some(element)
}

fn point_of(event: &MouseEvent) -> Point {
    Point::new(event.client_x() as f64, event.client_y() as f64)
}

fn first_touch(event: &TouchEvent) -> Option<Point> {
    let touch = event.touches().get(0).or_else(|| event.changed_touches().get(0))?;
    Some(Point::new(touch.client_x() as f64, touch.client_y() as f64))
}

/// Yield control back to the browser event loop.
pub async fn yield_to_event_loop() {
    let promise = js_sys::Promise::new(&mut |resolve, _| {
        if let Some(window) = web_sys::window() {
            let _ = window.set_timeout_with_callback_and_timeout_and_arguments_0(&resolve, 0);
        } else {
            let _ = resolve.call0(&JsValue::NULL);
        }
    });
    let _ = wasm_bindgen_futures::JsFuture::from(promise).await;
}

/// Object URLs over in-memory `Blob`s.
#[derive(Clone, Copy, Debug, Default)]
pub struct BlobUrlFactory;

impl DownloadUrlFactory for BlobUrlFactory {
    fn create_url(&self, gif: &[u8]) -> Result<String> {
        let parts = js_sys::Array::new();
        parts.push(&js_sys::Uint8Array::from(gif));
        let options = web_sys::BlobPropertyBag::new();
        options.set_type("image/gif");
        let blob = web_sys::Blob::new_with_u8_array_sequence_and_options(&parts, &options)
            .map_err(|e| Error::encoder(format!("blob creation failed: {e:?}")))?;
        web_sys::Url::create_object_url_with_blob(&blob)
            .map_err(|e| Error::encoder(format!("object url failed: {e:?}")))
    }
}

thread_local! {
    /// Mounted animators by container id, for speed sliders.
    static ANIMATORS: AnimatorRegistry<Shared<AnimationPlayer>> = AnimatorRegistry::new();
}

/// Frame animation bound to an animation container.
#[wasm_bindgen]
pub struct AnimationHook {
    runtime: WebRuntime<AnimationPlayer>,
}

#[wasm_bindgen]
impl AnimationHook {
    #[wasm_bindgen(constructor)]
    pub fn new(el: HtmlElement, push_event: js_sys::Function) -> AnimationHook {
        AnimationHook {
            runtime: WebRuntime::new(AnimationPlayer::new(InteractionConfig::default()), el, push_event),
        }
    }

    pub fn mounted(&self) {
        let attrs = read_data_attributes(self.runtime.root());
        self.runtime.dispatch(|player| player.on_attach(&attrs));
        let id = self.runtime.root().id();
        if !id.is_empty() {
            ANIMATORS.with(|registry| registry.register(id, &self.runtime.shared));
        }
    }

    pub fn updated(&self) {
        self.runtime.rescan();
        let attrs = read_data_attributes(self.runtime.root());
        self.runtime.dispatch(|player| player.on_data_change(&attrs));
    }

    pub fn destroyed(&self) {
        let id = self.runtime.root().id();
        ANIMATORS.with(|registry| registry.unregister(&id, &self.runtime.shared));
        self.runtime.dispatch(|player| player.on_detach());
    }

    #[wasm_bindgen(js_name = setSpeed)]
    pub fn set_speed(&self, speed_ms: u32) {
        self.runtime.dispatch(|player| {
            player.set_speed(speed_ms as u64);
            Effects::new()
        });
    }

    pub fn toggle(&self) {
        self.runtime.dispatch(|player| player.toggle());
    }
}

/// Range input that sets the speed of the animator named by its
/// `data-animation-container` attribute.
#[wasm_bindgen]
pub struct SpeedSliderHook {
    runtime: WebRuntime<SpeedSlider>,
}

#[wasm_bindgen]
impl SpeedSliderHook {
    #[wasm_bindgen(constructor)]
    pub fn new(el: HtmlElement, push_event: js_sys::Function) -> SpeedSliderHook {
        SpeedSliderHook {
            runtime: WebRuntime::new(SpeedSlider::default(), el, push_event),
        }
    }

    pub fn mounted(&self) {
        let attrs = read_data_attributes(self.runtime.root());
        self.runtime.dispatch(|s| s.on_attach(&attrs));
        self.listen();
    }

    pub fn updated(&self) {
        let attrs = read_data_attributes(self.runtime.root());
        self.runtime.dispatch(|s| s.on_data_change(&attrs));
    }

    pub fn destroyed(&self) {
        self.runtime.dispatch(|s| s.on_detach());
    }
}

impl SpeedSliderHook {
    fn listen(&self) {
        let root: &EventTarget = self.runtime.root().as_ref();

        // keep presses on the slider from reaching the enclosing modal
        for event in ["mousedown", "mouseup", "click", "touchstart", "touchend"] {
            self.runtime.listen(root, event, |_, e| e.stop_propagation());
        }

        self.runtime.listen(root, "input", |rt, e| {
            e.stop_propagation();
            if let Some(speed) = Self::push_speed(rt, &e) {
                let display = web_sys::window()
                    .and_then(|w| w.document())
                    .and_then(|d| d.get_element_by_id(SPEED_DISPLAY_ID));
                if let Some(display) = display {
                    display.set_text_content(Some(&SpeedSlider::display_text(speed)));
                }
            }
        });

        self.runtime.listen(root, "change", |rt, e| {
            e.stop_propagation();
            Self::push_speed(rt, &e);
        });
    }

    /// Push the slider's value to its animator; returns the applied speed.
    fn push_speed(rt: &WebRuntime<SpeedSlider>, event: &Event) -> Option<u64> {
        let input = event.target()?.dyn_into::<HtmlInputElement>().ok()?;
        let speed = SpeedSlider::parse_value(&input.value())?;
        let animator = ANIMATORS.with(|registry| rt.shared.component.borrow().resolve(registry));
        if let Some(shared) = animator {
            WebRuntime { shared }.dispatch(|player| {
                player.set_speed(speed);
                Effects::new()
            });
        }
        Some(speed)
    }
}

/// Click, shift-click, drag box and long-press selection on a frame grid.
#[wasm_bindgen]
pub struct SelectionHook {
    runtime: WebRuntime<SelectionController>,
}

#[wasm_bindgen]
impl SelectionHook {
    #[wasm_bindgen(constructor)]
    pub fn new(el: HtmlElement, push_event: js_sys::Function) -> SelectionHook {
        let controller = SelectionController::new(
            InputMode::detect(is_touch_capable()),
            InteractionConfig::default(),
        );
        SelectionHook {
            runtime: WebRuntime::new(controller, el, push_event),
        }
    }

    pub fn mounted(&self) {
        let attrs = read_data_attributes(self.runtime.root());
        self.runtime.dispatch(|c| c.on_attach(&attrs));
        self.listen();
    }

    pub fn updated(&self) {
        self.runtime.rescan();
        let attrs = read_data_attributes(self.runtime.root());
        self.runtime.dispatch(|c| c.on_data_change(&attrs));
    }

    pub fn destroyed(&self) {
        self.runtime.dispatch(|c| c.on_detach());
    }
}

impl SelectionHook {
    fn listen(&self) {
        let root: &EventTarget = self.runtime.root().as_ref();
        self.runtime.listen(root, "dragstart", |_, e| e.prevent_default());

        let mode = InputMode::detect(is_touch_capable());
        if mode == InputMode::Touch {
            self.listen_touch(root);
        } else {
            self.listen_mouse(root);
        }
    }

    fn listen_mouse(&self, root: &EventTarget) {
        self.runtime.listen(root, "click", |rt, e| {
            let Some(mouse) = e.dyn_ref::<MouseEvent>() else { return };
            let target = resolve_hit(e.target(), rt.root(), InputMode::Desktop);
            if matches!(target, HitTarget::Frame(_)) {
                e.prevent_default();
                e.stop_propagation();
            }
            let input = PointerInput::Click {
                target,
                shift: mouse.shift_key(),
            };
            rt.dispatch(|c| c.handle(input, &Vec::<FrameRect>::new()));
        });

        self.runtime.listen(root, "mousedown", |rt, e| {
            let Some(mouse) = e.dyn_ref::<MouseEvent>() else { return };
            let target = resolve_hit(e.target(), rt.root(), InputMode::Desktop);
            if target == HitTarget::GridSpace {
                e.prevent_default();
            }
            let input = PointerInput::MouseDown {
                target,
                at: point_of(mouse),
            };
            rt.dispatch(|c| c.handle(input, &Vec::<FrameRect>::new()));
        });

        let Some(document) = web_sys::window().and_then(|w| w.document()) else {
            return;
        };
        let document: &EventTarget = document.as_ref();

        self.runtime.listen(document, "mousemove", |rt, e| {
            let Some(mouse) = e.dyn_ref::<MouseEvent>() else { return };
            let input = PointerInput::MouseMove { at: point_of(mouse) };
            rt.dispatch(|c| c.handle(input, &DomLayout(rt.root())));
        });

        self.runtime.listen(document, "mouseup", |rt, e| {
            let Some(mouse) = e.dyn_ref::<MouseEvent>() else { return };
            let input = PointerInput::MouseUp { at: point_of(mouse) };
            rt.dispatch(|c| c.handle(input, &DomLayout(rt.root())));
        });
    }

    fn listen_touch(&self, root: &EventTarget) {
        self.runtime.listen(root, "touchstart", |rt, e| {
            let Some(touch) = e.dyn_ref::<TouchEvent>() else { return };
            let target = resolve_hit(e.target(), rt.root(), InputMode::Touch);
            if matches!(target, HitTarget::Frame(_)) {
                e.prevent_default();
            }
            let at = first_touch(touch).unwrap_or_default();
            rt.dispatch(|c| c.handle(PointerInput::TouchStart { target, at }, &Vec::<FrameRect>::new()));
        });

        self.runtime.listen(root, "touchmove", |rt, e| {
            let Some(touch) = e.dyn_ref::<TouchEvent>() else { return };
            let at = first_touch(touch).unwrap_or_default();
            rt.dispatch(|c| c.handle(PointerInput::TouchMove { at }, &Vec::<FrameRect>::new()));
        });

        self.runtime.listen(root, "touchend", |rt, e| {
            e.prevent_default();
            rt.dispatch(|c| c.handle(PointerInput::TouchEnd, &Vec::<FrameRect>::new()));
        });
    }
}

/// Timeline track with a draggable handle.
#[wasm_bindgen]
pub struct ScrubberHook {
    runtime: WebRuntime<TimelineScrubber>,
}

#[wasm_bindgen]
impl ScrubberHook {
    #[wasm_bindgen(constructor)]
    pub fn new(el: HtmlElement, push_event: js_sys::Function) -> ScrubberHook {
        ScrubberHook {
            runtime: WebRuntime::new(TimelineScrubber::new(InteractionConfig::default()), el, push_event),
        }
    }

    pub fn mounted(&self) {
        let attrs = read_data_attributes(self.runtime.root());
        self.runtime.dispatch(|s| s.on_attach(&attrs));
        self.listen();
    }

    pub fn updated(&self) {
        self.runtime.rescan();
        let attrs = read_data_attributes(self.runtime.root());
        self.runtime.dispatch(|s| s.on_data_change(&attrs));
    }

    pub fn destroyed(&self) {
        self.runtime.dispatch(|s| s.on_detach());
    }
}

impl ScrubberHook {
    fn listen(&self) {
        fn track(root: &HtmlElement) -> TrackBounds {
            let r = root.get_bounding_client_rect();
            TrackBounds::new(r.left(), r.width())
        }

        fn feed(rt: &WebRuntime<TimelineScrubber>, input: ScrubInput) {
            let bounds = track(rt.root());
            rt.dispatch(|s| s.handle(input, bounds));
        }

        let root: &EventTarget = self.runtime.root().as_ref();

        self.runtime.listen(root, "mousedown", |rt, e| {
            let Some(mouse) = e.dyn_ref::<MouseEvent>() else { return };
            let primary = mouse.button() == 0;
            if primary {
                e.prevent_default();
            }
            feed(rt, ScrubInput::MouseDown {
                client_x: mouse.client_x() as f64,
                primary,
            });
        });

        self.runtime.listen(root, "mouseleave", |rt, _| feed(rt, ScrubInput::MouseLeave));

        self.runtime.listen(root, "touchstart", |rt, e| {
            let Some(touch) = e.dyn_ref::<TouchEvent>() else { return };
            let touches = touch.touches().length() as usize;
            if touches == 1 {
                e.prevent_default();
            }
            let client_x = first_touch(touch).map(|p| p.x).unwrap_or_default();
            feed(rt, ScrubInput::TouchStart { client_x, touches });
        });

        let Some(document) = web_sys::window().and_then(|w| w.document()) else {
            return;
        };
        let document: &EventTarget = document.as_ref();

        // moves outside the track still scrub while dragging
        self.runtime.listen(document, "mousemove", |rt, e| {
            let Some(mouse) = e.dyn_ref::<MouseEvent>() else { return };
            let inside = e
                .target()
                .and_then(|t| t.dyn_into::<web_sys::Node>().ok())
                .map(|node| rt.root().contains(Some(&node)))
                .unwrap_or(false);
            let dragging = rt.shared.component.borrow().is_dragging();
            if inside || dragging {
                feed(rt, ScrubInput::MouseMove {
                    client_x: mouse.client_x() as f64,
                });
            }
        });

        self.runtime.listen(document, "mouseup", |rt, e| {
            let Some(mouse) = e.dyn_ref::<MouseEvent>() else { return };
            feed(rt, ScrubInput::MouseUp {
                client_x: mouse.client_x() as f64,
            });
        });

        self.runtime.listen(document, "touchmove", |rt, e| {
            let Some(touch) = e.dyn_ref::<TouchEvent>() else { return };
            let touches = touch.touches().length() as usize;
            let Some(at) = first_touch(touch) else { return };
            if rt.shared.component.borrow().is_dragging() {
                e.prevent_default();
            }
            feed(rt, ScrubInput::TouchMove {
                client_x: at.x,
                touches,
            });
        });

        self.runtime.listen(document, "touchend", |rt, _| feed(rt, ScrubInput::TouchEnd));
    }
}

/// Client-side GIF generation for `start_gif_generation` requests.
#[wasm_bindgen]
pub struct GifHook {
    session: Rc<GifSession<SystemClock, BlobUrlFactory>>,
    sink: JsEventSink,
}

#[wasm_bindgen]
impl GifHook {
    #[wasm_bindgen(constructor)]
    pub fn new(push_event: js_sys::Function) -> GifHook {
        GifHook {
            session: Rc::new(GifSession::new(
                GifAssembler::from_config(SystemClock::default(), &InteractionConfig::default()),
                BlobUrlFactory,
            )),
            sink: JsEventSink::new(push_event),
        }
    }

    /// Report the encoder as ready, mirroring the load handshake the server
    /// expects on mount.
    pub fn mounted(&self) {
        self.session.announce_ready(&mut self.sink.clone());
    }

    /// Resolves once the result has been pushed.
    pub fn generate(&self, payload: JsValue) -> js_sys::Promise {
        let session = Rc::clone(&self.session);
        let mut sink = self.sink.clone();
        wasm_bindgen_futures::future_to_promise(async move {
            let request = js_sys::JSON::stringify(&payload)
                .map(String::from)
                .map_err(|e| Error::InvalidInput(format!("{e:?}")))
                .and_then(|json| GifRequest::from_json(&json));
            match request {
                Ok(request) => {
                    session
                        .generate(&request, &mut GifCrateEncoder::default(), &mut sink, yield_to_event_loop)
                        .await
                }
                Err(e) => sink.push(&OutboundMessage::gif_error(format!("GIF generation failed: {e}"))),
            }
            Ok(JsValue::UNDEFINED)
        })
    }
}
