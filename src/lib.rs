//! # flipbook-core-view
//!
//! Interaction core for server-rendered frame viewers.
//!
//! This crate provides platform-agnostic state machines and logic for:
//! - Playing a frame selection with per-transition delays taken from
//!   capture timestamps
//! - Selecting frames by click, shift-click range, drag box and long-press
//! - Scrubbing a timeline with a debounced position stream
//! - Driving an animator's speed from a slider
//! - Assembling captured frames into an animated GIF
//!
//! Components never touch timers or the DOM. Each transition returns
//! [`Effects`] that a host applies: [`Simulation`] on a logical clock, or
//! the browser runtime behind the `web` feature.
//!
//! ## Features
//!
//! - `toml` - Load [`InteractionConfig`] from TOML
//! - `web` - DOM runtime, `setTimeout` timers and `wasm-bindgen` hook handles
//!
//! ## Example
//!
//! ```rust
//! use flipbook_core_view::{AnimationPlayer, DataAttributes, Hook, Simulation};
//!
//! let attrs = DataAttributes::from_pairs([
//!     ("frames", r#"["f0.jpg", "f1.jpg", "f2.jpg"]"#),
//!     ("selected-indices", "[0, 2]"),
//!     ("frame-timestamps", "[0, 100, 9000]"),
//! ]);
//!
//! let mut sim = Simulation::new(AnimationPlayer::default());
//! sim.dispatch(|player| player.on_attach(&attrs));
//! sim.advance_by(300);
//!
//! assert_eq!(sim.visible_frames(), vec![0]);
//! ```

mod animation;
mod config;
mod data;
mod effect;
mod error;
mod export;
mod geometry;
mod hook;
mod interval;
mod message;
pub mod parser;
mod scrubber;
mod selection;
mod sim;
mod slider;

#[cfg(feature = "web")]
pub mod web;

pub use animation::{AnimationPlayer, PlaybackState};
pub use config::{InteractionConfig, IntervalPolicy};
pub use data::{Frame, FrameStore, ImageRef, SelectedIndices};
pub use effect::{Effect, Effects, Feedback, TimerKind, TimerSlot, TimerTarget, TimerToken, Visual};
pub use error::{Error, Result};
pub use export::{
    Clock, DataUrlFactory, DownloadUrlFactory, FrameEncoder, GifAssembler, GifCrateEncoder, GifOptions,
    GifRequest, GifRequestFrame, GifRequestOptions, GifSession, HeightField, ImageSource, ManualClock,
    QualityTier, SystemClock, TargetHeight,
};
pub use geometry::{Point, Rect};
pub use hook::{DataAttributes, Hook};
pub use interval::compute_intervals;
pub use message::{EventSink, GifStatus, OutboundMessage};
pub use scrubber::{ScrubInput, TimelineScrubber, TrackBounds};
pub use selection::{
    frames_in, FrameLayout, FrameRect, FrameTouchHandler, GestureState, HitTarget, InputMode, PointerInput,
    SelectionContext, SelectionController, TouchState,
};
pub use sim::{RecordingSink, Simulation};
pub use slider::{AnimatorRegistry, SpeedSlider, SPEED_DISPLAY_ID};
