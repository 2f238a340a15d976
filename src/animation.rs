//! Animation player for cycling through a frame selection.

use tracing::debug;

use crate::config::InteractionConfig;
use crate::data::{FrameStore, SelectedIndices};
use crate::effect::{Effect, Effects, TimerKind, TimerSlot, TimerTarget, TimerToken, Visual};
use crate::hook::{DataAttributes, Hook};
use crate::interval::compute_intervals;

/// Current state of the player.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PlaybackState {
    /// Not started, not playable, or torn down
    #[default]
    Idle,
    /// A tick is scheduled
    Playing,
    /// Stopped on the current frame
    Paused,
}

/// Timer-driven player that shows one selected frame at a time.
///
/// The player does not own a timer. Every operation returns [`Effects`]:
/// visual transitions plus at most one scheduled [`TimerKind::AnimationTick`].
/// The host calls [`TimerTarget::on_timer`] when that tick fires, and the
/// player advances exactly one step in selection order and re-arms.
///
/// ## Example
///
/// ```rust
/// use flipbook_core_view::{AnimationPlayer, FrameStore, PlaybackState};
/// use flipbook_core_view::{Frame, ImageRef};
///
/// let frames = (0..3)
///     .map(|i| Frame::new(i, ImageRef::new(format!("{i}.jpg")), None))
///     .collect();
/// let store = FrameStore::new(frames, vec![0, 2], Vec::new());
///
/// let mut player = AnimationPlayer::default();
/// player.initialize(&store);
/// player.play();
/// assert_eq!(player.state(), PlaybackState::Playing);
/// assert_eq!(player.current_frame(), Some(0));
/// ```
#[derive(Clone, Debug)]
pub struct AnimationPlayer {
    config: InteractionConfig,
    selected: SelectedIndices,
    /// Delay after each position, aligned with `selected`; empty when no
    /// timestamps are known
    intervals: Vec<u64>,
    /// Uniform speed used when no timestamp intervals apply
    speed_ms: u64,
    /// Set by a mount-time override or `set_speed`; wins over intervals
    speed_explicit: bool,
    position: usize,
    state: PlaybackState,
    tick: TimerSlot,
}

impl AnimationPlayer {
    pub fn new(config: InteractionConfig) -> Self {
        let speed_ms = config.default_speed_ms.max(1);
        Self {
            config,
            selected: SelectedIndices::default(),
            intervals: Vec::new(),
            speed_ms,
            speed_explicit: false,
            position: 0,
            state: PlaybackState::Idle,
            tick: TimerSlot::new(),
        }
    }

    /// Load a new frame set, hide everything except the first selected
    /// frame and rewind to position 0.
    ///
    /// Any pending tick is cancelled and the player returns to `Idle`.
    pub fn initialize(&mut self, store: &FrameStore) -> Effects {
        let mut effects = Effects::new();
        if self.tick.is_pending() {
            self.tick.cancel(TimerKind::AnimationTick, &mut effects);
        }

        self.selected = store.selected().clone();
        self.position = 0;
        self.state = PlaybackState::Idle;

        match store.speed_override_ms() {
            Some(ms) => {
                self.speed_ms = ms;
                self.speed_explicit = true;
            }
            None => {
                self.speed_ms = self.config.default_speed_ms.max(1);
                self.speed_explicit = false;
            }
        }

        self.intervals = if self.selected.len() > 1 && store.has_timestamps() {
            compute_intervals(
                self.selected.as_slice(),
                store.timestamps(),
                &self.config.intervals,
            )
        } else {
            Vec::new()
        };

        effects.push(Effect::Visual(Visual::HideAllFrames));
        if let Some(first) = self.selected.get(0) {
            effects.push(Effect::Visual(Visual::ShowFrame(first)));
        }
        effects.push(Effect::Visual(Visual::Counter {
            position: 1,
            total: self.selected.len(),
        }));

        debug!(
            selected = self.selected.len(),
            intervals = ?self.intervals,
            speed_ms = self.speed_ms,
            "animation initialized"
        );
        effects
    }

    /// Start or resume playback.
    ///
    /// No-op when already playing or when fewer than two frames are selected.
    pub fn play(&mut self) -> Effects {
        let mut effects = Effects::new();
        if self.state == PlaybackState::Playing || !self.is_animatable() {
            return effects;
        }
        self.state = PlaybackState::Playing;
        self.tick
            .arm(TimerKind::AnimationTick, self.current_delay_ms(), &mut effects);
        effects
    }

    /// Pause on the current frame.
    pub fn pause(&mut self) -> Effects {
        let mut effects = Effects::new();
        if self.state != PlaybackState::Playing {
            return effects;
        }
        self.tick.cancel(TimerKind::AnimationTick, &mut effects);
        self.state = PlaybackState::Paused;
        effects
    }

    /// Toggle play/pause.
    pub fn toggle(&mut self) -> Effects {
        match self.state {
            PlaybackState::Playing => self.pause(),
            PlaybackState::Idle | PlaybackState::Paused => self.play(),
        }
    }

    /// Set a uniform speed for subsequent ticks.
    ///
    /// An already scheduled tick keeps its delay. Zero is ignored.
    pub fn set_speed(&mut self, speed_ms: u64) {
        if speed_ms == 0 {
            return;
        }
        self.speed_ms = speed_ms;
        self.speed_explicit = true;
    }

    /// Jump to a position within the selection.
    ///
    /// Out-of-range positions are ignored. While playing, the next tick is
    /// re-armed to fire one full interval from now.
    pub fn go_to_frame(&mut self, position: usize) -> Effects {
        let mut effects = Effects::new();
        if position >= self.selected.len() {
            return effects;
        }
        self.transition_to(position, &mut effects);
        if self.state == PlaybackState::Playing {
            self.tick
                .arm(TimerKind::AnimationTick, self.current_delay_ms(), &mut effects);
        }
        effects
    }

    /// Cancel any pending tick and drop listeners. Safe to call repeatedly.
    pub fn teardown(&mut self) -> Effects {
        let mut effects = Effects::new();
        self.tick.cancel(TimerKind::AnimationTick, &mut effects);
        effects.push(Effect::DetachListeners);
        self.state = PlaybackState::Idle;
        effects
    }

    #[inline]
    pub fn state(&self) -> PlaybackState {
        self.state
    }

    #[inline]
    pub fn is_playing(&self) -> bool {
        self.state == PlaybackState::Playing
    }

    /// Position within the selection.
    #[inline]
    pub fn position(&self) -> usize {
        self.position
    }

    /// Frame index currently visible.
    pub fn current_frame(&self) -> Option<usize> {
        self.selected.get(self.position)
    }

    #[inline]
    pub fn selected(&self) -> &SelectedIndices {
        &self.selected
    }

    #[inline]
    pub fn intervals(&self) -> &[u64] {
        &self.intervals
    }

    #[inline]
    pub fn speed_ms(&self) -> u64 {
        self.speed_ms
    }

    /// Delay before leaving the current position.
    pub fn current_delay_ms(&self) -> u64 {
        if self.speed_explicit {
            return self.speed_ms;
        }
        self.intervals
            .get(self.position)
            .copied()
            .unwrap_or(self.speed_ms)
    }

    fn is_animatable(&self) -> bool {
        self.selected.len() > 1
    }

    fn transition_to(&mut self, position: usize, effects: &mut Effects) {
        if let Some(current) = self.selected.get(self.position) {
            effects.push(Effect::Visual(Visual::HideFrame(current)));
        }
        self.position = position;
        if let Some(next) = self.selected.get(self.position) {
            effects.push(Effect::Visual(Visual::ShowFrame(next)));
        }
        effects.push(Effect::Visual(Visual::Counter {
            position: self.position + 1,
            total: self.selected.len(),
        }));
    }
}

impl Default for AnimationPlayer {
    fn default() -> Self {
        Self::new(InteractionConfig::default())
    }
}

impl TimerTarget for AnimationPlayer {
    fn on_timer(&mut self, kind: TimerKind, token: TimerToken) -> Effects {
        let mut effects = Effects::new();
        if kind != TimerKind::AnimationTick || !self.tick.fire(token) {
            return effects;
        }
        if self.state != PlaybackState::Playing || !self.is_animatable() {
            return effects;
        }

        let next = (self.position + 1) % self.selected.len();
        self.transition_to(next, &mut effects);
        self.tick
            .arm(TimerKind::AnimationTick, self.current_delay_ms(), &mut effects);
        effects
    }
}

impl Hook for AnimationPlayer {
    /// Parse the frame attributes and start playing when there is something
    /// to animate.
    fn on_attach(&mut self, attrs: &DataAttributes) -> Effects {
        let store = FrameStore::from_attributes(attrs);
        let mut effects = self.initialize(&store);
        effects.extend(self.play());
        effects
    }

    fn on_data_change(&mut self, attrs: &DataAttributes) -> Effects {
        self.on_attach(attrs)
    }

    fn on_detach(&mut self) -> Effects {
        self.teardown()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Frame, ImageRef};

    fn store(count: usize, selected: Vec<usize>, timestamps: Vec<Option<u64>>) -> FrameStore {
        let frames = (0..count)
            .map(|i| Frame::new(i, ImageRef::new(format!("{i}")), None))
            .collect();
        FrameStore::new(frames, selected, timestamps)
    }

    fn scheduled(effects: &Effects) -> Vec<(TimerToken, u64)> {
        effects
            .iter()
            .filter_map(|e| match e {
                Effect::Schedule {
                    kind: TimerKind::AnimationTick,
                    token,
                    delay_ms,
                } => Some((*token, *delay_ms)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_initialize_shows_first_selected() {
        let mut player = AnimationPlayer::default();
        let effects = player.initialize(&store(4, vec![2, 0, 3], Vec::new()));
        assert_eq!(
            effects,
            vec![
                Effect::Visual(Visual::HideAllFrames),
                Effect::Visual(Visual::ShowFrame(2)),
                Effect::Visual(Visual::Counter {
                    position: 1,
                    total: 3
                }),
            ]
        );
        assert_eq!(player.state(), PlaybackState::Idle);
        assert_eq!(player.current_frame(), Some(2));
    }

    #[test]
    fn test_single_frame_never_schedules() {
        for selected in [vec![], vec![1]] {
            let mut player = AnimationPlayer::default();
            let mut effects = player.initialize(&store(3, selected, vec![Some(0), Some(50), Some(90)]));
            effects.extend(player.play());
            effects.extend(player.toggle());
            effects.extend(player.go_to_frame(0));
            assert!(scheduled(&effects).is_empty());
            assert_eq!(player.state(), PlaybackState::Idle);
        }
    }

    #[test]
    fn test_tick_advances_cyclically() {
        let mut player = AnimationPlayer::default();
        player.initialize(&store(3, vec![0, 1, 2], Vec::new()));
        let effects = player.play();
        let (mut token, delay) = scheduled(&effects)[0];
        assert_eq!(delay, 150);

        let mut seen = Vec::new();
        for _ in 0..4 {
            let effects = player.on_timer(TimerKind::AnimationTick, token);
            seen.push(player.current_frame().unwrap());
            token = scheduled(&effects)[0].0;
        }
        assert_eq!(seen, vec![1, 2, 0, 1]);
    }

    #[test]
    fn test_play_twice_is_noop() {
        let mut player = AnimationPlayer::default();
        player.initialize(&store(3, vec![0, 1], Vec::new()));
        assert_eq!(scheduled(&player.play()).len(), 1);
        assert!(player.play().is_empty());
    }

    #[test]
    fn test_pause_keeps_frame_and_ignores_stale_tick() {
        let mut player = AnimationPlayer::default();
        player.initialize(&store(3, vec![0, 1, 2], Vec::new()));
        let token = scheduled(&player.play())[0].0;

        let effects = player.pause();
        assert_eq!(effects, vec![Effect::Cancel(TimerKind::AnimationTick)]);
        assert_eq!(player.state(), PlaybackState::Paused);

        assert!(player.on_timer(TimerKind::AnimationTick, token).is_empty());
        assert_eq!(player.current_frame(), Some(0));

        assert_eq!(scheduled(&player.play()).len(), 1);
        assert!(player.is_playing());
    }

    #[test]
    fn test_timestamp_intervals_drive_delays() {
        let mut player = AnimationPlayer::default();
        player.initialize(&store(
            3,
            vec![0, 1, 2],
            vec![Some(0), Some(60), Some(260)],
        ));
        assert_eq!(player.intervals(), &[60, 200, 130]);

        let (token, delay) = scheduled(&player.play())[0];
        assert_eq!(delay, 60);
        let effects = player.on_timer(TimerKind::AnimationTick, token);
        assert_eq!(scheduled(&effects)[0].1, 200);
    }

    #[test]
    fn test_set_speed_applies_to_next_tick_only() {
        let mut player = AnimationPlayer::default();
        player.initialize(&store(2, vec![0, 1], vec![Some(0), Some(80)]));
        let (token, delay) = scheduled(&player.play())[0];
        assert_eq!(delay, 80);

        player.set_speed(400);
        // nothing rescheduled by set_speed itself; the pending tick still fires
        let effects = player.on_timer(TimerKind::AnimationTick, token);
        assert_eq!(scheduled(&effects)[0].1, 400);

        player.set_speed(0);
        assert_eq!(player.speed_ms(), 400);
    }

    #[test]
    fn test_speed_override_from_store() {
        let mut player = AnimationPlayer::default();
        let s = store(2, vec![0, 1], vec![Some(0), Some(80)]).with_speed_override(Some(250));
        player.initialize(&s);
        assert_eq!(scheduled(&player.play())[0].1, 250);
    }

    #[test]
    fn test_go_to_frame() {
        let mut player = AnimationPlayer::default();
        player.initialize(&store(4, vec![3, 1, 0], Vec::new()));
        assert!(player.go_to_frame(3).is_empty());

        let effects = player.go_to_frame(2);
        assert_eq!(
            effects,
            vec![
                Effect::Visual(Visual::HideFrame(3)),
                Effect::Visual(Visual::ShowFrame(0)),
                Effect::Visual(Visual::Counter {
                    position: 3,
                    total: 3
                }),
            ]
        );

        let old = scheduled(&player.play())[0].0;
        let effects = player.go_to_frame(1);
        let rearmed = scheduled(&effects);
        assert_eq!(rearmed.len(), 1);
        assert!(effects.contains(&Effect::Cancel(TimerKind::AnimationTick)));
        assert!(player.on_timer(TimerKind::AnimationTick, old).is_empty());
        assert_eq!(player.current_frame(), Some(1));
    }

    #[test]
    fn test_teardown_idempotent() {
        let mut player = AnimationPlayer::default();
        player.initialize(&store(3, vec![0, 1], Vec::new()));
        let token = scheduled(&player.play())[0].0;

        for _ in 0..2 {
            let effects = player.teardown();
            assert_eq!(
                effects,
                vec![Effect::Cancel(TimerKind::AnimationTick), Effect::DetachListeners]
            );
            assert_eq!(player.state(), PlaybackState::Idle);
        }
        assert!(player.on_timer(TimerKind::AnimationTick, token).is_empty());
    }

    #[test]
    fn test_hook_attach_autoplays() {
        let attrs = DataAttributes::from_pairs([
            ("frames", r#"["a", "b", "c"]"#),
            ("selected-indices", "[0, 2]"),
            ("frame-timestamps", "[0, 100, 9000]"),
        ]);
        let mut player = AnimationPlayer::default();
        let effects = player.on_attach(&attrs);
        assert!(player.is_playing());
        assert_eq!(scheduled(&effects)[0].1, 150);
    }
}
