//! Tunable constants for playback, gestures and GIF assembly.
//!
//! The defaults are empirical values that keep playback and gestures feeling
//! smooth. Every field can be overridden; missing fields keep their default.

use serde::{Deserialize, Serialize};

/// Clamping policy applied to per-transition animation delays.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntervalPolicy {
    /// Raw delays above this collapse to `fast_default_ms`
    pub cutover_ms: u64,
    /// Delay used for raw delays above the cutover
    pub fast_default_ms: u64,
    /// Lower bound for delays at or below the cutover
    pub min_ms: u64,
    /// Upper bound for delays at or below the cutover
    pub max_ms: u64,
    /// Raw delay used when no forward timestamp delta exists at all
    pub fallback_ms: u64,
}

impl Default for IntervalPolicy {
    fn default() -> Self {
        Self {
            cutover_ms: 500,
            fast_default_ms: 150,
            min_ms: 50,
            max_ms: 300,
            fallback_ms: 150,
        }
    }
}

impl IntervalPolicy {
    /// Apply the clamp policy to a raw delay.
    ///
    /// ```rust
    /// use flipbook_core_view::IntervalPolicy;
    ///
    /// let policy = IntervalPolicy::default();
    /// assert_eq!(policy.clamp(9000), 150);
    /// assert_eq!(policy.clamp(20), 50);
    /// assert_eq!(policy.clamp(420), 300);
    /// assert_eq!(policy.clamp(120), 120);
    /// ```
    pub fn clamp(&self, raw_ms: u64) -> u64 {
        if raw_ms > self.cutover_ms {
            self.fast_default_ms
        } else {
            raw_ms.clamp(self.min_ms, self.max_ms.max(self.min_ms))
        }
    }
}

/// All interaction tunables in one place.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InteractionConfig {
    pub intervals: IntervalPolicy,
    /// Playback speed when no timestamps and no override are present
    pub default_speed_ms: u64,
    /// Hold duration that turns a touch into a long-press
    pub long_press_ms: u64,
    /// Trailing debounce window for `timeline_scrub`
    pub scrub_debounce_ms: u64,
    /// Server position updates closer than this to the cached value are ignored
    pub position_epsilon: f64,
    /// Overall bound on GIF assembly
    pub gif_timeout_ms: u64,
    pub haptic_ms: u64,
    pub tap_feedback_ms: u64,
    pub long_press_feedback_ms: u64,
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            intervals: IntervalPolicy::default(),
            default_speed_ms: 150,
            long_press_ms: 500,
            scrub_debounce_ms: 50,
            position_epsilon: 1e-3,
            gif_timeout_ms: 30_000,
            haptic_ms: 50,
            tap_feedback_ms: 150,
            long_press_feedback_ms: 300,
        }
    }
}

impl InteractionConfig {
    /// Parse a TOML document into an `InteractionConfig`.
    #[cfg(feature = "toml")]
    pub fn from_toml_str(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }

    /// Parse a JSON document into an `InteractionConfig`.
    pub fn from_json_str(s: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(s)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_band() {
        let policy = IntervalPolicy::default();
        assert_eq!(policy.clamp(0), 50);
        assert_eq!(policy.clamp(50), 50);
        assert_eq!(policy.clamp(300), 300);
        assert_eq!(policy.clamp(500), 300);
        assert_eq!(policy.clamp(501), 150);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config =
            InteractionConfig::from_json_str(r#"{"long_press_ms": 650, "intervals": {"max_ms": 400}}"#)
                .unwrap();
        assert_eq!(config.long_press_ms, 650);
        assert_eq!(config.intervals.max_ms, 400);
        assert_eq!(config.intervals.cutover_ms, 500);
        assert_eq!(config.scrub_debounce_ms, 50);
    }

    #[cfg(feature = "toml")]
    #[test]
    fn toml_overrides() {
        let config = InteractionConfig::from_toml_str(
            "scrub_debounce_ms = 80\n[intervals]\nfast_default_ms = 120\n",
        )
        .unwrap();
        assert_eq!(config.scrub_debounce_ms, 80);
        assert_eq!(config.intervals.fast_default_ms, 120);
        assert_eq!(config.intervals.min_ms, 50);
    }
}
