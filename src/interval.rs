//! Per-transition playback delays derived from frame timestamps.

use crate::config::IntervalPolicy;

/// Compute one delay per transition of `selected`, in playback order.
///
/// Entry `i` is the delay from `selected[i]` to its successor, wrapping from
/// the last position to the first. A transition whose timestamps are missing
/// or do not move forward takes the rounded average of all valid forward
/// deltas in the selection, or `policy.fallback_ms` when there are none.
/// Every raw delay then goes through [`IntervalPolicy::clamp`].
///
/// Returns an empty list for selections shorter than two frames.
///
/// ## Example
///
/// ```rust
/// use flipbook_core_view::{compute_intervals, IntervalPolicy};
///
/// let timestamps = [Some(0), Some(100), Some(9000)];
/// let delays = compute_intervals(&[0, 2], &timestamps, &IntervalPolicy::default());
/// assert_eq!(delays, vec![150, 150]);
///
/// let delays = compute_intervals(&[0, 1], &timestamps, &IntervalPolicy::default());
/// assert_eq!(delays, vec![100, 100]);
/// ```
pub fn compute_intervals(
    selected: &[usize],
    timestamps: &[Option<u64>],
    policy: &IntervalPolicy,
) -> Vec<u64> {
    let n = selected.len();
    if n < 2 {
        return Vec::new();
    }

    let timestamp_at = |position: usize| timestamps.get(selected[position]).copied().flatten();

    let raw: Vec<Option<u64>> = (0..n)
        .map(|i| match (timestamp_at(i), timestamp_at((i + 1) % n)) {
            (Some(current), Some(next)) if next > current => Some(next - current),
            _ => None,
        })
        .collect();

    let valid: Vec<u64> = raw.iter().flatten().copied().collect();
    let substitute = if valid.is_empty() {
        policy.fallback_ms
    } else {
        let sum: u128 = valid.iter().map(|d| *d as u128).sum();
        (sum as f64 / valid.len() as f64).round() as u64
    };

    raw.into_iter()
        .map(|delay| policy.clamp(delay.unwrap_or(substitute)))
        .collect()
}
