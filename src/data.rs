//! Core data structures for frame sequences and selections.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::hook::DataAttributes;
use crate::parser;

/// Opaque handle to a frame image (URL, path or inline base64 payload).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageRef(String);

impl ImageRef {
    pub fn new(handle: impl Into<String>) -> Self {
        Self(handle.into())
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A single frame received from the render layer.
///
/// Frames are immutable; a new render replaces the whole collection.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
    /// Position in the frame collection
    pub index: usize,
    /// Image handle
    pub image_ref: ImageRef,
    /// Capture timestamp in milliseconds, if known
    pub timestamp_ms: Option<u64>,
}

impl Frame {
    pub fn new(index: usize, image_ref: ImageRef, timestamp_ms: Option<u64>) -> Self {
        Self {
            index,
            image_ref,
            timestamp_ms,
        }
    }
}

/// Ordered, duplicate-free list of selected frame indices.
///
/// Order is playback order and is not necessarily ascending. Every value is
/// below the frame count the selection was validated against.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SelectedIndices(Vec<usize>);

impl SelectedIndices {
    /// Build a selection, dropping duplicates and indices `>= frame_count`.
    ///
    /// ```rust
    /// use flipbook_core_view::SelectedIndices;
    ///
    /// let selected = SelectedIndices::new(vec![4, 1, 4, 9], 5);
    /// assert_eq!(selected.as_slice(), &[4, 1]);
    /// ```
    pub fn new(indices: Vec<usize>, frame_count: usize) -> Self {
        let mut kept: Vec<usize> = Vec::with_capacity(indices.len());
        for index in indices {
            if index >= frame_count {
                warn!(index, frame_count, "selected index out of range, dropping");
            } else if kept.contains(&index) {
                warn!(index, "duplicate selected index, dropping");
            } else {
                kept.push(index);
            }
        }
        Self(kept)
    }

    #[inline]
    pub fn as_slice(&self) -> &[usize] {
        &self.0
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Frame index at a playback position.
    #[inline]
    pub fn get(&self, position: usize) -> Option<usize> {
        self.0.get(position).copied()
    }

    pub fn contains(&self, frame_index: usize) -> bool {
        self.0.contains(&frame_index)
    }
}

/// Parsed and validated frame metadata for one render.
///
/// `frame_count` counts every slot, including malformed entries that did not
/// yield a [`Frame`], so indices always match the rendered cards.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FrameStore {
    frames: Vec<Frame>,
    frame_count: usize,
    timestamps: Vec<Option<u64>>,
    selected: SelectedIndices,
    speed_override_ms: Option<u64>,
}

impl FrameStore {
    /// Build a store from already-parsed parts.
    ///
    /// The frame count is one past the highest frame index. An empty
    /// `timestamps` slice falls back to the frames' own timestamps.
    pub fn new(frames: Vec<Frame>, selected: Vec<usize>, timestamps: Vec<Option<u64>>) -> Self {
        let frame_count = frames.iter().map(|f| f.index + 1).max().unwrap_or(0);
        Self::with_frame_count(frames, frame_count, selected, timestamps)
    }

    /// Build a store from the slots returned by [`parser::parse_frames`].
    pub fn from_slots(slots: Vec<Option<Frame>>, selected: Vec<usize>, timestamps: Vec<Option<u64>>) -> Self {
        let frame_count = slots.len();
        Self::with_frame_count(slots.into_iter().flatten().collect(), frame_count, selected, timestamps)
    }

    fn with_frame_count(
        frames: Vec<Frame>,
        frame_count: usize,
        selected: Vec<usize>,
        timestamps: Vec<Option<u64>>,
    ) -> Self {
        let timestamps = if timestamps.is_empty() {
            let mut aligned = vec![None; frame_count];
            for frame in &frames {
                if let Some(slot) = aligned.get_mut(frame.index) {
                    *slot = frame.timestamp_ms;
                }
            }
            aligned
        } else {
            timestamps
        };
        let selected = SelectedIndices::new(selected, frame_count);
        Self {
            frames,
            frame_count,
            timestamps,
            selected,
            speed_override_ms: None,
        }
    }

    pub fn with_speed_override(mut self, speed_ms: Option<u64>) -> Self {
        self.speed_override_ms = speed_ms.filter(|ms| *ms > 0);
        self
    }

    /// Read the `frames`, `selected-indices`, `frame-timestamps` and
    /// `animation-speed` attributes.
    ///
    /// Attribute-level parse failures are logged and degrade to empty data.
    pub fn from_attributes(attrs: &DataAttributes) -> Self {
        let slots = attrs
            .get("frames")
            .map(parser::parse_frames)
            .transpose()
            .unwrap_or_else(|err| {
                warn!(%err, "unreadable frames attribute");
                None
            })
            .unwrap_or_default();

        let selected = attrs
            .get("selected-indices")
            .map(|json| parser::parse_selected_indices(json, slots.len()))
            .transpose()
            .unwrap_or_else(|err| {
                warn!(%err, "unreadable selected-indices attribute");
                None
            })
            .unwrap_or_default();

        let timestamps = attrs
            .get("frame-timestamps")
            .map(parser::parse_timestamps)
            .transpose()
            .unwrap_or_else(|err| {
                warn!(%err, "unreadable frame-timestamps attribute");
                None
            })
            .unwrap_or_default();

        let speed = attrs.get("animation-speed").and_then(parser::parse_speed);

        Self::from_slots(slots, selected.as_slice().to_vec(), timestamps).with_speed_override(speed)
    }

    /// Frames that parsed, in index order. Malformed slots are absent.
    #[inline]
    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    #[inline]
    pub fn frame_count(&self) -> usize {
        self.frame_count
    }

    #[inline]
    pub fn selected(&self) -> &SelectedIndices {
        &self.selected
    }

    /// Timestamps aligned with frame indices.
    #[inline]
    pub fn timestamps(&self) -> &[Option<u64>] {
        &self.timestamps
    }

    pub fn has_timestamps(&self) -> bool {
        self.timestamps.iter().any(Option::is_some)
    }

    #[inline]
    pub fn speed_override_ms(&self) -> Option<u64> {
        self.speed_override_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frames(n: usize) -> Vec<Frame> {
        (0..n)
            .map(|i| Frame::new(i, ImageRef::new(format!("f{i}.jpg")), None))
            .collect()
    }

    #[test]
    fn test_selection_keeps_order() {
        let selected = SelectedIndices::new(vec![3, 0, 2], 4);
        assert_eq!(selected.as_slice(), &[3, 0, 2]);
        assert_eq!(selected.get(0), Some(3));
        assert_eq!(selected.get(3), None);
        assert!(selected.contains(2));
        assert!(!selected.contains(1));
    }

    #[test]
    fn test_store_falls_back_to_frame_timestamps() {
        let mut fs = frames(2);
        fs[1].timestamp_ms = Some(80);
        let store = FrameStore::new(fs, vec![0, 1], Vec::new());
        assert_eq!(store.timestamps(), &[None, Some(80)]);
        assert!(store.has_timestamps());
    }

    #[test]
    fn test_store_from_attributes() {
        let attrs = DataAttributes::from_pairs([
            ("frames", r#"["a", "b", "c"]"#),
            ("selected-indices", "[0, 2, 5]"),
            ("frame-timestamps", "[0, 100, 9000]"),
            ("animation-speed", "200"),
        ]);
        let store = FrameStore::from_attributes(&attrs);
        assert_eq!(store.frame_count(), 3);
        assert_eq!(store.selected().as_slice(), &[0, 2]);
        assert_eq!(store.timestamps(), &[Some(0), Some(100), Some(9000)]);
        assert_eq!(store.speed_override_ms(), Some(200));
    }

    #[test]
    fn test_malformed_frame_keeps_its_slot() {
        let attrs = DataAttributes::from_pairs([
            ("frames", r#"["f0.jpg", 42, "f2.jpg", {"nothing": 1}]"#),
            ("selected-indices", "[0, 2, 3]"),
        ]);
        let store = FrameStore::from_attributes(&attrs);
        assert_eq!(store.frame_count(), 4);
        assert_eq!(store.selected().as_slice(), &[0, 2, 3]);
        let indices: Vec<_> = store.frames().iter().map(|f| (f.index, f.image_ref.as_str())).collect();
        assert_eq!(indices, vec![(0, "f0.jpg"), (2, "f2.jpg")]);
    }

    #[test]
    fn test_store_degrades_on_bad_attributes() {
        let attrs = DataAttributes::from_pairs([
            ("frames", "{oops"),
            ("selected-indices", "[0]"),
        ]);
        let store = FrameStore::from_attributes(&attrs);
        assert_eq!(store.frame_count(), 0);
        assert!(store.selected().is_empty());
        assert!(!store.has_timestamps());
    }
}
