//! Parsing of the inbound data attributes supplied by the render layer.
//!
//! Whole-attribute failures (not JSON, not an array) are returned as
//! [`Error::InvalidInput`]. Individual malformed entries are skipped and
//! logged so one bad frame never takes the interaction loop down.

use serde_json::Value;
use tracing::warn;

use crate::{Error, Frame, ImageRef, Result, SelectedIndices};

/// Keys probed, in order, for a frame's image handle.
const IMAGE_KEYS: [&str; 6] = ["image_ref", "image_data", "image_url", "url", "src", "path"];
/// Keys probed, in order, for a frame's capture timestamp.
const TIMESTAMP_KEYS: [&str; 2] = ["timestamp_ms", "timestamp"];

fn parse_array(json: &str, attribute: &str) -> Result<Vec<Value>> {
    match serde_json::from_str::<Value>(json)? {
        Value::Array(items) => Ok(items),
        other => Err(Error::InvalidInput(format!(
            "{attribute}: expected a JSON array, got {}",
            kind_of(&other)
        ))),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Read a non-negative integer, accepting integral floats and numeric strings.
fn as_index(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64().or_else(|| {
            n.as_f64()
                .filter(|f| *f >= 0.0 && f.fract() == 0.0 && f.is_finite())
                .map(|f| f as u64)
        }),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    }
}

/// Read a non-negative millisecond timestamp, rounding fractional values.
fn as_timestamp(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64().or_else(|| {
            n.as_f64()
                .filter(|f| *f >= 0.0 && f.is_finite())
                .map(|f| f.round() as u64)
        }),
        Value::String(s) => s.trim().parse::<f64>().ok().and_then(|f| {
            (f >= 0.0 && f.is_finite()).then(|| f.round() as u64)
        }),
        _ => None,
    }
}

/// Parse the `frames` attribute into one slot per non-null entry.
///
/// Entries may be bare strings (the image handle itself) or objects carrying
/// one of the known image keys and an optional timestamp. `null` entries are
/// dropped and do not take a slot. A malformed entry keeps its slot as `None`
/// so later frames stay aligned with the server's `data-frame-index`.
///
/// ```rust
/// use flipbook_core_view::parser::parse_frames;
///
/// let slots = parse_frames(r#"["a.jpg", null, 42, {"image_url": "b.jpg", "timestamp_ms": 40}]"#).unwrap();
/// assert_eq!(slots.len(), 3);
/// assert!(slots[1].is_none());
/// let last = slots[2].as_ref().unwrap();
/// assert_eq!(last.index, 2);
/// assert_eq!(last.timestamp_ms, Some(40));
/// ```
pub fn parse_frames(json: &str) -> Result<Vec<Option<Frame>>> {
    let items = parse_array(json, "frames")?;
    let mut slots = Vec::with_capacity(items.len());

    for (position, item) in items.iter().enumerate() {
        let index = slots.len();
        let frame = match item {
            Value::Null => continue,
            Value::String(handle) => Some(Frame::new(index, ImageRef::new(handle.clone()), None)),
            Value::Object(fields) => {
                let image = IMAGE_KEYS
                    .iter()
                    .find_map(|key| fields.get(*key).and_then(Value::as_str));
                match image {
                    Some(image) => {
                        let timestamp = TIMESTAMP_KEYS
                            .iter()
                            .find_map(|key| fields.get(*key).and_then(as_timestamp));
                        Some(Frame::new(index, ImageRef::new(image), timestamp))
                    }
                    None => {
                        warn!(position, index, "frame entry has no image handle, skipping");
                        None
                    }
                }
            }
            other => {
                warn!(position, index, kind = kind_of(other), "malformed frame entry, skipping");
                None
            }
        };
        slots.push(frame);
    }

    Ok(slots)
}

/// Parse the `selected-indices` attribute against `frame_count`.
///
/// Out-of-range, negative, non-numeric and duplicate entries are dropped;
/// the first occurrence of an index keeps its place in playback order.
pub fn parse_selected_indices(json: &str, frame_count: usize) -> Result<SelectedIndices> {
    let items = parse_array(json, "selected-indices")?;
    let mut indices = Vec::with_capacity(items.len());

    for item in &items {
        match as_index(item) {
            Some(index) => indices.push(index as usize),
            None => warn!(value = %item, "non-index entry in selected indices, skipping"),
        }
    }

    Ok(SelectedIndices::new(indices, frame_count))
}

/// Parse the `frame-timestamps` attribute.
///
/// The result is aligned with frame indices; missing or invalid entries are
/// `None` so the interval calculator can substitute a fallback.
pub fn parse_timestamps(json: &str) -> Result<Vec<Option<u64>>> {
    let items = parse_array(json, "frame-timestamps")?;
    Ok(items
        .iter()
        .map(|item| {
            let ts = as_timestamp(item);
            if ts.is_none() && !item.is_null() {
                warn!(value = %item, "invalid frame timestamp");
            }
            ts
        })
        .collect())
}

/// Parse a positive millisecond speed; zero and garbage yield `None`.
pub fn parse_speed(raw: &str) -> Option<u64> {
    raw.trim().parse::<u64>().ok().filter(|ms| *ms > 0)
}

/// Parse a scrub position; garbage and non-finite values yield `None`.
pub fn parse_position(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|p| p.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_frames_mixed() {
        let slots = parse_frames(
            r#"[{"image_data": "AAA", "timestamp": 12.6}, null, 42, {"nothing": 1}, "b.png"]"#,
        )
        .unwrap();
        assert_eq!(slots.len(), 4);
        let first = slots[0].as_ref().unwrap();
        assert_eq!(first.image_ref.as_str(), "AAA");
        assert_eq!(first.timestamp_ms, Some(13));
        assert!(slots[1].is_none());
        assert!(slots[2].is_none());
        let last = slots[3].as_ref().unwrap();
        assert_eq!(last.index, 3);
        assert_eq!(last.image_ref.as_str(), "b.png");
    }

    #[test]
    fn test_malformed_entry_keeps_later_indices() {
        let slots = parse_frames(r#"["f0.jpg", 42, "f2.jpg"]"#).unwrap();
        let indices: Vec<_> = slots.iter().flatten().map(|f| (f.index, f.image_ref.as_str())).collect();
        assert_eq!(indices, vec![(0, "f0.jpg"), (2, "f2.jpg")]);
    }

    #[test]
    fn test_parse_frames_not_array() {
        let result = parse_frames(r#"{"frames": []}"#);
        assert!(matches!(result, Err(Error::InvalidInput(_))));

        let result = parse_frames("not json");
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_parse_selected_indices_validates() {
        let selected = parse_selected_indices(r#"[2, 0, 2, 7, -1, "1", 1.5]"#, 3).unwrap();
        assert_eq!(selected.as_slice(), &[2, 0, 1]);
    }

    #[test]
    fn test_parse_timestamps() {
        let ts = parse_timestamps(r#"[0, null, 100.4, "250", -5, "x"]"#).unwrap();
        assert_eq!(ts, vec![Some(0), None, Some(100), Some(250), None, None]);
    }

    #[test]
    fn test_parse_scalars() {
        assert_eq!(parse_speed("200"), Some(200));
        assert_eq!(parse_speed("0"), None);
        assert_eq!(parse_speed("fast"), None);
        assert_eq!(parse_position(" 0.25 "), Some(0.25));
        assert_eq!(parse_position("NaN"), None);
    }
}
