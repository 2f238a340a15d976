//! Outbound messages pushed to the server-driven view.

use serde_json::{json, Value};

/// Status values carried by `gif_status_update`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GifStatus {
    /// Encoder is being prepared; sent once per mount
    EncoderLoading,
    EncoderReady,
    Generating,
    Error,
}

impl GifStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            // wire names predate the in-process encoder
            GifStatus::EncoderLoading => "loading_ffmpeg",
            GifStatus::EncoderReady => "ffmpeg_ready",
            GifStatus::Generating => "generating",
            GifStatus::Error => "error",
        }
    }
}

/// One event for the server's `handle_event`.
#[derive(Clone, Debug, PartialEq)]
pub enum OutboundMessage {
    SelectFrame {
        frame_index: usize,
        shift_key: bool,
    },
    SelectFrameRange {
        start_index: usize,
        end_index: usize,
        indices: Vec<usize>,
    },
    PreviewFrameSelection {
        indices: Vec<usize>,
    },
    TimelineScrub {
        position: f64,
    },
    TimelineClick {
        position: f64,
    },
    GifStatusUpdate {
        status: GifStatus,
        message: String,
    },
    GifGenerationComplete {
        download_url: String,
    },
}

impl OutboundMessage {
    /// Inclusive range between two indices in either order.
    ///
    /// ```rust
    /// use flipbook_core_view::OutboundMessage;
    ///
    /// let msg = OutboundMessage::range_between(7, 3);
    /// assert_eq!(
    ///     msg,
    ///     OutboundMessage::SelectFrameRange { start_index: 3, end_index: 7, indices: vec![3, 4, 5, 6, 7] }
    /// );
    /// ```
    pub fn range_between(a: usize, b: usize) -> Self {
        let (start_index, end_index) = (a.min(b), a.max(b));
        OutboundMessage::SelectFrameRange {
            start_index,
            end_index,
            indices: (start_index..=end_index).collect(),
        }
    }

    /// Range over an explicit index set; `None` when the set is empty.
    pub fn range_of(mut indices: Vec<usize>) -> Option<Self> {
        indices.sort_unstable();
        indices.dedup();
        let start_index = *indices.first()?;
        let end_index = *indices.last()?;
        Some(OutboundMessage::SelectFrameRange {
            start_index,
            end_index,
            indices,
        })
    }

    pub fn gif_error(message: impl Into<String>) -> Self {
        OutboundMessage::GifStatusUpdate {
            status: GifStatus::Error,
            message: message.into(),
        }
    }

    /// Event name as the server matches it.
    pub fn event_name(&self) -> &'static str {
        match self {
            OutboundMessage::SelectFrame { .. } => "select_frame",
            OutboundMessage::SelectFrameRange { .. } => "select_frame_range",
            OutboundMessage::PreviewFrameSelection { .. } => "preview_frame_selection",
            OutboundMessage::TimelineScrub { .. } => "timeline_scrub",
            OutboundMessage::TimelineClick { .. } => "timeline_click",
            OutboundMessage::GifStatusUpdate { .. } => "gif_status_update",
            OutboundMessage::GifGenerationComplete { .. } => "gif_generation_complete",
        }
    }

    /// Wire payload. Numbers and booleans travel as strings; the server
    /// parses every field from form-style params.
    pub fn payload(&self) -> Value {
        fn strings(indices: &[usize]) -> Vec<String> {
            indices.iter().map(usize::to_string).collect()
        }

        match self {
            OutboundMessage::SelectFrame {
                frame_index,
                shift_key,
            } => json!({
                "frame_index": frame_index.to_string(),
                "shift_key": shift_key.to_string(),
            }),
            OutboundMessage::SelectFrameRange {
                start_index,
                end_index,
                indices,
            } => json!({
                "start_index": start_index.to_string(),
                "end_index": end_index.to_string(),
                "indices": strings(indices),
            }),
            OutboundMessage::PreviewFrameSelection { indices } => json!({
                "indices": strings(indices),
            }),
            OutboundMessage::TimelineScrub { position } | OutboundMessage::TimelineClick { position } => {
                json!({ "position": position.to_string() })
            }
            OutboundMessage::GifStatusUpdate { status, message } => json!({
                "status": status.as_str(),
                "message": message,
            }),
            OutboundMessage::GifGenerationComplete { download_url } => json!({
                "download_url": download_url,
            }),
        }
    }
}

/// Write-only channel to the server-driven view.
pub trait EventSink {
    fn push_event(&mut self, event: &str, payload: Value);

    fn push(&mut self, message: &OutboundMessage) {
        self.push_event(message.event_name(), message.payload());
    }
}
