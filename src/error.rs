//! Crate error type.

use thiserror::Error;

/// Errors surfaced by parsing and GIF assembly.
///
/// Interaction components never return these; they log and no-op instead.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("{}", encoding_message(.frame, .reason))]
    EncodingFailure { frame: Option<usize>, reason: String },

    #[error("GIF generation timed out after {} seconds", .limit_ms / 1000)]
    Timeout { limit_ms: u64 },

    #[error("Need at least {required} frame(s), got {actual}")]
    EmptySelection { required: usize, actual: usize },
}

fn encoding_message(frame: &Option<usize>, reason: &str) -> String {
    match frame {
        Some(index) => format!("Frame {index}: {reason}"),
        None => reason.to_string(),
    }
}

impl Error {
    pub(crate) fn frame(index: usize, reason: impl Into<String>) -> Self {
        Error::EncodingFailure {
            frame: Some(index),
            reason: reason.into(),
        }
    }

    pub(crate) fn encoder(reason: impl Into<String>) -> Self {
        Error::EncodingFailure {
            frame: None,
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::InvalidInput(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_display() {
        let err = Error::Timeout { limit_ms: 30_000 };
        assert_eq!(err.to_string(), "GIF generation timed out after 30 seconds");
    }

    #[test]
    fn encoding_failure_mentions_frame() {
        let err = Error::frame(3, "has empty data");
        assert_eq!(err.to_string(), "Frame 3: has empty data");

        let err = Error::encoder("writer closed");
        assert_eq!(err.to_string(), "writer closed");
    }

    #[test]
    fn from_json_error() {
        let json_err = serde_json::from_str::<Vec<u32>>("[1,").unwrap_err();
        let err = Error::from(json_err);
        assert!(matches!(err, Error::InvalidInput(_)));
    }
}
