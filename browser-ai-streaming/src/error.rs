//! Streaming errors.

use thiserror::Error;

/// Failures of the platform stream, surfaced to consumers as an `error`
/// stream part.
///
/// Detector and parser problems never show up here: malformed model output
/// degrades to plain text.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StreamError {
    /// The platform token stream failed.
    #[error("{0}")]
    Platform(String),

    /// The platform aborted the stream on its own.
    #[error("Platform aborted the stream")]
    Aborted,
}

impl StreamError {
    /// Stream part carrying this error.
    #[must_use]
    pub fn to_part(&self) -> crate::StreamPart {
        crate::StreamPart::error(self)
    }
}

/// Result type for streaming operations.
pub type StreamResult<T> = Result<T, StreamError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StreamPart;

    #[test]
    fn test_error_part() {
        assert_eq!(
            StreamError::Platform("GPU device lost".into()).to_part(),
            StreamPart::error("GPU device lost")
        );
        assert_eq!(StreamError::Aborted.to_part().kind(), "error");
    }
}
