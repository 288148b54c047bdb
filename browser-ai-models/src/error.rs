//! Model-related error types.

use browser_ai_core::BrowserAiError;
use browser_ai_streaming::StreamError;
use thiserror::Error;

/// Errors from obtaining a session.
///
/// `Clone` because one initialisation result is handed to every caller that
/// waited on it.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SessionError {
    /// The platform capability does not exist in this runtime.
    #[error("Platform unavailable: {0}")]
    PlatformUnavailable(String),

    /// The platform exists but reports the model as unavailable.
    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    /// The platform constructor failed.
    #[error("Session initialization failed: {0}")]
    InitializationFailed(String),
}

impl SessionError {
    /// Check if this error is retryable.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        !matches!(self, SessionError::PlatformUnavailable(_))
    }
}

/// Errors raised by platform implementations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct PlatformError {
    /// Error message.
    pub message: String,
    /// Whether the failure is the platform reporting an abort.
    pub is_abort: bool,
}

impl PlatformError {
    /// Create a platform error.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            is_abort: false,
        }
    }

    /// Create an abort error.
    pub fn aborted() -> Self {
        Self {
            message: "The operation was aborted".to_string(),
            is_abort: true,
        }
    }
}

/// Errors from a generate or stream call.
#[derive(Debug, Error)]
pub enum ModelError {
    /// No session could be obtained.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// The platform rejected the prompt.
    #[error("Generation failed: {0}")]
    GenerationFailed(String),

    /// The call was aborted.
    #[error("Request aborted")]
    Aborted,

    /// The platform cannot express part of the request.
    #[error("Unsupported functionality: {0}")]
    UnsupportedFunctionality(String),

    /// JSON serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ModelError {
    /// Create an unsupported functionality error.
    pub fn unsupported(functionality: impl Into<String>) -> Self {
        Self::UnsupportedFunctionality(functionality.into())
    }

    /// Check if this error is retryable.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            ModelError::Session(e) => e.is_retryable(),
            ModelError::GenerationFailed(_) => true,
            _ => false,
        }
    }
}

impl From<PlatformError> for ModelError {
    fn from(err: PlatformError) -> Self {
        if err.is_abort {
            ModelError::Aborted
        } else {
            ModelError::GenerationFailed(err.message)
        }
    }
}

impl From<PlatformError> for StreamError {
    fn from(err: PlatformError) -> Self {
        if err.is_abort {
            StreamError::Aborted
        } else {
            StreamError::Platform(err.message)
        }
    }
}

impl From<SessionError> for BrowserAiError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::PlatformUnavailable(m) => BrowserAiError::PlatformUnavailable(m),
            SessionError::ModelUnavailable(m) => BrowserAiError::ModelUnavailable(m),
            SessionError::InitializationFailed(m) => BrowserAiError::InitializationFailed(m),
        }
    }
}

impl From<ModelError> for BrowserAiError {
    fn from(err: ModelError) -> Self {
        match err {
            ModelError::Session(e) => e.into(),
            ModelError::GenerationFailed(m) => BrowserAiError::GenerationFailed(m),
            ModelError::Aborted => BrowserAiError::Aborted,
            ModelError::UnsupportedFunctionality(m) => BrowserAiError::UnsupportedFunctionality(m),
            ModelError::Serialization(e) => BrowserAiError::Serialization(e),
        }
    }
}

/// Result type for model operations.
pub type ModelResult<T> = Result<T, ModelError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_error_conversion() {
        assert!(matches!(
            ModelError::from(PlatformError::aborted()),
            ModelError::Aborted
        ));
        let err = ModelError::from(PlatformError::new("GPU lost"));
        assert_eq!(err.to_string(), "Generation failed: GPU lost");
        assert!(err.is_retryable());

        assert_eq!(StreamError::from(PlatformError::aborted()), StreamError::Aborted);
        assert_eq!(
            StreamError::from(PlatformError::new("GPU lost")).to_string(),
            "GPU lost"
        );
    }

    #[test]
    fn test_session_error_is_transparent() {
        let err = ModelError::from(SessionError::PlatformUnavailable("no window.ai".into()));
        assert_eq!(err.to_string(), "Platform unavailable: no window.ai");
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_into_browser_ai_error() {
        let err: BrowserAiError = ModelError::from(SessionError::ModelUnavailable("x".into())).into();
        assert!(matches!(err, BrowserAiError::ModelUnavailable(_)));
        let err: BrowserAiError = ModelError::Aborted.into();
        assert!(matches!(err, BrowserAiError::Aborted));
    }
}
