//! Top-level error type for browser-ai.
//!
//! Each crate owns the errors for its own concern (session lifecycle,
//! generation, streaming). [`BrowserAiError`] is the umbrella the facade
//! converts them into so applications can match on one type.

use thiserror::Error;

/// The main error type for browser-ai operations.
#[derive(Error, Debug)]
pub enum BrowserAiError {
    /// The model capability does not exist in this runtime.
    #[error("Platform unavailable: {0}")]
    PlatformUnavailable(String),

    /// The capability exists but the model cannot be obtained right now.
    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    /// Session construction started but failed.
    #[error("Session initialization failed: {0}")]
    InitializationFailed(String),

    /// The platform rejected a prompt for a reason other than abort.
    #[error("Generation failed: {0}")]
    GenerationFailed(String),

    /// The call was aborted by the caller.
    #[error("Generation aborted")]
    Aborted,

    /// A feature the target platform cannot express.
    #[error("Unsupported functionality: {0}")]
    UnsupportedFunctionality(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl BrowserAiError {
    /// Whether retrying the same call later can succeed.
    ///
    /// A missing platform never recovers without a different runtime; a
    /// missing model or failed initialization may.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ModelUnavailable(_) | Self::InitializationFailed(_) | Self::GenerationFailed(_)
        )
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }
}

/// Result type alias using BrowserAiError.
pub type Result<T> = std::result::Result<T, BrowserAiError>;
