//! The seam between the model layer and an in-browser runtime.
//!
//! A [`LanguageModelPlatform`] checks availability and constructs sessions;
//! a [`LanguageModelSession`] answers prompts, either whole or as a stream
//! of text fragments.

use crate::error::PlatformError;
use crate::progress::ProgressMonitor;
use async_trait::async_trait;
use browser_ai_core::{MediaData, Role};
use futures::Stream;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::pin::Pin;
use std::sync::Arc;

/// Whether a model can be used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Availability {
    /// The model cannot be used here.
    Unavailable,
    /// The model must be downloaded first.
    Downloadable,
    /// The model is being downloaded.
    Downloading,
    /// The model is ready.
    Available,
}

impl Availability {
    /// Whether a session can be created, possibly after a download.
    #[must_use]
    pub fn is_usable(&self) -> bool {
        !matches!(self, Availability::Unavailable)
    }
}

/// One piece of platform message content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum PlatformContent {
    /// Text.
    Text(String),
    /// An image.
    Image(MediaData),
    /// An audio clip.
    Audio(MediaData),
}

/// A message in the shape the runtime consumes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformMessage {
    /// Speaker. Never `tool`; tool results are sent as user text.
    pub role: Role,
    /// Content parts.
    pub content: Vec<PlatformContent>,
}

impl PlatformMessage {
    /// Create a text message.
    pub fn text(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            content: vec![PlatformContent::Text(text.into())],
        }
    }

    /// Create a system message.
    pub fn system(text: impl Into<String>) -> Self {
        Self::text(Role::System, text)
    }

    /// Concatenated text content.
    #[must_use]
    pub fn text_content(&self) -> String {
        self.content
            .iter()
            .filter_map(|c| match c {
                PlatformContent::Text(t) => Some(t.as_str()),
                _ => None,
            })
            .collect()
    }
}

/// Everything a platform needs to construct a session.
#[derive(Debug, Clone, Default)]
pub struct CreateSessionRequest {
    /// Messages the session starts with (the system prompt, if any).
    pub initial_prompts: Vec<PlatformMessage>,
    /// Sampling temperature.
    pub temperature: Option<f64>,
    /// Top-k sampling.
    pub top_k: Option<u64>,
    /// Media kinds the caller intends to send.
    pub expected_inputs: Vec<ExpectedInput>,
    /// Platform-specific options, passed through untouched.
    pub extra: Map<String, JsonValue>,
    /// Relay for download progress.
    pub monitor: Option<ProgressMonitor>,
}

/// A media kind a session should be prepared for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpectedInput {
    /// Text.
    Text,
    /// Images.
    Image,
    /// Audio.
    Audio,
}

/// Per-prompt generation options.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PromptOptions {
    /// Sampling temperature.
    pub temperature: Option<f64>,
    /// Top-k sampling.
    pub top_k: Option<u64>,
    /// Top-p sampling.
    pub top_p: Option<f64>,
    /// Maximum tokens to generate.
    pub max_output_tokens: Option<u64>,
    /// Stop sequences.
    pub stop_sequences: Vec<String>,
}

/// Stream of text fragments from a session.
pub type TokenStream = Pin<Box<dyn Stream<Item = Result<String, PlatformError>> + Send>>;

/// A live model session.
#[async_trait]
pub trait LanguageModelSession: Send + Sync {
    /// Answer a prompt in one piece.
    async fn prompt(
        &self,
        messages: Vec<PlatformMessage>,
        options: PromptOptions,
    ) -> Result<String, PlatformError>;

    /// Answer a prompt as a stream of fragments.
    ///
    /// Dropping the stream cancels generation.
    async fn prompt_streaming(
        &self,
        messages: Vec<PlatformMessage>,
        options: PromptOptions,
    ) -> Result<TokenStream, PlatformError>;

    /// Whether [`destroy`](Self::destroy) releases anything.
    fn supports_destroy(&self) -> bool {
        false
    }

    /// Release the session's resources.
    async fn destroy(&self) -> Result<(), PlatformError> {
        Ok(())
    }

    /// Tokens consumed by the session's context so far.
    fn input_usage(&self) -> Option<u64> {
        None
    }
}

/// An in-browser model runtime.
#[async_trait]
pub trait LanguageModelPlatform: Send + Sync {
    /// Runtime name, for logs and errors.
    fn name(&self) -> &str;

    /// Whether the runtime exists in this environment.
    fn is_supported(&self) -> bool;

    /// Check whether a session with `options` could be created.
    async fn availability(
        &self,
        options: &crate::options::SessionOptions,
    ) -> Result<Availability, PlatformError>;

    /// Construct a session. Called at most once per initialisation.
    async fn create_session(
        &self,
        request: CreateSessionRequest,
    ) -> Result<Arc<dyn LanguageModelSession>, PlatformError>;

    /// Whether sessions accept media input.
    fn supports_media(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_availability_wire() {
        assert_eq!(
            serde_json::to_string(&Availability::Downloadable).unwrap(),
            "\"downloadable\""
        );
        assert!(Availability::Downloading.is_usable());
        assert!(!Availability::Unavailable.is_usable());
    }

    #[test]
    fn test_platform_message_text() {
        let msg = PlatformMessage {
            role: Role::User,
            content: vec![
                PlatformContent::Text("look at ".into()),
                PlatformContent::Image(MediaData::Url(
                    "https://example.com/a.png".parse().unwrap(),
                )),
                PlatformContent::Text("this".into()),
            ],
        };
        assert_eq!(msg.text_content(), "look at this");
        assert_eq!(
            serde_json::to_value(PlatformMessage::system("hi")).unwrap()["content"][0]["type"],
            "text"
        );
    }
}
