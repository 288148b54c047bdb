//! # browser-ai - in-browser language models behind one chat interface
//!
//! browser-ai adapts in-process "browser-class" language model runtimes (the
//! browser's built-in prompt API, Transformers.js, WebLLM) to a single
//! streaming chat interface that speaks the AI SDK stream-part vocabulary.
//!
//! None of these runtimes have native function calling. browser-ai teaches
//! the model to answer with a fenced JSON block, detects that fence while
//! tokens stream in, and turns it into structured tool-call parts.
//!
//! ## Quick Start
//!
//! ```rust
//! use browser_ai::prelude::*;
//! use futures::StreamExt;
//! use std::sync::Arc;
//!
//! # tokio_test::block_on(async {
//! let platform = Arc::new(MockPlatform::new().with_tokens([
//!     "Let me check.\n```tool_call\n",
//!     "{\"name\": \"getWeather\", \"arguments\": {\"city\": \"NYC\"}}\n```",
//! ]));
//! let provider = BrowserAiProvider::web_llm(platform);
//! let model = provider.language_model("Llama-3.2-1B-Instruct-q4f16_1-MLC").unwrap();
//!
//! let options = CallOptions::new(vec![Message::user("Weather in NYC?")])
//!     .with_tools(vec![ToolDefinition::new("getWeather", "Current weather")]);
//! let parts: Vec<StreamPart> = model.do_stream(options).await.unwrap().collect().await;
//!
//! assert!(parts.iter().any(|p| matches!(p, StreamPart::ToolCall { .. })));
//! assert_eq!(parts.last().and_then(StreamPart::finish_reason), Some(FinishReason::ToolCalls));
//! # });
//! ```
//!
//! ## Architecture
//!
//! browser-ai is organized as a workspace of focused crates:
//!
//! - [`browser_ai_core`] - Messages, settings, usage, finish reasons, errors
//! - [`browser_ai_streaming`] - Fence detection and stream parts
//! - [`browser_ai_tools`] - Tool definitions, tool-call parsing, prompts
//! - [`browser_ai_models`] - Platform traits, sessions, the chat model
//! - [`browser_ai_providers`] - Provider factories, model cache, registry

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_code)]

pub mod direct;

/// Core types.
pub use browser_ai_core as core;

/// Model layer.
pub use browser_ai_models as models;

/// Providers.
pub use browser_ai_providers as providers;

/// Streaming.
pub use browser_ai_streaming as streaming;

/// Tools.
pub use browser_ai_tools as tools;

pub use browser_ai_core::{
    BrowserAiError, CallSettings, CallWarning, ContentPart, FinishReason, MediaData, Message,
    Role, ToolChoice, Usage,
};
pub use browser_ai_models::{
    Availability, BrowserChatModel, CallOptions, ChatStream, GenerateResult, LanguageModel,
    LanguageModelPlatform, LanguageModelSession, MockPlatform, ModelError, PlatformKind,
    ProgressCallback, SessionError, SessionManager, SessionOptions,
};
pub use browser_ai_providers::{BrowserAiProvider, ModelCache, ProviderConfig, ProviderRegistry};
pub use browser_ai_streaming::{FenceDetector, StreamPart};
pub use browser_ai_tools::{ToolCallParser, ToolDefinition};

/// Prelude for common imports.
pub mod prelude {
    pub use crate::direct::{generate_text, stream_text, ModelSpec};
    pub use browser_ai_core::prelude::*;
    pub use browser_ai_models::prelude::*;
    pub use browser_ai_models::MockPlatform;
    pub use browser_ai_providers::prelude::*;
    pub use browser_ai_streaming::{FenceDetector, StreamPart};
    pub use browser_ai_tools::prelude::*;
}
