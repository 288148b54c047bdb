//! # browser-ai-models
//!
//! Chat models backed by in-browser language model runtimes.
//!
//! A runtime is described by two traits: [`LanguageModelPlatform`] checks
//! availability and constructs sessions, [`LanguageModelSession`] answers
//! prompts. On top of them this crate provides:
//!
//! - **[`SessionManager`]**: lazily creates one session, shares a single
//!   in-flight initialisation between concurrent callers, relays download
//!   progress, and tears the session down on request
//! - **[`BrowserChatModel`]**: the [`LanguageModel`] implementation, with
//!   message conversion per [`PlatformProfile`], tool calling through fenced
//!   JSON, and a streaming orchestrator emitting [`StreamPart`]s
//! - **[`MockPlatform`]**: a scripted platform for tests
//!
//! ## Example
//!
//! ```rust
//! use browser_ai_core::Message;
//! use browser_ai_models::{
//!     web_llm_profile, BrowserChatModel, CallOptions, LanguageModel, MockPlatform,
//! };
//! use std::sync::Arc;
//!
//! # tokio_test::block_on(async {
//! let platform = Arc::new(MockPlatform::new().with_tokens(["Hi!"]));
//! let model = BrowserChatModel::new("Llama-3.2-1B", platform, web_llm_profile());
//!
//! let result = model
//!     .do_generate(CallOptions::new(vec![Message::user("Hello")]))
//!     .await
//!     .unwrap();
//! assert_eq!(result.text(), "Hi!");
//! # });
//! ```
//!
//! [`StreamPart`]: browser_ai_streaming::StreamPart

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod convert;
pub mod error;
pub mod mock;
pub mod model;
pub mod options;
pub mod platform;
pub mod profile;
pub mod progress;
pub mod session;
pub mod stream;

// Re-exports
pub use convert::{collect_system, convert_messages, ConvertedPrompt};
pub use error::{ModelError, ModelResult, PlatformError, SessionError};
pub use mock::{MockPlatform, MockScript, MockSession, RecordedRequest};
pub use model::{BoxedModel, BrowserChatModel, CallOptions, GenerateResult, LanguageModel};
pub use options::{SessionOptions, INTERNAL_OPTION_KEYS};
pub use platform::{
    Availability, CreateSessionRequest, ExpectedInput, LanguageModelPlatform,
    LanguageModelSession, PlatformContent, PlatformMessage, PromptOptions, TokenStream,
};
pub use profile::{
    prompt_api_profile, transformers_profile, web_llm_profile, MessageStyle, PlatformKind,
    PlatformProfile, SystemPlacement,
};
pub use progress::{ProgressCallback, ProgressMonitor, ProgressReport, ProgressSink};
pub use session::{SessionHandle, SessionManager};
pub use stream::ChatStream;

/// Prelude for common imports.
pub mod prelude {
    pub use crate::error::{ModelError, ModelResult, SessionError};
    pub use crate::model::{BrowserChatModel, CallOptions, GenerateResult, LanguageModel};
    pub use crate::options::SessionOptions;
    pub use crate::platform::{
        Availability, LanguageModelPlatform, LanguageModelSession, PlatformMessage,
    };
    pub use crate::profile::{PlatformKind, PlatformProfile};
    pub use crate::progress::{ProgressCallback, ProgressSink};
    pub use crate::stream::ChatStream;
}
