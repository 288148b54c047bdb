//! # browser-ai-core
//!
//! Core types, messages, and error handling shared by the browser-ai crates.
//!
//! This crate provides the foundational types used throughout the workspace:
//!
//! - **Messages**: canonical chat messages with tagged multi-modal content
//! - **Errors**: the top-level error type for the facade
//! - **Usage**: token usage reported on `finish`
//! - **Settings**: per-call generation settings
//! - **Identifiers**: `call_`-prefixed tool call ids and stream part ids
//!
//! ## Example
//!
//! ```rust
//! use browser_ai_core::{
//!     messages::{ContentPart, Message},
//!     settings::CallSettings,
//!     identifier::generate_tool_call_id,
//! };
//!
//! let messages = vec![
//!     Message::system("You are a helpful assistant."),
//!     Message::user("What's the weather in NYC?"),
//! ];
//! assert_eq!(messages[1].text_content(), "What's the weather in NYC?");
//!
//! let settings = CallSettings::new().temperature(0.7).top_k(40);
//! assert_eq!(settings.top_k, Some(40));
//!
//! assert!(generate_tool_call_id().starts_with("call_"));
//! # let _ = ContentPart::text("hi");
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod errors;
pub mod identifier;
pub mod messages;
pub mod response;
pub mod settings;
pub mod usage;

// Re-exports for convenience
pub use errors::{BrowserAiError, Result};
pub use identifier::{generate_text_id, generate_tool_call_id};
pub use messages::{ContentPart, MediaData, Message, Role};
pub use response::{CallWarning, FinishReason};
pub use settings::{CallSettings, ToolChoice};
pub use usage::Usage;

/// Prelude module for common imports.
///
/// ```rust
/// use browser_ai_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::errors::{BrowserAiError, Result};
    pub use crate::identifier::{generate_text_id, generate_tool_call_id};
    pub use crate::messages::{ContentPart, MediaData, Message, Role};
    pub use crate::response::{CallWarning, FinishReason};
    pub use crate::settings::{CallSettings, ToolChoice};
    pub use crate::usage::Usage;
}
