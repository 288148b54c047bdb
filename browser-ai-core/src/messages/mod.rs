//! Message types for model interactions.
//!
//! A conversation is a list of [`Message`]s. Each message has a [`Role`] and
//! a list of [`ContentPart`]s, a tagged variant covering text, media and the
//! tool call round-trip. Platform converters normalize from this one shape
//! instead of inspecting strings-or-arrays.
//!
//! ## Example
//!
//! ```rust
//! use browser_ai_core::messages::{ContentPart, MediaData, Message, Role};
//!
//! let msg = Message::user_parts(vec![
//!     ContentPart::text("What is in this picture?"),
//!     ContentPart::image(MediaData::base64("iVBORw0KGgo="), "image/png"),
//! ]);
//! assert_eq!(msg.role, Role::User);
//! assert!(msg.has_media());
//! ```

pub mod content;
pub mod message;

pub use content::{ContentPart, MediaData};
pub use message::{Message, Role};
