//! ID generation utilities.
//!
//! This module provides functions for generating unique identifiers
//! for tool calls and stream parts.

use uuid::Uuid;

/// Generate a unique tool call ID.
///
/// Used whenever a parsed tool call does not carry its own `id`.
///
/// # Example
///
/// ```rust
/// use browser_ai_core::identifier::generate_tool_call_id;
///
/// let id = generate_tool_call_id();
/// assert!(id.starts_with("call_"));
/// assert_eq!(id.len(), 37); // "call_" + 32 hex chars
/// ```
#[must_use]
pub fn generate_tool_call_id() -> String {
    format!("call_{}", Uuid::new_v4().simple())
}

/// Generate a stable id for a text part (`text-start`/`text-delta`/`text-end`).
#[must_use]
pub fn generate_text_id() -> String {
    format!("text_{}", Uuid::new_v4().simple())
}
