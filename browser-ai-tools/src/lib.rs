//! # browser-ai-tools
//!
//! Tool calling for models without a function-calling API.
//!
//! Tools are described to the model in its system prompt, and the model
//! answers with a fenced JSON block. This crate provides both halves:
//!
//! - **[`build_tool_system_prompt`]**: render [`ToolDefinition`]s and the fence
//!   format into a system prompt
//! - **[`ToolCallParser`]**: extract [`ToolCallRecord`]s and the remaining prose
//!   from a complete response
//! - **[`format_tool_results`]**: hand tool results back on the next turn
//!
//! ## Example
//!
//! ```rust
//! use browser_ai_tools::ToolCallParser;
//!
//! let response = "Let me check.\n```tool_call\n{\"name\": \"getWeather\", \"arguments\": {\"city\": \"NYC\"}}\n```";
//! let parsed = ToolCallParser::new().parse(response);
//!
//! assert_eq!(parsed.tool_calls[0].tool_name, "getWeather");
//! assert_eq!(parsed.tool_calls[0].args["city"], "NYC");
//! assert_eq!(parsed.text_content, "Let me check.");
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod definition;
pub mod parser;
pub mod prompt;

// Re-exports
pub use definition::{ObjectJsonSchema, ToolDefinition};
pub use parser::{parse_fence_payload, ParsedResponse, ToolCallParser, ToolCallRecord};
pub use prompt::{
    build_tool_system_prompt, build_tool_system_prompt_with, format_tool_results,
    TOOL_RESULT_MARKER,
};

/// Prelude for common imports.
pub mod prelude {
    pub use crate::definition::{ObjectJsonSchema, ToolDefinition};
    pub use crate::parser::{ParsedResponse, ToolCallParser, ToolCallRecord};
    pub use crate::prompt::{build_tool_system_prompt, format_tool_results};
}
