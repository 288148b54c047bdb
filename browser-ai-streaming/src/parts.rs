//! Stream part types.
//!
//! This module defines the parts emitted by a streaming chat call, using the
//! same vocabulary as the AI SDK language-model stream protocol.

use browser_ai_core::{CallWarning, FinishReason, Usage};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Parts emitted during a streaming call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum StreamPart {
    /// First part of every stream.
    StreamStart {
        /// Warnings about settings the platform ignores.
        warnings: Vec<CallWarning>,
    },

    /// A text block opened.
    TextStart {
        /// Block ID.
        id: String,
    },

    /// Text appended to an open block.
    TextDelta {
        /// Block ID.
        id: String,
        /// The text.
        delta: String,
    },

    /// A text block closed.
    TextEnd {
        /// Block ID.
        id: String,
    },

    /// A tool call started streaming.
    ToolInputStart {
        /// Tool call ID.
        id: String,
        /// Tool name.
        #[serde(rename = "toolName")]
        tool_name: String,
    },

    /// More of the tool arguments.
    ToolInputDelta {
        /// Tool call ID.
        id: String,
        /// Raw JSON fragment.
        delta: String,
    },

    /// Tool arguments finished streaming.
    ToolInputEnd {
        /// Tool call ID.
        id: String,
    },

    /// A complete tool call.
    ToolCall {
        /// Tool call ID.
        #[serde(rename = "toolCallId")]
        tool_call_id: String,
        /// Tool name.
        #[serde(rename = "toolName")]
        tool_name: String,
        /// Arguments serialized as a JSON string.
        input: String,
    },

    /// Last part of every stream.
    Finish {
        /// Why generation stopped.
        #[serde(rename = "finishReason")]
        finish_reason: FinishReason,
        /// Token usage, when the platform reports it.
        usage: Usage,
    },

    /// The platform stream failed.
    Error {
        /// Error message.
        error: String,
    },
}

impl StreamPart {
    /// Create a stream start part.
    pub fn stream_start(warnings: Vec<CallWarning>) -> Self {
        Self::StreamStart { warnings }
    }

    /// Create a text delta part.
    pub fn text_delta(id: impl Into<String>, delta: impl Into<String>) -> Self {
        Self::TextDelta {
            id: id.into(),
            delta: delta.into(),
        }
    }

    /// Create a tool input start part.
    pub fn tool_input_start(id: impl Into<String>, tool_name: impl Into<String>) -> Self {
        Self::ToolInputStart {
            id: id.into(),
            tool_name: tool_name.into(),
        }
    }

    /// Create a tool input delta part.
    pub fn tool_input_delta(id: impl Into<String>, delta: impl Into<String>) -> Self {
        Self::ToolInputDelta {
            id: id.into(),
            delta: delta.into(),
        }
    }

    /// Create a tool call part.
    pub fn tool_call(
        tool_call_id: impl Into<String>,
        tool_name: impl Into<String>,
        input: impl Into<String>,
    ) -> Self {
        Self::ToolCall {
            tool_call_id: tool_call_id.into(),
            tool_name: tool_name.into(),
            input: input.into(),
        }
    }

    /// Create a finish part.
    pub fn finish(finish_reason: FinishReason, usage: Usage) -> Self {
        Self::Finish {
            finish_reason,
            usage,
        }
    }

    /// Create an error part.
    pub fn error(error: impl fmt::Display) -> Self {
        Self::Error {
            error: error.to_string(),
        }
    }

    /// Wire name of the part type.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::StreamStart { .. } => "stream-start",
            Self::TextStart { .. } => "text-start",
            Self::TextDelta { .. } => "text-delta",
            Self::TextEnd { .. } => "text-end",
            Self::ToolInputStart { .. } => "tool-input-start",
            Self::ToolInputDelta { .. } => "tool-input-delta",
            Self::ToolInputEnd { .. } => "tool-input-end",
            Self::ToolCall { .. } => "tool-call",
            Self::Finish { .. } => "finish",
            Self::Error { .. } => "error",
        }
    }

    /// Check if this is the final part.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finish { .. })
    }

    /// Check if this is an error part.
    #[must_use]
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }

    /// Get the text if this is a text delta.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::TextDelta { delta, .. } => Some(delta),
            _ => None,
        }
    }

    /// Get the finish reason if this is a finish part.
    pub fn finish_reason(&self) -> Option<FinishReason> {
        match self {
            Self::Finish { finish_reason, .. } => Some(*finish_reason),
            _ => None,
        }
    }

    /// Encode as a single JSON line.
    pub fn encode(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

impl fmt::Display for StreamPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StreamStart { warnings } => {
                write!(f, "[stream-start] {} warning(s)", warnings.len())
            }
            Self::TextStart { id } => write!(f, "[text-start] {id}"),
            Self::TextDelta { delta, .. } => write!(f, "{delta}"),
            Self::TextEnd { id } => write!(f, "[text-end] {id}"),
            Self::ToolInputStart { tool_name, .. } => write!(f, "[tool-input-start] {tool_name}"),
            Self::ToolInputDelta { delta, .. } => write!(f, "{delta}"),
            Self::ToolInputEnd { id } => write!(f, "[tool-input-end] {id}"),
            Self::ToolCall {
                tool_name, input, ..
            } => write!(f, "[tool-call] {tool_name} {input}"),
            Self::Finish { finish_reason, .. } => write!(f, "[finish] {finish_reason}"),
            Self::Error { error } => write!(f, "[error] {error}"),
        }
    }
}
