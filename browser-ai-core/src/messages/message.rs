//! Chat messages.

use serde::{Deserialize, Serialize};

use super::content::ContentPart;

/// Message author role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System instructions.
    System,
    /// End user.
    User,
    /// Model output.
    Assistant,
    /// Tool results.
    Tool,
}

impl Role {
    /// Get the role as a lowercase string.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::Tool => "tool",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single chat message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Who wrote the message.
    pub role: Role,
    /// Message content.
    pub content: Vec<ContentPart>,
}

impl Message {
    /// Create a message with the given role and parts.
    #[must_use]
    pub fn new(role: Role, content: Vec<ContentPart>) -> Self {
        Self { role, content }
    }

    /// Create a system message.
    #[must_use]
    pub fn system(text: impl Into<String>) -> Self {
        Self::new(Role::System, vec![ContentPart::text(text)])
    }

    /// Create a text-only user message.
    #[must_use]
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, vec![ContentPart::text(text)])
    }

    /// Create a multi-part user message.
    #[must_use]
    pub fn user_parts(parts: Vec<ContentPart>) -> Self {
        Self::new(Role::User, parts)
    }

    /// Create a text-only assistant message.
    #[must_use]
    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Role::Assistant, vec![ContentPart::text(text)])
    }

    /// Create a tool message carrying results.
    #[must_use]
    pub fn tool(results: Vec<ContentPart>) -> Self {
        Self::new(Role::Tool, results)
    }

    /// Concatenate all text parts.
    #[must_use]
    pub fn text_content(&self) -> String {
        self.content
            .iter()
            .filter_map(ContentPart::as_text)
            .collect::<Vec<_>>()
            .join("")
    }

    /// Check if any part is an image or audio clip.
    #[must_use]
    pub fn has_media(&self) -> bool {
        self.content.iter().any(ContentPart::is_media)
    }
}
