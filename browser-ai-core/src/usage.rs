//! Token usage reported by a call.
//!
//! In-browser runtimes rarely report token counts, so every field is
//! optional and usually `None`.

use serde::{Deserialize, Serialize};

/// Token usage for a single call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Usage {
    /// Number of tokens in the prompt.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_tokens: Option<u64>,
    /// Number of tokens generated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_tokens: Option<u64>,
    /// Total tokens (input + output).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_tokens: Option<u64>,
}

impl Usage {
    /// Create an empty usage record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create usage with input and output tokens.
    #[must_use]
    pub fn with_tokens(input_tokens: u64, output_tokens: u64) -> Self {
        Self {
            input_tokens: Some(input_tokens),
            output_tokens: Some(output_tokens),
            total_tokens: Some(input_tokens + output_tokens),
        }
    }

    /// Set input tokens.
    #[must_use]
    pub fn input_tokens(mut self, tokens: u64) -> Self {
        self.input_tokens = Some(tokens);
        self.recalculate_total();
        self
    }

    /// Set output tokens.
    #[must_use]
    pub fn output_tokens(mut self, tokens: u64) -> Self {
        self.output_tokens = Some(tokens);
        self.recalculate_total();
        self
    }

    /// Check whether any count is known.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.input_tokens.is_none() && self.output_tokens.is_none()
    }

    fn recalculate_total(&mut self) {
        self.total_tokens = match (self.input_tokens, self.output_tokens) {
            (Some(i), Some(o)) => Some(i + o),
            (Some(i), None) => Some(i),
            (None, Some(o)) => Some(o),
            (None, None) => None,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_tokens() {
        let usage = Usage::with_tokens(10, 5);
        assert_eq!(usage.total_tokens, Some(15));
        assert!(!usage.is_empty());
    }

    #[test]
    fn test_builder_recalculates_total() {
        let usage = Usage::new().input_tokens(7);
        assert_eq!(usage.total_tokens, Some(7));
        let usage = usage.output_tokens(3);
        assert_eq!(usage.total_tokens, Some(10));
    }

    #[test]
    fn test_empty_serializes_to_empty_object() {
        assert!(Usage::new().is_empty());
        assert_eq!(serde_json::to_string(&Usage::new()).unwrap(), "{}");
        assert_eq!(
            serde_json::to_string(&Usage::with_tokens(1, 2)).unwrap(),
            r#"{"inputTokens":1,"outputTokens":2,"totalTokens":3}"#
        );
    }
}
