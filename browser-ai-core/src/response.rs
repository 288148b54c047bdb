//! Finish reasons and call warnings.

use serde::{Deserialize, Serialize};

/// Finish reason for model completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum FinishReason {
    /// Normal stop (end of response).
    Stop,
    /// Maximum token length reached.
    Length,
    /// Content filter triggered.
    ContentFilter,
    /// Tool calls need to be executed.
    ToolCalls,
    /// Error occurred.
    Error,
    /// Other/custom reason.
    Other,
    /// Unknown reason.
    #[default]
    Unknown,
}

impl FinishReason {
    /// Get the wire name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stop => "stop",
            Self::Length => "length",
            Self::ContentFilter => "content-filter",
            Self::ToolCalls => "tool-calls",
            Self::Error => "error",
            Self::Other => "other",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for FinishReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A non-fatal problem with the call settings, reported on `stream-start`
/// and on generate results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum CallWarning {
    /// A setting the platform ignores.
    UnsupportedSetting {
        /// Setting name.
        setting: String,
        /// Extra detail.
        #[serde(skip_serializing_if = "Option::is_none")]
        details: Option<String>,
    },
    /// A tool the platform cannot be given.
    UnsupportedTool {
        /// Tool name.
        tool_name: String,
        /// Extra detail.
        #[serde(skip_serializing_if = "Option::is_none")]
        details: Option<String>,
    },
    /// Anything else.
    Other {
        /// Warning text.
        message: String,
    },
}

impl CallWarning {
    /// Create an unsupported-setting warning.
    #[must_use]
    pub fn unsupported_setting(setting: impl Into<String>, details: Option<String>) -> Self {
        Self::UnsupportedSetting {
            setting: setting.into(),
            details,
        }
    }

    /// Create an unsupported-tool warning.
    #[must_use]
    pub fn unsupported_tool(tool_name: impl Into<String>, details: Option<String>) -> Self {
        Self::UnsupportedTool {
            tool_name: tool_name.into(),
            details,
        }
    }

    /// Create a free-form warning.
    #[must_use]
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(FinishReason::Stop, "\"stop\"")]
    #[case(FinishReason::ToolCalls, "\"tool-calls\"")]
    #[case(FinishReason::ContentFilter, "\"content-filter\"")]
    fn test_finish_reason_wire(#[case] reason: FinishReason, #[case] expected: &str) {
        assert_eq!(serde_json::to_string(&reason).unwrap(), expected);
        assert_eq!(format!("\"{}\"", reason), expected);
    }

    #[test]
    fn test_warning_serde() {
        let w = CallWarning::unsupported_setting("seed", None);
        assert_eq!(
            serde_json::to_string(&w).unwrap(),
            r#"{"type":"unsupported-setting","setting":"seed"}"#
        );
    }
}
