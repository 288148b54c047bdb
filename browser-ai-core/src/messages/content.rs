//! Multi-modal content parts.

use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use url::Url;

/// Raw media payload for image and audio parts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum MediaData {
    /// Base64-encoded bytes (no `data:` prefix).
    Base64(String),
    /// Raw bytes.
    Bytes(Vec<u8>),
    /// A URL the platform fetches itself.
    Url(Url),
}

impl MediaData {
    /// Create base64 media data.
    #[must_use]
    pub fn base64(data: impl Into<String>) -> Self {
        Self::Base64(data.into())
    }

    /// Create raw byte media data.
    #[must_use]
    pub fn bytes(data: impl Into<Vec<u8>>) -> Self {
        Self::Bytes(data.into())
    }

    /// Check if this payload is a URL reference.
    #[must_use]
    pub fn is_url(&self) -> bool {
        matches!(self, Self::Url(_))
    }

    /// Get the payload as base64, encoding raw bytes if needed.
    ///
    /// Returns `None` for URL payloads.
    #[must_use]
    pub fn to_base64(&self) -> Option<String> {
        match self {
            Self::Base64(s) => Some(s.clone()),
            Self::Bytes(b) => Some(base64::engine::general_purpose::STANDARD.encode(b)),
            Self::Url(_) => None,
        }
    }

    /// Render as a `data:` URL, or the URL itself for URL payloads.
    #[must_use]
    pub fn to_data_url(&self, media_type: &str) -> String {
        match self {
            Self::Url(url) => url.to_string(),
            other => format!(
                "data:{};base64,{}",
                media_type,
                other.to_base64().unwrap_or_default()
            ),
        }
    }
}

/// Individual content part in a message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ContentPart {
    /// Plain text.
    Text {
        /// The text.
        text: String,
    },
    /// An image.
    Image {
        /// Image payload.
        data: MediaData,
        /// MIME type, e.g. `image/png`.
        media_type: String,
    },
    /// An audio clip.
    Audio {
        /// Audio payload.
        data: MediaData,
        /// MIME type, e.g. `audio/wav`.
        media_type: String,
    },
    /// A tool call previously emitted by the assistant.
    ToolCall {
        /// Call identifier.
        tool_call_id: String,
        /// Tool name.
        tool_name: String,
        /// Parsed arguments.
        input: JsonValue,
    },
    /// The result of executing a tool call.
    ToolResult {
        /// Call identifier this result answers.
        tool_call_id: String,
        /// Tool name.
        tool_name: String,
        /// Tool output.
        output: JsonValue,
        /// Whether the tool failed.
        #[serde(default, skip_serializing_if = "std::ops::Not::not")]
        is_error: bool,
    },
}

impl ContentPart {
    /// Create a text part.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// Create an image part.
    #[must_use]
    pub fn image(data: MediaData, media_type: impl Into<String>) -> Self {
        Self::Image {
            data,
            media_type: media_type.into(),
        }
    }

    /// Create an audio part.
    #[must_use]
    pub fn audio(data: MediaData, media_type: impl Into<String>) -> Self {
        Self::Audio {
            data,
            media_type: media_type.into(),
        }
    }

    /// Create a tool call part.
    #[must_use]
    pub fn tool_call(
        tool_call_id: impl Into<String>,
        tool_name: impl Into<String>,
        input: JsonValue,
    ) -> Self {
        Self::ToolCall {
            tool_call_id: tool_call_id.into(),
            tool_name: tool_name.into(),
            input,
        }
    }

    /// Create a successful tool result part.
    #[must_use]
    pub fn tool_result(
        tool_call_id: impl Into<String>,
        tool_name: impl Into<String>,
        output: JsonValue,
    ) -> Self {
        Self::ToolResult {
            tool_call_id: tool_call_id.into(),
            tool_name: tool_name.into(),
            output,
            is_error: false,
        }
    }

    /// Get the text if this is a text part.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text { text } => Some(text),
            _ => None,
        }
    }

    /// Check if this is an image or audio part.
    #[must_use]
    pub fn is_media(&self) -> bool {
        matches!(self, Self::Image { .. } | Self::Audio { .. })
    }
}

impl From<&str> for ContentPart {
    fn from(s: &str) -> Self {
        Self::text(s)
    }
}

impl From<String> for ContentPart {
    fn from(s: String) -> Self {
        Self::text(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_media_to_base64() {
        assert_eq!(
            MediaData::bytes(b"hi".to_vec()).to_base64().as_deref(),
            Some("aGk=")
        );
        assert_eq!(MediaData::base64("aGk=").to_base64().as_deref(), Some("aGk="));

        let url = MediaData::Url(Url::parse("https://example.com/a.png").unwrap());
        assert!(url.is_url());
        assert_eq!(url.to_base64(), None);
        assert_eq!(url.to_data_url("image/png"), "https://example.com/a.png");
    }

    #[test]
    fn test_data_url() {
        let data = MediaData::bytes(b"hi".to_vec());
        assert_eq!(data.to_data_url("image/png"), "data:image/png;base64,aGk=");
    }

    #[test]
    fn test_content_part_serde_tag() {
        let part = ContentPart::tool_call("call_1", "getWeather", json!({"city": "NYC"}));
        let value = serde_json::to_value(&part).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "tool-call",
                "tool_call_id": "call_1",
                "tool_name": "getWeather",
                "input": {"city": "NYC"}
            })
        );

        let result = ContentPart::tool_result("call_1", "getWeather", json!("sunny"));
        let value = serde_json::to_value(&result).unwrap();
        assert!(value.get("is_error").is_none());
    }

    #[test]
    fn test_is_media() {
        assert!(ContentPart::image(MediaData::base64("x"), "image/png").is_media());
        assert!(ContentPart::audio(MediaData::base64("x"), "audio/wav").is_media());
        assert!(!ContentPart::text("x").is_media());
        assert_eq!(ContentPart::from("x").as_text(), Some("x"));
    }
}
