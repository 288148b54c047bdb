//! Parsing tool calls out of a complete model response.
//!
//! The parser is lenient: malformed payloads never fail the call, they simply
//! produce no tool calls. Records that cannot be used are logged at `debug`
//! and dropped.

use browser_ai_core::generate_tool_call_id;
use browser_ai_streaming::{FenceConfig, FenceDetector};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use tracing::debug;

/// One tool call extracted from a fence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRecord {
    /// Call identifier, from the payload's `id` or freshly generated.
    pub tool_call_id: String,
    /// Tool name.
    pub tool_name: String,
    /// Arguments; always present, `{}` when the payload omitted them.
    pub args: JsonValue,
}

impl ToolCallRecord {
    /// Arguments serialized as a JSON string.
    #[must_use]
    pub fn input_json(&self) -> String {
        self.args.to_string()
    }
}

/// Result of [`ToolCallParser::parse`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedResponse {
    /// Calls in payload order.
    pub tool_calls: Vec<ToolCallRecord>,
    /// The response with its fences removed.
    pub text_content: String,
}

impl ParsedResponse {
    /// Whether any tool call was found.
    #[must_use]
    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

/// Extracts fenced tool calls from model responses.
#[derive(Debug, Clone, Default)]
pub struct ToolCallParser {
    config: FenceConfig,
}

impl ToolCallParser {
    /// Create a parser for the default fence markers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a parser for custom fence markers.
    #[must_use]
    pub fn with_config(config: FenceConfig) -> Self {
        Self {
            config: config.normalized(),
        }
    }

    /// The markers in use.
    #[must_use]
    pub fn config(&self) -> &FenceConfig {
        &self.config
    }

    /// Whether `text` contains an opening marker.
    #[must_use]
    pub fn has_fence_marker(&self, text: &str) -> bool {
        self.config.contains_open_marker(text)
    }

    /// The first complete fence in `text`, delimiters included.
    #[must_use]
    pub fn extract_fence_block(&self, text: &str) -> Option<String> {
        let mut detector = FenceDetector::with_config(self.config.clone());
        detector.add_chunk(text);
        detector.detect_fence().fence
    }

    /// Extract every tool call and the surrounding prose.
    ///
    /// Without a complete fence the input comes back unchanged.
    #[must_use]
    pub fn parse(&self, response_text: &str) -> ParsedResponse {
        if !self.has_fence_marker(response_text) {
            return ParsedResponse {
                tool_calls: Vec::new(),
                text_content: response_text.to_string(),
            };
        }

        let mut detector = FenceDetector::with_config(self.config.clone());
        detector.add_chunk(response_text);

        let mut pieces = Vec::new();
        let mut tool_calls = Vec::new();
        loop {
            let detection = detector.detect_fence();
            let Some(fence) = detection.fence else {
                let mut tail = detection.prefix_text;
                tail.push_str(&detector.flush());
                pieces.push(tail);
                break;
            };
            pieces.push(detection.prefix_text);
            tool_calls.extend(parse_fence_payload(self.fence_inner(&fence)));
            detector.add_chunk(&detection.remaining_text);
        }

        if pieces.len() == 1 {
            return ParsedResponse {
                tool_calls,
                text_content: response_text.to_string(),
            };
        }

        let text_content = pieces
            .into_iter()
            .reduce(|left, right| join_at_seam(&left, &right))
            .unwrap_or_default();

        ParsedResponse {
            tool_calls,
            text_content,
        }
    }

    /// Strip the delimiters from a complete fence.
    #[must_use]
    pub fn fence_inner<'a>(&self, fence: &'a str) -> &'a str {
        let body = self
            .config
            .open_markers
            .iter()
            .find_map(|marker| fence.strip_prefix(marker.as_str()))
            .unwrap_or(fence);
        body.strip_suffix(self.config.close_marker.as_str())
            .unwrap_or(body)
    }
}

/// Parse the JSON payload of a fence into tool calls.
///
/// Accepts a single object, an array of objects, or objects separated by
/// newlines. Anything else yields no calls.
#[must_use]
pub fn parse_fence_payload(inner: &str) -> Vec<ToolCallRecord> {
    let inner = inner.trim();
    if inner.is_empty() {
        return Vec::new();
    }

    let values = match serde_json::from_str::<JsonValue>(inner) {
        Ok(JsonValue::Array(items)) => items,
        Ok(value) => vec![value],
        Err(_) => {
            let mut values = Vec::new();
            for item in serde_json::Deserializer::from_str(inner).into_iter::<JsonValue>() {
                match item {
                    Ok(value) => values.push(value),
                    Err(e) => {
                        debug!(error = %e, parsed = values.len(), "Stopped reading tool call payload");
                        break;
                    }
                }
            }
            values
        }
    };

    values.into_iter().filter_map(record_from_value).collect()
}

fn record_from_value(value: JsonValue) -> Option<ToolCallRecord> {
    let mut object = match value {
        JsonValue::Object(object) => object,
        other => {
            debug!(payload = %other, "Dropping tool call that is not an object");
            return None;
        }
    };

    let tool_name = match string_field(&object, &["name", "toolName"]) {
        Some(name) if !name.is_empty() => name,
        _ => {
            debug!(payload = ?object, "Dropping tool call without a name");
            return None;
        }
    };

    let args = ["arguments", "args"]
        .iter()
        .find_map(|key| object.remove(*key))
        .map(normalize_args)
        .unwrap_or_else(empty_args);

    let tool_call_id = string_field(&object, &["id"]).unwrap_or_else(generate_tool_call_id);

    Some(ToolCallRecord {
        tool_call_id,
        tool_name,
        args,
    })
}

fn string_field(object: &Map<String, JsonValue>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match object.get(*key) {
        Some(JsonValue::String(s)) => Some(s.clone()),
        _ => None,
    })
}

fn empty_args() -> JsonValue {
    JsonValue::Object(Map::new())
}

/// `null` becomes `{}`; a string holding a JSON object is unwrapped.
fn normalize_args(args: JsonValue) -> JsonValue {
    match args {
        JsonValue::Null => empty_args(),
        JsonValue::String(raw) => match serde_json::from_str::<JsonValue>(&raw) {
            Ok(value @ JsonValue::Object(_)) => value,
            _ => JsonValue::String(raw),
        },
        other => other,
    }
}

/// Join two pieces of prose around a removed fence, keeping at most one
/// side's whitespace at the seam.
fn join_at_seam(left: &str, right: &str) -> String {
    if left.trim().is_empty() {
        return right.trim_start().to_string();
    }
    if right.trim().is_empty() {
        return left.trim_end().to_string();
    }

    let kept = left.trim_end();
    let seam = if kept.len() < left.len() {
        &left[kept.len()..]
    } else {
        let rest = right.trim_start();
        &right[..right.len() - rest.len()]
    };
    format!("{kept}{seam}{}", right.trim_start())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use serde_json::json;

    const WEATHER: &str =
        "```tool_call\n{\"name\": \"getWeather\", \"arguments\": {\"city\": \"NYC\"}}\n```";

    #[test]
    fn test_has_fence_marker() {
        let parser = ToolCallParser::new();
        assert!(parser.has_fence_marker("x ```tool_call\n"));
        assert!(parser.has_fence_marker("```tool-call\n"));
        assert!(!parser.has_fence_marker("```tool-call"));
        assert!(!parser.has_fence_marker("```json\n{}\n```"));
    }

    #[test]
    fn test_extract_fence_block_includes_delimiters() {
        let parser = ToolCallParser::new();
        let text = format!("before {WEATHER}\nafter");
        assert_eq!(parser.extract_fence_block(&text).as_deref(), Some(WEATHER));
        assert_eq!(parser.extract_fence_block("no fence here"), None);
        assert_eq!(parser.extract_fence_block("```tool_call\n{\"name\":"), None);
    }

    #[test]
    fn test_parse_single_call() {
        let parser = ToolCallParser::new();
        let parsed = parser.parse(&format!("Let me check.\n{WEATHER}\nDone."));

        assert_eq!(parsed.tool_calls.len(), 1);
        let call = &parsed.tool_calls[0];
        assert_eq!(call.tool_name, "getWeather");
        assert_eq!(call.args, json!({"city": "NYC"}));
        assert!(call.tool_call_id.starts_with("call_"));
        assert_eq!(call.input_json(), r#"{"city":"NYC"}"#);
        assert_eq!(parsed.text_content, "Let me check.\nDone.");
    }

    #[test]
    fn test_parse_array_and_aliases() {
        let parser = ToolCallParser::new();
        let text = "```tool-call\n[{\"toolName\":\"a\",\"args\":{\"x\":1},\"id\":\"fixed\"},{\"name\":\"b\"}]\n```";
        let parsed = parser.parse(text);

        assert_eq!(parsed.tool_calls.len(), 2);
        assert_eq!(parsed.tool_calls[0].tool_call_id, "fixed");
        assert_eq!(parsed.tool_calls[0].args, json!({"x": 1}));
        assert_eq!(parsed.tool_calls[1].tool_name, "b");
        assert_eq!(parsed.tool_calls[1].args, json!({}));
        assert_eq!(parsed.text_content, "");
    }

    #[test]
    fn test_parse_newline_separated_objects() {
        let calls = parse_fence_payload(
            "{\"name\":\"first\",\"arguments\":null}\n{\"name\":\"second\",\"arguments\":{\"q\":\"rust\"}}",
        );
        let names: Vec<_> = calls.iter().map(|c| c.tool_name.as_str()).collect();
        assert_eq!(names, vec!["first", "second"]);
        assert_eq!(calls[0].args, json!({}));
    }

    #[test]
    fn test_records_without_name_are_dropped() {
        let calls = parse_fence_payload(r#"[{"arguments":{}},{"name":""},42,{"name":"ok"}]"#);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].tool_name, "ok");
    }

    #[test]
    fn test_stringified_arguments_are_unwrapped() {
        let calls = parse_fence_payload(r#"{"name":"a","arguments":"{\"k\":true}"}"#);
        assert_eq!(calls[0].args, json!({"k": true}));
    }

    #[rstest]
    #[case::not_json("```tool_call\nplease call the weather tool\n```")]
    #[case::truncated("```tool_call\n{\"name\": \"getWea\n```")]
    #[case::scalar("```tool_call\n42\n```")]
    #[case::empty("```tool_call\n```")]
    fn test_invalid_payload_yields_no_calls(#[case] text: &str) {
        let parsed = ToolCallParser::new().parse(text);
        assert!(!parsed.has_tool_calls());
    }

    #[rstest]
    #[case::plain("Just a normal answer.\n")]
    #[case::other_fence("```json\n{\"name\":\"x\"}\n```")]
    #[case::unterminated("Checking ```tool_call\n{\"name\":\"x\"}")]
    fn test_no_complete_fence_returns_input_unchanged(#[case] text: &str) {
        let parsed = ToolCallParser::new().parse(text);
        assert!(parsed.tool_calls.is_empty());
        assert_eq!(parsed.text_content, text);
    }

    #[test]
    fn test_multiple_fences() {
        let text = format!(
            "One {WEATHER}\ntwo ```tool_call\n{{\"name\":\"getTime\"}}\n```\nthree"
        );
        let parsed = ToolCallParser::new().parse(&text);
        let names: Vec<_> = parsed.tool_calls.iter().map(|c| c.tool_name.as_str()).collect();
        assert_eq!(names, vec!["getWeather", "getTime"]);
        assert_eq!(parsed.text_content, "One two three");
    }

    #[test]
    fn test_code_fence_inside_arguments() {
        let text = "```tool_call\n{\"name\":\"writeFile\",\"arguments\":{\"content\":\"```js\\nlet x = 1;\\n```\"}}\n```";
        let parsed = ToolCallParser::new().parse(text);

        assert_eq!(parsed.tool_calls.len(), 1);
        assert_eq!(parsed.tool_calls[0].tool_name, "writeFile");
        assert_eq!(
            parsed.tool_calls[0].args,
            json!({"content": "```js\nlet x = 1;\n```"})
        );
        assert_eq!(parsed.text_content, "");
    }

    #[test]
    fn test_marker_in_prose_is_not_a_fence() {
        let text = "See ```tool_calls are documented``` here";
        let parser = ToolCallParser::new();
        assert!(!parser.has_fence_marker(text));

        let parsed = parser.parse(text);
        assert!(!parsed.has_tool_calls());
        assert_eq!(parsed.text_content, text);
    }

    #[test]
    fn test_synthesized_ids_are_unique() {
        let payload = (0..50)
            .map(|i| format!("{{\"name\":\"t{i}\"}}"))
            .collect::<Vec<_>>()
            .join("\n");
        let calls = parse_fence_payload(&payload);
        let ids: std::collections::HashSet<_> =
            calls.iter().map(|c| c.tool_call_id.clone()).collect();
        assert_eq!(calls.len(), 50);
        assert_eq!(ids.len(), 50);
    }

    #[test]
    fn test_custom_markers() {
        let parser = ToolCallParser::with_config(FenceConfig::new(["<tool>"], "</tool>"));
        let parsed = parser.parse("a <tool>\n{\"name\":\"x\"}\n</tool>\nb");
        assert_eq!(parsed.tool_calls[0].tool_name, "x");
        assert_eq!(parsed.text_content, "a b");
        assert_eq!(parser.fence_inner("<tool>{}</tool>"), "{}");
    }

    #[rstest]
    #[case("a\n", "\nb", "a\nb")]
    #[case("a ", "b", "a b")]
    #[case("a", "  b", "a  b")]
    #[case("a", "b", "ab")]
    #[case("  ", "\nb ", "b ")]
    #[case(" a ", "", " a")]
    fn test_join_at_seam(#[case] left: &str, #[case] right: &str, #[case] expected: &str) {
        assert_eq!(join_at_seam(left, right), expected);
    }
}
