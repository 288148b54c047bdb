//! Prompt text for fenced tool calling.

use crate::definition::ToolDefinition;
use browser_ai_core::ContentPart;
use browser_ai_streaming::{FenceConfig, DEFAULT_CLOSE_MARKER};
use serde_json::Value as JsonValue;

/// Opening marker used when rendering tool results back to the model.
pub const TOOL_RESULT_MARKER: &str = "```tool_result";

/// Build the system prompt that teaches the model the fence format.
///
/// With no tools the original system prompt is returned as is.
#[must_use]
pub fn build_tool_system_prompt(original_system: Option<&str>, tools: &[ToolDefinition]) -> String {
    build_tool_system_prompt_with(&FenceConfig::default(), original_system, tools)
}

/// Like [`build_tool_system_prompt`], for custom fence markers.
#[must_use]
pub fn build_tool_system_prompt_with(
    config: &FenceConfig,
    original_system: Option<&str>,
    tools: &[ToolDefinition],
) -> String {
    let original = original_system.map(str::trim).unwrap_or_default();
    if tools.is_empty() {
        return original.to_string();
    }

    let open = config.primary_open_marker();
    let close = config.close_marker.as_str();
    let listing: Vec<JsonValue> = tools.iter().map(ToolDefinition::to_prompt_json).collect();
    let listing =
        serde_json::to_string_pretty(&listing).unwrap_or_else(|_| JsonValue::from(listing).to_string());

    let mut prompt = String::new();
    if !original.is_empty() {
        prompt.push_str(original);
        prompt.push_str("\n\n");
    }
    prompt.push_str(&format!(
        "You have access to the following tools. To call a tool, reply with a fenced block \
in exactly this format:\n\
\n\
{open}\n\
{{\"name\": \"tool_name\", \"arguments\": {{\"param\": \"value\"}}}}\n\
{close}\n\
\n\
Rules:\n\
- Use a tool name exactly as listed.\n\
- \"arguments\" must be a JSON object matching the tool's parameters.\n\
- To call several tools at once, put a JSON array of calls in one block.\n\
- Write nothing after the closing fence; the results will be sent back to you.\n\
- If no tool is needed, answer normally without a fence.\n\
\n\
Available tools:\n\
{listing}"
    ));
    prompt
}

/// Render tool results as a fenced block for the next turn.
///
/// Parts other than tool results are ignored. Each result is one JSON line.
#[must_use]
pub fn format_tool_results(parts: &[ContentPart]) -> String {
    let lines: Vec<String> = parts
        .iter()
        .filter_map(|part| match part {
            ContentPart::ToolResult {
                tool_call_id,
                tool_name,
                output,
                is_error,
            } => {
                let mut entry = serde_json::json!({
                    "id": tool_call_id,
                    "name": tool_name,
                    "result": output,
                });
                if *is_error {
                    entry["error"] = JsonValue::Bool(true);
                }
                Some(entry.to_string())
            }
            _ => None,
        })
        .collect();

    if lines.is_empty() {
        return String::new();
    }
    format!(
        "{TOOL_RESULT_MARKER}\n{}\n{DEFAULT_CLOSE_MARKER}",
        lines.join("\n")
    )
}
