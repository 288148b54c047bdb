//! Conversion from canonical messages to platform messages.
//!
//! Normalisation is shared: system messages are collected into one system
//! prompt (with tool instructions appended), assistant tool calls are
//! rendered back into fences, and tool results become user text. The
//! profile then decides where the system prompt goes and how content is
//! shaped.

use crate::error::{ModelError, ModelResult};
use crate::platform::{PlatformContent, PlatformMessage};
use crate::profile::{MessageStyle, PlatformProfile, SystemPlacement};
use browser_ai_core::{ContentPart, Message, Role};
use browser_ai_streaming::FenceConfig;
use browser_ai_tools::{build_tool_system_prompt_with, format_tool_results, ToolDefinition};
use serde_json::json;

/// Messages ready for a platform.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConvertedPrompt {
    /// System prompt to hand to the session constructor.
    ///
    /// Only set for [`SystemPlacement::InitialPrompts`]; otherwise the system
    /// prompt is the first entry of `messages`.
    pub system_prompt: Option<String>,
    /// Conversation messages.
    pub messages: Vec<PlatformMessage>,
}

/// Convert `messages` for the platform described by `profile`.
///
/// `tools` are described in the system prompt using the markers in `fence`.
pub fn convert_messages(
    messages: &[Message],
    profile: &PlatformProfile,
    tools: &[ToolDefinition],
    fence: &FenceConfig,
) -> ModelResult<ConvertedPrompt> {
    let system = collect_system(messages);
    let system = build_tool_system_prompt_with(fence, system.as_deref(), tools);
    let system = (!system.is_empty()).then_some(system);

    let mut converted = Vec::with_capacity(messages.len() + 1);
    for message in messages {
        let content = match message.role {
            Role::System => continue,
            Role::User => user_content(&message.content, profile)?,
            Role::Assistant => assistant_content(&message.content, fence),
            Role::Tool => {
                let rendered = format_tool_results(&message.content);
                text_only(rendered)
            }
        };
        if content.is_empty() {
            continue;
        }

        let role = match message.role {
            Role::Assistant => Role::Assistant,
            _ => Role::User,
        };
        let content = match profile.message_style {
            MessageStyle::PromptApi => content,
            MessageStyle::ChatCompletions => flatten_text(content),
        };
        converted.push(PlatformMessage { role, content });
    }

    Ok(match profile.system_placement {
        SystemPlacement::InitialPrompts => ConvertedPrompt {
            system_prompt: system,
            messages: converted,
        },
        SystemPlacement::FirstMessage => {
            if let Some(system) = system {
                converted.insert(0, PlatformMessage::system(system));
            }
            ConvertedPrompt {
                system_prompt: None,
                messages: converted,
            }
        }
    })
}

/// All system message text, joined by blank lines.
#[must_use]
pub fn collect_system(messages: &[Message]) -> Option<String> {
    let parts: Vec<String> = messages
        .iter()
        .filter(|m| m.role == Role::System)
        .map(|m| m.text_content().trim().to_string())
        .filter(|t| !t.is_empty())
        .collect();
    (!parts.is_empty()).then(|| parts.join("\n\n"))
}

fn user_content(parts: &[ContentPart], profile: &PlatformProfile) -> ModelResult<Vec<PlatformContent>> {
    let mut content = Vec::with_capacity(parts.len());
    for part in parts {
        match part {
            ContentPart::Text { text } => content.push(PlatformContent::Text(text.clone())),
            ContentPart::Image { data, .. } => {
                if !profile.supports_images {
                    return Err(ModelError::unsupported(format!(
                        "image input on {}",
                        profile.kind
                    )));
                }
                content.push(PlatformContent::Image(data.clone()));
            }
            ContentPart::Audio { data, .. } => {
                if !profile.supports_audio {
                    return Err(ModelError::unsupported(format!(
                        "audio input on {}",
                        profile.kind
                    )));
                }
                content.push(PlatformContent::Audio(data.clone()));
            }
            ContentPart::ToolResult { .. } => {
                let rendered = format_tool_results(std::slice::from_ref(part));
                content.push(PlatformContent::Text(rendered));
            }
            ContentPart::ToolCall { .. } => {}
        }
    }
    Ok(content)
}

fn assistant_content(parts: &[ContentPart], fence: &FenceConfig) -> Vec<PlatformContent> {
    let mut text = String::new();
    let mut calls = Vec::new();
    for part in parts {
        match part {
            ContentPart::Text { text: t } => text.push_str(t),
            ContentPart::ToolCall {
                tool_name, input, ..
            } => calls.push(json!({ "name": tool_name, "arguments": input }).to_string()),
            _ => {}
        }
    }

    if !calls.is_empty() {
        if !text.is_empty() && !text.ends_with('\n') {
            text.push('\n');
        }
        text.push_str(fence.primary_open_marker());
        text.push('\n');
        text.push_str(&calls.join("\n"));
        text.push('\n');
        text.push_str(&fence.close_marker);
    }
    text_only(text)
}

fn text_only(text: String) -> Vec<PlatformContent> {
    if text.is_empty() {
        Vec::new()
    } else {
        vec![PlatformContent::Text(text)]
    }
}

/// Collapse text parts into one leading text part; media parts follow it.
fn flatten_text(content: Vec<PlatformContent>) -> Vec<PlatformContent> {
    let mut text = String::new();
    let mut media = Vec::new();
    for part in content {
        match part {
            PlatformContent::Text(t) => text.push_str(&t),
            other => media.push(other),
        }
    }
    let mut flattened = text_only(text);
    flattened.extend(media);
    flattened
}
