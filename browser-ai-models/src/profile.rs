//! Platform profiles and capabilities.
//!
//! Each in-browser runtime takes a different message shape and honours a
//! different subset of call settings. A [`PlatformProfile`] records those
//! differences so the model layer can convert and warn uniformly.

use browser_ai_core::{CallSettings, CallWarning, ToolChoice};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The in-browser runtimes supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PlatformKind {
    /// The browser's built-in Prompt API.
    PromptApi,
    /// Transformers.js running ONNX models.
    Transformers,
    /// WebLLM running MLC-compiled models on WebGPU.
    WebLlm,
}

impl PlatformKind {
    /// Stable lowercase name, used as the provider name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            PlatformKind::PromptApi => "prompt-api",
            PlatformKind::Transformers => "transformers",
            PlatformKind::WebLlm => "web-llm",
        }
    }

    /// Default profile for this runtime.
    #[must_use]
    pub fn profile(&self) -> PlatformProfile {
        match self {
            PlatformKind::PromptApi => prompt_api_profile(),
            PlatformKind::Transformers => transformers_profile(),
            PlatformKind::WebLlm => web_llm_profile(),
        }
    }
}

impl fmt::Display for PlatformKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where the system message goes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SystemPlacement {
    /// Given to the session once, as its initial prompts.
    #[default]
    InitialPrompts,
    /// Sent as the first message of every prompt.
    FirstMessage,
}

/// Message shape the runtime accepts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MessageStyle {
    /// Role plus a list of typed content parts.
    #[default]
    PromptApi,
    /// Role plus a single text string.
    ChatCompletions,
}

/// Platform capabilities and behaviour.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformProfile {
    /// The runtime.
    pub kind: PlatformKind,
    /// Accepts image input.
    pub supports_images: bool,
    /// Accepts audio input.
    pub supports_audio: bool,
    /// System message placement.
    pub system_placement: SystemPlacement,
    /// Message shape.
    pub message_style: MessageStyle,
    /// Honours `max_output_tokens`.
    pub supports_max_output_tokens: bool,
    /// Honours `top_p`.
    pub supports_top_p: bool,
    /// Honours `stop_sequences`.
    pub supports_stop_sequences: bool,
}

impl PlatformProfile {
    /// Create a text-only profile for `kind`.
    #[must_use]
    pub fn new(kind: PlatformKind) -> Self {
        Self {
            kind,
            supports_images: false,
            supports_audio: false,
            system_placement: SystemPlacement::FirstMessage,
            message_style: MessageStyle::ChatCompletions,
            supports_max_output_tokens: true,
            supports_top_p: true,
            supports_stop_sequences: false,
        }
    }

    /// Set image support.
    #[must_use]
    pub fn with_images(mut self, supported: bool) -> Self {
        self.supports_images = supported;
        self
    }

    /// Set audio support.
    #[must_use]
    pub fn with_audio(mut self, supported: bool) -> Self {
        self.supports_audio = supported;
        self
    }

    /// Set system message placement.
    #[must_use]
    pub fn with_system_placement(mut self, placement: SystemPlacement) -> Self {
        self.system_placement = placement;
        self
    }

    /// Whether any media input is accepted.
    #[must_use]
    pub fn supports_media(&self) -> bool {
        self.supports_images || self.supports_audio
    }

    /// Warnings for settings this runtime cannot honour.
    #[must_use]
    pub fn unsupported_settings(&self, settings: &CallSettings) -> Vec<CallWarning> {
        let mut warnings = Vec::new();
        let mut unsupported = |setting: &str, present: bool| {
            if present {
                warnings.push(CallWarning::unsupported_setting(setting, None));
            }
        };

        unsupported("frequencyPenalty", settings.frequency_penalty.is_some());
        unsupported("presencePenalty", settings.presence_penalty.is_some());
        unsupported("seed", settings.seed.is_some());
        unsupported(
            "stopSequences",
            settings.stop_sequences.is_some() && !self.supports_stop_sequences,
        );
        unsupported(
            "maxOutputTokens",
            settings.max_output_tokens.is_some() && !self.supports_max_output_tokens,
        );
        unsupported("topP", settings.top_p.is_some() && !self.supports_top_p);

        match &settings.tool_choice {
            Some(ToolChoice::Required) => warnings.push(CallWarning::unsupported_setting(
                "toolChoice",
                Some("tool calls cannot be forced; the model decides".into()),
            )),
            Some(ToolChoice::Tool { tool_name }) => warnings.push(CallWarning::unsupported_setting(
                "toolChoice",
                Some(format!("only `{tool_name}` is offered, but a call is not forced")),
            )),
            _ => {}
        }
        warnings
    }
}

/// The browser's built-in Prompt API.
#[must_use]
pub fn prompt_api_profile() -> PlatformProfile {
    PlatformProfile {
        kind: PlatformKind::PromptApi,
        supports_images: true,
        supports_audio: true,
        system_placement: SystemPlacement::InitialPrompts,
        message_style: MessageStyle::PromptApi,
        supports_max_output_tokens: false,
        supports_top_p: false,
        supports_stop_sequences: false,
    }
}

/// Transformers.js.
#[must_use]
pub fn transformers_profile() -> PlatformProfile {
    PlatformProfile::new(PlatformKind::Transformers).with_images(true)
}

/// WebLLM.
#[must_use]
pub fn web_llm_profile() -> PlatformProfile {
    PlatformProfile {
        supports_stop_sequences: true,
        ..PlatformProfile::new(PlatformKind::WebLlm)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_names() {
        assert_eq!(PlatformKind::PromptApi.to_string(), "prompt-api");
        assert_eq!(
            serde_json::to_string(&PlatformKind::WebLlm).unwrap(),
            "\"web-llm\""
        );
    }

    #[test]
    fn test_prompt_api_profile() {
        let profile = PlatformKind::PromptApi.profile();
        assert!(profile.supports_media());
        assert_eq!(profile.system_placement, SystemPlacement::InitialPrompts);
        assert_eq!(profile.message_style, MessageStyle::PromptApi);
    }

    #[test]
    fn test_web_llm_is_text_only() {
        let profile = PlatformKind::WebLlm.profile();
        assert!(!profile.supports_media());
        assert_eq!(profile.system_placement, SystemPlacement::FirstMessage);
    }

    #[test]
    fn test_unsupported_settings() {
        let settings = CallSettings::new()
            .temperature(0.3)
            .top_k(5)
            .seed(7)
            .max_output_tokens(100)
            .top_p(0.9)
            .tool_choice(ToolChoice::Required);

        let names = |warnings: Vec<CallWarning>| -> Vec<String> {
            warnings
                .into_iter()
                .filter_map(|w| match w {
                    CallWarning::UnsupportedSetting { setting, .. } => Some(setting),
                    _ => None,
                })
                .collect()
        };

        assert_eq!(
            names(prompt_api_profile().unsupported_settings(&settings)),
            vec!["seed", "maxOutputTokens", "topP", "toolChoice"]
        );
        assert_eq!(
            names(web_llm_profile().unsupported_settings(&settings)),
            vec!["seed", "toolChoice"]
        );
        assert!(web_llm_profile()
            .unsupported_settings(&CallSettings::new().temperature(0.1))
            .is_empty());
    }
}
