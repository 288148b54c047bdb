//! Core model trait and the browser chat model.
//!
//! [`LanguageModel`] is the interface the rest of the workspace programs
//! against. [`BrowserChatModel`] implements it on top of a
//! [`LanguageModelPlatform`]: it owns one [`SessionManager`], turns canonical
//! messages into platform messages, teaches the model the tool-call fence
//! format, and parses fences back into tool calls.

use crate::convert::{convert_messages, ConvertedPrompt};
use crate::error::{ModelError, ModelResult, SessionError};
use crate::options::SessionOptions;
use crate::platform::{Availability, LanguageModelPlatform, PlatformMessage, PromptOptions};
use crate::profile::{MessageStyle, PlatformProfile};
use crate::progress::ProgressSink;
use crate::session::{SessionHandle, SessionManager};
use crate::stream::{spawn_chat_stream, ChatStream, StreamSetup};
use async_trait::async_trait;
use browser_ai_core::{
    CallSettings, CallWarning, ContentPart, FinishReason, Message, ToolChoice, Usage,
};
use browser_ai_tools::{ToolCallParser, ToolDefinition};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Inputs of a single generate or stream call.
#[derive(Debug, Clone, Default)]
pub struct CallOptions {
    /// Conversation so far.
    pub messages: Vec<Message>,
    /// Generation settings.
    pub settings: CallSettings,
    /// Tools the model may call.
    pub tools: Vec<ToolDefinition>,
    /// Cancels the call.
    pub abort: Option<CancellationToken>,
}

impl CallOptions {
    /// Create options for `messages`.
    #[must_use]
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            ..Self::default()
        }
    }

    /// Set generation settings.
    #[must_use]
    pub fn with_settings(mut self, settings: CallSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Set the tools.
    #[must_use]
    pub fn with_tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.tools = tools;
        self
    }

    /// Set the abort token.
    #[must_use]
    pub fn with_abort(mut self, abort: CancellationToken) -> Self {
        self.abort = Some(abort);
        self
    }
}

/// Result of a non-streaming call.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateResult {
    /// Text and tool call parts, in order.
    pub content: Vec<ContentPart>,
    /// Why generation stopped.
    pub finish_reason: FinishReason,
    /// Token usage, when known.
    pub usage: Usage,
    /// Settings the platform ignored.
    pub warnings: Vec<CallWarning>,
}

impl GenerateResult {
    /// Concatenated text content.
    #[must_use]
    pub fn text(&self) -> String {
        self.content.iter().filter_map(ContentPart::as_text).collect()
    }

    /// Tool call parts.
    pub fn tool_calls(&self) -> impl Iterator<Item = &ContentPart> {
        self.content
            .iter()
            .filter(|part| matches!(part, ContentPart::ToolCall { .. }))
    }
}

/// Core model trait.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Model identifier within its provider.
    fn model_id(&self) -> &str;

    /// Provider name, e.g. `web-llm`.
    fn provider(&self) -> &str;

    /// `provider:model_id`.
    fn identifier(&self) -> String {
        format!("{}:{}", self.provider(), self.model_id())
    }

    /// Capabilities of the platform behind the model.
    fn profile(&self) -> &PlatformProfile;

    /// Generate a whole response.
    async fn do_generate(&self, options: CallOptions) -> ModelResult<GenerateResult>;

    /// Stream a response.
    ///
    /// Session and prompt failures are returned here; failures after the
    /// stream starts arrive as `error` parts.
    async fn do_stream(&self, options: CallOptions) -> ModelResult<ChatStream>;
}

/// Boxed model for dynamic dispatch.
pub type BoxedModel = Arc<dyn LanguageModel>;

/// A prepared call.
struct PreparedCall {
    session_options: SessionOptions,
    messages: Vec<PlatformMessage>,
    prompt: PromptOptions,
    warnings: Vec<CallWarning>,
}

/// Chat model backed by an in-browser platform.
pub struct BrowserChatModel {
    model_id: String,
    profile: PlatformProfile,
    sessions: SessionManager,
    parser: ToolCallParser,
}

impl BrowserChatModel {
    /// Create a model with no base session options.
    pub fn new(
        model_id: impl Into<String>,
        platform: Arc<dyn LanguageModelPlatform>,
        profile: PlatformProfile,
    ) -> Self {
        Self::with_session_options(model_id, platform, profile, SessionOptions::default())
    }

    /// Create a model whose sessions start from `options`.
    pub fn with_session_options(
        model_id: impl Into<String>,
        platform: Arc<dyn LanguageModelPlatform>,
        profile: PlatformProfile,
        options: SessionOptions,
    ) -> Self {
        Self {
            model_id: model_id.into(),
            profile,
            sessions: SessionManager::new(platform, options),
            parser: ToolCallParser::new(),
        }
    }

    /// Use a parser with custom fence markers.
    #[must_use]
    pub fn with_parser(mut self, parser: ToolCallParser) -> Self {
        self.parser = parser;
        self
    }

    /// The session manager.
    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    /// Check availability without creating a session.
    pub async fn check_availability(&self) -> Availability {
        self.sessions.check_availability().await
    }

    /// Create the session ahead of the first call, reporting download progress.
    pub async fn create_session_with_progress(
        &self,
        on_progress: Arc<dyn ProgressSink>,
    ) -> Result<SessionHandle, SessionError> {
        self.sessions.create_session_with_progress(on_progress).await
    }

    /// Release the session. The next call creates a fresh one.
    pub async fn destroy_session(&self) {
        self.sessions.destroy_session().await;
    }

    fn prepare(&self, options: &CallOptions) -> ModelResult<PreparedCall> {
        let settings = &options.settings;
        let mut warnings = self.profile.unsupported_settings(settings);
        let tools = offered_tools(&options.tools, settings.tool_choice.as_ref(), &mut warnings);

        let ConvertedPrompt {
            system_prompt,
            messages,
        } = convert_messages(&options.messages, &self.profile, &tools, self.parser.config())?;

        let mut session_options = SessionOptions::new();
        session_options.system_prompt = system_prompt;
        if self.profile.message_style == MessageStyle::PromptApi {
            session_options.temperature = settings.temperature;
            session_options.top_k = settings.top_k;
        }

        let prompt = PromptOptions {
            temperature: settings.temperature,
            top_k: settings.top_k,
            top_p: settings.top_p.filter(|_| self.profile.supports_top_p),
            max_output_tokens: settings
                .max_output_tokens
                .filter(|_| self.profile.supports_max_output_tokens),
            stop_sequences: match &settings.stop_sequences {
                Some(stops) if self.profile.supports_stop_sequences => stops.clone(),
                _ => Vec::new(),
            },
        };

        Ok(PreparedCall {
            session_options,
            messages,
            prompt,
            warnings,
        })
    }

    fn usage(session: &SessionHandle) -> Usage {
        match session.input_usage() {
            Some(tokens) => Usage::new().input_tokens(tokens),
            None => Usage::new(),
        }
    }
}

/// Tools to describe to the model under `choice`.
fn offered_tools(
    tools: &[ToolDefinition],
    choice: Option<&ToolChoice>,
    warnings: &mut Vec<CallWarning>,
) -> Vec<ToolDefinition> {
    match choice {
        Some(ToolChoice::None) => Vec::new(),
        Some(ToolChoice::Tool { tool_name }) => {
            let selected: Vec<ToolDefinition> = tools
                .iter()
                .filter(|t| t.name() == tool_name)
                .cloned()
                .collect();
            if selected.is_empty() {
                warnings.push(CallWarning::unsupported_tool(
                    tool_name.clone(),
                    Some("not among the provided tools".to_string()),
                ));
            }
            selected
        }
        _ => tools.to_vec(),
    }
}

#[async_trait]
impl LanguageModel for BrowserChatModel {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn provider(&self) -> &str {
        self.profile.kind.as_str()
    }

    fn profile(&self) -> &PlatformProfile {
        &self.profile
    }

    async fn do_generate(&self, options: CallOptions) -> ModelResult<GenerateResult> {
        let abort = options.abort.clone().unwrap_or_default();
        let PreparedCall {
            session_options,
            messages,
            prompt,
            warnings,
        } = self.prepare(&options)?;

        let session = tokio::select! {
            biased;
            _ = abort.cancelled() => return Err(ModelError::Aborted),
            session = self.sessions.get_session(Some(&session_options)) => session?,
        };

        debug!(model = %self.model_id, messages = messages.len(), "Generating");
        let text = tokio::select! {
            biased;
            _ = abort.cancelled() => return Err(ModelError::Aborted),
            text = session.prompt(messages, prompt) => text?,
        };

        let parsed = self.parser.parse(&text);
        let (content, finish_reason) = if parsed.has_tool_calls() {
            let mut content = Vec::with_capacity(parsed.tool_calls.len() + 1);
            if !parsed.text_content.is_empty() {
                content.push(ContentPart::text(parsed.text_content));
            }
            content.extend(parsed.tool_calls.into_iter().map(|call| {
                ContentPart::tool_call(call.tool_call_id, call.tool_name, call.args)
            }));
            (content, FinishReason::ToolCalls)
        } else if text.is_empty() {
            (Vec::new(), FinishReason::Stop)
        } else {
            (vec![ContentPart::text(text)], FinishReason::Stop)
        };

        info!(
            model = %self.model_id,
            finish_reason = %finish_reason,
            parts = content.len(),
            "Generation complete"
        );
        Ok(GenerateResult {
            content,
            finish_reason,
            usage: Self::usage(&session),
            warnings,
        })
    }

    async fn do_stream(&self, options: CallOptions) -> ModelResult<ChatStream> {
        let abort = options.abort.clone().unwrap_or_default();
        let PreparedCall {
            session_options,
            messages,
            prompt,
            warnings,
        } = self.prepare(&options)?;

        let session = tokio::select! {
            biased;
            _ = abort.cancelled() => return Err(ModelError::Aborted),
            session = self.sessions.get_session(Some(&session_options)) => session?,
        };

        debug!(model = %self.model_id, messages = messages.len(), "Streaming");
        let tokens = tokio::select! {
            biased;
            _ = abort.cancelled() => return Err(ModelError::Aborted),
            tokens = session.prompt_streaming(messages, prompt) => tokens?,
        };

        Ok(spawn_chat_stream(
            tokens,
            StreamSetup {
                warnings,
                parser: self.parser.clone(),
                session,
                abort,
            },
        ))
    }
}

impl std::fmt::Debug for BrowserChatModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BrowserChatModel")
            .field("model_id", &self.model_id)
            .field("profile", &self.profile)
            .field("sessions", &self.sessions)
            .finish()
    }
}
