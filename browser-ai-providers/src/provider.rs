//! Provider trait and the browser provider.
//!
//! A provider is a factory for chat models on one platform kind. It owns the
//! platform handle, the configuration, and the model cache.

use crate::cache::{CacheKey, ModelCache};
use crate::config::ProviderConfig;
use browser_ai_models::{
    Availability, BrowserChatModel, LanguageModelPlatform, PlatformKind, PlatformProfile,
    SessionManager, SessionOptions,
};
use browser_ai_tools::ToolCallParser;
use std::sync::Arc;
use tracing::debug;

/// Model id the prompt API uses for its built-in model.
pub const PROMPT_API_DEFAULT_MODEL: &str = "text";

/// Provider trait - creates chat models for one platform.
pub trait Provider: Send + Sync + std::fmt::Debug {
    /// Provider name (e.g., "web-llm", "prompt-api").
    fn name(&self) -> &str;

    /// The platform kind.
    fn kind(&self) -> PlatformKind;

    /// Whether the platform exists in this environment.
    fn is_supported(&self) -> bool;

    /// Get a model with the provider's default session options.
    fn language_model(&self, model_id: &str) -> Result<Arc<BrowserChatModel>, ProviderError>;

    /// Get the default model.
    fn default_model(&self) -> Result<Arc<BrowserChatModel>, ProviderError>;

    /// Get alternate names for this provider.
    fn aliases(&self) -> &[&str] {
        &[]
    }
}

/// Type alias for boxed providers.
pub type BoxedProvider = Arc<dyn Provider>;

/// Provider for one in-browser platform.
pub struct BrowserAiProvider {
    kind: PlatformKind,
    platform: Arc<dyn LanguageModelPlatform>,
    config: ProviderConfig,
    cache: ModelCache,
}

impl std::fmt::Debug for BrowserAiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BrowserAiProvider")
            .field("kind", &self.kind)
            .field("platform", &self.platform.name())
            .field("config", &self.config)
            .field("cached_models", &self.cache.len())
            .finish()
    }
}

impl BrowserAiProvider {
    /// Create a provider for `kind` running on `platform`.
    pub fn new(kind: PlatformKind, platform: Arc<dyn LanguageModelPlatform>) -> Self {
        Self {
            kind,
            platform,
            config: ProviderConfig::default(),
            cache: ModelCache::new(),
        }
    }

    /// The browser's built-in prompt API.
    pub fn prompt_api(platform: Arc<dyn LanguageModelPlatform>) -> Self {
        Self::new(PlatformKind::PromptApi, platform)
            .with_config(ProviderConfig::new().with_default_model(PROMPT_API_DEFAULT_MODEL))
    }

    /// Transformers.js.
    pub fn transformers(platform: Arc<dyn LanguageModelPlatform>) -> Self {
        Self::new(PlatformKind::Transformers, platform)
    }

    /// WebLLM.
    pub fn web_llm(platform: Arc<dyn LanguageModelPlatform>) -> Self {
        Self::new(PlatformKind::WebLlm, platform)
    }

    /// Replace the configuration. Cached models are kept.
    #[must_use]
    pub fn with_config(mut self, config: ProviderConfig) -> Self {
        self.config = config;
        self
    }

    /// The configuration.
    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    /// The model cache.
    pub fn cache(&self) -> &ModelCache {
        &self.cache
    }

    /// The platform.
    pub fn platform(&self) -> &Arc<dyn LanguageModelPlatform> {
        &self.platform
    }

    /// Profile for models of this provider.
    ///
    /// Media support is dropped when the platform reports it cannot take
    /// media input.
    #[must_use]
    pub fn profile(&self) -> PlatformProfile {
        let profile = self.kind.profile();
        if self.platform.supports_media() {
            profile
        } else {
            profile.with_images(false).with_audio(false)
        }
    }

    /// Check availability with the provider's default options.
    pub async fn check_availability(&self) -> Availability {
        SessionManager::new(Arc::clone(&self.platform), self.config.session_defaults.clone())
            .check_availability()
            .await
    }

    /// Get a model whose sessions start from `options` layered over the
    /// provider's defaults.
    pub fn language_model_with(
        &self,
        model_id: &str,
        options: &SessionOptions,
    ) -> Result<Arc<BrowserChatModel>, ProviderError> {
        let model_id = model_id.trim();
        if model_id.is_empty() {
            return Err(ProviderError::InvalidModelString(model_id.to_string()));
        }
        let options = self.config.session_defaults.merge(options);

        if !self.config.cache_models {
            return Ok(Arc::new(self.build(model_id, options)));
        }
        let key = CacheKey::new(model_id, &options)?;
        Ok(self
            .cache
            .get_or_insert_with(key, || self.build(model_id, options)))
    }

    fn build(&self, model_id: &str, options: SessionOptions) -> BrowserChatModel {
        debug!(provider = self.kind.as_str(), model_id, "Creating model");
        BrowserChatModel::with_session_options(
            model_id,
            Arc::clone(&self.platform),
            self.profile(),
            options,
        )
        .with_parser(ToolCallParser::with_config(self.config.fence.clone()))
    }
}

impl Provider for BrowserAiProvider {
    fn name(&self) -> &str {
        self.kind.as_str()
    }

    fn kind(&self) -> PlatformKind {
        self.kind
    }

    fn is_supported(&self) -> bool {
        self.platform.is_supported()
    }

    fn language_model(&self, model_id: &str) -> Result<Arc<BrowserChatModel>, ProviderError> {
        self.language_model_with(model_id, &SessionOptions::default())
    }

    fn default_model(&self) -> Result<Arc<BrowserChatModel>, ProviderError> {
        match &self.config.default_model {
            Some(model_id) => self.language_model(model_id),
            None => Err(ProviderError::MissingConfig(format!(
                "{} has no default model",
                self.kind
            ))),
        }
    }

    fn aliases(&self) -> &[&str] {
        match self.kind {
            PlatformKind::PromptApi => &["chrome", "builtin"],
            PlatformKind::Transformers => &["transformers-js"],
            PlatformKind::WebLlm => &["webllm"],
        }
    }
}

/// Provider error types.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// Missing required configuration.
    #[error("Missing configuration: {0}")]
    MissingConfig(String),

    /// Unknown provider.
    #[error("Unknown provider: {0}")]
    UnknownProvider(String),

    /// Invalid model string format.
    #[error("Invalid model string: {0}")]
    InvalidModelString(String),

    /// Options could not be serialized for the cache key.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<ProviderError> for browser_ai_core::BrowserAiError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::Serialization(e) => Self::Serialization(e),
            other => Self::Configuration(other.to_string()),
        }
    }
}
