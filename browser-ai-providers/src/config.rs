//! Provider configuration.

use browser_ai_models::SessionOptions;
use browser_ai_streaming::FenceConfig;
use serde::{Deserialize, Serialize};

/// Configuration for a browser provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProviderConfig {
    /// Model used when a model string names only the provider.
    pub default_model: Option<String>,
    /// Options every session created by this provider starts from.
    pub session_defaults: SessionOptions,
    /// Tool-call fence markers.
    pub fence: FenceConfig,
    /// Reuse model instances for identical `(model id, options)` pairs.
    pub cache_models: bool,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            default_model: None,
            session_defaults: SessionOptions::default(),
            fence: FenceConfig::default(),
            cache_models: true,
        }
    }
}

impl ProviderConfig {
    /// Create a new config.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the default model.
    #[must_use]
    pub fn with_default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = Some(model.into());
        self
    }

    /// Set the session defaults.
    #[must_use]
    pub fn with_session_defaults(mut self, options: SessionOptions) -> Self {
        self.session_defaults = options;
        self
    }

    /// Set the fence markers.
    #[must_use]
    pub fn with_fence(mut self, fence: FenceConfig) -> Self {
        self.fence = fence.normalized();
        self
    }

    /// Enable or disable the model cache.
    #[must_use]
    pub fn with_model_cache(mut self, enabled: bool) -> Self {
        self.cache_models = enabled;
        self
    }

    /// Load overrides from environment variables with the given prefix.
    ///
    /// Looks for:
    /// - `{PREFIX}_DEFAULT_MODEL`
    /// - `{PREFIX}_TEMPERATURE`
    /// - `{PREFIX}_TOP_K`
    ///
    /// Values that fail to parse are ignored.
    #[must_use]
    pub fn from_env(prefix: &str) -> Self {
        let var = |name: &str| std::env::var(format!("{prefix}_{name}")).ok();
        let mut config = Self::default();
        config.default_model = var("DEFAULT_MODEL");
        config.session_defaults.temperature = var("TEMPERATURE").and_then(|v| v.parse().ok());
        config.session_defaults.top_k = var("TOP_K").and_then(|v| v.parse().ok());
        config
    }

    /// Parse a JSON document.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        let mut config: Self = serde_json::from_str(json)?;
        config.fence = config.fence.normalized();
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = ProviderConfig::new();
        assert!(config.cache_models);
        assert_eq!(config.fence, FenceConfig::default());
        assert!(config.default_model.is_none());
    }

    #[test]
    fn test_from_json() {
        let config = ProviderConfig::from_json(
            r#"{
                "defaultModel": "Llama-3.2-1B-Instruct-q4f16_1-MLC",
                "sessionDefaults": {"temperature": 0.3, "contextWindow": 4096},
                "cacheModels": false
            }"#,
        )
        .unwrap();

        assert_eq!(
            config.default_model.as_deref(),
            Some("Llama-3.2-1B-Instruct-q4f16_1-MLC")
        );
        assert_eq!(config.session_defaults.temperature, Some(0.3));
        assert_eq!(config.session_defaults.extra["contextWindow"], 4096);
        assert!(!config.cache_models);
        assert_eq!(config.fence, FenceConfig::default());
    }

    #[test]
    fn test_from_env() {
        std::env::set_var("BROWSER_AI_TEST_DEFAULT_MODEL", "gemini-nano");
        std::env::set_var("BROWSER_AI_TEST_TEMPERATURE", "0.7");
        std::env::set_var("BROWSER_AI_TEST_TOP_K", "not-a-number");

        let config = ProviderConfig::from_env("BROWSER_AI_TEST");
        assert_eq!(config.default_model.as_deref(), Some("gemini-nano"));
        assert_eq!(config.session_defaults.temperature, Some(0.7));
        assert_eq!(config.session_defaults.top_k, None);

        std::env::remove_var("BROWSER_AI_TEST_DEFAULT_MODEL");
        std::env::remove_var("BROWSER_AI_TEST_TEMPERATURE");
        std::env::remove_var("BROWSER_AI_TEST_TOP_K");
    }
}
