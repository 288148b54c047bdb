//! Provider registry for lookup and inference.
//!
//! The registry maintains a collection of providers and supports:
//! - Lookup by name or alias
//! - Model strings with a provider prefix (e.g., "web-llm:Llama-3.2-1B-Instruct-q4f16_1-MLC")
//! - Provider inference from well-known model id shapes

use crate::provider::{BoxedProvider, ProviderError};
use browser_ai_models::{BrowserChatModel, PlatformKind};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Registry for looking up providers by name.
#[derive(Debug, Default)]
pub struct ProviderRegistry {
    providers: RwLock<HashMap<String, BoxedProvider>>,
}

impl ProviderRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider under its name and aliases.
    pub fn register(&self, provider: BoxedProvider) {
        let mut providers = self.providers.write();
        for alias in provider.aliases() {
            providers.insert((*alias).to_string(), Arc::clone(&provider));
        }
        providers.insert(provider.name().to_string(), provider);
    }

    /// Get a provider by name.
    pub fn get(&self, name: &str) -> Option<BoxedProvider> {
        self.providers.read().get(name).cloned()
    }

    /// Check if a provider exists.
    pub fn contains(&self, name: &str) -> bool {
        self.providers.read().contains_key(name)
    }

    /// Registered names and aliases, sorted.
    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self.providers.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Resolve a model string to its provider and bare model id.
    ///
    /// `provider:model` picks the provider explicitly; a bare provider name
    /// selects that provider's default model (empty id); anything else is
    /// matched against well-known model id shapes.
    pub fn infer_provider(&self, model: &str) -> Result<(BoxedProvider, String), ProviderError> {
        if let Some((provider_name, model_id)) = model.split_once(':') {
            return match self.get(provider_name) {
                Some(provider) => Ok((provider, model_id.to_string())),
                None => Err(ProviderError::UnknownProvider(provider_name.to_string())),
            };
        }

        if let Some(provider) = self.get(model) {
            return Ok((provider, String::new()));
        }

        infer_kind_from_model_id(model)
            .and_then(|kind| self.get(kind.as_str()))
            .map(|provider| (provider, model.to_string()))
            .ok_or_else(|| ProviderError::InvalidModelString(model.to_string()))
    }

    /// Resolve a model string to a model.
    pub fn language_model(&self, model: &str) -> Result<Arc<BrowserChatModel>, ProviderError> {
        let (provider, model_id) = self.infer_provider(model)?;
        if model_id.is_empty() {
            provider.default_model()
        } else {
            provider.language_model(&model_id)
        }
    }

    /// Remove a provider name or alias.
    pub fn remove(&self, name: &str) -> Option<BoxedProvider> {
        self.providers.write().remove(name)
    }

    /// Clear all providers.
    pub fn clear(&self) {
        self.providers.write().clear();
    }
}

/// Infer the platform kind from a model id.
pub fn infer_kind_from_model_id(model_id: &str) -> Option<PlatformKind> {
    let lower = model_id.to_lowercase();

    // WebLLM prebuilt models carry the MLC suffix
    if lower.ends_with("-mlc") || lower.contains("-mlc-") {
        return Some(PlatformKind::WebLlm);
    }

    // Transformers.js models come from the hub
    if lower.starts_with("onnx-community/") || lower.starts_with("xenova/") {
        return Some(PlatformKind::Transformers);
    }

    // Built-in browser model
    if lower == "text" || lower.starts_with("gemini-nano") {
        return Some(PlatformKind::PromptApi);
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{BrowserAiProvider, Provider};
    use browser_ai_models::{LanguageModel, MockPlatform};
    use rstest::rstest;

    fn registry() -> ProviderRegistry {
        let registry = ProviderRegistry::new();
        registry.register(Arc::new(BrowserAiProvider::web_llm(Arc::new(MockPlatform::new()))));
        registry.register(Arc::new(BrowserAiProvider::prompt_api(Arc::new(
            MockPlatform::new(),
        ))));
        registry
    }

    #[test]
    fn test_lookup_by_name_and_alias() {
        let registry = registry();
        assert!(registry.contains("web-llm"));
        assert_eq!(registry.get("webllm").unwrap().name(), "web-llm");
        assert_eq!(registry.get("chrome").unwrap().name(), "prompt-api");
        assert!(registry.get("transformers").is_none());
        assert!(registry.list().contains(&"builtin".to_string()));
    }

    #[test]
    fn test_explicit_prefix() {
        let registry = registry();
        let (provider, model) = registry.infer_provider("web-llm:Phi-3.5-mini").unwrap();
        assert_eq!(provider.name(), "web-llm");
        assert_eq!(model, "Phi-3.5-mini");

        assert!(matches!(
            registry.infer_provider("openai:gpt-4o"),
            Err(ProviderError::UnknownProvider(_))
        ));
    }

    #[test]
    fn test_bare_provider_uses_default_model() {
        let registry = registry();
        let model = registry.language_model("prompt-api").unwrap();
        assert_eq!(model.model_id(), "text");
        assert_eq!(model.identifier(), "prompt-api:text");
    }

    #[test]
    fn test_inferred_provider_shares_cached_model() {
        let registry = registry();
        let a = registry
            .language_model("Llama-3.2-1B-Instruct-q4f16_1-MLC")
            .unwrap();
        let b = registry
            .language_model("web-llm:Llama-3.2-1B-Instruct-q4f16_1-MLC")
            .unwrap();
        assert!(Arc::ptr_eq(&a, &b));

        assert!(matches!(
            registry.language_model("mystery-model"),
            Err(ProviderError::InvalidModelString(_))
        ));
    }

    #[rstest]
    #[case("Llama-3.2-1B-Instruct-q4f16_1-MLC", Some(PlatformKind::WebLlm))]
    #[case("Qwen2.5-0.5B-Instruct-q4f16_1-MLC-1k", Some(PlatformKind::WebLlm))]
    #[case("onnx-community/Qwen2.5-0.5B-Instruct", Some(PlatformKind::Transformers))]
    #[case("Xenova/distilgpt2", Some(PlatformKind::Transformers))]
    #[case("text", Some(PlatformKind::PromptApi))]
    #[case("gemini-nano", Some(PlatformKind::PromptApi))]
    #[case("gpt-4o", None)]
    fn test_infer_kind(#[case] model_id: &str, #[case] expected: Option<PlatformKind>) {
        assert_eq!(infer_kind_from_model_id(model_id), expected);
    }
}
