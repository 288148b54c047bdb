//! Direct generate and stream calls.
//!
//! Thin helpers for scripts and one-off queries: resolve a model from a
//! model string (through a [`ProviderRegistry`]) or take a model instance,
//! and run one call.
//!
//! # Examples
//!
//! ```rust
//! use browser_ai::direct::generate_text;
//! use browser_ai::prelude::*;
//! use std::sync::Arc;
//!
//! # tokio_test::block_on(async {
//! let registry = ProviderRegistry::new();
//! registry.register(Arc::new(BrowserAiProvider::web_llm(Arc::new(
//!     MockPlatform::new().with_tokens(["Paris."]),
//! ))));
//!
//! let result = generate_text(
//!     "web-llm:Llama-3.2-1B-Instruct-q4f16_1-MLC",
//!     &registry,
//!     CallOptions::new(vec![Message::user("Capital of France?")]),
//! )
//! .await
//! .unwrap();
//! assert_eq!(result.text(), "Paris.");
//! # });
//! ```

use browser_ai_models::{
    BoxedModel, CallOptions, ChatStream, GenerateResult, LanguageModel, ModelError,
};
use browser_ai_providers::{ProviderError, ProviderRegistry};
use std::sync::Arc;
use thiserror::Error;

/// Error type for direct calls.
#[derive(Debug, Error)]
pub enum DirectError {
    /// The model string could not be resolved.
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// The call failed.
    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    /// Runtime error (e.g., sync functions called in async context).
    #[error("Runtime error: {0}")]
    Runtime(String),
}

/// Model specification - a model string or a model instance.
#[derive(Clone)]
pub enum ModelSpec {
    /// Model string such as `web-llm:Phi-3.5-mini-instruct-q4f16_1-MLC`.
    Name(String),
    /// Pre-built model instance.
    Instance(BoxedModel),
}

impl From<&str> for ModelSpec {
    fn from(s: &str) -> Self {
        ModelSpec::Name(s.to_string())
    }
}

impl From<String> for ModelSpec {
    fn from(s: String) -> Self {
        ModelSpec::Name(s)
    }
}

impl From<BoxedModel> for ModelSpec {
    fn from(model: BoxedModel) -> Self {
        ModelSpec::Instance(model)
    }
}

impl ModelSpec {
    /// Wrap a concrete model.
    pub fn from_model<M: LanguageModel + 'static>(model: M) -> Self {
        ModelSpec::Instance(Arc::new(model))
    }

    fn resolve(self, registry: &ProviderRegistry) -> Result<BoxedModel, DirectError> {
        match self {
            ModelSpec::Name(name) => {
                let model: BoxedModel = registry.language_model(&name)?;
                Ok(model)
            }
            ModelSpec::Instance(model) => Ok(model),
        }
    }
}

impl std::fmt::Debug for ModelSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelSpec::Name(name) => f.debug_tuple("Name").field(name).finish(),
            ModelSpec::Instance(model) => f
                .debug_tuple("Instance")
                .field(&model.identifier())
                .finish(),
        }
    }
}

/// Generate a whole response.
pub async fn generate_text(
    model: impl Into<ModelSpec>,
    registry: &ProviderRegistry,
    options: CallOptions,
) -> Result<GenerateResult, DirectError> {
    let model = model.into().resolve(registry)?;
    Ok(model.do_generate(options).await?)
}

/// Stream a response.
pub async fn stream_text(
    model: impl Into<ModelSpec>,
    registry: &ProviderRegistry,
    options: CallOptions,
) -> Result<ChatStream, DirectError> {
    let model = model.into().resolve(registry)?;
    Ok(model.do_stream(options).await?)
}

/// Blocking [`generate_text`] on a fresh current-thread runtime.
///
/// Returns [`DirectError::Runtime`] when called from async code.
pub fn generate_text_sync(
    model: impl Into<ModelSpec>,
    registry: &ProviderRegistry,
    options: CallOptions,
) -> Result<GenerateResult, DirectError> {
    if tokio::runtime::Handle::try_current().is_ok() {
        return Err(DirectError::Runtime(
            "generate_text_sync cannot be called from async context; use generate_text".to_string(),
        ));
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| DirectError::Runtime(format!("Failed to create runtime: {e}")))?;
    runtime.block_on(generate_text(model, registry, options))
}

#[cfg(test)]
mod tests {
    use super::*;
    use browser_ai_core::{FinishReason, Message};
    use browser_ai_models::{web_llm_profile, BrowserChatModel, MockPlatform};
    use browser_ai_providers::BrowserAiProvider;
    use browser_ai_streaming::StreamPart;
    use futures::StreamExt;

    fn registry(tokens: &[&str]) -> ProviderRegistry {
        let registry = ProviderRegistry::new();
        registry.register(Arc::new(BrowserAiProvider::web_llm(Arc::new(
            MockPlatform::new().with_tokens(tokens.iter().copied()),
        ))));
        registry
    }

    #[test]
    fn test_model_spec_from_str() {
        let spec: ModelSpec = "web-llm:Phi-3.5".into();
        assert!(matches!(spec, ModelSpec::Name(ref s) if s == "web-llm:Phi-3.5"));
    }

    #[test]
    fn test_unknown_provider() {
        let err = generate_text_sync(
            "openai:gpt-4o",
            &registry(&[]),
            CallOptions::new(vec![Message::user("Hi")]),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            DirectError::Provider(ProviderError::UnknownProvider(_))
        ));
    }

    #[test]
    fn test_generate_text_sync() {
        let result = generate_text_sync(
            "Llama-3.2-1B-Instruct-q4f16_1-MLC",
            &registry(&["Hello"]),
            CallOptions::new(vec![Message::user("Hi")]),
        )
        .unwrap();
        assert_eq!(result.text(), "Hello");
    }

    #[tokio::test]
    async fn test_sync_rejected_in_async_context() {
        let err = generate_text_sync(
            "web-llm:m",
            &registry(&[]),
            CallOptions::new(vec![Message::user("Hi")]),
        )
        .unwrap_err();
        assert!(matches!(err, DirectError::Runtime(_)));
    }

    #[tokio::test]
    async fn test_stream_with_instance() {
        let model = BrowserChatModel::new(
            "m",
            Arc::new(MockPlatform::new().with_tokens(["a", "b"])),
            web_llm_profile(),
        );
        let parts: Vec<StreamPart> = stream_text(
            ModelSpec::from_model(model),
            &ProviderRegistry::new(),
            CallOptions::new(vec![Message::user("Hi")]),
        )
        .await
        .unwrap()
        .collect()
        .await;

        assert_eq!(
            parts.last().and_then(StreamPart::finish_reason),
            Some(FinishReason::Stop)
        );
    }
}
