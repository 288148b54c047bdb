//! Provider abstractions for browser-ai.
//!
//! A provider creates chat models for one in-browser platform:
//!
//! - **prompt-api** - the browser's built-in model (aliases `chrome`, `builtin`)
//! - **transformers** - Transformers.js ONNX models (alias `transformers-js`)
//! - **web-llm** - WebLLM MLC-compiled models (alias `webllm`)
//!
//! Each provider owns an explicit [`ModelCache`], so asking twice for the
//! same model id and options returns the same model (and the same session).
//!
//! ## Example
//!
//! ```rust
//! use browser_ai_models::MockPlatform;
//! use browser_ai_providers::{BrowserAiProvider, ProviderRegistry};
//! use std::sync::Arc;
//!
//! let registry = ProviderRegistry::new();
//! registry.register(Arc::new(BrowserAiProvider::web_llm(Arc::new(MockPlatform::new()))));
//!
//! let model = registry.language_model("Llama-3.2-1B-Instruct-q4f16_1-MLC").unwrap();
//! let again = registry.language_model("web-llm:Llama-3.2-1B-Instruct-q4f16_1-MLC").unwrap();
//! assert!(Arc::ptr_eq(&model, &again));
//! ```
//!
//! ## Model Strings
//!
//! - `web-llm:Llama-3.2-1B-Instruct-q4f16_1-MLC` - explicit provider
//! - `prompt-api` - the provider's default model
//! - `onnx-community/Qwen2.5-0.5B-Instruct` - inferred as Transformers.js

#![warn(missing_docs)]
#![deny(unsafe_code)]

mod cache;
mod config;
mod provider;
mod registry;

// Re-exports
pub use cache::{CacheKey, ModelCache};
pub use config::ProviderConfig;
pub use provider::{
    BoxedProvider, BrowserAiProvider, Provider, ProviderError, PROMPT_API_DEFAULT_MODEL,
};
pub use registry::{infer_kind_from_model_id, ProviderRegistry};

/// Prelude for common imports.
pub mod prelude {
    pub use crate::{BrowserAiProvider, ModelCache, Provider, ProviderConfig, ProviderRegistry};
}
