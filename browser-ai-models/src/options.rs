//! Session creation options.

use crate::platform::{CreateSessionRequest, ExpectedInput, PlatformMessage};
use crate::progress::{ProgressMonitor, ProgressSink};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::fmt;
use std::sync::Arc;

/// Keys that configure this crate rather than the platform, never forwarded.
pub const INTERNAL_OPTION_KEYS: &[&str] = &["onDownloadProgress", "modelId", "signal"];

/// Options for creating a session.
///
/// Known fields are typed; anything else lands in `extra` and is passed to the
/// platform as is.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionOptions {
    /// Sampling temperature.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,

    /// Top-k sampling.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u64>,

    /// System prompt, sent to the session as its initial prompt.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,

    /// Media kinds the caller intends to send.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_inputs: Option<Vec<ExpectedInput>>,

    /// Platform-specific options.
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,

    /// Receives download progress while the session initialises.
    #[serde(skip)]
    pub on_download_progress: Option<Arc<dyn ProgressSink>>,
}

impl SessionOptions {
    /// Create empty options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set temperature.
    #[must_use]
    pub fn temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set top-k.
    #[must_use]
    pub fn top_k(mut self, k: u64) -> Self {
        self.top_k = Some(k);
        self
    }

    /// Set the system prompt.
    #[must_use]
    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    /// Set the expected inputs.
    #[must_use]
    pub fn expected_inputs(mut self, inputs: Vec<ExpectedInput>) -> Self {
        self.expected_inputs = Some(inputs);
        self
    }

    /// Set a platform-specific option.
    #[must_use]
    pub fn extra(mut self, key: impl Into<String>, value: JsonValue) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    /// Set the progress sink.
    #[must_use]
    pub fn on_download_progress(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.on_download_progress = Some(sink);
        self
    }

    /// Merge with another set of options, preferring values from `other`.
    ///
    /// The merge is shallow: an `extra` key in `other` replaces the whole
    /// value, nested objects are not combined.
    #[must_use]
    pub fn merge(&self, other: &SessionOptions) -> SessionOptions {
        let mut extra = self.extra.clone();
        for (key, value) in &other.extra {
            extra.insert(key.clone(), value.clone());
        }
        SessionOptions {
            temperature: other.temperature.or(self.temperature),
            top_k: other.top_k.or(self.top_k),
            system_prompt: other
                .system_prompt
                .clone()
                .or_else(|| self.system_prompt.clone()),
            expected_inputs: other
                .expected_inputs
                .clone()
                .or_else(|| self.expected_inputs.clone()),
            extra,
            on_download_progress: other
                .on_download_progress
                .clone()
                .or_else(|| self.on_download_progress.clone()),
        }
    }

    /// Translate into a platform request.
    ///
    /// The system prompt becomes the initial prompt, the progress sink is
    /// wrapped in a fresh [`ProgressMonitor`] and internal keys are dropped.
    #[must_use]
    pub fn into_request(self) -> CreateSessionRequest {
        let mut extra = self.extra;
        for key in INTERNAL_OPTION_KEYS {
            extra.remove(*key);
        }

        CreateSessionRequest {
            initial_prompts: self
                .system_prompt
                .filter(|s| !s.trim().is_empty())
                .map(PlatformMessage::system)
                .into_iter()
                .collect(),
            temperature: self.temperature,
            top_k: self.top_k,
            expected_inputs: self.expected_inputs.unwrap_or_default(),
            extra,
            monitor: self.on_download_progress.map(ProgressMonitor::new),
        }
    }
}

impl fmt::Debug for SessionOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionOptions")
            .field("temperature", &self.temperature)
            .field("top_k", &self.top_k)
            .field("system_prompt", &self.system_prompt)
            .field("expected_inputs", &self.expected_inputs)
            .field("extra", &self.extra)
            .field("on_download_progress", &self.on_download_progress.is_some())
            .finish()
    }
}
