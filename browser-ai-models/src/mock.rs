//! Mock platform for testing.
//!
//! [`MockPlatform`] records every constructor call, relays scripted download
//! progress, and hands out [`MockSession`]s that answer with scripted
//! fragments. Sessions flag when their token stream is dropped, so tests can
//! assert that a reader was released.
//!
//! ```rust
//! use browser_ai_models::MockPlatform;
//!
//! let platform = MockPlatform::new()
//!     .with_tokens(["Hello", ", world"])
//!     .with_input_usage(12);
//! assert_eq!(platform.create_calls(), 0);
//! ```

use crate::error::PlatformError;
use crate::options::SessionOptions;
use crate::platform::{
    Availability, CreateSessionRequest, LanguageModelPlatform, LanguageModelSession,
    PlatformMessage, PromptOptions, TokenStream,
};
use crate::progress::ProgressReport;
use async_trait::async_trait;
use futures::{stream, StreamExt};
use parking_lot::Mutex;
use serde_json::{Map, Value as JsonValue};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// What a mock session answers with.
#[derive(Debug, Clone, Default)]
pub struct MockScript {
    /// Fragments yielded in order.
    pub tokens: Vec<String>,
    /// Fail with this message after this many fragments.
    pub error_after: Option<(usize, String)>,
    /// Keep the stream open after the last fragment.
    pub hold_open: bool,
    /// Reported input usage.
    pub input_usage: Option<u64>,
}

/// A constructor call seen by [`MockPlatform`].
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    /// Initial prompts passed.
    pub initial_prompts: Vec<PlatformMessage>,
    /// Temperature passed.
    pub temperature: Option<f64>,
    /// Top-k passed.
    pub top_k: Option<u64>,
    /// Extra options passed.
    pub extra: Map<String, JsonValue>,
    /// Whether a progress monitor was attached.
    pub had_monitor: bool,
}

/// A scripted platform.
#[derive(Debug)]
pub struct MockPlatform {
    name: String,
    supported: bool,
    availability: Availability,
    failing_availability: bool,
    supports_media: bool,
    progress: Vec<ProgressReport>,
    create_delay: Option<Duration>,
    create_failures: AtomicUsize,
    failing_destroy: bool,
    script: MockScript,
    create_calls: AtomicUsize,
    requests: Mutex<Vec<RecordedRequest>>,
    sessions: Mutex<Vec<Arc<MockSession>>>,
}

impl Default for MockPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl MockPlatform {
    /// Create a supported platform whose model is available.
    pub fn new() -> Self {
        Self {
            name: "mock".to_string(),
            supported: true,
            availability: Availability::Available,
            failing_availability: false,
            supports_media: false,
            progress: Vec::new(),
            create_delay: None,
            create_failures: AtomicUsize::new(0),
            failing_destroy: false,
            script: MockScript::default(),
            create_calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
            sessions: Mutex::new(Vec::new()),
        }
    }

    /// Set the platform name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Report the platform as absent.
    #[must_use]
    pub fn unsupported(mut self) -> Self {
        self.supported = false;
        self
    }

    /// Set the availability result.
    #[must_use]
    pub fn with_availability(mut self, availability: Availability) -> Self {
        self.availability = availability;
        self
    }

    /// Make the availability check fail.
    #[must_use]
    pub fn with_failing_availability(mut self) -> Self {
        self.failing_availability = true;
        self
    }

    /// Accept media input.
    #[must_use]
    pub fn with_media(mut self) -> Self {
        self.supports_media = true;
        self
    }

    /// Progress reported during each construction.
    #[must_use]
    pub fn with_progress(mut self, reports: impl IntoIterator<Item = ProgressReport>) -> Self {
        self.progress = reports.into_iter().collect();
        self
    }

    /// Delay each construction.
    #[must_use]
    pub fn with_create_delay(mut self, delay: Duration) -> Self {
        self.create_delay = Some(delay);
        self
    }

    /// Fail the next `count` constructions.
    #[must_use]
    pub fn with_create_failures(self, count: usize) -> Self {
        self.create_failures.store(count, Ordering::SeqCst);
        self
    }

    /// Make `destroy` fail on every session.
    #[must_use]
    pub fn with_failing_destroy(mut self) -> Self {
        self.failing_destroy = true;
        self
    }

    /// Fragments every session answers with.
    #[must_use]
    pub fn with_tokens<S: Into<String>>(mut self, tokens: impl IntoIterator<Item = S>) -> Self {
        self.script.tokens = tokens.into_iter().map(Into::into).collect();
        self
    }

    /// Fail the stream after `after` fragments.
    #[must_use]
    pub fn with_stream_error(mut self, after: usize, message: impl Into<String>) -> Self {
        self.script.error_after = Some((after, message.into()));
        self
    }

    /// Keep streams (and whole prompts) pending after the scripted fragments.
    #[must_use]
    pub fn holding_stream_open(mut self) -> Self {
        self.script.hold_open = true;
        self
    }

    /// Input usage reported by sessions.
    #[must_use]
    pub fn with_input_usage(mut self, tokens: u64) -> Self {
        self.script.input_usage = Some(tokens);
        self
    }

    /// Number of constructor calls.
    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    /// Constructor calls, in order.
    pub fn recorded_requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().clone()
    }

    /// Sessions created, in order.
    pub fn sessions(&self) -> Vec<Arc<MockSession>> {
        self.sessions.lock().clone()
    }

    /// The most recent session.
    pub fn last_session(&self) -> Option<Arc<MockSession>> {
        self.sessions.lock().last().cloned()
    }

    /// Number of sessions destroyed.
    pub fn destroyed_sessions(&self) -> usize {
        self.sessions
            .lock()
            .iter()
            .filter(|s| s.is_destroyed())
            .count()
    }
}

#[async_trait]
impl LanguageModelPlatform for MockPlatform {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_supported(&self) -> bool {
        self.supported
    }

    async fn availability(&self, _options: &SessionOptions) -> Result<Availability, PlatformError> {
        if self.failing_availability {
            return Err(PlatformError::new("availability check failed"));
        }
        Ok(self.availability)
    }

    async fn create_session(
        &self,
        request: CreateSessionRequest,
    ) -> Result<Arc<dyn LanguageModelSession>, PlatformError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().push(RecordedRequest {
            initial_prompts: request.initial_prompts.clone(),
            temperature: request.temperature,
            top_k: request.top_k,
            extra: request.extra.clone(),
            had_monitor: request.monitor.is_some(),
        });

        if let Some(monitor) = &request.monitor {
            for report in &self.progress {
                monitor.report(*report);
            }
        }
        if let Some(delay) = self.create_delay {
            tokio::time::sleep(delay).await;
        }

        let failing = self
            .create_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(PlatformError::new("model failed to load"));
        }

        let session = Arc::new(MockSession::new(self.script.clone(), self.failing_destroy));
        self.sessions.lock().push(Arc::clone(&session));
        Ok(session)
    }

    fn supports_media(&self) -> bool {
        self.supports_media
    }
}

/// A scripted session.
#[derive(Debug)]
pub struct MockSession {
    script: MockScript,
    failing_destroy: bool,
    destroyed: AtomicBool,
    destroy_calls: AtomicUsize,
    prompts: Mutex<Vec<(Vec<PlatformMessage>, PromptOptions)>>,
    reader_dropped: Arc<AtomicBool>,
    fragments_pulled: Arc<AtomicUsize>,
}

impl MockSession {
    /// Create a session answering with `script`.
    pub fn new(script: MockScript, failing_destroy: bool) -> Self {
        Self {
            script,
            failing_destroy,
            destroyed: AtomicBool::new(false),
            destroy_calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
            reader_dropped: Arc::new(AtomicBool::new(false)),
            fragments_pulled: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Prompts received, in order.
    pub fn prompts(&self) -> Vec<(Vec<PlatformMessage>, PromptOptions)> {
        self.prompts.lock().clone()
    }

    /// Whether `destroy` was called.
    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::SeqCst)
    }

    /// Number of times `destroy` was called.
    pub fn destroy_calls(&self) -> usize {
        self.destroy_calls.load(Ordering::SeqCst)
    }

    /// Whether the last token stream handed out has been dropped.
    pub fn reader_dropped(&self) -> bool {
        self.reader_dropped.load(Ordering::SeqCst)
    }

    /// Fragments pulled from token streams so far.
    pub fn fragments_pulled(&self) -> usize {
        self.fragments_pulled.load(Ordering::SeqCst)
    }

    fn scripted_items(&self) -> Vec<Result<String, PlatformError>> {
        let mut items: Vec<_> = self.script.tokens.iter().cloned().map(Ok).collect();
        if let Some((after, message)) = &self.script.error_after {
            items.truncate(*after);
            items.push(Err(PlatformError::new(message.clone())));
        }
        items
    }
}

struct DropFlag(Arc<AtomicBool>);

impl Drop for DropFlag {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl LanguageModelSession for MockSession {
    async fn prompt(
        &self,
        messages: Vec<PlatformMessage>,
        options: PromptOptions,
    ) -> Result<String, PlatformError> {
        self.prompts.lock().push((messages, options));
        if self.script.hold_open {
            futures::future::pending::<()>().await;
        }
        self.scripted_items().into_iter().collect()
    }

    async fn prompt_streaming(
        &self,
        messages: Vec<PlatformMessage>,
        options: PromptOptions,
    ) -> Result<TokenStream, PlatformError> {
        self.prompts.lock().push((messages, options));
        self.reader_dropped.store(false, Ordering::SeqCst);

        let guard = DropFlag(Arc::clone(&self.reader_dropped));
        let pulled = Arc::clone(&self.fragments_pulled);
        let fragments = stream::iter(self.scripted_items()).map(move |item| {
            let _held = &guard;
            pulled.fetch_add(1, Ordering::SeqCst);
            item
        });

        if self.script.hold_open {
            Ok(Box::pin(fragments.chain(stream::pending())))
        } else {
            Ok(Box::pin(fragments))
        }
    }

    fn supports_destroy(&self) -> bool {
        true
    }

    async fn destroy(&self) -> Result<(), PlatformError> {
        self.destroyed.store(true, Ordering::SeqCst);
        self.destroy_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_destroy {
            return Err(PlatformError::new("destroy failed"));
        }
        Ok(())
    }

    fn input_usage(&self) -> Option<u64> {
        self.script.input_usage
    }
}
