//! Streaming chat orchestration.
//!
//! A spawned task reads platform fragments, runs them through a
//! [`FenceDetector`], and sends [`StreamPart`]s over a channel. Prose becomes
//! text parts; a fence becomes tool-input parts while it streams and
//! tool-call parts once it closes. After the first fence that yields calls
//! the platform reader is dropped and the stream finishes with
//! [`FinishReason::ToolCalls`]; text the model wrote after the fence is not
//! forwarded.

use crate::error::PlatformError;
use crate::platform::TokenStream;
use crate::session::SessionHandle;
use browser_ai_core::{
    generate_text_id, generate_tool_call_id, CallWarning, FinishReason, Usage,
};
use browser_ai_streaming::{
    FenceDetector, StreamError, StreamPart, StreamingFenceDetection, ToolInputTracker,
};
use browser_ai_tools::{parse_fence_payload, ToolCallParser, ToolCallRecord};
use futures::{Stream, StreamExt};
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Stream of parts returned by a streaming call.
///
/// Dropping it stops the producer task and releases the platform reader.
pub struct ChatStream {
    inner: ReceiverStream<StreamPart>,
}

impl ChatStream {
    /// Wrap a receiver.
    pub fn new(rx: mpsc::Receiver<StreamPart>) -> Self {
        Self {
            inner: ReceiverStream::new(rx),
        }
    }
}

impl Stream for ChatStream {
    type Item = StreamPart;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

impl std::fmt::Debug for ChatStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatStream").finish_non_exhaustive()
    }
}

/// Everything the producer task needs besides the fragments.
pub(crate) struct StreamSetup {
    pub warnings: Vec<CallWarning>,
    pub parser: ToolCallParser,
    pub session: SessionHandle,
    pub abort: CancellationToken,
}

/// Spawn the producer task over `tokens`.
pub(crate) fn spawn_chat_stream(tokens: TokenStream, setup: StreamSetup) -> ChatStream {
    let (tx, rx) = mpsc::channel(64);
    let StreamSetup {
        warnings,
        parser,
        session,
        abort,
    } = setup;

    let orchestrator = Orchestrator {
        tx,
        detector: FenceDetector::with_config(parser.config().clone()),
        parser,
        session,
        text_id: None,
        tool_input: None,
        calls_emitted: 0,
        finished: false,
    };
    tokio::spawn(orchestrator.run(tokens, warnings, abort));
    ChatStream::new(rx)
}

/// The consumer went away.
#[derive(Debug)]
struct ReceiverGone;

enum Flow {
    Continue,
    ToolCallsEmitted,
}

enum Next {
    Aborted,
    ConsumerGone,
    Fragment(Option<Result<String, PlatformError>>),
}

/// The tool call being streamed from the current fence.
struct ActiveToolInput {
    id: String,
    tracker: ToolInputTracker,
    started: bool,
    pending_args: String,
}

impl ActiveToolInput {
    fn new() -> Self {
        Self {
            id: generate_tool_call_id(),
            tracker: ToolInputTracker::new(),
            started: false,
            pending_args: String::new(),
        }
    }
}

struct Orchestrator {
    tx: mpsc::Sender<StreamPart>,
    detector: FenceDetector,
    parser: ToolCallParser,
    session: SessionHandle,
    text_id: Option<String>,
    tool_input: Option<ActiveToolInput>,
    calls_emitted: usize,
    finished: bool,
}

impl Orchestrator {
    async fn run(mut self, mut tokens: TokenStream, warnings: Vec<CallWarning>, abort: CancellationToken) {
        if self.send(StreamPart::stream_start(warnings)).await.is_err() {
            return;
        }

        loop {
            let next = tokio::select! {
                biased;
                _ = abort.cancelled() => Next::Aborted,
                _ = self.tx.closed() => Next::ConsumerGone,
                fragment = tokens.next() => Next::Fragment(fragment),
            };

            let outcome = match next {
                Next::ConsumerGone => Err(ReceiverGone),
                Next::Aborted => {
                    drop(tokens);
                    self.finish_aborted().await
                }
                Next::Fragment(Some(Ok(fragment))) => match self.on_fragment(&fragment).await {
                    Ok(Flow::Continue) => continue,
                    Ok(Flow::ToolCallsEmitted) => {
                        drop(tokens);
                        self.finish_tool_calls().await
                    }
                    Err(gone) => Err(gone),
                },
                Next::Fragment(Some(Err(e))) if e.is_abort => {
                    drop(tokens);
                    self.finish_aborted().await
                }
                Next::Fragment(Some(Err(e))) => {
                    drop(tokens);
                    self.finish_failed(e).await
                }
                Next::Fragment(None) => match self.on_end_of_input().await {
                    Ok(Flow::ToolCallsEmitted) => self.finish_tool_calls().await,
                    Ok(Flow::Continue) => self.finish_end_of_stream().await,
                    Err(gone) => Err(gone),
                },
            };

            if outcome.is_err() {
                debug!("Stream consumer dropped; stopping");
            }
            return;
        }
    }

    async fn on_fragment(&mut self, fragment: &str) -> Result<Flow, ReceiverGone> {
        self.detector.add_chunk(fragment);

        loop {
            let detection = self.detector.detect_streaming_fence();
            if !detection.made_progress() {
                return Ok(Flow::Continue);
            }
            if let Flow::ToolCallsEmitted = self.on_detection(detection).await? {
                return Ok(Flow::ToolCallsEmitted);
            }
        }
    }

    /// The platform stream ended; a fence closed by the last line completes here.
    async fn on_end_of_input(&mut self) -> Result<Flow, ReceiverGone> {
        let detection = self.detector.finish();
        self.on_detection(detection).await
    }

    async fn on_detection(&mut self, detection: StreamingFenceDetection) -> Result<Flow, ReceiverGone> {
        if !detection.safe_content.is_empty() {
            self.emit_text(&detection.safe_content).await?;
        }
        if detection.fence_started {
            self.tool_input = Some(ActiveToolInput::new());
        }
        if !detection.fence_delta.is_empty() {
            self.on_fence_delta(&detection.fence_delta).await?;
        }

        let Some(fence) = detection.complete_fence else {
            return Ok(Flow::Continue);
        };
        let records = parse_fence_payload(self.parser.fence_inner(&fence));
        if records.is_empty() {
            debug!(fence_len = fence.len(), "Fence held no tool calls; emitting as text");
            self.close_tool_input().await?;
            self.emit_text(&fence).await?;
            return Ok(Flow::Continue);
        }

        let trailing = self.detector.flush();
        if !trailing.is_empty() {
            debug!(suppressed_len = trailing.len(), "Suppressing text after tool call fence");
        }
        self.emit_tool_calls(records).await?;
        Ok(Flow::ToolCallsEmitted)
    }

    async fn on_fence_delta(&mut self, delta: &str) -> Result<(), ReceiverGone> {
        let Some(input) = self.tool_input.as_mut() else {
            return Ok(());
        };
        let update = input.tracker.push(delta);

        let mut parts = Vec::new();
        if let Some(tool_name) = update.tool_name {
            input.started = true;
            parts.push(StreamPart::tool_input_start(&input.id, tool_name));
        }
        input.pending_args.push_str(&update.arguments_delta);
        if input.started && !input.pending_args.is_empty() {
            let args = std::mem::take(&mut input.pending_args);
            parts.push(StreamPart::tool_input_delta(&input.id, args));
        }

        for part in parts {
            self.send(part).await?;
        }
        Ok(())
    }

    async fn emit_text(&mut self, text: &str) -> Result<(), ReceiverGone> {
        if text.is_empty() {
            return Ok(());
        }
        let id = match &self.text_id {
            Some(id) => id.clone(),
            None => {
                let id = generate_text_id();
                self.text_id = Some(id.clone());
                self.send(StreamPart::TextStart { id: id.clone() }).await?;
                id
            }
        };
        self.send(StreamPart::text_delta(id, text)).await
    }

    async fn close_text(&mut self) -> Result<(), ReceiverGone> {
        match self.text_id.take() {
            Some(id) => self.send(StreamPart::TextEnd { id }).await,
            None => Ok(()),
        }
    }

    async fn close_tool_input(&mut self) -> Result<(), ReceiverGone> {
        match self.tool_input.take() {
            Some(input) if input.started => self.send(StreamPart::ToolInputEnd { id: input.id }).await,
            _ => Ok(()),
        }
    }

    async fn emit_tool_calls(&mut self, records: Vec<ToolCallRecord>) -> Result<(), ReceiverGone> {
        let mut streamed = self.tool_input.take();
        if let Some(active) = &streamed {
            let first_name = records.first().map(|r| r.tool_name.as_str());
            if active.started && active.tracker.tool_name() != first_name {
                debug!(
                    streamed = ?active.tracker.tool_name(),
                    parsed = ?first_name,
                    "Streamed tool input does not match the parsed call"
                );
                self.send(StreamPart::ToolInputEnd {
                    id: active.id.clone(),
                })
                .await?;
                streamed = None;
            }
        }

        for (index, record) in records.into_iter().enumerate() {
            let input = record.input_json();
            let (id, started) = match (&streamed, index) {
                (Some(active), 0) => (active.id.clone(), active.started),
                _ => (generate_tool_call_id(), false),
            };

            if !started {
                self.send(StreamPart::tool_input_start(&id, &record.tool_name))
                    .await?;
                self.send(StreamPart::tool_input_delta(&id, &input)).await?;
            }
            self.send(StreamPart::ToolInputEnd { id: id.clone() }).await?;
            self.send(StreamPart::tool_call(id, record.tool_name, input))
                .await?;
            self.calls_emitted += 1;
        }
        Ok(())
    }

    async fn finish_tool_calls(&mut self) -> Result<(), ReceiverGone> {
        self.close_text().await?;
        self.finish(FinishReason::ToolCalls).await
    }

    async fn finish_end_of_stream(&mut self) -> Result<(), ReceiverGone> {
        let rest = self.detector.flush();
        self.close_tool_input().await?;
        if !rest.is_empty() {
            debug!(len = rest.len(), "Emitting unconsumed text at end of stream");
            self.emit_text(&rest).await?;
        }
        self.close_text().await?;
        self.finish(FinishReason::Stop).await
    }

    async fn finish_aborted(&mut self) -> Result<(), ReceiverGone> {
        debug!(calls = self.calls_emitted, "Stream aborted");
        self.detector.clear_buffer();
        self.close_tool_input().await?;
        self.close_text().await?;
        let reason = if self.calls_emitted > 0 {
            FinishReason::ToolCalls
        } else {
            FinishReason::Stop
        };
        self.finish(reason).await
    }

    async fn finish_failed(&mut self, error: PlatformError) -> Result<(), ReceiverGone> {
        warn!(error = %error, "Platform stream failed");
        self.close_tool_input().await?;
        self.close_text().await?;
        self.send(StreamError::from(error).to_part()).await?;
        self.finish(FinishReason::Error).await
    }

    async fn finish(&mut self, reason: FinishReason) -> Result<(), ReceiverGone> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;
        let usage = match self.session.input_usage() {
            Some(tokens) => Usage::new().input_tokens(tokens),
            None => Usage::new(),
        };
        self.send(StreamPart::finish(reason, usage)).await
    }

    async fn send(&self, part: StreamPart) -> Result<(), ReceiverGone> {
        self.tx.send(part).await.map_err(|_| ReceiverGone)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockScript, MockSession};
    use crate::platform::{LanguageModelSession, PromptOptions};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn script(tokens: &[&str]) -> MockScript {
        MockScript {
            tokens: tokens.iter().map(|t| t.to_string()).collect(),
            ..MockScript::default()
        }
    }

    async fn start(session: &Arc<MockSession>, abort: CancellationToken) -> ChatStream {
        let tokens = session
            .prompt_streaming(vec![], PromptOptions::default())
            .await
            .unwrap();
        let handle: SessionHandle = session.clone();
        spawn_chat_stream(
            tokens,
            StreamSetup {
                warnings: vec![],
                parser: ToolCallParser::new(),
                session: handle,
                abort,
            },
        )
    }

    async fn run_script(session: &Arc<MockSession>) -> Vec<StreamPart> {
        start(session, CancellationToken::new()).await.collect().await
    }

    fn kinds(parts: &[StreamPart]) -> Vec<&'static str> {
        parts.iter().map(StreamPart::kind).collect()
    }

    fn text(parts: &[StreamPart]) -> String {
        parts.iter().filter_map(StreamPart::as_text).collect()
    }

    #[tokio::test]
    async fn test_tool_call_stream() {
        let session = Arc::new(MockSession::new(
            script(&[
                "Let me ",
                "check.\n```tool",
                "_call\n{\"name\":\"getWe",
                "ather\",\"arguments\":{\"city\":\"NYC\"}}\n```",
                "\nDone.",
            ]),
            false,
        ));

        let parts = run_script(&session).await;
        assert_eq!(
            kinds(&parts),
            vec![
                "stream-start",
                "text-start",
                "text-delta",
                "text-delta",
                "tool-input-start",
                "tool-input-delta",
                "tool-input-end",
                "tool-call",
                "text-end",
                "finish",
            ]
        );
        assert_eq!(text(&parts), "Let me check.\n");

        let StreamPart::ToolInputStart { id: input_id, tool_name } = &parts[4] else {
            panic!("expected tool-input-start, got {:?}", parts[4]);
        };
        assert_eq!(tool_name, "getWeather");
        assert_eq!(
            parts[5],
            StreamPart::tool_input_delta(input_id, "{\"city\":\"NYC\"}")
        );
        assert_eq!(
            parts[7],
            StreamPart::tool_call(input_id, "getWeather", "{\"city\":\"NYC\"}")
        );
        assert_eq!(parts[9].finish_reason(), Some(FinishReason::ToolCalls));

        // The close only counts once the following fragment ends its line.
        assert!(session.reader_dropped());
        assert_eq!(session.fragments_pulled(), 5);
    }

    #[tokio::test]
    async fn test_plain_text_stream() {
        let session = Arc::new(MockSession::new(script(&["Hello", ", ", "world"]), false));
        let parts = run_script(&session).await;

        assert_eq!(
            kinds(&parts),
            vec![
                "stream-start",
                "text-start",
                "text-delta",
                "text-delta",
                "text-delta",
                "text-end",
                "finish"
            ]
        );
        assert_eq!(text(&parts), "Hello, world");
        assert_eq!(parts.last().unwrap().finish_reason(), Some(FinishReason::Stop));
    }

    #[tokio::test]
    async fn test_several_calls_in_one_fence() {
        let session = Arc::new(MockSession::new(
            script(&[
                "```tool_call\n[{\"name\":\"a\",\"arguments\":{\"x\":1}},",
                "{\"name\":\"b\"}]\n```",
            ]),
            false,
        ));
        let parts = run_script(&session).await;

        let calls: Vec<(String, String, String)> = parts
            .iter()
            .filter_map(|p| match p {
                StreamPart::ToolCall {
                    tool_call_id,
                    tool_name,
                    input,
                } => Some((tool_call_id.clone(), tool_name.clone(), input.clone())),
                _ => None,
            })
            .collect();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].1, "a");
        assert_eq!(calls[0].2, "{\"x\":1}");
        assert_eq!(calls[1].1, "b");
        assert_eq!(calls[1].2, "{}");
        assert_ne!(calls[0].0, calls[1].0);

        let starts: Vec<&String> = parts
            .iter()
            .filter_map(|p| match p {
                StreamPart::ToolInputStart { id, .. } => Some(id),
                _ => None,
            })
            .collect();
        assert_eq!(starts, vec![&calls[0].0, &calls[1].0]);
        assert!(!kinds(&parts).contains(&"text-start"));
    }

    #[tokio::test]
    async fn test_streamed_id_not_reused_for_other_tool() {
        // The first record has no usable name, so only "b" is emitted.
        let session = Arc::new(MockSession::new(
            script(&[
                "```tool_call\n[{\"name\":\"\",\"arguments\":{\"x\":1}},",
                "{\"name\":\"b\",\"arguments\":{\"y\":2}}]\n```",
            ]),
            false,
        ));
        let parts = run_script(&session).await;

        let calls: Vec<(&String, &String)> = parts
            .iter()
            .filter_map(|p| match p {
                StreamPart::ToolCall {
                    tool_call_id,
                    tool_name,
                    ..
                } => Some((tool_call_id, tool_name)),
                _ => None,
            })
            .collect();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].1, "b");

        let starts: Vec<(&String, &String)> = parts
            .iter()
            .filter_map(|p| match p {
                StreamPart::ToolInputStart { id, tool_name } => Some((id, tool_name)),
                _ => None,
            })
            .collect();
        assert!(starts.contains(&calls[0]));
        let ends = kinds(&parts)
            .into_iter()
            .filter(|k| *k == "tool-input-end")
            .count();
        assert_eq!(ends, starts.len());
    }

    #[tokio::test]
    async fn test_fence_without_calls_is_text() {
        let input = "A ```tool_call\nnot json\n```\nB";
        let session = Arc::new(MockSession::new(script(&[input]), false));
        let parts = run_script(&session).await;

        assert_eq!(text(&parts), input);
        assert!(!kinds(&parts).contains(&"tool-call"));
        assert_eq!(parts.last().unwrap().finish_reason(), Some(FinishReason::Stop));
    }

    #[tokio::test]
    async fn test_unterminated_fence_flushed_as_text() {
        let input = "Sure ```tool_call\n{\"name\":\"lookup\"";
        let session = Arc::new(MockSession::new(script(&[input]), false));
        let parts = run_script(&session).await;

        assert_eq!(text(&parts), input);
        let kinds = kinds(&parts);
        assert!(kinds.contains(&"tool-input-start"));
        assert!(kinds.contains(&"tool-input-end"));
        assert!(!kinds.contains(&"tool-call"));
        assert_eq!(parts.last().unwrap().finish_reason(), Some(FinishReason::Stop));
    }

    #[tokio::test]
    async fn test_platform_error() {
        let mut failing = script(&["Hi", "there"]);
        failing.error_after = Some((1, "GPU lost".into()));
        let session = Arc::new(MockSession::new(failing, false));
        let parts = run_script(&session).await;

        assert_eq!(
            kinds(&parts),
            vec![
                "stream-start",
                "text-start",
                "text-delta",
                "text-end",
                "error",
                "finish"
            ]
        );
        assert_eq!(parts[4], StreamPart::error("GPU lost"));
        assert_eq!(parts[5].finish_reason(), Some(FinishReason::Error));
    }

    #[tokio::test]
    async fn test_abort_drops_reader() {
        let mut held = script(&["Partial answer"]);
        held.hold_open = true;
        let session = Arc::new(MockSession::new(held, false));
        let abort = CancellationToken::new();
        let mut stream = start(&session, abort.clone()).await;

        loop {
            let part = stream.next().await.unwrap();
            if part.as_text().is_some() {
                break;
            }
        }
        abort.cancel();

        let rest: Vec<StreamPart> = stream.collect().await;
        assert_eq!(kinds(&rest), vec!["text-end", "finish"]);
        assert_eq!(rest[1].finish_reason(), Some(FinishReason::Stop));
        assert!(session.reader_dropped());
    }

    #[tokio::test]
    async fn test_dropped_consumer_releases_reader() {
        let mut held = script(&["Partial answer"]);
        held.hold_open = true;
        let session = Arc::new(MockSession::new(held, false));
        let mut stream = start(&session, CancellationToken::new()).await;

        while stream.next().await.and_then(|p| p.as_text().map(str::to_owned)).is_none() {}
        drop(stream);

        for _ in 0..50 {
            if session.reader_dropped() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        assert!(session.reader_dropped());
    }

    #[tokio::test]
    async fn test_usage_reported() {
        let mut with_usage = script(&["ok"]);
        with_usage.input_usage = Some(12);
        let session = Arc::new(MockSession::new(with_usage, false));
        let parts = run_script(&session).await;

        let Some(StreamPart::Finish { usage, .. }) = parts.last() else {
            panic!("missing finish");
        };
        assert_eq!(usage.input_tokens, Some(12));
    }
}
