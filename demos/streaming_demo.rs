//! Streams a scripted tool-calling reply through the full pipeline.
//!
//! Run with:
//!
//! ```sh
//! RUST_LOG=browser_ai=debug cargo run --example streaming_demo
//! ```

use browser_ai::models::ProgressReport;
use browser_ai::prelude::*;
use futures::StreamExt;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let platform = Arc::new(
        MockPlatform::new()
            .with_progress([
                ProgressReport::Fraction(0.25),
                ProgressReport::Percent(60.0),
                ProgressReport::Bytes {
                    loaded: 1024,
                    total: 1024,
                },
            ])
            .with_tokens([
                "Let me look that up. ",
                "``",
                "`tool_call\n{\"name\": \"getWeather\", ",
                "\"arguments\": {\"city\": \"Berlin\"}}\n",
                "```",
            ]),
    );

    let registry = ProviderRegistry::new();
    registry.register(Arc::new(BrowserAiProvider::web_llm(platform)));

    let model = registry.language_model("web-llm:Llama-3.2-1B-Instruct-q4f16_1-MLC")?;
    info!(availability = ?model.check_availability().await, "Platform checked");

    model
        .create_session_with_progress(ProgressCallback::shared(|loaded| {
            info!(percent = (loaded * 100.0).round(), "Downloading model");
        }))
        .await?;

    let options = CallOptions::new(vec![
        Message::system("You are a terse weather assistant."),
        Message::user("What's the weather in Berlin?"),
    ])
    .with_tools(vec![ToolDefinition::new(
        "getWeather",
        "Current weather for a city",
    )]);

    let mut stream = model.do_stream(options).await?;
    while let Some(part) = stream.next().await {
        match &part {
            StreamPart::TextDelta { delta, .. } => info!(delta = %delta, "text"),
            StreamPart::ToolCall {
                tool_name, input, ..
            } => info!(tool = %tool_name, input = %input, "tool call"),
            StreamPart::Finish { finish_reason, .. } => info!(reason = %finish_reason, "finish"),
            other => info!(kind = other.kind(), "part"),
        }
    }

    model.destroy_session().await;
    Ok(())
}
