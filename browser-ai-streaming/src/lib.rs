//! # browser-ai-streaming
//!
//! Streaming support for browser-ai.
//!
//! Browser runtimes have no native function calling, so tool calls arrive as
//! fenced JSON blocks inside the token stream. This crate turns that stream
//! into structured parts without ever holding back more text than a partial
//! delimiter.
//!
//! ## Core Concepts
//!
//! - **[`FenceDetector`]**: split a fragmented token stream into prose and
//!   tool-call fences
//! - **[`ToolInputTracker`]**: pull the tool name and argument deltas out of a
//!   fence while it is still streaming
//! - **[`StreamPart`]**: the parts a streaming call emits
//!
//! ## Example
//!
//! ```rust
//! use browser_ai_streaming::FenceDetector;
//!
//! let mut detector = FenceDetector::new();
//! let mut text = String::new();
//! let mut fences = Vec::new();
//!
//! for fragment in ["Let me check.\n``", "`tool_call\n{\"name\":\"getWeather\"}", "\n```"] {
//!     detector.add_chunk(fragment);
//!     loop {
//!         let step = detector.detect_streaming_fence();
//!         text.push_str(&step.safe_content);
//!         if let Some(fence) = &step.complete_fence {
//!             fences.push(fence.clone());
//!         }
//!         if !step.made_progress() {
//!             break;
//!         }
//!     }
//! }
//! // A close marker on the last line only counts once the input has ended.
//! if let Some(fence) = detector.finish().complete_fence {
//!     fences.push(fence);
//! }
//!
//! assert_eq!(text, "Let me check.\n");
//! assert_eq!(fences.len(), 1);
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod error;
pub mod fence;
pub mod parts;
pub mod tool_input;

// Re-exports
pub use error::{StreamError, StreamResult};
pub use fence::{
    partial_marker_suffix_len, FenceConfig, FenceDetection, FenceDetector, FenceState,
    StreamingFenceDetection, DEFAULT_CLOSE_MARKER, DEFAULT_OPEN_MARKERS,
};
pub use parts::StreamPart;
pub use tool_input::{ToolInputTracker, ToolInputUpdate};

/// Prelude for common imports.
pub mod prelude {
    pub use crate::error::{StreamError, StreamResult};
    pub use crate::fence::{FenceConfig, FenceDetector, StreamingFenceDetection};
    pub use crate::parts::StreamPart;
    pub use crate::tool_input::ToolInputTracker;
}
