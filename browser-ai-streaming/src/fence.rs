//! Incremental detection of fenced tool-call blocks.
//!
//! Models that lack native function calling are prompted to answer with a
//! fenced block such as:
//!
//! ````text
//! Let me check.
//! ```tool_call
//! {"name": "getWeather", "arguments": {"city": "NYC"}}
//! ```
//! ````
//!
//! An opening marker only counts when the newline follows it directly, and
//! the closing marker only counts on a line of its own. Backticks inside the
//! JSON payload, or a tag spelled slightly differently in prose, are content.
//!
//! The text arrives token by token, so a delimiter can be split across any
//! number of fragments. [`FenceDetector`] buffers only the suffix that could
//! still turn into a delimiter and releases everything else as soon as it is
//! provably prose.
//!
//! Two modes share one buffer:
//!
//! - [`FenceDetector::detect_fence`] scans the buffer for a complete fence.
//! - [`FenceDetector::detect_streaming_fence`] is called in a loop per
//!   fragment and additionally reports in-fence content as it is proven.
//!   [`FenceDetector::finish`] marks the end of input, where a closing marker
//!   at the very end of the text becomes final.
//!
//! Do not interleave the two modes on one detector; `detect_fence` rewinds a
//! partially streamed fence back into the buffer before scanning.

use serde::{Deserialize, Serialize};
use tracing::trace;

/// Opening markers recognised by default.
pub const DEFAULT_OPEN_MARKERS: &[&str] = &["```tool_call", "```tool-call"];

/// Closing marker recognised by default.
pub const DEFAULT_CLOSE_MARKER: &str = "```";

/// Delimiters for a tool-call fence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FenceConfig {
    /// Accepted opening markers. The first one is used when prompting.
    pub open_markers: Vec<String>,
    /// Closing marker.
    pub close_marker: String,
}

impl Default for FenceConfig {
    fn default() -> Self {
        Self {
            open_markers: DEFAULT_OPEN_MARKERS.iter().map(|m| (*m).to_string()).collect(),
            close_marker: DEFAULT_CLOSE_MARKER.to_string(),
        }
    }
}

impl FenceConfig {
    /// Create a config from explicit markers. Empty markers are ignored.
    #[must_use]
    pub fn new<I, S>(open_markers: I, close_marker: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            open_markers: open_markers.into_iter().map(Into::into).collect(),
            close_marker: close_marker.into(),
        }
        .normalized()
    }

    /// The marker to show the model in instructions.
    #[must_use]
    pub fn primary_open_marker(&self) -> &str {
        self.open_markers
            .first()
            .map(String::as_str)
            .unwrap_or(DEFAULT_OPEN_MARKERS[0])
    }

    /// Check whether `text` contains any opening marker followed by a newline.
    #[must_use]
    pub fn contains_open_marker(&self, text: &str) -> bool {
        self.open_markers
            .iter()
            .any(|m| find_open_delimiter(text, m).is_some())
    }

    /// Drop empty markers and fall back to the defaults where nothing is left.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.open_markers.retain(|m| !m.is_empty());
        if self.open_markers.is_empty() {
            self.open_markers = Self::default().open_markers;
        }
        if self.close_marker.is_empty() {
            self.close_marker = DEFAULT_CLOSE_MARKER.to_string();
        }
        self
    }
}

/// Whether the detector is currently inside a fence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FenceState {
    /// Scanning prose for an opening marker.
    #[default]
    Outside,
    /// Accumulating fence content until the closing marker.
    Inside,
}

/// Result of [`FenceDetector::detect_fence`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FenceDetection {
    /// Prose before the fence (or all safe prose when there is no fence).
    pub prefix_text: String,
    /// The complete fence, delimiters included.
    pub fence: Option<String>,
    /// Text after the closing marker. No longer buffered.
    pub remaining_text: String,
}

/// Result of one [`FenceDetector::detect_streaming_fence`] call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamingFenceDetection {
    /// Prose proven safe to emit. Always empty while inside a fence.
    pub safe_content: String,
    /// Whether the detector is inside a fence after this call.
    pub in_fence: bool,
    /// Set on the call that matched an opening marker.
    pub fence_started: bool,
    /// In-fence content proven not to be part of the closing marker.
    pub fence_delta: String,
    /// The complete raw fence, set on the call that matched the closing marker.
    pub complete_fence: Option<String>,
    /// Text already buffered after the closing marker. It stays buffered and
    /// is released as `safe_content` by later calls.
    pub text_after_fence: String,
}

impl StreamingFenceDetection {
    /// Whether this call consumed anything. Callers loop until this is false.
    #[must_use]
    pub fn made_progress(&self) -> bool {
        self.fence_started
            || self.complete_fence.is_some()
            || !self.safe_content.is_empty()
            || !self.fence_delta.is_empty()
    }
}

/// Stateful scanner over arriving text fragments.
#[derive(Debug, Clone, Default)]
pub struct FenceDetector {
    config: FenceConfig,
    buffer: String,
    state: FenceState,
    /// Raw text of the fence being streamed: opening marker plus content
    /// reported through `fence_delta` so far.
    fence_raw: String,
}

impl FenceDetector {
    /// Create a detector with the default markers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a detector with custom markers.
    #[must_use]
    pub fn with_config(config: FenceConfig) -> Self {
        Self {
            config: config.normalized(),
            ..Self::default()
        }
    }

    /// Create a detector from explicit opening markers and a closing marker.
    #[must_use]
    pub fn with_markers<I, S>(open_markers: I, close_marker: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_config(FenceConfig::new(open_markers, close_marker))
    }

    /// The markers in use.
    #[must_use]
    pub fn config(&self) -> &FenceConfig {
        &self.config
    }

    /// Append a fragment to the buffer.
    pub fn add_chunk(&mut self, fragment: &str) {
        self.buffer.push_str(fragment);
    }

    /// Current fence state.
    #[must_use]
    pub fn state(&self) -> FenceState {
        self.state
    }

    /// Whether a fence has been opened and not yet closed.
    #[must_use]
    pub fn is_in_fence(&self) -> bool {
        self.state == FenceState::Inside
    }

    /// Whether any unconsumed text remains, including a partial fence.
    #[must_use]
    pub fn has_content(&self) -> bool {
        !self.buffer.is_empty() || !self.fence_raw.is_empty()
    }

    /// The unconsumed buffer.
    #[must_use]
    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    /// Size of the unconsumed buffer in bytes.
    #[must_use]
    pub fn buffer_size(&self) -> usize {
        self.buffer.len()
    }

    /// Raw text of the fence currently being streamed, if any.
    #[must_use]
    pub fn pending_fence(&self) -> &str {
        &self.fence_raw
    }

    /// Drop all buffered text and return to [`FenceState::Outside`].
    pub fn clear_buffer(&mut self) {
        self.buffer.clear();
        self.fence_raw.clear();
        self.state = FenceState::Outside;
    }

    /// Take every unconsumed byte, an unterminated fence included, and reset.
    ///
    /// Used at end of stream, where leftovers are treated as plain text.
    pub fn flush(&mut self) -> String {
        let mut rest = std::mem::take(&mut self.fence_raw);
        rest.push_str(&self.buffer);
        self.clear_buffer();
        rest
    }

    /// Scan the whole buffer for a complete fence.
    ///
    /// The buffer is taken as all the text there is, so a closing marker at
    /// its very end closes the fence.
    pub fn detect_fence(&mut self) -> FenceDetection {
        if self.state == FenceState::Inside {
            let mut rewound = std::mem::take(&mut self.fence_raw);
            rewound.push_str(&self.buffer);
            self.buffer = rewound;
            self.state = FenceState::Outside;
        }

        let Some((start, open_len)) = self.find_open_marker(&self.buffer) else {
            let safe_len = self.buffer.len() - self.open_overlap(&self.buffer);
            let prefix_text: String = self.buffer.drain(..safe_len).collect();
            return FenceDetection {
                prefix_text,
                ..FenceDetection::default()
            };
        };

        let prefix_text: String = self.buffer.drain(..start).collect();
        let close = self.config.close_marker.as_str();
        let CloseScan::Closed { end: close_end, .. } =
            scan_close(&self.buffer[open_len..], close, true, true)
        else {
            return FenceDetection {
                prefix_text,
                ..FenceDetection::default()
            };
        };

        let end = open_len + close_end;
        let remaining_text = self.buffer.split_off(end);
        let fence = std::mem::take(&mut self.buffer);
        trace!(fence_len = fence.len(), "fence detected");
        FenceDetection {
            prefix_text,
            fence: Some(fence),
            remaining_text,
        }
    }

    /// Consume as much of the buffer as can be classified right now.
    ///
    /// Call in a loop until [`StreamingFenceDetection::made_progress`] returns
    /// false, then wait for the next fragment.
    pub fn detect_streaming_fence(&mut self) -> StreamingFenceDetection {
        match self.state {
            FenceState::Outside => self.advance_outside(),
            FenceState::Inside => self.advance_inside(false),
        }
    }

    /// Mark the end of input.
    ///
    /// Inside a fence, a closing marker that ends the text is only final once
    /// nothing else can follow it. Call this once after the last fragment,
    /// handle the result like any other detection, then [`flush`](Self::flush).
    pub fn finish(&mut self) -> StreamingFenceDetection {
        match self.state {
            FenceState::Outside => StreamingFenceDetection::default(),
            FenceState::Inside => self.advance_inside(true),
        }
    }

    fn advance_outside(&mut self) -> StreamingFenceDetection {
        let Some((start, open_len)) = self.find_open_marker(&self.buffer) else {
            let safe_len = self.buffer.len() - self.open_overlap(&self.buffer);
            return StreamingFenceDetection {
                safe_content: self.buffer.drain(..safe_len).collect(),
                ..StreamingFenceDetection::default()
            };
        };

        let safe_content: String = self.buffer.drain(..start).collect();
        self.fence_raw = self.buffer.drain(..open_len).collect();
        self.state = FenceState::Inside;
        trace!(marker = %self.fence_raw, "fence opened");

        StreamingFenceDetection {
            safe_content,
            in_fence: true,
            fence_started: true,
            ..StreamingFenceDetection::default()
        }
    }

    fn advance_inside(&mut self, at_end: bool) -> StreamingFenceDetection {
        let close = self.config.close_marker.as_str();
        let at_line_start = self.fence_raw.ends_with('\n');
        let (close_at, close_end) = match scan_close(&self.buffer, close, at_line_start, at_end) {
            CloseScan::Closed { start, end } => (start, end),
            CloseScan::Open { proven } => {
                let fence_delta: String = self.buffer.drain(..proven).collect();
                self.fence_raw.push_str(&fence_delta);
                return StreamingFenceDetection {
                    in_fence: true,
                    fence_delta,
                    ..StreamingFenceDetection::default()
                };
            }
        };

        let fence_delta: String = self.buffer.drain(..close_at).collect();
        self.fence_raw.push_str(&fence_delta);
        self.fence_raw
            .extend(self.buffer.drain(..close_end - close_at));
        let complete_fence = std::mem::take(&mut self.fence_raw);
        self.state = FenceState::Outside;
        trace!(fence_len = complete_fence.len(), "fence closed");

        StreamingFenceDetection {
            in_fence: false,
            fence_delta,
            complete_fence: Some(complete_fence),
            text_after_fence: self.buffer.clone(),
            ..StreamingFenceDetection::default()
        }
    }

    /// Earliest opening delimiter (marker plus newline) in `text` as
    /// `(index, delimiter_len)`. On a tie the longest marker wins.
    fn find_open_marker(&self, text: &str) -> Option<(usize, usize)> {
        self.config
            .open_markers
            .iter()
            .filter_map(|m| find_open_delimiter(text, m).map(|idx| (idx, m.len() + 1)))
            .min_by(|a, b| a.0.cmp(&b.0).then(b.1.cmp(&a.1)))
    }

    /// Longest suffix of `text` that could still grow into an opening
    /// delimiter.
    fn open_overlap(&self, text: &str) -> usize {
        self.config
            .open_markers
            .iter()
            .map(|m| {
                if text.ends_with(m.as_str()) {
                    m.len()
                } else {
                    partial_marker_suffix_len(text, m)
                }
            })
            .max()
            .unwrap_or(0)
    }
}

/// Index of the first `marker` in `text` that is directly followed by `\n`.
fn find_open_delimiter(text: &str, marker: &str) -> Option<usize> {
    text.match_indices(marker)
        .map(|(idx, _)| idx)
        .find(|&idx| text.as_bytes().get(idx + marker.len()) == Some(&b'\n'))
}

/// Outcome of looking for a closing line in fence content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CloseScan {
    /// The closing marker spans `start..end`.
    Closed { start: usize, end: usize },
    /// No close yet; the first `proven` bytes are content.
    Open { proven: usize },
}

/// Find the closing marker on a line of its own.
///
/// A closing line is the marker at a line start followed only by spaces,
/// tabs or `\r`, then `\n`. A closing line that ends `content` only counts
/// when `at_end`; otherwise it is withheld, as is a last line that is still a
/// prefix of the marker.
fn scan_close(content: &str, close: &str, at_line_start: bool, at_end: bool) -> CloseScan {
    let mut line_start = if at_line_start {
        Some(0)
    } else {
        content.find('\n').map(|i| i + 1)
    };

    while let Some(start) = line_start {
        let rest = &content[start..];
        match rest.find('\n') {
            Some(len) if is_close_line(&rest[..len], close) => {
                return CloseScan::Closed {
                    start,
                    end: start + close.len(),
                };
            }
            Some(len) => line_start = Some(start + len + 1),
            None if is_close_line(rest, close) && at_end => {
                return CloseScan::Closed {
                    start,
                    end: start + close.len(),
                };
            }
            None if !at_end && (is_close_line(rest, close) || close.starts_with(rest)) => {
                return CloseScan::Open { proven: start };
            }
            None => break,
        }
    }

    CloseScan::Open {
        proven: content.len(),
    }
}

fn is_close_line(line: &str, close: &str) -> bool {
    line.strip_prefix(close)
        .is_some_and(|rest| rest.chars().all(|c| matches!(c, ' ' | '\t' | '\r')))
}

/// Length of the longest suffix of `text` that is a proper prefix of `marker`.
///
/// Compares bytes, so the cut point is always the start of a marker's first
/// character and therefore a char boundary in `text`.
pub fn partial_marker_suffix_len(text: &str, marker: &str) -> usize {
    let text = text.as_bytes();
    let marker = marker.as_bytes();
    let longest = marker.len().saturating_sub(1).min(text.len());
    (1..=longest)
        .rev()
        .find(|&len| text.ends_with(&marker[..len]))
        .unwrap_or(0)
}
