//! Incremental extraction of a tool call from partial fence content.
//!
//! While a fence streams in, the payload is incomplete JSON such as
//! `{"name":"getWeather","arguments":{"ci`. [`ToolInputTracker`] scans the
//! top-level keys of the first call object to find the tool name as soon as
//! its string is closed, and hands out the value of `arguments` (or `args`)
//! in non-overlapping slices.

/// What changed after feeding more fence content.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolInputUpdate {
    /// The tool name, reported exactly once, on the push that completed it.
    pub tool_name: Option<String>,
    /// New bytes of the arguments value since the previous push.
    pub arguments_delta: String,
}

impl ToolInputUpdate {
    /// Whether the update carries anything.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tool_name.is_none() && self.arguments_delta.is_empty()
    }
}

/// Accumulates fence content for the first tool call in a fence.
#[derive(Debug, Clone, Default)]
pub struct ToolInputTracker {
    content: String,
    tool_name: Option<String>,
    emitted_len: usize,
    arguments_complete: bool,
}

impl ToolInputTracker {
    /// Create an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed newly proven fence content.
    pub fn push(&mut self, delta: &str) -> ToolInputUpdate {
        self.content.push_str(delta);
        let scan = scan_first_call(&self.content);

        let mut update = ToolInputUpdate::default();
        if self.tool_name.is_none() {
            if let Some(name) = scan.tool_name {
                self.tool_name = Some(name.clone());
                update.tool_name = Some(name);
            }
        }

        if let Some(args) = scan.arguments {
            let value = &self.content[args.start..args.end];
            if value.len() > self.emitted_len {
                update.arguments_delta = value[self.emitted_len..].to_string();
                self.emitted_len = value.len();
            }
            self.arguments_complete = args.complete;
        }
        update
    }

    /// The tool name, once known.
    #[must_use]
    pub fn tool_name(&self) -> Option<&str> {
        self.tool_name.as_deref()
    }

    /// Everything fed so far.
    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Whether the arguments value has been seen in full.
    #[must_use]
    pub fn arguments_complete(&self) -> bool {
        self.arguments_complete
    }

    /// Number of argument bytes handed out so far.
    #[must_use]
    pub fn emitted_len(&self) -> usize {
        self.emitted_len
    }

    /// Forget everything, ready for the next fence.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ArgumentsSpan {
    start: usize,
    end: usize,
    complete: bool,
}

#[derive(Debug, Default)]
struct FirstCallScan {
    tool_name: Option<String>,
    arguments: Option<ArgumentsSpan>,
}

const NAME_KEYS: &[&str] = &["name", "toolName"];
const ARGUMENT_KEYS: &[&str] = &["arguments", "args"];

/// Scan the top-level keys of the first object in `text`.
///
/// The payload may be a bare object or an array of objects; keys are
/// considered at the depth of the first `{`. Scanning stops when that object
/// closes.
fn scan_first_call(text: &str) -> FirstCallScan {
    let bytes = text.as_bytes();
    let mut scan = FirstCallScan::default();
    let mut depth = 0usize;
    let mut object_depth: Option<usize> = None;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'"' => {
                let Some(end) = string_end(bytes, i) else {
                    return scan;
                };
                if Some(depth) == object_depth {
                    let key = &text[i + 1..end];
                    let after_key = skip_ws(bytes, end + 1);
                    if bytes.get(after_key) == Some(&b':') {
                        let value_start = skip_ws(bytes, after_key + 1);
                        if NAME_KEYS.contains(&key) && scan.tool_name.is_none() {
                            if bytes.get(value_start) == Some(&b'"') {
                                if let Some(value_end) = string_end(bytes, value_start) {
                                    scan.tool_name = unescape(&text[value_start..=value_end]);
                                }
                            }
                        } else if ARGUMENT_KEYS.contains(&key)
                            && scan.arguments.is_none()
                            && value_start < bytes.len()
                        {
                            let (end, complete) = value_end(bytes, value_start);
                            scan.arguments = Some(ArgumentsSpan {
                                start: value_start,
                                end,
                                complete,
                            });
                        }
                        i = after_key + 1;
                        continue;
                    }
                }
                i = end + 1;
                continue;
            }
            b'{' => {
                depth += 1;
                if object_depth.is_none() {
                    object_depth = Some(depth);
                }
            }
            b'[' => depth += 1,
            b'}' | b']' => {
                if Some(depth) == object_depth && bytes[i] == b'}' {
                    return scan;
                }
                depth = depth.saturating_sub(1);
            }
            _ => {}
        }
        i += 1;
    }
    scan
}

/// Index of the closing quote of the string opening at `start`.
fn string_end(bytes: &[u8], start: usize) -> Option<usize> {
    let mut escaped = false;
    for (offset, &b) in bytes[start + 1..].iter().enumerate() {
        if escaped {
            escaped = false;
        } else if b == b'\\' {
            escaped = true;
        } else if b == b'"' {
            return Some(start + 1 + offset);
        }
    }
    None
}

fn skip_ws(bytes: &[u8], mut i: usize) -> usize {
    while i < bytes.len() && bytes[i].is_ascii_whitespace() {
        i += 1;
    }
    i
}

fn unescape(quoted: &str) -> Option<String> {
    serde_json::from_str::<String>(quoted).ok()
}

/// End of the JSON value starting at `start`, and whether it is complete.
///
/// Incomplete values extend to the end of the text.
fn value_end(bytes: &[u8], start: usize) -> (usize, bool) {
    match bytes[start] {
        b'"' => match string_end(bytes, start) {
            Some(end) => (end + 1, true),
            None => (bytes.len(), false),
        },
        b'{' | b'[' => {
            let mut depth = 0usize;
            let mut i = start;
            while i < bytes.len() {
                match bytes[i] {
                    b'"' => match string_end(bytes, i) {
                        Some(end) => i = end,
                        None => return (bytes.len(), false),
                    },
                    b'{' | b'[' => depth += 1,
                    b'}' | b']' => {
                        depth -= 1;
                        if depth == 0 {
                            return (i + 1, true);
                        }
                    }
                    _ => {}
                }
                i += 1;
            }
            (bytes.len(), false)
        }
        _ => {
            // Scalars end at the next delimiter; until one arrives the value
            // may still grow.
            let end = bytes[start..]
                .iter()
                .position(|b| matches!(b, b',' | b'}' | b']') || b.is_ascii_whitespace())
                .map(|offset| start + offset);
            match end {
                Some(end) => (end, true),
                None => (bytes.len(), false),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn feed_chars(text: &str) -> (Option<String>, String, ToolInputTracker) {
        let mut tracker = ToolInputTracker::new();
        let mut name = None;
        let mut args = String::new();
        for c in text.chars() {
            let update = tracker.push(&c.to_string());
            if let Some(n) = update.tool_name {
                assert!(name.is_none(), "tool name reported twice");
                name = Some(n);
            }
            args.push_str(&update.arguments_delta);
        }
        (name, args, tracker)
    }

    #[test]
    fn test_name_only_after_string_closes() {
        let mut tracker = ToolInputTracker::new();
        assert_eq!(tracker.push("\n{\"name\":\"getWea").tool_name, None);
        let update = tracker.push("ther\",");
        assert_eq!(update.tool_name.as_deref(), Some("getWeather"));
        assert_eq!(tracker.tool_name(), Some("getWeather"));
        assert_eq!(tracker.push(" ").tool_name, None);
    }

    #[test]
    fn test_arguments_deltas_do_not_overlap() {
        let payload = "\n{\"name\":\"getWeather\",\"arguments\":{\"city\":\"NYC\",\"unit\":\"c\"}}\n";
        let (name, args, tracker) = feed_chars(payload);
        assert_eq!(name.as_deref(), Some("getWeather"));
        assert_eq!(args, "{\"city\":\"NYC\",\"unit\":\"c\"}");
        assert!(tracker.arguments_complete());
        assert_eq!(tracker.emitted_len(), args.len());
    }

    #[test]
    fn test_args_alias_and_tool_name_alias() {
        let (name, args, _) = feed_chars("{\"toolName\": \"search\", \"args\": {\"q\": \"rust\"}}");
        assert_eq!(name.as_deref(), Some("search"));
        assert_eq!(args, "{\"q\": \"rust\"}");
    }

    #[test]
    fn test_nested_name_key_is_ignored() {
        let (name, args, _) =
            feed_chars("{\"arguments\":{\"name\":\"bob\"},\"name\":\"greet\"}");
        assert_eq!(name.as_deref(), Some("greet"));
        assert_eq!(args, "{\"name\":\"bob\"}");
    }

    #[test]
    fn test_array_payload_uses_first_call() {
        let (name, args, _) = feed_chars(
            "[{\"name\":\"a\",\"arguments\":{\"x\":1}},{\"name\":\"b\",\"arguments\":{\"y\":2}}]",
        );
        assert_eq!(name.as_deref(), Some("a"));
        assert_eq!(args, "{\"x\":1}");
    }

    #[test]
    fn test_braces_inside_strings() {
        let (_, args, _) = feed_chars("{\"name\":\"echo\",\"arguments\":{\"text\":\"}{\\\"\"}}");
        assert_eq!(args, "{\"text\":\"}{\\\"\"}");
    }

    #[test]
    fn test_scalar_arguments() {
        let (_, args, tracker) = feed_chars("{\"name\":\"n\",\"arguments\":42}");
        assert_eq!(args, "42");
        assert!(tracker.arguments_complete());

        let (_, args, _) = feed_chars("{\"name\":\"n\",\"arguments\":\"hi\"}");
        assert_eq!(args, "\"hi\"");
    }

    #[test]
    fn test_escaped_name() {
        let mut tracker = ToolInputTracker::new();
        let update = tracker.push(r#"{"name":"say_\"hi\"","arguments":{}}"#);
        assert_eq!(update.tool_name.as_deref(), Some("say_\"hi\""));
        assert_eq!(update.arguments_delta, "{}");
    }

    #[test]
    fn test_reset() {
        let mut tracker = ToolInputTracker::new();
        let _ = tracker.push("{\"name\":\"a\"");
        tracker.reset();
        assert_eq!(tracker.tool_name(), None);
        assert_eq!(tracker.content(), "");
        assert!(tracker.push("").is_empty());
    }
}
