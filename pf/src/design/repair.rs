//! JSON repair and validation for model output
//!
//! Model text has no schema guarantee. It may be fenced in markdown, carry
//! comments or trailing commas, be wrapped in prose, or be cut off. This module
//! recovers a strictly parsed JSON value of the expected shape, or reports the
//! input as irrecoverable. It never returns a guessed structure.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use super::spec::DesignNodeSpec;

/// Inputs larger than this are rejected outright
pub const MAX_INPUT_BYTES: usize = 1024 * 1024;

static LEADING_FENCE: OnceLock<Regex> = OnceLock::new();
static TRAILING_FENCE: OnceLock<Regex> = OnceLock::new();

/// Expected top-level JSON shape
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Array,
    Object,
}

impl Shape {
    fn open(self) -> char {
        match self {
            Shape::Array => '[',
            Shape::Object => '{',
        }
    }

    fn close(self) -> char {
        match self {
            Shape::Array => ']',
            Shape::Object => '}',
        }
    }

    fn matches(self, value: &Value) -> bool {
        match self {
            Shape::Array => value.is_array(),
            Shape::Object => value.is_object(),
        }
    }
}

/// Why model output could not be used
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RepairError {
    #[error("input too large ({0} bytes)")]
    TooLarge(usize),

    #[error("no JSON {0:?} found in input")]
    NotFound(Shape),

    #[error("unbalanced brackets: {opens} open, {closes} close")]
    Unbalanced { opens: usize, closes: usize },

    #[error("JSON parse failed: {0}")]
    Parse(String),

    #[error("parsed JSON is not a {0:?}")]
    WrongShape(Shape),

    #[error("design contains no nodes")]
    Empty,

    #[error("element {index} is not a JSON object")]
    NotAnObject { index: usize },

    #[error("invalid design node: {0}")]
    Decode(String),

    #[error("nesting depth {depth} exceeds limit {max}")]
    TooDeep { depth: usize, max: usize },
}

/// Outcome of a repair attempt
#[derive(Debug, Clone, PartialEq)]
pub enum Repaired {
    Parsed(Value),
    Irrecoverable(RepairError),
}

impl Repaired {
    pub fn into_result(self) -> Result<Value, RepairError> {
        match self {
            Repaired::Parsed(v) => Ok(v),
            Repaired::Irrecoverable(e) => Err(e),
        }
    }
}

/// Recover a JSON value of the given shape from raw model text
pub fn repair(raw: &str, shape: Shape) -> Repaired {
    debug!(len = raw.len(), ?shape, "repair: called");
    if raw.len() > MAX_INPUT_BYTES {
        debug!("repair: input too large");
        return Repaired::Irrecoverable(RepairError::TooLarge(raw.len()));
    }

    let unfenced = strip_fences(raw.trim());
    let cleaned = strip_trailing_commas(&strip_comments(&unfenced));
    let cleaned = cleaned.trim();

    let narrowed = narrow(cleaned, shape).unwrap_or(cleaned);
    let (opens, closes) = count_delimiters(narrowed, shape);
    if opens == 0 {
        debug!("repair: no opening delimiter");
        return Repaired::Irrecoverable(RepairError::NotFound(shape));
    }
    if opens != closes {
        debug!(opens, closes, "repair: bracket imbalance");
        return Repaired::Irrecoverable(RepairError::Unbalanced { opens, closes });
    }

    let first_error = match parse_shape(narrowed, shape) {
        Ok(value) => {
            debug!("repair: parsed on first pass");
            return Repaired::Parsed(value);
        }
        Err(e) => e,
    };

    match widest_balanced_span(cleaned, shape) {
        Some(span) if span != narrowed => {
            debug!(span_len = span.len(), "repair: retrying with widest balanced span");
            match parse_shape(span, shape) {
                Ok(value) => Repaired::Parsed(value),
                Err(e) => Repaired::Irrecoverable(e),
            }
        }
        _ => {
            debug!("repair: no alternative span");
            Repaired::Irrecoverable(first_error)
        }
    }
}

/// Repair model text into a validated list of design nodes
///
/// Accepts a top-level array, or a single root object; see [`detect_shape`].
pub fn repair_nodes(raw: &str, max_depth: usize) -> Result<Vec<DesignNodeSpec>, RepairError> {
    debug!(len = raw.len(), %max_depth, "repair_nodes: called");
    let value = repair(raw, detect_shape(raw)).into_result()?;
    decode_nodes(value, max_depth)
}

/// Shape of a design response: a root object when `{` comes before any `[`,
/// otherwise an array of nodes
pub fn detect_shape(raw: &str) -> Shape {
    match (raw.find('['), raw.find('{')) {
        (Some(array), Some(object)) if object < array => Shape::Object,
        (None, Some(_)) => Shape::Object,
        _ => Shape::Array,
    }
}

/// Convert a parsed JSON value into typed design nodes
pub fn decode_nodes(value: Value, max_depth: usize) -> Result<Vec<DesignNodeSpec>, RepairError> {
    debug!(%max_depth, "decode_nodes: called");
    let items = match value {
        Value::Array(items) => items,
        object @ Value::Object(_) => vec![object],
        _ => return Err(RepairError::WrongShape(Shape::Array)),
    };
    if items.is_empty() {
        return Err(RepairError::Empty);
    }

    let mut nodes = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        if !item.is_object() {
            return Err(RepairError::NotAnObject { index });
        }
        let node: DesignNodeSpec = serde_json::from_value(item).map_err(|e| RepairError::Decode(e.to_string()))?;
        let depth = node.depth();
        if depth > max_depth {
            return Err(RepairError::TooDeep { depth, max: max_depth });
        }
        nodes.push(node);
    }
    Ok(nodes)
}

fn parse_shape(text: &str, shape: Shape) -> Result<Value, RepairError> {
    let value: Value = serde_json::from_str(text).map_err(|e| RepairError::Parse(e.to_string()))?;
    if shape.matches(&value) {
        Ok(value)
    } else {
        Err(RepairError::WrongShape(shape))
    }
}

fn strip_fences(text: &str) -> String {
    let leading = LEADING_FENCE.get_or_init(|| Regex::new(r"(?i)^```(?:json)?\s*").expect("valid regex"));
    let trailing = TRAILING_FENCE.get_or_init(|| Regex::new(r"\s*```$").expect("valid regex"));
    let text = leading.replace(text, "");
    trailing.replace(&text, "").into_owned()
}

/// Remove `//` and `/* */` comments that sit outside string literals
fn strip_comments(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut in_string = false;
    let mut escaped = false;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if in_string {
            out.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            i += 1;
            continue;
        }

        match (c, chars.get(i + 1)) {
            ('"', _) => {
                in_string = true;
                out.push(c);
                i += 1;
            }
            ('/', Some('/')) => {
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
            }
            ('/', Some('*')) => {
                i += 2;
                while i < chars.len() && !(chars[i] == '*' && chars.get(i + 1) == Some(&'/')) {
                    i += 1;
                }
                i += 2;
            }
            _ => {
                out.push(c);
                i += 1;
            }
        }
    }
    out
}

/// Drop commas that directly precede `]` or `}` (whitespace allowed between)
fn strip_trailing_commas(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut in_string = false;
    let mut escaped = false;

    for (i, &c) in chars.iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            out.push(c);
            continue;
        }
        if c == '"' {
            in_string = true;
        } else if c == ',' {
            let next = chars[i + 1..].iter().find(|ch| !ch.is_whitespace());
            if matches!(next, Some(']') | Some('}')) {
                continue;
            }
        }
        out.push(c);
    }
    out
}

/// First opener to last closer, discarding surrounding prose
fn narrow(text: &str, shape: Shape) -> Option<&str> {
    let start = text.find(shape.open())?;
    let end = text.rfind(shape.close())?;
    (end > start).then(|| &text[start..=end])
}

/// Count the shape's delimiters outside string literals
fn count_delimiters(text: &str, shape: Shape) -> (usize, usize) {
    let (open, close) = (shape.open(), shape.close());
    let mut opens = 0;
    let mut closes = 0;
    let mut in_string = false;
    let mut escaped = false;

    for c in text.chars() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        if c == '"' {
            in_string = true;
        } else if c == open {
            opens += 1;
        } else if c == close {
            closes += 1;
        }
    }
    (opens, closes)
}

/// The longest balanced `open ... close` span, found in a single pass
fn widest_balanced_span(text: &str, shape: Shape) -> Option<&str> {
    let (open, close) = (shape.open(), shape.close());
    let mut openers: Vec<usize> = Vec::new();
    let mut best: Option<&str> = None;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in text.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        if c == '"' {
            in_string = true;
        } else if c == open {
            openers.push(i);
        } else if c == close
            && let Some(start) = openers.pop()
        {
            let span = &text[start..i + c.len_utf8()];
            if best.is_none_or(|b| span.len() > b.len()) {
                best = Some(span);
            }
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parsed(raw: &str, shape: Shape) -> Value {
        match repair(raw, shape) {
            Repaired::Parsed(v) => v,
            Repaired::Irrecoverable(e) => panic!("expected parse, got {e}"),
        }
    }

    #[test]
    fn test_widest_span_skips_stray_closers() {
        let text = r#"] [1] "[not" [2, [3]] ]"#;
        assert_eq!(widest_balanced_span(text, Shape::Array), Some("[2, [3]]"));
        assert_eq!(widest_balanced_span("no brackets", Shape::Array), None);
    }

    #[test]
    fn test_widest_span_is_linear_on_deep_nesting() {
        let depth = 200_000;
        let text = format!("x{}{}", "[".repeat(depth), "]".repeat(depth));
        let span = widest_balanced_span(&text, Shape::Array).unwrap();
        assert_eq!(span.len(), depth * 2);
    }

    #[test]
    fn test_valid_minified_array_is_unchanged() {
        let raw = r##"[{"type":"text","content":"hi","y":0},{"type":"rectangle","width":320}]"##;
        let expected: Value = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed(raw, Shape::Array), expected);
    }

    #[test]
    fn test_fenced_array_with_trailing_comma() {
        let raw = r##"[{"type":"text","content":"hi"},{"type":"star"}]"##;
        let fenced = "```json\n[{\"type\":\"text\",\"content\":\"hi\"},{\"type\":\"star\"},]\n```";
        let expected: Value = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed(fenced, Shape::Array), expected);
    }

    #[test]
    fn test_untagged_and_uppercase_fence() {
        assert_eq!(parsed("```\n[1, 2]\n```", Shape::Array), json!([1, 2]));
        assert_eq!(parsed("```JSON\n[1, 2]\n```", Shape::Array), json!([1, 2]));
    }

    #[test]
    fn test_strips_comments() {
        let raw = r#"[
            // the header
            {"type": "text", /* inline */ "content": "a"}
        ]"#;
        assert_eq!(parsed(raw, Shape::Array), json!([{"type": "text", "content": "a"}]));
    }

    #[test]
    fn test_comment_markers_inside_strings_survive() {
        let raw = r#"[{"content": "see https://example.com/*path*/ // ok"}]"#;
        assert_eq!(
            parsed(raw, Shape::Array),
            json!([{"content": "see https://example.com/*path*/ // ok"}])
        );
    }

    #[test]
    fn test_trailing_commas_in_objects_and_nested_arrays() {
        let raw = r#"[{"a": [1, 2, ], "b": {"c": 3, }, }, ]"#;
        assert_eq!(parsed(raw, Shape::Array), json!([{"a": [1, 2], "b": {"c": 3}}]));
    }

    #[test]
    fn test_comma_inside_string_kept() {
        let raw = r#"["a, ]", "b"]"#;
        assert_eq!(parsed(raw, Shape::Array), json!(["a, ]", "b"]));
    }

    #[test]
    fn test_prose_around_json() {
        let raw = "Sure! Here is the design:\n[{\"type\": \"ellipse\"}]\nLet me know if you need changes.";
        assert_eq!(parsed(raw, Shape::Array), json!([{"type": "ellipse"}]));
    }

    #[test]
    fn test_unbalanced_is_irrecoverable() {
        let result = repair("[{\"a\":1}", Shape::Array);
        assert!(matches!(
            result,
            Repaired::Irrecoverable(RepairError::Unbalanced { opens: 1, closes: 0 })
        ));
    }

    #[test]
    fn test_truncated_output_is_irrecoverable() {
        let raw = r#"[{"type": "frame", "children": [{"type": "text", "content": "cut"#;
        assert!(matches!(repair(raw, Shape::Array), Repaired::Irrecoverable(_)));
    }

    #[test]
    fn test_no_json_at_all() {
        assert_eq!(
            repair("I cannot help with that.", Shape::Array),
            Repaired::Irrecoverable(RepairError::NotFound(Shape::Array))
        );
        assert_eq!(repair("", Shape::Object), Repaired::Irrecoverable(RepairError::NotFound(Shape::Object)));
    }

    #[test]
    fn test_second_pass_uses_widest_span() {
        // Trailing prose adds a balanced pair, so first..last fails to parse
        let raw = r#"[{"type": "text"}, {"type": "star"}] and also see [note]"#;
        assert_eq!(parsed(raw, Shape::Array), json!([{"type": "text"}, {"type": "star"}]));
    }

    #[test]
    fn test_invalid_content_is_irrecoverable() {
        let raw = "[{type: text}]";
        assert!(matches!(repair(raw, Shape::Array), Repaired::Irrecoverable(RepairError::Parse(_))));
    }

    #[test]
    fn test_object_shape() {
        let raw = "```json\n{\"type\": \"frame\", \"children\": [],}\n```";
        assert_eq!(parsed(raw, Shape::Object), json!({"type": "frame", "children": []}));
    }

    #[test]
    fn test_too_large() {
        let raw = "[".repeat(MAX_INPUT_BYTES + 1);
        assert!(matches!(
            repair(&raw, Shape::Array),
            Repaired::Irrecoverable(RepairError::TooLarge(_))
        ));
    }

    #[test]
    fn test_repair_nodes_accepts_root_object() {
        let raw = r#"{"type": "frame", "name": "Root", "children": [{"type": "text"}]}"#;
        let nodes = repair_nodes(raw, 20).unwrap();
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].name.as_deref(), Some("Root"));
        assert_eq!(nodes[0].children.len(), 1);
    }

    #[test]
    fn test_repair_nodes_array_of_objects() {
        let raw = "```json\n[{\"type\": \"text\"}, {\"type\": \"star\",},]\n```";
        let nodes = repair_nodes(raw, 20).unwrap();
        assert_eq!(nodes.len(), 2);
    }

    #[test]
    fn test_repair_nodes_unparseable() {
        assert!(repair_nodes("not json at all", 20).is_err());
        assert!(repair_nodes("[{\"a\":1}", 20).is_err());
    }

    #[test]
    fn test_decode_rejects_non_objects_and_empty() {
        assert_eq!(decode_nodes(json!([]), 20), Err(RepairError::Empty));
        assert_eq!(
            decode_nodes(json!([{"type": "text"}, "oops"]), 20),
            Err(RepairError::NotAnObject { index: 1 })
        );
        assert_eq!(decode_nodes(json!(3), 20), Err(RepairError::WrongShape(Shape::Array)));
    }

    #[test]
    fn test_decode_enforces_depth_limit() {
        let mut value = json!({"type": "text"});
        for _ in 0..5 {
            value = json!({"type": "frame", "children": [value]});
        }
        assert!(decode_nodes(json!([value.clone()]), 6).is_ok());
        assert_eq!(
            decode_nodes(json!([value]), 5),
            Err(RepairError::TooDeep { depth: 6, max: 5 })
        );
    }
}
