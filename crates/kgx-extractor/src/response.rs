//! Tolerant parsing of raw model output
//!
//! Models are asked for pure JSON but routinely return prose, markdown
//! fences, or truncated documents. The locator scans the raw text for
//! the first balanced JSON array or object, respecting string literals
//! and escapes, and the shape helpers normalize the accepted layouts
//! into a uniform record list.

use kgx_core::{ChunkFailure, FailureReason};
use serde_json::Value;

const EXCERPT_CHARS: usize = 200;

/// Locate the first balanced JSON array or object in raw model text
///
/// Returns the matching slice, or `None` when no balanced payload
/// exists (prose-only or truncated output).
pub fn locate_json_payload(raw: &str) -> Option<&str> {
    let bytes = raw.as_bytes();
    let start = raw.find(['[', '{'])?;

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, &byte) in bytes[start..].iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if byte == b'\\' {
                escaped = true;
            } else if byte == b'"' {
                in_string = false;
            }
            continue;
        }
        match byte {
            b'"' => in_string = true,
            b'[' | b'{' => depth += 1,
            b']' | b'}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(&raw[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }

    None
}

/// Truncated excerpt of raw output for failure reports
pub fn excerpt(raw: &str) -> String {
    if raw.chars().count() <= EXCERPT_CHARS {
        raw.to_string()
    } else {
        let cut: String = raw.chars().take(EXCERPT_CHARS).collect();
        format!("{cut}...")
    }
}

fn parse_failure(chunk_index: usize, detail: String) -> ChunkFailure {
    ChunkFailure {
        chunk_index,
        reason: FailureReason::Parse,
        detail,
    }
}

/// Parse raw triple-mode output into a list of candidate records
///
/// Accepted shapes, in order of preference:
/// - a JSON array of objects
/// - a single triple object (wrapped into a one-element list)
/// - an object whose sole array-valued field holds the records
pub fn parse_triple_records(raw: &str, chunk_index: usize) -> Result<Vec<Value>, ChunkFailure> {
    let payload = locate_json_payload(raw).ok_or_else(|| {
        parse_failure(
            chunk_index,
            format!("no JSON payload in model output: {}", excerpt(raw)),
        )
    })?;

    let value: Value = serde_json::from_str(payload).map_err(|e| {
        parse_failure(
            chunk_index,
            format!("invalid JSON ({e}): {}", excerpt(payload)),
        )
    })?;

    match value {
        Value::Array(items) => Ok(items),
        Value::Object(map) => {
            if map.contains_key("subject")
                && map.contains_key("predicate")
                && map.contains_key("object")
            {
                return Ok(vec![Value::Object(map)]);
            }
            let mut arrays: Vec<Vec<Value>> = map
                .into_iter()
                .filter_map(|(_, v)| match v {
                    Value::Array(items) => Some(items),
                    _ => None,
                })
                .collect();
            if arrays.len() == 1 {
                Ok(arrays.remove(0))
            } else {
                Err(parse_failure(
                    chunk_index,
                    format!("unrecognized JSON shape: {}", excerpt(payload)),
                ))
            }
        }
        other => Err(parse_failure(
            chunk_index,
            format!("expected array or object, got {other}"),
        )),
    }
}

/// Parse raw JSON-LD output into the list of `@graph` nodes
///
/// Accepts an object carrying an `@graph` array, or a bare array of
/// node objects.
pub fn parse_graph_nodes(raw: &str, chunk_index: usize) -> Result<Vec<Value>, ChunkFailure> {
    let payload = locate_json_payload(raw).ok_or_else(|| {
        parse_failure(
            chunk_index,
            format!("no JSON payload in model output: {}", excerpt(raw)),
        )
    })?;

    let value: Value = serde_json::from_str(payload).map_err(|e| {
        parse_failure(
            chunk_index,
            format!("invalid JSON ({e}): {}", excerpt(payload)),
        )
    })?;

    match value {
        Value::Object(mut map) => match map.remove("@graph") {
            Some(Value::Array(nodes)) => Ok(nodes),
            Some(_) => Err(parse_failure(
                chunk_index,
                "@graph is not an array".to_string(),
            )),
            // a single bare node is tolerated
            None if map.contains_key("@id") => Ok(vec![Value::Object(map)]),
            None => Err(parse_failure(
                chunk_index,
                format!("object has no @graph: {}", excerpt(payload)),
            )),
        },
        Value::Array(nodes) => Ok(nodes),
        other => Err(parse_failure(
            chunk_index,
            format!("expected JSON-LD object, got {other}"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locate_plain_array() {
        let raw = r#"[{"subject":"a","predicate":"b","object":"c"}]"#;
        assert_eq!(locate_json_payload(raw), Some(raw));
    }

    #[test]
    fn test_locate_strips_markdown_fence() {
        let raw = "```json\n[{\"subject\":\"a\"}]\n```";
        assert_eq!(locate_json_payload(raw), Some(r#"[{"subject":"a"}]"#));
    }

    #[test]
    fn test_locate_skips_leading_prose() {
        let raw = "Here are the triples you asked for:\n[1, 2] trailing text";
        assert_eq!(locate_json_payload(raw), Some("[1, 2]"));
    }

    #[test]
    fn test_locate_ignores_brackets_inside_strings() {
        let raw = r#"[{"object":"a ] tricky } value"}]"#;
        assert_eq!(locate_json_payload(raw), Some(raw));
    }

    #[test]
    fn test_locate_handles_escaped_quote_in_string() {
        let raw = r#"[{"object":"say \" ] hi"}]"#;
        assert_eq!(locate_json_payload(raw), Some(raw));
    }

    #[test]
    fn test_locate_truncated_output_is_none() {
        assert_eq!(locate_json_payload(r#"[{"subject":"a""#), None);
        assert_eq!(locate_json_payload("no json at all"), None);
    }

    #[test]
    fn test_parse_single_object_wrapped() {
        let raw = r#"{"subject":"a","predicate":"b","object":"c"}"#;
        let records = parse_triple_records(raw, 0).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["subject"], "a");
    }

    #[test]
    fn test_parse_wrapper_object_with_single_list() {
        let raw = r#"{"triples":[{"subject":"a","predicate":"b","object":"c"}]}"#;
        let records = parse_triple_records(raw, 0).unwrap();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn test_parse_ambiguous_wrapper_is_failure() {
        let raw = r#"{"first":[1],"second":[2]}"#;
        let failure = parse_triple_records(raw, 3).unwrap_err();
        assert_eq!(failure.chunk_index, 3);
        assert_eq!(failure.reason, FailureReason::Parse);
    }

    #[test]
    fn test_parse_prose_only_is_failure_with_excerpt() {
        let failure = parse_triple_records("I could not find any triples.", 1).unwrap_err();
        assert!(failure.detail.contains("I could not find"));
    }

    #[test]
    fn test_parse_graph_nodes() {
        let raw = r#"{"@graph":[{"@id":"e1","@type":"Person"}]}"#;
        let nodes = parse_graph_nodes(raw, 0).unwrap();
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0]["@id"], "e1");
    }

    #[test]
    fn test_parse_bare_node_tolerated() {
        let raw = r#"{"@id":"e1","@type":"Person"}"#;
        let nodes = parse_graph_nodes(raw, 0).unwrap();
        assert_eq!(nodes.len(), 1);
    }

    #[test]
    fn test_excerpt_truncates_on_char_boundary() {
        let long: String = "é".repeat(300);
        let cut = excerpt(&long);
        assert!(cut.ends_with("..."));
        assert_eq!(cut.chars().count(), EXCERPT_CHARS + 3);
    }
}
