//! Dotted / bracketed path resolution over JSON values.
//!
//! Supported syntax:
//! - `a.b.c` nested keys
//! - `a[0]` array index (rewritten to `a.0`)
//! - `a["key"]` / `a['key']` quoted keys (rewritten to `a.key`)
//! - `a\.b` a single segment whose name contains a dot

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

// Never produced by bracket rewriting or user paths in practice.
const ESCAPED_DOT: &str = "\u{0}DOT\u{0}";

/// How far past its end an existing array may be padded by a write.
const MAX_ARRAY_PADDING: usize = 1024;

static INDEX_SEGMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[(\d+)\]").expect("valid index regex"));
static DOUBLE_QUOTED_SEGMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"\["([^"]*)"\]"#).expect("valid quoted key regex"));
static SINGLE_QUOTED_SEGMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\['([^']*)'\]").expect("valid quoted key regex"));

/// Split a path into its logical segments.
pub fn parse_path(path: &str) -> Vec<String> {
    let protected = path.replace("\\.", ESCAPED_DOT);
    let normalized = INDEX_SEGMENT.replace_all(&protected, ".$1");
    let normalized = DOUBLE_QUOTED_SEGMENT.replace_all(&normalized, ".$1");
    let normalized = SINGLE_QUOTED_SEGMENT.replace_all(&normalized, ".$1");

    normalized
        .split('.')
        .filter(|segment| !segment.is_empty())
        .map(|segment| segment.replace(ESCAPED_DOT, "."))
        .collect()
}

/// Read the value at `path`.
///
/// A key equal to the whole, unparsed path wins over a nested walk, so flat
/// objects such as `{"meta_data.maxDuration": 10}` resolve directly.
pub fn get_by_path<'a>(data: &'a Value, path: &str) -> Option<&'a Value> {
    if let Some(value) = data.as_object().and_then(|map| map.get(path)) {
        return Some(value);
    }

    let mut current = data;
    for segment in parse_path(path) {
        current = match current {
            Value::Object(map) => map.get(&segment)?,
            Value::Array(items) => items.get(array_index(&segment)?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Write `value` at `path`, creating intermediate objects as needed.
///
/// Missing or scalar intermediates are replaced by empty objects. A numeric
/// segment on an existing array indexes into it, padding with nulls; an index
/// too far past the end turns the array into an object keyed by index.
pub fn set_by_path(target: &mut Map<String, Value>, path: &str, value: Value) {
    let mut segments = parse_path(path).into_iter();
    let Some(first) = segments.next() else {
        return;
    };

    let mut slot = target.entry(first).or_insert(Value::Null);
    for segment in segments {
        slot = child_slot(slot, &segment);
    }
    *slot = value;
}

/// Canonical array index: ASCII digits without a leading zero.
fn array_index(segment: &str) -> Option<usize> {
    let canonical = !segment.is_empty()
        && segment.bytes().all(|b| b.is_ascii_digit())
        && (segment == "0" || !segment.starts_with('0'));
    if canonical {
        segment.parse().ok()
    } else {
        None
    }
}

fn child_slot<'a>(node: &'a mut Value, segment: &str) -> &'a mut Value {
    let padded_len = match (&*node, array_index(segment)) {
        (Value::Array(items), Some(index)) => index
            .checked_add(1)
            .filter(|len| *len <= items.len().saturating_add(MAX_ARRAY_PADDING)),
        _ => None,
    };

    match (node, padded_len) {
        (Value::Array(items), Some(len)) => {
            if items.len() < len {
                items.resize(len, Value::Null);
            }
            &mut items[len - 1]
        }
        (node, _) => {
            let map = match std::mem::take(node) {
                Value::Object(map) => map,
                // Arrays keep their elements under index keys
                Value::Array(items) => items
                    .into_iter()
                    .enumerate()
                    .map(|(i, item)| (i.to_string(), item))
                    .collect(),
                _ => Map::new(),
            };
            *node = Value::Object(map);
            match node {
                Value::Object(map) => map.entry(segment.to_string()).or_insert(Value::Null),
                _ => unreachable!("intermediate node was just replaced by an object"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_plain_and_bracket_segments() {
        assert_eq!(parse_path("a.b.c"), vec!["a", "b", "c"]);
        assert_eq!(parse_path("a[0].b"), vec!["a", "0", "b"]);
        assert_eq!(parse_path(r#"a["b.c"]"#), vec!["a", "b", "c"]);
        assert_eq!(parse_path("a['key']"), vec!["a", "key"]);
    }

    #[test]
    fn test_parse_drops_empty_segments() {
        assert_eq!(parse_path(".a..b."), vec!["a", "b"]);
        assert!(parse_path("").is_empty());
    }

    #[test]
    fn test_parse_keeps_escaped_dot() {
        assert_eq!(parse_path(r"meta\.data.value"), vec!["meta.data", "value"]);
    }

    #[test]
    fn test_get_nested_and_indexed() {
        let data = json!({"a": [{"b": 1}], "image_size": {"width": 512}});
        assert_eq!(get_by_path(&data, "a[0].b"), Some(&json!(1)));
        assert_eq!(get_by_path(&data, "image_size.width"), Some(&json!(512)));
    }

    #[test]
    fn test_get_stops_at_null_intermediate() {
        let data = json!({"a": null, "s": "text"});
        assert_eq!(get_by_path(&data, "a.b"), None);
        assert_eq!(get_by_path(&data, "s.length"), None);
        assert_eq!(get_by_path(&data, "missing.deep.path"), None);
    }

    #[test]
    fn test_get_returns_explicit_null_leaf() {
        let data = json!({"a": {"b": null}});
        assert_eq!(get_by_path(&data, "a.b"), Some(&Value::Null));
    }

    #[test]
    fn test_get_flat_key_wins() {
        let data = json!({"x.y": 1, "x": {"y": 2}});
        assert_eq!(get_by_path(&data, "x.y"), Some(&json!(1)));
    }

    #[test]
    fn test_get_escaped_dot() {
        let data = json!({"a.b": 7});
        assert_eq!(get_by_path(&data, r"a\.b"), Some(&json!(7)));

        let nested = json!({"meta": {"a.b": {"c": true}}});
        assert_eq!(get_by_path(&nested, r"meta.a\.b.c"), Some(&json!(true)));
    }

    #[test]
    fn test_set_creates_intermediates() {
        let mut out = Map::new();
        set_by_path(&mut out, "image_size.width", json!(1024));
        set_by_path(&mut out, "image_size.height", json!(768));
        assert_eq!(
            Value::Object(out),
            json!({"image_size": {"width": 1024, "height": 768}})
        );
    }

    #[test]
    fn test_set_bracket_path_reads_back() {
        let mut out = Map::new();
        set_by_path(&mut out, "a[0].b", json!(5));
        let value = Value::Object(out);
        assert_eq!(value, json!({"a": {"0": {"b": 5}}}));
        assert_eq!(get_by_path(&value, "a[0].b"), Some(&json!(5)));
    }

    #[test]
    fn test_set_replaces_scalar_intermediate() {
        let mut out = Map::new();
        set_by_path(&mut out, "a", json!("leaf"));
        set_by_path(&mut out, "a.b", json!(1));
        assert_eq!(Value::Object(out), json!({"a": {"b": 1}}));
    }

    #[test]
    fn test_set_indexes_existing_array() {
        let mut out = Map::new();
        set_by_path(&mut out, "loras", json!([{"path": "x"}]));
        set_by_path(&mut out, "loras[0].scale", json!(0.8));
        set_by_path(&mut out, "loras[2]", json!("z"));
        assert_eq!(
            Value::Object(out),
            json!({"loras": [{"path": "x", "scale": 0.8}, null, "z"]})
        );
    }

    #[test]
    fn test_set_index_past_padding_limit_becomes_key() {
        let mut out = Map::new();
        set_by_path(&mut out, "loras", json!([{"path": "x"}]));
        set_by_path(&mut out, "loras[18446744073709551615]", json!(2));
        set_by_path(&mut out, "huge", json!([]));
        set_by_path(&mut out, "huge[4000000000]", json!(true));
        assert_eq!(
            Value::Object(out),
            json!({
                "loras": {"0": {"path": "x"}, "18446744073709551615": 2},
                "huge": {"4000000000": true}
            })
        );
    }

    #[test]
    fn test_non_canonical_index_is_a_key() {
        let data = json!({"a": ["zero", "one"]});
        assert_eq!(get_by_path(&data, "a.1"), Some(&json!("one")));
        assert_eq!(get_by_path(&data, "a.01"), None);
        assert_eq!(get_by_path(&data, "a.+1"), None);

        let mut out = Map::new();
        set_by_path(&mut out, "a", json!(["zero"]));
        set_by_path(&mut out, "a.01", json!("x"));
        assert_eq!(Value::Object(out), json!({"a": {"0": "zero", "01": "x"}}));
    }

    #[test]
    fn test_set_escaped_dot_key() {
        let mut out = Map::new();
        set_by_path(&mut out, r"meta_data\.maxDuration", json!(10));
        assert_eq!(Value::Object(out), json!({"meta_data.maxDuration": 10}));
    }

    #[test]
    fn test_set_empty_path_is_noop() {
        let mut out = Map::new();
        set_by_path(&mut out, "", json!(1));
        assert!(out.is_empty());
    }

    #[test]
    fn test_round_trip_plain_paths() {
        for path in ["a", "a.b", "a.b.c", "prompt", "image_size.width"] {
            let mut out = Map::new();
            set_by_path(&mut out, path, json!("v"));
            let value = Value::Object(out);
            assert_eq!(get_by_path(&value, path), Some(&json!("v")), "path {path}");
        }
    }
}
