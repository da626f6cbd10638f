//! Dotted-path lookups into nested source documents.
//!
//! Paths walk nested objects segment by segment. Arrays are treated as
//! single-element wrappers: only the first element is considered. An
//! object reached without remaining segments is not a value, while a
//! scalar found as the first array element is returned even if segments
//! remain.

use std::fmt;

use serde_json::{Map, Number, Value};

/// A leaf value found at the end of a path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scalar<'a> {
    Str(&'a str),
    Number(&'a Number),
    Bool(bool),
}

impl fmt::Display for Scalar<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Str(s) => f.write_str(s),
            Scalar::Number(n) => write!(f, "{n}"),
            Scalar::Bool(b) => write!(f, "{b}"),
        }
    }
}

/// Resolve `path` against `doc`, returning `None` when any segment is
/// missing or the path ends on a container.
pub fn resolve<'a>(
    path: &str,
    doc: &'a Map<String, Value>,
) -> Option<Scalar<'a>> {
    let segments: Vec<&str> = path.split('.').collect();
    walk(&segments, doc)
}

fn walk<'a>(
    segments: &[&str],
    map: &'a Map<String, Value>,
) -> Option<Scalar<'a>> {
    let (key, rest) = segments.split_first()?;
    match map.get(*key)? {
        Value::Object(inner) => descend(rest, inner),
        Value::Array(items) => match items.first()? {
            Value::Object(inner) => descend(rest, inner),
            first => scalar(first),
        },
        value => scalar(value),
    }
}

fn descend<'a>(
    rest: &[&str],
    map: &'a Map<String, Value>,
) -> Option<Scalar<'a>> {
    if rest.is_empty() {
        return None;
    }
    walk(rest, map)
}

fn scalar(value: &Value) -> Option<Scalar<'_>> {
    match value {
        Value::String(s) => Some(Scalar::Str(s)),
        Value::Number(n) => Some(Scalar::Number(n)),
        Value::Bool(b) => Some(Scalar::Bool(*b)),
        // nested arrays and nulls carry no usable value
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn doc(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("fixture must be an object"),
        }
    }

    #[test]
    fn resolves_nested_object() {
        let d = doc(json!({"a": {"b": "22"}, "b": 2}));
        assert_eq!(resolve("a.b", &d), Some(Scalar::Str("22")));
    }

    #[test]
    fn missing_nested_key_is_absent() {
        let d = doc(json!({"a": {"b": "22"}, "b": 2}));
        assert_eq!(resolve("a.c", &d), None);
    }

    #[test]
    fn missing_top_level_key_is_absent() {
        let d = doc(json!({"a": {"b": "22"}, "b": 2}));
        assert_eq!(resolve("c", &d), None);
    }

    #[test]
    fn top_level_number_is_scalar() {
        let d = doc(json!({"a": {"b": "22"}, "b": 2}));
        assert_eq!(resolve("b", &d).map(|s| s.to_string()), Some("2".into()));
    }

    #[test]
    fn descends_into_first_list_element() {
        let d = doc(json!({"a": [{"c": "3"}, "d"], "b": 2}));
        assert_eq!(resolve("a.c", &d), Some(Scalar::Str("3")));
    }

    #[test]
    fn resolves_three_levels() {
        let d = doc(json!({"a": {"b": {"c": "ccc"}, "c": 2}}));
        assert_eq!(resolve("a.b.c", &d), Some(Scalar::Str("ccc")));
    }

    #[test]
    fn path_ending_on_object_is_absent() {
        let d = doc(json!({"a": {"b": {"c": "ccc"}}}));
        assert_eq!(resolve("a.b", &d), None);
    }

    #[test]
    fn path_ending_on_list_of_objects_is_absent() {
        let d = doc(json!({"a": [{"c": "3"}]}));
        assert_eq!(resolve("a", &d), None);
    }

    #[test]
    fn scalar_list_head_wins_even_mid_path() {
        let d = doc(json!({"a": ["x", "y"]}));
        assert_eq!(resolve("a", &d), Some(Scalar::Str("x")));
        assert_eq!(resolve("a.b.c", &d), Some(Scalar::Str("x")));
    }

    #[test]
    fn scalar_mid_path_is_returned() {
        let d = doc(json!({"a": "leaf"}));
        assert_eq!(resolve("a.b", &d), Some(Scalar::Str("leaf")));
    }

    #[test]
    fn empty_list_is_absent() {
        let d = doc(json!({"a": []}));
        assert_eq!(resolve("a", &d), None);
    }

    #[test]
    fn null_is_absent() {
        let d = doc(json!({"a": null}));
        assert_eq!(resolve("a", &d), None);
    }

    #[test]
    fn booleans_render_as_words() {
        let d = doc(json!({"flag": true}));
        assert_eq!(resolve("flag", &d).unwrap().to_string(), "true");
    }

    #[test]
    fn marc_style_subfield_lookup() {
        let d = doc(json!({
            "content": {"245": [{"a": "Moby Dick", "b": "or, The Whale"}]}
        }));
        assert_eq!(
            resolve("content.245.a", &d),
            Some(Scalar::Str("Moby Dick"))
        );
        assert_eq!(
            resolve("content.245.b", &d),
            Some(Scalar::Str("or, The Whale"))
        );
        assert_eq!(resolve("content.245.c", &d), None);
    }
}
