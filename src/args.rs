//! Call-argument types and boundary normalization.
//!
//! `get`/`post` accept loosely-shaped targets: a bare id, an id list, a filter
//! object, or a comma-delimited string from a URL path. Each shape is an explicit
//! enum variant and is normalized exactly once here, so the service layer only
//! ever sees an id list or a cleaned filter map.

use serde_json::{Map, Value};

/// Target clause of a `get` or `post` call.
#[derive(Clone, Debug, Default)]
pub enum Where {
    #[default]
    None,
    /// One id (`GET /posts/7`).
    Id(Value),
    /// Explicit id list.
    Ids(Vec<Value>),
    /// Attribute filter, or relation clause on create (`{posts: 7}`).
    Filter(Map<String, Value>),
    /// Comma-delimited id string from a URL path (`"3,4,5"`).
    Raw(String),
}

/// Normalized target: either concrete ids or a filter for the provider to resolve.
#[derive(Clone, Debug)]
pub enum Selection {
    Ids(Vec<Value>),
    Filter(Map<String, Value>),
}

impl Where {
    /// Collapse to a `Selection` plus the limit the shape forces, if any.
    /// Single-id shapes force `limit = 1`; id lists force `limit = len`.
    pub fn normalize(self) -> (Selection, Option<usize>) {
        match self {
            Where::None => (Selection::Filter(Map::new()), None),
            Where::Id(id) => (Selection::Ids(vec![id]), Some(1)),
            Where::Raw(s) => {
                let ids: Vec<Value> = s
                    .split(',')
                    .map(str::trim)
                    .filter(|part| !part.is_empty())
                    .map(parse_scalar)
                    .collect();
                id_list(ids)
            }
            Where::Ids(ids) => {
                let ids: Vec<Value> = ids.into_iter().filter(|v| !is_empty_value(v)).collect();
                id_list(ids)
            }
            Where::Filter(mut map) => {
                // An `id` key collapses the whole clause to single-object mode.
                if let Some(id) = map.remove("id") {
                    return (Selection::Ids(vec![id]), Some(1));
                }
                map.retain(|_, v| !is_empty_value(v));
                (Selection::Filter(map), None)
            }
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Where::None)
    }
}

/// An id list with no surviving entries is no target at all; it falls back to
/// the empty filter instead of forcing a zero limit.
fn id_list(ids: Vec<Value>) -> (Selection, Option<usize>) {
    if ids.is_empty() {
        (Selection::Filter(Map::new()), None)
    } else {
        let n = ids.len();
        (Selection::Ids(ids), Some(n))
    }
}

/// Requested attribute projection.
#[derive(Clone, Debug, Default)]
pub enum Fields {
    #[default]
    None,
    One(String),
    Many(Vec<String>),
    /// Comma-delimited field string (`"name,email"`).
    Raw(String),
}

impl Fields {
    /// Ordered, de-duplicated field list. Empty means no projection.
    pub fn normalize(self) -> Vec<String> {
        let raw = match self {
            Fields::None => Vec::new(),
            Fields::One(f) => vec![f],
            Fields::Many(fs) => fs,
            Fields::Raw(s) => s.split(',').map(str::to_string).collect(),
        };
        let mut out: Vec<String> = Vec::with_capacity(raw.len());
        for f in raw {
            let f = f.trim().to_string();
            if !f.is_empty() && !out.contains(&f) {
                out.push(f);
            }
        }
        out
    }
}

/// Page size: positive integer, or the caller's default.
pub fn clamp_limit(limit: Option<i64>, default: usize) -> usize {
    match limit {
        Some(n) if n > 0 => n as usize,
        _ => default,
    }
}

/// Page offset: non-negative integer, or 0.
pub fn clamp_offset(offset: Option<i64>) -> usize {
    match offset {
        Some(n) if n > 0 => n as usize,
        _ => 0,
    }
}

/// Coerce a path/query string to a typed id value: integer, bool, or string.
pub fn parse_scalar(s: &str) -> Value {
    if let Ok(n) = s.parse::<i64>() {
        return Value::Number(n.into());
    }
    if s.eq_ignore_ascii_case("true") {
        return Value::Bool(true);
    }
    if s.eq_ignore_ascii_case("false") {
        return Value::Bool(false);
    }
    Value::String(s.to_string())
}

/// Id rendering for error messages: strings without JSON quotes.
pub(crate) fn display_id(id: &Value) -> String {
    match id {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Null, empty string, empty array, or empty object. Numeric zero and `false`
/// are kept: both are valid ids and filter values.
pub fn is_empty_value(v: &Value) -> bool {
    match v {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(m) => m.is_empty(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn filter(pairs: &[(&str, Value)]) -> Map<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn bare_id_becomes_single_element_list() {
        let (sel, limit) = Where::Id(json!(7)).normalize();
        match sel {
            Selection::Ids(ids) => assert_eq!(ids, vec![json!(7)]),
            other => panic!("expected ids, got {:?}", other),
        }
        assert_eq!(limit, Some(1));
    }

    #[test]
    fn raw_string_splits_and_forces_limit() {
        let (sel, limit) = Where::Raw("3, 4,5".into()).normalize();
        match sel {
            Selection::Ids(ids) => assert_eq!(ids, vec![json!(3), json!(4), json!(5)]),
            other => panic!("expected ids, got {:?}", other),
        }
        assert_eq!(limit, Some(3));
    }

    #[test]
    fn filter_with_id_key_collapses_to_single_object_mode() {
        let (sel, limit) =
            Where::Filter(filter(&[("id", json!(9)), ("name", json!("x"))])).normalize();
        match sel {
            Selection::Ids(ids) => assert_eq!(ids, vec![json!(9)]),
            other => panic!("expected ids, got {:?}", other),
        }
        assert_eq!(limit, Some(1));
    }

    #[test]
    fn filter_cleanup_drops_empty_values_but_keeps_zero() {
        let (sel, limit) = Where::Filter(filter(&[
            ("name", json!("")),
            ("tags", json!([])),
            ("rank", json!(0)),
            ("gone", Value::Null),
        ]))
        .normalize();
        match sel {
            Selection::Filter(map) => {
                assert_eq!(map.len(), 1);
                assert_eq!(map.get("rank"), Some(&json!(0)));
            }
            other => panic!("expected filter, got {:?}", other),
        }
        assert_eq!(limit, None);
    }

    #[test]
    fn fields_normalize_dedups_and_trims() {
        assert_eq!(
            Fields::Raw("name, email,name,".into()).normalize(),
            vec!["name".to_string(), "email".to_string()]
        );
        assert!(Fields::None.normalize().is_empty());
    }

    #[test]
    fn limit_and_offset_coercion() {
        assert_eq!(clamp_limit(Some(25), 10), 25);
        assert_eq!(clamp_limit(Some(0), 10), 10);
        assert_eq!(clamp_limit(Some(-3), 10), 10);
        assert_eq!(clamp_limit(None, 10), 10);
        assert_eq!(clamp_offset(Some(40)), 40);
        assert_eq!(clamp_offset(Some(-1)), 0);
        assert_eq!(clamp_offset(None), 0);
    }
}
