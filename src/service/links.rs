//! Pagination cursor links: query-string construction for prev/next pages.

use serde_json::{Map, Value};

/// Snapshot of one `get` call's query, taken before id resolution.
/// Only used to derive the prev/next cursor links.
#[derive(Clone, Debug)]
pub struct QueryDescriptor {
    pub filter: Map<String, Value>,
    pub fields: Vec<String>,
    pub limit: usize,
    pub offset: usize,
    pub sort: Option<String>,
}

impl QueryDescriptor {
    /// Query string for this descriptor at the given page offset.
    /// Empty filter/fields/sort entries are dropped to keep links minimal;
    /// list-valued filter entries join into comma-delimited strings.
    pub fn query_string(&self, offset: usize) -> String {
        let mut pairs: Vec<(String, String)> = Vec::new();
        for (k, v) in &self.filter {
            let joined = join_value(v);
            if !joined.is_empty() {
                pairs.push((k.clone(), joined));
            }
        }
        if !self.fields.is_empty() {
            pairs.push(("fields".to_string(), self.fields.join(",")));
        }
        pairs.push(("limit".to_string(), self.limit.to_string()));
        pairs.push(("offset".to_string(), offset.to_string()));
        if let Some(sort) = self.sort.as_deref().filter(|s| !s.is_empty()) {
            pairs.push(("sort".to_string(), sort.to_string()));
        }
        pairs
            .iter()
            .map(|(k, v)| {
                format!(
                    "{}={}",
                    urlencoding::encode(k),
                    urlencoding::encode(v)
                )
            })
            .collect::<Vec<_>>()
            .join("&")
    }
}

fn join_value(v: &Value) -> String {
    match v {
        Value::Array(items) => items
            .iter()
            .map(scalar_string)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(","),
        other => scalar_string(other),
    }
}

fn scalar_string(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
