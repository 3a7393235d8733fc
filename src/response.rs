//! Response document envelope: `{data, links?}`.

use serde::Serialize;
use serde_json::Value;

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct Links {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prev: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
}

impl Links {
    /// `Some` only when at least one link exists; the envelope drops the
    /// `links` key entirely otherwise.
    pub fn non_empty(prev: Option<String>, next: Option<String>) -> Option<Links> {
        if prev.is_none() && next.is_none() {
            None
        } else {
            Some(Links { prev, next })
        }
    }
}

#[derive(Serialize, Clone, Debug)]
pub struct Document {
    pub data: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub links: Option<Links>,
}

impl Document {
    pub fn new(data: Value) -> Document {
        Document { data, links: None }
    }

    pub fn with_links(data: Value, links: Option<Links>) -> Document {
        Document { data, links }
    }
}
