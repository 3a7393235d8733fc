//! In-memory provider: the default storage backend for demos and tests.

use crate::args::display_id;
use crate::error::AppError;
use crate::provider::{Provider, ProviderFactory};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::sync::{Arc, RwLock};

/// How `add` assigns ids to objects that carry none.
#[derive(Clone, Copy, Debug, Default)]
pub enum IdStrategy {
    /// Monotonic integers starting at 1. Predictable; used by the test suite.
    #[default]
    Sequential,
    Uuid,
}

struct Store {
    rows: Vec<Map<String, Value>>,
    next_id: i64,
}

/// Exact-match in-memory store for one resource.
pub struct MemoryProvider {
    endpoint: String,
    ids: IdStrategy,
    store: RwLock<Store>,
}

impl MemoryProvider {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self::with_ids(endpoint, IdStrategy::default())
    }

    pub fn with_ids(endpoint: impl Into<String>, ids: IdStrategy) -> Self {
        MemoryProvider {
            endpoint: endpoint.into(),
            ids,
            store: RwLock::new(Store {
                rows: Vec::new(),
                next_id: 1,
            }),
        }
    }

    fn lock_read(&self) -> Result<std::sync::RwLockReadGuard<'_, Store>, AppError> {
        self.store
            .read()
            .map_err(|_| AppError::Provider("memory store poisoned".into()))
    }

    fn lock_write(&self) -> Result<std::sync::RwLockWriteGuard<'_, Store>, AppError> {
        self.store
            .write()
            .map_err(|_| AppError::Provider("memory store poisoned".into()))
    }
}

#[async_trait]
impl Provider for MemoryProvider {
    async fn find(
        &self,
        filter: &Map<String, Value>,
        limit: usize,
        offset: usize,
        sort: Option<&str>,
    ) -> Result<Vec<Value>, AppError> {
        let store = self.lock_read()?;
        let mut rows: Vec<&Map<String, Value>> = store
            .rows
            .iter()
            .filter(|row| matches_filter(row, filter))
            .collect();
        if let Some(sort) = sort.filter(|s| !s.is_empty()) {
            let (field, descending) = match sort.strip_prefix('-') {
                Some(f) => (f, true),
                None => (sort, false),
            };
            rows.sort_by(|a, b| {
                let ord = compare_values(a.get(field), b.get(field));
                if descending {
                    ord.reverse()
                } else {
                    ord
                }
            });
        }
        Ok(rows
            .into_iter()
            .skip(offset)
            .take(limit)
            .filter_map(|row| row.get("id").cloned())
            .collect())
    }

    async fn fetch(&self, ids: &[Value], fields: &[String]) -> Result<Vec<Value>, AppError> {
        let store = self.lock_read()?;
        let mut out = Vec::with_capacity(ids.len());
        for id in ids {
            let row = find_row(&store.rows, id)
                .ok_or_else(|| AppError::NotFound(format!("id `{}` not found", display_id(id))))?;
            out.push(project(row, fields));
        }
        Ok(out)
    }

    async fn get(&self, id: &Value, fields: &[String]) -> Result<Value, AppError> {
        let store = self.lock_read()?;
        let row = find_row(&store.rows, id)
            .ok_or_else(|| AppError::NotFound(format!("id `{}` not found", display_id(id))))?;
        Ok(project(row, fields))
    }

    async fn get_attr(&self, id: &Value, field: &str) -> Result<Value, AppError> {
        let store = self.lock_read()?;
        let row = find_row(&store.rows, id)
            .ok_or_else(|| AppError::NotFound(format!("id `{}` not found", display_id(id))))?;
        Ok(row.get(field).cloned().unwrap_or(Value::Null))
    }

    async fn add(&self, mut object: Map<String, Value>) -> Result<Value, AppError> {
        let mut store = self.lock_write()?;
        match object.get("id") {
            Some(id) if !id.is_null() => {
                if find_row(&store.rows, id).is_some() {
                    return Err(AppError::Conflict(format!(
                        "id `{}` already exists",
                        display_id(id)
                    )));
                }
                // Keep sequential assignment ahead of pre-assigned numeric ids.
                if let Some(n) = id.as_i64() {
                    store.next_id = store.next_id.max(n + 1);
                }
            }
            _ => {
                let id = match self.ids {
                    IdStrategy::Sequential => {
                        let n = store.next_id;
                        store.next_id += 1;
                        Value::Number(n.into())
                    }
                    IdStrategy::Uuid => Value::String(uuid::Uuid::new_v4().to_string()),
                };
                object.insert("id".to_string(), id);
            }
        }
        store.rows.push(object.clone());
        Ok(Value::Object(object))
    }

    async fn add_attr(&self, id: &Value, field: &str, value: Value) -> Result<(), AppError> {
        let mut store = self.lock_write()?;
        let row = find_row_mut(&mut store.rows, id)
            .ok_or_else(|| AppError::NotFound(format!("id `{}` not found", display_id(id))))?;
        match (row.get_mut(field), value) {
            // Array attributes accumulate: relation fan-out appends new peers.
            (Some(Value::Array(have)), Value::Array(more)) => {
                for v in more {
                    if !have.contains(&v) {
                        have.push(v);
                    }
                }
            }
            (_, value) => {
                row.insert(field.to_string(), value);
            }
        }
        Ok(())
    }

    async fn exists(&self, id: &Value) -> Result<bool, AppError> {
        let store = self.lock_read()?;
        Ok(find_row(&store.rows, id).is_some())
    }

    async fn count(&self, filter: &Map<String, Value>) -> Result<u64, AppError> {
        let store = self.lock_read()?;
        Ok(store
            .rows
            .iter()
            .filter(|row| matches_filter(row, filter))
            .count() as u64)
    }

    fn endpoint(&self) -> String {
        self.endpoint.clone()
    }
}

/// Factory producing one independent `MemoryProvider` per resource.
#[derive(Clone, Copy, Debug, Default)]
pub struct MemoryProviderFactory {
    pub ids: IdStrategy,
}

impl ProviderFactory for MemoryProviderFactory {
    fn provider_for(
        &self,
        resource: &str,
        endpoint: Option<&str>,
    ) -> Result<Arc<dyn Provider>, AppError> {
        let endpoint = endpoint
            .map(str::to_string)
            .unwrap_or_else(|| format!("/{}", resource));
        Ok(Arc::new(MemoryProvider::with_ids(endpoint, self.ids)))
    }
}

fn find_row<'a>(rows: &'a [Map<String, Value>], id: &Value) -> Option<&'a Map<String, Value>> {
    rows.iter().find(|row| row.get("id") == Some(id))
}

fn find_row_mut<'a>(
    rows: &'a mut [Map<String, Value>],
    id: &Value,
) -> Option<&'a mut Map<String, Value>> {
    rows.iter_mut().find(|row| row.get("id") == Some(id))
}

fn matches_filter(row: &Map<String, Value>, filter: &Map<String, Value>) -> bool {
    filter.iter().all(|(k, want)| {
        row.get(k)
            .map(|cell| value_matches(cell, want))
            .unwrap_or(false)
    })
}

/// Filter match: list-valued filter entries are alternatives; list-valued cells
/// (relation attributes) match on membership.
fn value_matches(cell: &Value, want: &Value) -> bool {
    match want {
        Value::Array(options) => options.iter().any(|w| value_matches(cell, w)),
        want => match cell {
            Value::Array(have) => have.contains(want),
            cell => cell == want,
        },
    }
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => match (a.as_f64(), b.as_f64()) {
            (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
            _ => match (a.as_str(), b.as_str()) {
                (Some(x), Some(y)) => x.cmp(y),
                _ => a.to_string().cmp(&b.to_string()),
            },
        },
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn project(row: &Map<String, Value>, fields: &[String]) -> Value {
    if fields.is_empty() {
        return Value::Object(row.clone());
    }
    let mut out = Map::new();
    for f in fields {
        if let Some(v) = row.get(f) {
            out.insert(f.clone(), v.clone());
        }
    }
    Value::Object(out)
}
