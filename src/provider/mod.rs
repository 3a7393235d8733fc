//! Storage provider contract consumed by the CRUD service.

mod memory;

pub use memory::{IdStrategy, MemoryProvider, MemoryProviderFactory};

use crate::error::AppError;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;

/// Storage capability for one resource. Objects are JSON maps; ids are JSON
/// scalars assigned by the provider on `add`.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Ids of objects matching an exact-match filter, paginated.
    async fn find(
        &self,
        filter: &Map<String, Value>,
        limit: usize,
        offset: usize,
        sort: Option<&str>,
    ) -> Result<Vec<Value>, AppError>;

    /// Batch fetch by id, projected to `fields` (empty = full objects).
    async fn fetch(&self, ids: &[Value], fields: &[String]) -> Result<Vec<Value>, AppError>;

    /// One object by id, projected to `fields`.
    async fn get(&self, id: &Value, fields: &[String]) -> Result<Value, AppError>;

    /// One attribute of one object.
    async fn get_attr(&self, id: &Value, field: &str) -> Result<Value, AppError>;

    /// Store a new object. Assigns an id if the object carries none; returns
    /// the stored object including its id.
    async fn add(&self, object: Map<String, Value>) -> Result<Value, AppError>;

    /// Set one attribute on an existing object.
    async fn add_attr(&self, id: &Value, field: &str, value: Value) -> Result<(), AppError>;

    async fn exists(&self, id: &Value) -> Result<bool, AppError>;

    /// Total number of objects matching `filter`, ignoring pagination.
    /// Called per page-link computation, so it must be cheap.
    async fn count(&self, filter: &Map<String, Value>) -> Result<u64, AppError>;

    /// Canonical base path for this resource, used in pagination links.
    fn endpoint(&self) -> String;
}

/// Builds a provider for a named resource. The registry's deferred descriptors
/// hold one of these and resolve it on first use.
pub trait ProviderFactory: Send + Sync {
    fn provider_for(
        &self,
        resource: &str,
        endpoint: Option<&str>,
    ) -> Result<Arc<dyn Provider>, AppError>;
}

/// A provider argument as it appears in configuration: already concrete, or a
/// factory to be resolved against the resource name.
#[derive(Clone)]
pub enum ProviderSource {
    Concrete(Arc<dyn Provider>),
    Factory(Arc<dyn ProviderFactory>),
}

impl ProviderSource {
    pub fn resolve(
        &self,
        resource: &str,
        endpoint: Option<&str>,
    ) -> Result<Arc<dyn Provider>, AppError> {
        match self {
            ProviderSource::Concrete(p) => Ok(p.clone()),
            ProviderSource::Factory(f) => f.provider_for(resource, endpoint),
        }
    }
}
