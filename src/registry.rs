//! Lazy service registry: resource name -> configured `ResourceService`.
//!
//! Entries start as deferred descriptors and are materialized at most once, on
//! first lookup. A default provider makes the registry permissive (any plural
//! name resolves); exposing explicit names narrows it back to a whitelist.

use crate::error::{AppError, ConfigError};
use crate::provider::{Provider, ProviderFactory, ProviderSource};
use crate::service::ResourceService;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

enum Slot {
    Resolved(Arc<ResourceService>),
    Deferred(ProviderSource),
}

struct DefaultDescriptor {
    provider: Arc<dyn ProviderFactory>,
    endpoint: Option<String>,
}

pub struct ServiceRegistry {
    default: Option<DefaultDescriptor>,
    strict: bool,
    slots: RwLock<HashMap<String, Slot>>,
}

impl fmt::Debug for ServiceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slots = self.slots.read().unwrap_or_else(PoisonError::into_inner);
        let mut names: Vec<&String> = slots.keys().collect();
        names.sort();
        f.debug_struct("ServiceRegistry")
            .field("strict", &self.strict)
            .field("has_default", &self.default.is_some())
            .field("resources", &names)
            .finish_non_exhaustive()
    }
}

impl ServiceRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// Service for a resource name, materializing it on first use.
    ///
    /// Resolution is memoized: a given name is constructed at most once per
    /// registry lifetime, double-checked under the write lock.
    pub fn get(self: &Arc<Self>, name: &str) -> Result<Arc<ResourceService>, AppError> {
        {
            let slots = self.slots.read().unwrap_or_else(PoisonError::into_inner);
            match slots.get(name) {
                Some(Slot::Resolved(svc)) => return Ok(svc.clone()),
                Some(Slot::Deferred(_)) => {}
                None if self.strict => {
                    return Err(AppError::NotFound(format!(
                        "unable to instantiate resource `{}` service",
                        name
                    )))
                }
                None => {}
            }
        }

        let mut slots = self.slots.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(Slot::Resolved(svc)) = slots.get(name) {
            return Ok(svc.clone());
        }
        let source = match slots.get(name) {
            Some(Slot::Deferred(source)) => source.clone(),
            _ => match &self.default {
                Some(d) => ProviderSource::Factory(d.provider.clone()),
                None => {
                    return Err(AppError::NotFound(format!(
                        "unable to instantiate resource `{}` service",
                        name
                    )))
                }
            },
        };
        let endpoint = self.endpoint_for(name);
        tracing::debug!(resource = %name, "materializing service");
        let svc = Arc::new(ResourceService::new(
            name,
            &source,
            endpoint.as_deref(),
            Arc::downgrade(self),
        )?);
        slots.insert(name.to_string(), Slot::Resolved(svc.clone()));
        Ok(svc)
    }

    /// Introspection document over every currently-known resource name.
    pub fn index(&self) -> Value {
        let slots = self.slots.read().unwrap_or_else(PoisonError::into_inner);
        let mut names: Vec<&String> = slots.keys().collect();
        names.sort();
        let resources: Vec<Value> = names
            .into_iter()
            .map(|name| {
                let link = match slots.get(name) {
                    Some(Slot::Resolved(svc)) => svc.endpoint(),
                    _ => self
                        .endpoint_for(name)
                        .unwrap_or_else(|| format!("/{}", name)),
                };
                json!({"type": name, "link": link})
            })
            .collect();
        json!({
            "endpoint": self.base_endpoint(),
            "requests": "/{resource}[/{ids}[/{attribute}]]",
            "methods": ["GET", "POST"],
            "resources": resources,
        })
    }

    fn base_endpoint(&self) -> String {
        self.default
            .as_ref()
            .and_then(|d| d.endpoint.clone())
            .unwrap_or_else(|| "/".to_string())
    }

    /// Default endpoint propagated down into provider construction when the
    /// provider configuration carries none of its own.
    fn endpoint_for(&self, name: &str) -> Option<String> {
        self.default
            .as_ref()
            .and_then(|d| d.endpoint.as_deref())
            .map(|base| format!("{}/{}", base.trim_end_matches('/'), name))
    }
}

enum Entry {
    Instance(Arc<ResourceService>),
    Provider(Arc<dyn Provider>),
    Factory(Arc<dyn ProviderFactory>),
}

/// Replays the descriptor-mapping rules as explicit builder calls: at most one
/// default, whitelist names, and named entries.
pub struct RegistryBuilder {
    default_provider: Option<Arc<dyn ProviderFactory>>,
    default_endpoint: Option<String>,
    exposed: Vec<String>,
    entries: Vec<(String, Entry)>,
}

impl Default for RegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RegistryBuilder {
    pub fn new() -> RegistryBuilder {
        RegistryBuilder {
            default_provider: None,
            default_endpoint: None,
            exposed: Vec::new(),
            entries: Vec::new(),
        }
    }

    /// Default provider factory: any plural resource name may now resolve,
    /// unless names are exposed explicitly.
    pub fn default_provider(mut self, provider: Arc<dyn ProviderFactory>) -> Self {
        self.default_provider = Some(provider);
        self
    }

    /// Base endpoint seeded into providers built from the default descriptor.
    pub fn default_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.default_endpoint = Some(endpoint.into());
        self
    }

    /// Whitelist a name against the default descriptor. Any exposed name turns
    /// strict mode back on: only exposed or explicitly-registered names resolve.
    pub fn expose(mut self, name: impl Into<String>) -> Self {
        self.exposed.push(name.into());
        self
    }

    /// Register an already-built service instance.
    pub fn service_instance(mut self, name: impl Into<String>, svc: Arc<ResourceService>) -> Self {
        self.entries.push((name.into(), Entry::Instance(svc)));
        self
    }

    /// Register a concrete provider for one resource.
    pub fn service_provider(mut self, name: impl Into<String>, provider: Arc<dyn Provider>) -> Self {
        self.entries.push((name.into(), Entry::Provider(provider)));
        self
    }

    /// Register a per-resource provider factory, resolved lazily.
    pub fn service_factory(
        mut self,
        name: impl Into<String>,
        factory: Arc<dyn ProviderFactory>,
    ) -> Self {
        self.entries.push((name.into(), Entry::Factory(factory)));
        self
    }

    pub fn build(self) -> Result<Arc<ServiceRegistry>, AppError> {
        let strict = match &self.default_provider {
            None => true,
            Some(_) => !self.exposed.is_empty(),
        };
        let mut slots: HashMap<String, Slot> = HashMap::new();
        for name in self.exposed {
            let default = self
                .default_provider
                .as_ref()
                .ok_or_else(|| ConfigError::NoDefault(name.clone()))?;
            slots.insert(
                name,
                Slot::Deferred(ProviderSource::Factory(default.clone())),
            );
        }
        for (name, entry) in self.entries {
            let slot = match entry {
                Entry::Instance(svc) => Slot::Resolved(svc),
                Entry::Provider(p) => Slot::Deferred(ProviderSource::Concrete(p)),
                Entry::Factory(f) => Slot::Deferred(ProviderSource::Factory(f)),
            };
            slots.insert(name, slot);
        }
        Ok(Arc::new(ServiceRegistry {
            default: self.default_provider.map(|provider| DefaultDescriptor {
                provider,
                endpoint: self.default_endpoint,
            }),
            strict,
            slots: RwLock::new(slots),
        }))
    }
}
