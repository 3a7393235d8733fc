//! Resource SDK: a resource CRUD semantics engine with a lazy service registry.

pub mod args;
pub mod error;
pub mod handlers;
pub mod label;
pub mod provider;
pub mod registry;
pub mod response;
pub mod routes;
pub mod service;
pub mod state;

pub use args::{Fields, Where};
pub use error::{AppError, ConfigError};
pub use label::LabelPair;
pub use provider::{
    IdStrategy, MemoryProvider, MemoryProviderFactory, Provider, ProviderFactory, ProviderSource,
};
pub use registry::{RegistryBuilder, ServiceRegistry};
pub use response::{Document, Links};
pub use routes::{common_routes, resource_routes};
pub use service::{ResourceService, DEFAULT_PAGE_SIZE};
pub use state::AppState;
