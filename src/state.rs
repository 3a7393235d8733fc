//! Shared application state for all routes.

use crate::registry::ServiceRegistry;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<ServiceRegistry>,
}
