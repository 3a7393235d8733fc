//! Router construction.

mod common;

pub use common::common_routes;

use crate::handlers::resource::{
    create, create_with_ids, index, list, read, read_attr, update_attr,
};
use crate::state::AppState;
use axum::{routing::get, Router};

/// Resource routes: `/`, `/:resource`, `/:resource/:ids`,
/// `/:resource/:ids/:attr` for GET and POST. Handlers resolve the service by
/// resource name through the registry.
pub fn resource_routes(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/:resource", get(list).post(create))
        .route("/:resource/:ids", get(read).post(create_with_ids))
        .route("/:resource/:ids/:attr", get(read_attr).post(update_attr))
        .with_state(state)
}
