//! Per-resource CRUD semantics service.

mod engine;
mod links;

pub use engine::{ResourceService, DEFAULT_PAGE_SIZE};
pub use links::QueryDescriptor;
