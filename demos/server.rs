//! Example server: in-memory providers behind the lazy registry, resource
//! routes mounted under /api/v1.

use axum::Router;
use resource_sdk::{
    common_routes, resource_routes, AppState, MemoryProviderFactory, RegistryBuilder,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::limit::RequestBodyLimitLayer;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("resource_sdk=info".parse()?))
        .init();

    let registry = RegistryBuilder::new()
        .default_provider(Arc::new(MemoryProviderFactory::default()))
        .default_endpoint("/api/v1")
        .expose("posts")
        .expose("comments")
        .build()?;
    let state = AppState { registry };

    let app = Router::new()
        .merge(common_routes())
        .nest("/api/v1", resource_routes(state))
        .layer(RequestBodyLimitLayer::new(1024 * 1024));

    let addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
