//! HTTP application wiring (Axum router + engine wiring).
//!
//! - `services.rs`: store, event sink and engine construction
//! - `routes/`: HTTP routes + handlers
//! - `dto.rs`: request/response bodies
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{Extension, Router, routing::get};
use tower::ServiceBuilder;

use storecraft_engine::Engine;

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub fn build_app(engine: Arc<Engine>) -> Router {
    // Tenant-scoped routes: require `x-tenant-id`.
    let scoped = routes::router()
        .layer(Extension(engine))
        .layer(axum::middleware::from_fn(middleware::tenant_middleware));

    Router::new()
        .route("/health", get(routes::system::health))
        .merge(scoped)
        .layer(ServiceBuilder::new())
}
