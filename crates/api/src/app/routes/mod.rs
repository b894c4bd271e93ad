use axum::{
    Router,
    routing::{get, post},
};

pub mod actions;
pub mod system;

/// Router for all tenant-scoped endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/v1/actions", post(actions::run_actions))
        .route("/v1/actions/catalogue", get(actions::catalogue))
}
