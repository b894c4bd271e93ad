use std::sync::Arc;

use axum::{Extension, Json, extract::rejection::JsonRejection, response::IntoResponse};

use storecraft_engine::{ActionKind, Engine};

use crate::app::{dto, errors};
use crate::context::TenantContext;

/// Run a batch of actions for the request's tenant.
///
/// Individual action failures are reported inside `results`; the response itself is
/// always `200` once the body parses.
pub async fn run_actions(
    Extension(engine): Extension<Arc<Engine>>,
    Extension(tenant): Extension<TenantContext>,
    body: Result<Json<dto::ActionBatchRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => return errors::json_rejection_to_response(rejection),
    };

    let results = engine
        .run(tenant.tenant_id(), body.actions, &body.snapshot)
        .await;

    Json(dto::ActionBatchResponse { results }).into_response()
}

/// Every action type the engine accepts.
pub async fn catalogue() -> Json<dto::ActionCatalogueResponse> {
    Json(dto::ActionCatalogueResponse {
        actions: ActionKind::ALL.iter().map(|kind| kind.as_str()).collect(),
    })
}
