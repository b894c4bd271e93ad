use axum::{
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use storecraft_core::TenantId;

use crate::app::errors::json_error;
use crate::context::TenantContext;

pub const TENANT_HEADER: &str = "x-tenant-id";

/// Resolve the tenant from `x-tenant-id` and attach a [`TenantContext`] to the request.
pub async fn tenant_middleware(
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    let tenant_id = match extract_tenant(req.headers()) {
        Ok(tenant_id) => tenant_id,
        Err(message) => {
            return json_error(StatusCode::BAD_REQUEST, "missing_tenant", message).into_response();
        }
    };

    req.extensions_mut().insert(TenantContext::new(tenant_id));
    next.run(req).await
}

fn extract_tenant(headers: &HeaderMap) -> Result<TenantId, String> {
    let header = headers
        .get(TENANT_HEADER)
        .ok_or_else(|| format!("{TENANT_HEADER} header is required"))?;

    let raw = header
        .to_str()
        .map_err(|_| format!("{TENANT_HEADER} must be ASCII"))?
        .trim();
    if raw.is_empty() {
        return Err(format!("{TENANT_HEADER} header is required"));
    }

    raw.parse::<TenantId>().map_err(|e| e.to_string())
}
