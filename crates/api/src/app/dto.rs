use serde::{Deserialize, Serialize};

use storecraft_engine::{ActionResult, RawAction, Snapshot};

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct ActionBatchRequest {
    pub actions: Vec<RawAction>,
    #[serde(default)]
    pub snapshot: Snapshot,
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct ActionBatchResponse {
    pub results: Vec<ActionResult>,
}

#[derive(Debug, Serialize)]
pub struct ActionCatalogueResponse {
    pub actions: Vec<&'static str>,
}
