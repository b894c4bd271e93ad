//! Batch runner: structural validation → validators → executor, one action at a time.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::{debug, info, instrument};

use storecraft_core::{DomainError, DomainResult, TenantId};
use storecraft_infra::{CommerceStore, EngineConfig, EventPublisher, InventoryLedger, OrderService};

use crate::action::{Action, RawAction};
use crate::snapshot::Snapshot;
use crate::validate::{Verdict, validate};

/// Outcome of one proposed action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionResult {
    /// The action as executed; the repaired version when a validator fixed it.
    pub action: RawAction,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
}

impl ActionResult {
    fn ok(action: RawAction, data: JsonValue) -> Self {
        Self {
            action,
            success: true,
            data: Some(data),
            error: None,
            error_code: None,
        }
    }

    fn failed(action: RawAction, err: &DomainError) -> Self {
        Self {
            action,
            success: false,
            data: None,
            error: Some(err.to_string()),
            error_code: Some(err.code().to_string()),
        }
    }
}

/// Tenant-scoped action engine. Holds no per-request state.
pub struct Engine {
    pub(crate) store: Arc<dyn CommerceStore>,
    pub(crate) ledger: InventoryLedger<dyn CommerceStore>,
    pub(crate) orders: OrderService<dyn CommerceStore>,
    pub(crate) publisher: EventPublisher,
    pub(crate) config: EngineConfig,
}

impl Engine {
    pub fn new(store: Arc<dyn CommerceStore>, publisher: EventPublisher, config: EngineConfig) -> Self {
        let ledger = InventoryLedger::new(Arc::clone(&store), publisher.clone(), &config);
        let orders = OrderService::new(
            Arc::clone(&store),
            ledger.clone(),
            publisher.clone(),
            config.clone(),
        );
        Self {
            store,
            ledger,
            orders,
            publisher,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn ledger(&self) -> &InventoryLedger<dyn CommerceStore> {
        &self.ledger
    }

    pub fn orders(&self) -> &OrderService<dyn CommerceStore> {
        &self.orders
    }

    /// Run every action in input order. Always returns one result per action; a failure
    /// is recorded and the next action still runs.
    #[instrument(skip(self, actions, snapshot), fields(tenant_id = %tenant_id, actions = actions.len()))]
    pub async fn run(
        &self,
        tenant_id: TenantId,
        actions: Vec<RawAction>,
        snapshot: &Snapshot,
    ) -> Vec<ActionResult> {
        let mut results = Vec::with_capacity(actions.len());
        for raw in actions {
            results.push(self.run_one(tenant_id, raw, snapshot).await);
        }
        results
    }

    async fn run_one(&self, tenant_id: TenantId, raw: RawAction, snapshot: &Snapshot) -> ActionResult {
        let action = match Action::from_raw(&raw) {
            Ok(action) => action,
            Err(err) => return self.report(raw, err),
        };

        let (action, raw, fix) = match validate(&action, snapshot) {
            Verdict::Valid => (action, raw, None),
            Verdict::Invalid(err) => return self.report(raw, err),
            Verdict::Fixed { action, details } => match action.to_raw() {
                Ok(fixed) => {
                    debug!(action = %action.kind(), "validator repaired action");
                    (action, fixed, Some(details))
                }
                Err(err) => return self.report(raw, err),
            },
        };

        match self.execute_with_timeout(tenant_id, &action).await {
            Ok(data) => ActionResult::ok(raw, with_fix(data, fix)),
            Err(err) => self.report(raw, err),
        }
    }

    /// Execute one typed action, bounded by the configured timeout. Never retried.
    pub async fn execute_with_timeout(
        &self,
        tenant_id: TenantId,
        action: &Action,
    ) -> DomainResult<JsonValue> {
        let limit = self.config.action_timeout;
        match tokio::time::timeout(limit, self.execute(tenant_id, action)).await {
            Ok(result) => result,
            Err(_) => Err(DomainError::Timeout(format!(
                "{} did not finish within {} ms",
                action.kind(),
                limit.as_millis()
            ))),
        }
    }

    fn report(&self, raw: RawAction, err: DomainError) -> ActionResult {
        info!(action = %raw.kind, code = err.code(), error = %err, "action failed");
        ActionResult::failed(raw, &err)
    }
}

fn with_fix(data: JsonValue, fix: Option<JsonValue>) -> JsonValue {
    let Some(details) = fix else {
        return data;
    };
    let mut object = match data {
        JsonValue::Object(map) => map,
        other => {
            let mut map = serde_json::Map::new();
            map.insert("result".into(), other);
            map
        }
    };
    object.insert("autoFixed".into(), JsonValue::Bool(true));
    object.insert("fixes".into(), details);
    JsonValue::Object(object)
}
