use std::sync::Arc;

use anyhow::Context;

use storecraft_engine::Engine;
use storecraft_events::TracingEventSink;
use storecraft_infra::{CommerceStore, EventPublisher, InMemoryCommerceStore, PostgresCommerceStore};

use crate::config::ApiConfig;

/// Wire the store, event sink and engine.
///
/// With `DATABASE_URL` set the Postgres store is used and migrated on startup; otherwise
/// everything lives in memory and is lost on restart.
pub async fn build_engine(config: &ApiConfig) -> anyhow::Result<Engine> {
    let store: Arc<dyn CommerceStore> = match config.database_url.as_deref() {
        Some(url) => {
            let store = PostgresCommerceStore::connect(url, config.db_max_connections)
                .await
                .context("connecting to postgres")?;
            store.migrate().await.context("running migrations")?;
            tracing::info!("using postgres store");
            Arc::new(store)
        }
        None => {
            tracing::warn!("DATABASE_URL not set; using in-memory store");
            Arc::new(InMemoryCommerceStore::new())
        }
    };

    let publisher = EventPublisher::new(Arc::new(TracingEventSink));
    Ok(Engine::new(store, publisher, config.engine.clone()))
}
