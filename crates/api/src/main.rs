use std::sync::Arc;

use storecraft_api::app::{build_app, services::build_engine};
use storecraft_api::config::ApiConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    storecraft_observability::init();

    let config = ApiConfig::from_env();
    let engine = Arc::new(build_engine(&config).await?);
    let app = build_app(engine);

    let listener = tokio::net::TcpListener::bind(config.bind).await?;
    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
