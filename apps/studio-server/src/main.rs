// [[MMSS]]/apps/studio-server/src/main.rs
// Purpose: Entry point. Loads configuration and catalogs, then starts the studio server.
// Architecture: Application Boot
// Dependencies: Axum, Tower, Tokio

mod catalog;
mod config;
mod events;
mod export;
mod metrics;
mod models;
mod runtime;
mod security;
mod serializer;
mod server;
mod store;

use anyhow::Context;
use std::sync::Arc;

use crate::config::StudioConfig;
use crate::runtime::StudioRuntime;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("mmss_studio=debug".parse()?)
                .add_directive("tower_http=trace".parse()?),
        )
        .init();

    tracing::info!("Initializing MMSS Studio...");

    let config = StudioConfig::from_env();
    let runtime = Arc::new(StudioRuntime::new(&config));
    tracing::info!("Exports will be written to {}", runtime.exporter.root().display());

    let app = server::router(runtime);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    tracing::info!("MMSS Studio Server listening on http://{}", addr);

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
