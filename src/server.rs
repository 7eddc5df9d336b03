//! Process wiring for the HTTP and stdio servers.
//!
//! [`build_service`] opens the database, builds the embedder and the remote
//! index, and returns the one [`MemoryService`] every surface shares.

use anyhow::Result;
use rmcp::transport::streamable_http_server::session::local::LocalSessionManager;
use rmcp::transport::streamable_http_server::StreamableHttpService;
use rmcp::ServiceExt;
use std::sync::Arc;
use tokio::sync::watch;

use crate::config::HearthConfig;
use crate::embedding::Embedder;
use crate::memory::local::LocalStore;
use crate::remote;
use crate::retrieval::MemoryService;
use crate::routes::{self, AppState};
use crate::sync::SyncDaemon;
use crate::tools::HearthTools;

/// Shared setup: open DB, create the embedder and remote index, reconcile
/// the embedding model.
pub async fn build_service(config: HearthConfig) -> Result<MemoryService> {
    let db_path = config.resolved_db_path();
    let local = LocalStore::open(&db_path)?;
    tracing::info!(db = %db_path.display(), "database ready");

    let embedder = Embedder::from_config(&config.embedding)?;
    if let Some(model) = embedder.model_name() {
        local.reconcile_embedding_model(model).await?;
        tracing::info!(model = %model, "embedding provider ready");
    }

    let index = remote::create_index(&config.remote)?;
    let service = MemoryService::new(local, embedder, index, Arc::new(config));

    if service.vector_search_enabled() {
        tracing::info!("vector search enabled");
    } else {
        tracing::warn!("vector search disabled, serving keyword results only");
    }
    Ok(service)
}

/// Start the MCP server over stdio transport.
pub async fn serve_stdio(config: HearthConfig) -> Result<()> {
    tracing::info!("starting Hearth MCP server on stdio");

    let service = build_service(config).await?;

    let tools = HearthTools::new(service);
    let transport = rmcp::transport::stdio();

    let server = tools.serve(transport).await?;
    tracing::info!("MCP server running, waiting for client");

    server.waiting().await?;
    tracing::info!("MCP server shut down");

    Ok(())
}

/// Start the REST API (with MCP nested at `/mcp`) and the sync daemon.
///
/// Ctrl-C stops accepting connections and lets the daemon finish its
/// current tick before exiting.
pub async fn serve_http(config: HearthConfig) -> Result<()> {
    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let sync_config = config.sync.clone();

    let service = build_service(config).await?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let daemon = if sync_config.enabled {
        let daemon = SyncDaemon::new(service.clone(), &sync_config);
        Some(tokio::spawn(daemon.run(shutdown_rx.clone())))
    } else {
        tracing::info!("sync daemon disabled by config");
        None
    };

    let mcp_service = service.clone();
    let mcp = StreamableHttpService::new(
        move || Ok(HearthTools::new(mcp_service.clone())),
        LocalSessionManager::default().into(),
        Default::default(),
    );

    let app = routes::router(AppState { service }).nest_service("/mcp", mcp);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %bind_addr, "Hearth listening at http://{bind_addr} (MCP at /mcp)");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for ctrl-c");
                std::future::pending::<()>().await;
            }
            tracing::info!("shutting down HTTP server");
        })
        .await?;

    let _ = shutdown_tx.send(true);
    if let Some(handle) = daemon {
        if let Err(e) = handle.await {
            tracing::error!(error = %e, "sync daemon task failed");
        }
    }

    Ok(())
}
