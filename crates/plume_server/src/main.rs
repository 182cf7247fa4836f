/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - FEDI3 Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use anyhow::{Context, Result};
use plume_core::{ContentEngine, SqliteGraphStore};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

mod api;
mod config;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive("info".parse()?),
        )
        .init();

    let cfg = config::load_config()?;
    let store = SqliteGraphStore::open(&cfg.db_path)
        .with_context(|| format!("open store {}", cfg.db_path.display()))?;
    info!(
        db = %cfg.db_path.display(),
        read_strategy = ?cfg.engine.read_strategy,
        empty_comments = ?cfg.engine.empty_comments,
        version = plume_core::plume_core_version(),
        "store opened"
    );

    let state = api::AppState {
        engine: ContentEngine::new(Arc::new(store), cfg.engine.clone()),
        servers_file: cfg.servers_file.clone(),
    };
    let app = api::router(state, cfg.max_body_bytes);

    let shutdown = CancellationToken::new();
    let signal = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("shutdown requested"),
            Err(e) => warn!("ctrl-c handler failed: {e}"),
        }
        signal.cancel();
    });

    let listener = tokio::net::TcpListener::bind(cfg.bind)
        .await
        .with_context(|| format!("bind {}", cfg.bind))?;
    info!("plume_server listening on http://{}", cfg.bind);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await
        .context("serve")?;
    info!("plume_server stopped");
    Ok(())
}
