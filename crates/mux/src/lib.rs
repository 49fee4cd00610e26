// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Ride-dispatch-core: the matching and offer-auction engine for a
//! ride-hailing platform's real-time broker.

pub mod config;
pub mod driver;
pub mod error;
pub mod events;
pub mod geo;
pub mod matching;
pub mod ride;
pub mod rooms;
pub mod state;
pub mod transport;

use std::sync::Arc;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::Config;
use crate::state::AppState;
use crate::transport::build_router;

/// Run the dispatch core until a shutdown signal arrives.
pub async fn run(config: Config) -> anyhow::Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    let shutdown = CancellationToken::new();

    let state = Arc::new(AppState::new(config, shutdown.clone()));
    let router = build_router(Arc::clone(&state));

    let listener = TcpListener::bind(&addr).await?;
    info!(%addr, "ride-dispatch-core listening");

    tokio::spawn(wait_for_shutdown_signal(shutdown));

    axum::serve(listener, router).with_graceful_shutdown(state.shutdown.clone().cancelled_owned()).await?;
    Ok(())
}

async fn wait_for_shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        let Ok(mut sig) = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) else {
            std::future::pending::<()>().await;
            return;
        };
        sig.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    info!("shutdown signal received");
    shutdown.cancel();
}
