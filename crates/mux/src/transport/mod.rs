// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP + WebSocket transport for the dispatch core.

pub mod dispatch;
pub mod http;
pub mod ws;

use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use tower_http::cors::CorsLayer;

use crate::state::AppState;

/// Build the axum `Router`: liveness probe, WebSocket upgrade, permissive CORS.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(http::health))
        .route("/ws", get(ws::ws_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
