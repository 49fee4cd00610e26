// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Liveness probe.

/// `GET /` — always `200 OK`, so orchestrators can probe without touching
/// the WebSocket surface.
pub async fn health() -> &'static str {
    "OK"
}
