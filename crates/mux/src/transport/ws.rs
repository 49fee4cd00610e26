// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The connection gateway: WebSocket upgrade and the per-connection duplex
//! loop wiring a client's socket to its room outbox and to event dispatch.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};

use crate::state::{new_id, AppState};
use crate::transport::dispatch::{self, Tipo};

/// `GET /ws` — upgrade to the client duplex channel.
pub async fn ws_handler(State(state): State<Arc<AppState>>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws(state, socket))
}

async fn handle_ws(state: Arc<AppState>, socket: WebSocket) {
    let conn_id = new_id();
    let mut outbox = state.rooms.register(conn_id.clone()).await;
    let (mut ws_tx, mut ws_rx) = socket.split();
    let mut tipo: Option<Tipo> = None;

    loop {
        tokio::select! {
            _ = state.shutdown.cancelled() => break,

            msg = outbox.recv() => {
                match msg {
                    Some(text) => {
                        if ws_tx.send(Message::Text(text.to_string().into())).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }

            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        dispatch::handle_inbound(&state, &conn_id, &mut tipo, &text).await;
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(_)) => break,
                    _ => {}
                }
            }
        }
    }

    dispatch::handle_disconnect(&state, &conn_id, tipo).await;
}
