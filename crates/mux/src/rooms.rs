// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Connection registry and room-scoped fan-out.
//!
//! A "room" is just a named set of connection ids. Emitting to a room looks
//! up each member's outbound channel and sends independently — there is no
//! shared broadcast channel, so membership changes take effect immediately
//! and a slow or dead connection can't stall the others.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{mpsc, RwLock};
use tracing::debug;

/// Room id for a ride's broadcast group.
pub fn ride_room(ride_id: &str) -> String {
    format!("ride:{ride_id}")
}

/// Per-connection outbound channel. The WebSocket write side drains this.
pub type Outbox = mpsc::UnboundedSender<Arc<str>>;

#[derive(Default)]
pub struct Rooms {
    connections: RwLock<HashMap<String, Outbox>>,
    members: RwLock<HashMap<String, HashSet<String>>>,
}

impl Rooms {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection's outbound channel. Returns the receiver the
    /// WebSocket write loop should drain.
    pub async fn register(&self, conn_id: String) -> mpsc::UnboundedReceiver<Arc<str>> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.connections.write().await.insert(conn_id, tx);
        rx
    }

    /// Tear down a connection: drop its outbox and remove it from every room.
    pub async fn remove_connection(&self, conn_id: &str) {
        self.connections.write().await.remove(conn_id);
        let mut members = self.members.write().await;
        members.retain(|_, set| {
            set.remove(conn_id);
            !set.is_empty()
        });
    }

    pub async fn join(&self, room: &str, conn_id: &str) {
        self.members.write().await.entry(room.to_owned()).or_default().insert(conn_id.to_owned());
    }

    /// Remove every connection from a room (used by terminal-status linger eviction).
    pub async fn clear_room(&self, room: &str) {
        self.members.write().await.remove(room);
    }

    pub async fn room_members(&self, room: &str) -> HashSet<String> {
        self.members.read().await.get(room).cloned().unwrap_or_default()
    }

    pub async fn is_member(&self, room: &str, conn_id: &str) -> bool {
        self.members.read().await.get(room).is_some_and(|set| set.contains(conn_id))
    }

    /// Serialize and send to a single connection. Logged and dropped on failure.
    pub async fn emit_to(&self, conn_id: &str, payload: &impl Serialize) {
        let Ok(text) = serde_json::to_string(payload) else {
            debug!(conn_id, "failed to serialize outbound event");
            return;
        };
        let guard = self.connections.read().await;
        if let Some(tx) = guard.get(conn_id) {
            if tx.send(Arc::from(text.as_str())).is_err() {
                debug!(conn_id, "outbound channel closed, event lost");
            }
        }
    }

    /// Serialize once and fan out to every current member of `room`.
    pub async fn emit_to_room(&self, room: &str, payload: &impl Serialize) {
        let Ok(text) = serde_json::to_string(payload) else {
            debug!(room, "failed to serialize outbound event");
            return;
        };
        let shared: Arc<str> = Arc::from(text.as_str());
        let members = self.room_members(room).await;
        let guard = self.connections.read().await;
        for conn_id in &members {
            if let Some(tx) = guard.get(conn_id) {
                if tx.send(Arc::clone(&shared)).is_err() {
                    debug!(conn_id, room, "outbound channel closed, event lost");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn emit_to_room_reaches_only_members() {
        let rooms = Rooms::new();
        let mut rx_a = rooms.register("a".into()).await;
        let mut rx_b = rooms.register("b".into()).await;

        rooms.join("ride:r1", "a").await;
        rooms.emit_to_room("ride:r1", &json!({"hello": "world"})).await;

        let got = rx_a.recv().await.unwrap();
        assert!(got.contains("hello"));
        assert!(rx_b.try_recv().is_err());
    }

    #[tokio::test]
    async fn remove_connection_drops_membership() {
        let rooms = Rooms::new();
        let _rx = rooms.register("a".into()).await;
        rooms.join("ride:r1", "a").await;
        assert!(rooms.is_member("ride:r1", "a").await);

        rooms.remove_connection("a").await;
        assert!(!rooms.is_member("ride:r1", "a").await);
    }

    #[tokio::test]
    async fn clear_room_evicts_all_members() {
        let rooms = Rooms::new();
        let _rx_a = rooms.register("a".into()).await;
        let _rx_b = rooms.register("b".into()).await;
        rooms.join("ride:r1", "a").await;
        rooms.join("ride:r1", "b").await;

        rooms.clear_room("ride:r1").await;
        assert!(rooms.room_members("ride:r1").await.is_empty());
    }

    #[tokio::test]
    async fn emit_to_unregistered_connection_is_silently_dropped() {
        let rooms = Rooms::new();
        rooms.emit_to("ghost", &json!({"x": 1})).await;
    }
}
