// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Driver presence registry: availability and last-known location, keyed by
//! connection id.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::RwLock;

use crate::geo::Coordinate;

/// A driver's last reported position, stamped with the epoch-ms it was seen.
#[derive(Debug, Clone, Copy)]
pub struct LastLocation {
    pub coord: Coordinate,
    pub at: u64,
}

/// One per currently connected driver.
#[derive(Debug, Clone)]
pub struct DriverPresence {
    pub conn_id: String,
    pub driver_id: Option<String>,
    pub available: bool,
    pub last: Option<LastLocation>,
}

impl DriverPresence {
    fn new(conn_id: String, driver_id: Option<String>) -> Self {
        Self { conn_id, driver_id, available: false, last: None }
    }

    /// Fresh iff a location exists and is no older than `stale_after`.
    pub fn is_fresh(&self, now_ms: u64, stale_after: Duration) -> bool {
        match self.last {
            Some(last) => now_ms.saturating_sub(last.at) <= stale_after.as_millis() as u64,
            None => false,
        }
    }

    /// Eligible iff available and fresh.
    pub fn is_eligible(&self, now_ms: u64, stale_after: Duration) -> bool {
        self.available && self.is_fresh(now_ms, stale_after)
    }
}

/// Registry of connected drivers. All mutation is serialized through a single
/// lock, matching the single-writer-per-operation contract.
#[derive(Default)]
pub struct DriverRegistry {
    drivers: RwLock<HashMap<String, DriverPresence>>,
}

impl DriverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a newly identified driver connection. Overwrites any prior
    /// presence for the same `conn_id`.
    pub async fn register(&self, conn_id: String, driver_id: Option<String>) {
        let presence = DriverPresence::new(conn_id.clone(), driver_id);
        self.drivers.write().await.insert(conn_id, presence);
    }

    /// Update availability. No-op if the connection isn't a registered driver.
    pub async fn set_available(&self, conn_id: &str, available: bool) {
        if let Some(presence) = self.drivers.write().await.get_mut(conn_id) {
            presence.available = available;
        }
    }

    /// Update last-known location. Rejected silently if the coordinate isn't finite.
    pub async fn update_location(&self, conn_id: &str, coord: Coordinate, now_ms: u64) {
        if !coord.is_finite() {
            return;
        }
        if let Some(presence) = self.drivers.write().await.get_mut(conn_id) {
            presence.last = Some(LastLocation { coord, at: now_ms });
        }
    }

    pub async fn get(&self, conn_id: &str) -> Option<DriverPresence> {
        self.drivers.read().await.get(conn_id).cloned()
    }

    pub async fn remove(&self, conn_id: &str) -> Option<DriverPresence> {
        self.drivers.write().await.remove(conn_id)
    }

    /// Snapshot of every registered driver, for the candidate selector.
    pub async fn snapshot(&self) -> Vec<DriverPresence> {
        self.drivers.read().await.values().cloned().collect()
    }
}
