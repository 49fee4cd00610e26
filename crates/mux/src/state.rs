// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared application state handed to every transport handler.

use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::driver::DriverRegistry;
use crate::ride::RideRegistry;
use crate::rooms::Rooms;

/// Everything a connection handler or background task needs.
pub struct AppState {
    pub config: Config,
    pub shutdown: CancellationToken,
    pub rooms: Rooms,
    pub drivers: DriverRegistry,
    pub rides: RideRegistry,
}

impl AppState {
    pub fn new(config: Config, shutdown: CancellationToken) -> Self {
        Self { config, shutdown, rooms: Rooms::new(), drivers: DriverRegistry::new(), rides: RideRegistry::new() }
    }
}

/// Current time as epoch milliseconds. Used to stamp driver locations and
/// outbound event timestamps.
pub fn epoch_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Mint a fresh connection or offer id.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
