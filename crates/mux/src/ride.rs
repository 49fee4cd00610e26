// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Ride records: the auction state machine and its outstanding offers.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::geo::Coordinate;

/// Lifecycle state of a ride. SEARCHING is the only state with a live
/// auction timer; every other state is terminal with respect to matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RideStatus {
    Searching,
    Accepted,
    Failed,
    Completed,
    Canceled,
}

/// State of a single outstanding offer within a ride.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OfferState {
    Pending,
    Won,
    Lost,
    #[allow(dead_code)] // reserved for a future per-offer TTL sweep; round TTL covers it today
    Expired,
}

#[derive(Debug, Clone)]
pub struct RideOffer {
    pub offer_id: String,
    pub conn_id: String,
    pub issued_at: u64,
    pub state: OfferState,
}

/// Mutable half of a ride, serialized behind a single per-ride lock so that
/// a dispatch round, an acceptance, and a status update can never interleave
/// and leave the record in a state the invariants disallow.
#[derive(Default)]
pub struct RideInner {
    pub status: Option<RideStatus>,
    pub offered: HashMap<String, RideOffer>,
    pub offered_conns: HashSet<String>,
    pub winner_conn_id: Option<String>,
    pub round: u32,
    /// Handle for the currently-armed auction/retry timer, if any. Installing
    /// a new timer cancels this one first; leaving SEARCHING cancels and
    /// nulls it.
    pub timer_token: Option<CancellationToken>,
}

impl RideInner {
    pub fn status(&self) -> RideStatus {
        self.status.unwrap_or(RideStatus::Searching)
    }
}

/// One active ride, keyed by a client-supplied `rideId`.
pub struct Ride {
    pub ride_id: String,
    pub passenger_conn_id: String,
    pub passenger_name: String,
    pub pickup_address: String,
    pub destination_address: String,
    pub pickup: Coordinate,
    pub dest: Coordinate,
    pub route_polyline: Option<String>,
    pub fare: Option<serde_json::Value>,
    pub inner: Mutex<RideInner>,
}

impl Ride {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        ride_id: String,
        passenger_conn_id: String,
        passenger_name: String,
        pickup_address: String,
        destination_address: String,
        pickup: Coordinate,
        dest: Coordinate,
        route_polyline: Option<String>,
        fare: Option<serde_json::Value>,
    ) -> Arc<Self> {
        Arc::new(Self {
            ride_id,
            passenger_conn_id,
            passenger_name,
            pickup_address,
            destination_address,
            pickup,
            dest,
            route_polyline,
            fare,
            inner: Mutex::new(RideInner { round: 0, ..RideInner::default() }),
        })
    }

    pub async fn status(&self) -> RideStatus {
        self.inner.lock().await.status()
    }

    /// Force a terminal status, bypassing the acceptance arbiter's
    /// compare-and-set. Used for exhaustion (SEARCHING -> FAILED) and for
    /// passenger-driven terminal status updates (-> COMPLETED / CANCELED).
    pub async fn force_status(&self, status: RideStatus) {
        self.inner.lock().await.status = Some(status);
    }

    /// Cancel any armed timer for this ride. Called on every transition out
    /// of SEARCHING and on deletion.
    pub async fn cancel_timer(&self) {
        if let Some(token) = self.inner.lock().await.timer_token.take() {
            token.cancel();
        }
    }

    /// Arm a fresh timer, cancelling whatever was previously armed. Returns
    /// the token the caller should select against; firing is the caller's
    /// responsibility (the ride doesn't own a runtime handle).
    pub async fn rearm_timer(&self, parent: &CancellationToken) -> CancellationToken {
        let mut inner = self.inner.lock().await;
        if let Some(old) = inner.timer_token.take() {
            old.cancel();
        }
        let token = parent.child_token();
        inner.timer_token = Some(token.clone());
        token
    }
}

#[derive(Default)]
pub struct RideRegistry {
    rides: tokio::sync::RwLock<HashMap<String, Arc<Ride>>>,
}

impl RideRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new ride. Returns `false` without mutating if the id is already in use.
    pub async fn create(&self, ride: Arc<Ride>) -> bool {
        let mut rides = self.rides.write().await;
        if rides.contains_key(&ride.ride_id) {
            return false;
        }
        rides.insert(ride.ride_id.clone(), ride);
        true
    }

    pub async fn get(&self, ride_id: &str) -> Option<Arc<Ride>> {
        self.rides.read().await.get(ride_id).cloned()
    }

    pub async fn delete(&self, ride_id: &str) -> Option<Arc<Ride>> {
        self.rides.write().await.remove(ride_id)
    }
}
