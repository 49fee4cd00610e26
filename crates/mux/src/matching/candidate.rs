// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Candidate selection: a pure query over driver presence and a ride's
//! already-offered set. Performs no mutation and takes no lock itself —
//! callers pass in a snapshot.

use std::collections::HashSet;

use crate::driver::DriverPresence;
use crate::geo::{haversine_km, Coordinate};

/// One candidate, ordered ascending by `distance_km`.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub conn_id: String,
    pub distance_km: f64,
}

/// Rank eligible drivers for `pickup`, excluding anyone already in `offered_conns`.
///
/// 1. Primary pass: eligible (available + fresh) drivers, nearest first.
/// 2. Fallback: if that's empty, any available driver regardless of freshness,
///    at the sentinel distance (no usable location to rank by).
/// 3. Quick-test override: every known driver, distance zero, ignoring both
///    availability and freshness — development only.
pub fn rank_candidates(
    drivers: &[DriverPresence],
    pickup: Coordinate,
    offered_conns: &HashSet<String>,
    now_ms: u64,
    stale_after: std::time::Duration,
    quick_test_mode: bool,
) -> Vec<Candidate> {
    let unsolicited = |d: &&DriverPresence| !offered_conns.contains(&d.conn_id);

    if quick_test_mode {
        return drivers
            .iter()
            .filter(unsolicited)
            .map(|d| Candidate { conn_id: d.conn_id.clone(), distance_km: 0.0 })
            .collect();
    }

    let mut primary: Vec<Candidate> = drivers
        .iter()
        .filter(unsolicited)
        .filter(|d| d.is_eligible(now_ms, stale_after))
        .map(|d| Candidate { conn_id: d.conn_id.clone(), distance_km: haversine_km(Some(pickup), d.last.map(|l| l.coord)) })
        .collect();

    if !primary.is_empty() {
        primary.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km).then_with(|| a.conn_id.cmp(&b.conn_id)));
        return primary;
    }

    let mut fallback: Vec<Candidate> = drivers
        .iter()
        .filter(unsolicited)
        .filter(|d| d.available)
        .map(|d| Candidate { conn_id: d.conn_id.clone(), distance_km: crate::geo::SENTINEL_DISTANCE_KM })
        .collect();
    fallback.sort_by(|a, b| a.conn_id.cmp(&b.conn_id));
    fallback
}
