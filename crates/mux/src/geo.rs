// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Great-circle distance between two points. Pure, thread-safe, no state.

use serde::{Deserialize, Serialize};

/// A latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// True if both components are finite decimal degrees.
    pub fn is_finite(&self) -> bool {
        self.lat.is_finite() && self.lng.is_finite()
    }
}

/// Distance reported when a coordinate is unavailable. Large enough to sort
/// after any real-world distance without needing `Option` plumbing through
/// the candidate selector.
pub const SENTINEL_DISTANCE_KM: f64 = 9999.0;

const EARTH_RADIUS_KM: f64 = 6371.0;

/// Haversine distance between `a` and `b`, in kilometres. Returns the
/// sentinel distance if either point is missing or non-finite.
pub fn haversine_km(a: Option<Coordinate>, b: Option<Coordinate>) -> f64 {
    let (a, b) = match (a, b) {
        (Some(a), Some(b)) if a.is_finite() && b.is_finite() => (a, b),
        _ => return SENTINEL_DISTANCE_KM,
    };

    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let dlat = (b.lat - a.lat).to_radians();
    let dlng = (b.lng - a.lng).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlng / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().asin();
    (EARTH_RADIUS_KM * c).max(0.0)
}
