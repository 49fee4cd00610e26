// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Acceptance arbitration: resolves concurrent `corrida_aceita` attempts for
//! the same ride into exactly one winner.

use std::sync::Arc;

use tracing::info;

use crate::error::OfferLostReason;
use crate::events::{CorridaAceitaPayload, ServerEvent};
use crate::ride::{OfferState, Ride, RideStatus};
use crate::rooms::ride_room;
use crate::state::{epoch_ms, AppState};

enum Outcome {
    Rejected(OfferLostReason),
    Awarded { loser_conns: Vec<String> },
}

/// Resolve one acceptance attempt. Holds the ride's lock only long enough to
/// compute the outcome; every emit happens after the lock is released so no
/// I/O runs inside the critical section.
pub async fn accept_offer(state: &AppState, ride: &Arc<Ride>, conn_id: &str, payload: &CorridaAceitaPayload) {
    let outcome = {
        let mut inner = ride.inner.lock().await;
        if inner.status() != RideStatus::Searching {
            Outcome::Rejected(OfferLostReason::NotSearching)
        } else {
            let valid = inner
                .offered
                .get(&payload.offer_id)
                .is_some_and(|offer| offer.conn_id == conn_id && offer.state == OfferState::Pending);

            if !valid {
                Outcome::Rejected(OfferLostReason::OfferInvalid)
            } else {
                inner.status = Some(RideStatus::Accepted);
                inner.winner_conn_id = Some(conn_id.to_owned());
                let mut loser_conns = Vec::new();
                for (offer_id, offer) in inner.offered.iter_mut() {
                    if offer_id == &payload.offer_id {
                        offer.state = OfferState::Won;
                    } else if offer.state == OfferState::Pending {
                        offer.state = OfferState::Lost;
                        loser_conns.push(offer.conn_id.clone());
                    }
                }
                Outcome::Awarded { loser_conns }
            }
        }
    };

    match outcome {
        Outcome::Rejected(reason) => {
            state.rooms.emit_to(conn_id, &ServerEvent::OfferLost { ride_id: ride.ride_id.clone(), reason }).await;
        }
        Outcome::Awarded { loser_conns } => {
            ride.cancel_timer().await;
            info!(ride_id = %ride.ride_id, conn_id, "ride accepted");

            let room = ride_room(&ride.ride_id);
            state.rooms.join(&room, conn_id).await;

            for loser in loser_conns {
                state
                    .rooms
                    .emit_to(&loser, &ServerEvent::OfferLost { ride_id: ride.ride_id.clone(), reason: OfferLostReason::AlreadyTaken })
                    .await;
            }

            state.rooms.emit_to(conn_id, &ServerEvent::OfferWon { ride_id: ride.ride_id.clone() }).await;

            let timestamp = epoch_ms();
            state
                .rooms
                .emit_to_room(
                    &room,
                    &ServerEvent::CorridaAceita {
                        ride_id: ride.ride_id.clone(),
                        driver_id: payload.driver_id.clone(),
                        driver_name: payload.driver_name.clone(),
                        driver_phone: payload.driver_phone.clone(),
                        vehicle_model: payload.vehicle_model.clone(),
                        vehicle_plate: payload.vehicle_plate.clone(),
                        status: "accepted",
                        message: format!("{} aceitou sua corrida", payload.driver_name),
                        timestamp,
                        approach_polyline: payload.approach_polyline.clone(),
                    },
                )
                .await;
        }
    }
}
