// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The per-ride round scheduler: selects a batch, issues offers, arms a TTL
//! timer, and on expiry either advances the round or reports exhaustion.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::RETRY_DELAY;
use crate::events::ServerEvent;
use crate::matching::candidate::rank_candidates;
use crate::ride::{OfferState, Ride, RideOffer, RideStatus};
use crate::rooms::ride_room;
use crate::state::{epoch_ms, new_id, AppState};

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Start (or advance) one dispatch step for `ride`. Boxed because the retry
/// and TTL-expiry paths recurse into this same function from a spawned task.
pub fn dispatch_round(state: Arc<AppState>, ride: Arc<Ride>) -> BoxFuture<'static, ()> {
    Box::pin(async move {
        if ride.status().await != RideStatus::Searching {
            return;
        }

        let drivers = state.drivers.snapshot().await;
        let offered_conns = ride.inner.lock().await.offered_conns.clone();
        let now = epoch_ms();
        let ranked = rank_candidates(
            &drivers,
            ride.pickup,
            &offered_conns,
            now,
            state.config.driver_stale(),
            state.config.quick_test_mode,
        );
        let batch: Vec<_> = ranked.into_iter().take(state.config.batch_size).collect();

        if batch.is_empty() {
            let round = ride.inner.lock().await.round;
            if round >= state.config.max_rounds - 1 {
                ride.cancel_timer().await;
                ride.force_status(RideStatus::Failed).await;
                info!(ride_id = %ride.ride_id, round, "auction exhausted, no candidates");
                state
                    .rooms
                    .emit_to(&ride.passenger_conn_id, &ServerEvent::SemMotoristas { ride_id: ride.ride_id.clone() })
                    .await;
                return;
            }

            ride.inner.lock().await.round += 1;
            let token = ride.rearm_timer(&state.shutdown).await;
            let state = Arc::clone(&state);
            let ride = Arc::clone(&ride);
            tokio::spawn(async move {
                tokio::select! {
                    _ = tokio::time::sleep(RETRY_DELAY) => {
                        dispatch_round(state, ride).await;
                    }
                    _ = token.cancelled() => {}
                }
            });
            return;
        }

        let expires_at = now + state.config.offer_ttl_ms;
        let mut targets = Vec::with_capacity(batch.len());
        {
            let mut inner = ride.inner.lock().await;
            for candidate in &batch {
                let offer_id = new_id();
                inner.offered.insert(
                    offer_id.clone(),
                    RideOffer { offer_id: offer_id.clone(), conn_id: candidate.conn_id.clone(), issued_at: now, state: OfferState::Pending },
                );
                inner.offered_conns.insert(candidate.conn_id.clone());
                targets.push((candidate.conn_id.clone(), offer_id));
            }
        }

        for (conn_id, offer_id) in targets {
            debug!(ride_id = %ride.ride_id, conn_id = %conn_id, offer_id = %offer_id, "offering ride");
            state
                .rooms
                .emit_to(
                    &conn_id,
                    &ServerEvent::CorridaDisponivel {
                        offer_id,
                        ride_id: ride.ride_id.clone(),
                        passenger_name: ride.passenger_name.clone(),
                        pickup_address: ride.pickup_address.clone(),
                        pickup_location: ride.pickup.into(),
                        destination_address: ride.destination_address.clone(),
                        destination_location: ride.dest.into(),
                        route_polyline: ride.route_polyline.clone(),
                        fare: ride.fare.clone(),
                        expires_at,
                    },
                )
                .await;
        }

        let token = ride.rearm_timer(&state.shutdown).await;
        let state = Arc::clone(&state);
        let ride = Arc::clone(&ride);
        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(state.config.offer_ttl()) => {
                    let still_searching = {
                        let mut inner = ride.inner.lock().await;
                        let searching = inner.status() == RideStatus::Searching;
                        if searching {
                            inner.round += 1;
                        }
                        searching
                    };
                    if still_searching {
                        warn!(ride_id = %ride.ride_id, room = %ride_room(&ride.ride_id), "auction round expired with no acceptance");
                        dispatch_round(state, ride).await;
                    }
                }
                _ = token.cancelled() => {}
            }
        });
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::driver::DriverRegistry;
    use crate::geo::Coordinate;
    use crate::rooms::Rooms;
    use crate::ride::RideRegistry;
    use tokio_util::sync::CancellationToken;

    fn config(batch_size: usize, max_rounds: u32, offer_ttl_ms: u64) -> Config {
        Config {
            port: 0,
            host: "0.0.0.0".into(),
            batch_size,
            offer_ttl_ms,
            max_rounds,
            driver_stale_ms: 30_000,
            quick_test_mode: false,
            log_format: "json".into(),
            log_level: "info".into(),
        }
    }

    fn ride() -> Arc<Ride> {
        Ride::new(
            "r1".into(),
            "passenger-conn".into(),
            "Alice".into(),
            "123 Main St".into(),
            "456 Oak Ave".into(),
            Coordinate::new(-23.550, -46.633),
            Coordinate::new(-23.500, -46.600),
            None,
            None,
        )
    }

    async fn state(cfg: Config) -> Arc<AppState> {
        Arc::new(AppState {
            config: cfg,
            shutdown: CancellationToken::new(),
            rooms: Rooms::new(),
            drivers: DriverRegistry::new(),
            rides: RideRegistry::new(),
        })
    }

    #[tokio::test]
    async fn nearest_driver_offered_first() {
        let state = state(config(1, 3, 12_000)).await;
        state.drivers.register("d1".into(), None).await;
        state.drivers.set_available("d1", true).await;
        state.drivers.update_location("d1", Coordinate::new(-23.551, -46.634), epoch_ms()).await;
        state.drivers.register("d2".into(), None).await;
        state.drivers.set_available("d2", true).await;
        state.drivers.update_location("d2", Coordinate::new(-23.700, -46.900), epoch_ms()).await;

        let r = ride();
        let mut rx = state.rooms.register("d1".into()).await;
        let _rx2 = state.rooms.register("d2".into()).await;

        dispatch_round(Arc::clone(&state), Arc::clone(&r)).await;

        let msg = rx.recv().await.unwrap();
        assert!(msg.contains("corrida_disponivel"));
        assert!(r.inner.lock().await.offered_conns.contains("d1"));
        assert!(!r.inner.lock().await.offered_conns.contains("d2"));
    }

    #[tokio::test]
    async fn empty_batch_at_last_round_fails_the_ride() {
        let state = state(config(1, 1, 12_000)).await;
        let r = ride();
        let mut rx = state.rooms.register("passenger-conn".into()).await;

        dispatch_round(Arc::clone(&state), Arc::clone(&r)).await;

        let msg = rx.recv().await.unwrap();
        assert!(msg.contains("sem_motoristas"));
        assert_eq!(r.status().await, RideStatus::Failed);
    }
}
