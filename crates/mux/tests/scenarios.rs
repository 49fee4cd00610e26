// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end scenarios driving the real router over a live WebSocket
//! connection, one per participant.

use std::sync::Arc;
use std::time::Duration;

use axum_test::TestServer;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

use ride_dispatch_core::config::Config;
use ride_dispatch_core::state::AppState;
use ride_dispatch_core::transport::build_router;

fn config() -> Config {
    Config {
        port: 0,
        host: "127.0.0.1".into(),
        batch_size: 3,
        offer_ttl_ms: 12_000,
        max_rounds: 3,
        driver_stale_ms: 30_000,
        quick_test_mode: false,
        log_format: "json".into(),
        log_level: "info".into(),
    }
}

#[allow(clippy::expect_used)]
fn server_with(cfg: Config) -> TestServer {
    let state = Arc::new(AppState::new(cfg, CancellationToken::new()));
    let router = build_router(state);
    TestServer::builder().http_transport().build(router).expect("failed to build test server")
}

async fn identify(server: &TestServer, tipo: &str) -> axum_test::TestWebSocket {
    let mut ws = server.get_websocket("/ws").await.into_websocket().await;
    ws.send_json(&json!({"event": "identificar", "tipo": tipo})).await;
    let ack: Value = ws.receive_json().await;
    assert_eq!(ack["event"], "status");
    assert_eq!(ack["ok"], true);
    ws
}

async fn go_available(ws: &mut axum_test::TestWebSocket, lat: f64, lng: f64) {
    ws.send_json(&json!({"event": "driver_status", "available": true})).await;
    ws.send_json(&json!({"event": "driver_localizacao", "lat": lat, "lng": lng})).await;
}

fn nova_corrida(ride_id: &str, pickup: (f64, f64), dest: (f64, f64)) -> Value {
    json!({
        "event": "nova_corrida",
        "rideId": ride_id,
        "passengerName": "Alice",
        "pickupAddress": "123 Main St",
        "pickupLocation": {"latitude": pickup.0, "longitude": pickup.1},
        "destinationAddress": "456 Oak Ave",
        "destinationLocation": {"latitude": dest.0, "longitude": dest.1},
        "fare": 25,
    })
}

#[allow(clippy::expect_used)]
#[tokio::test]
async fn s1_happy_path_first_round_acceptance() {
    let server = server_with(config());

    let mut d1 = identify(&server, "motorista").await;
    go_available(&mut d1, -23.550, -46.634).await;
    let mut d2 = identify(&server, "motorista").await;
    go_available(&mut d2, -23.560, -46.640).await;
    let mut passenger = identify(&server, "passageiro").await;

    passenger.send_json(&nova_corrida("r1", (-23.550, -46.633), (-23.500, -46.600))).await;

    let offer: Value = d1.receive_json().await;
    assert_eq!(offer["event"], "corrida_disponivel");
    let offer_id = offer["offerId"].as_str().expect("offer carries an offerId").to_owned();

    d1.send_json(&json!({
        "event": "corrida_aceita",
        "rideId": "r1",
        "offerId": offer_id,
        "driverId": "d1",
        "driverName": "Bob",
        "driverPhone": "555-1111",
        "vehicleModel": "Civic",
        "vehiclePlate": "ABC1234",
    }))
    .await;

    let won: Value = d1.receive_json().await;
    assert_eq!(won["event"], "offer_won");

    let room_event: Value = passenger.receive_json().await;
    assert_eq!(room_event["event"], "corrida_aceita");
    assert_eq!(room_event["status"], "accepted");

    // d2 was also within the batch (BATCH_SIZE 3, only two drivers) and so
    // already has its own corrida_disponivel queued ahead of the loss notice.
    let own_offer: Value = d2.receive_json().await;
    assert_eq!(own_offer["event"], "corrida_disponivel");

    let lost: Value = d2.receive_json().await;
    assert_eq!(lost["event"], "offer_lost");
    assert_eq!(lost["reason"], "already_taken");
}

#[tokio::test]
async fn s3_exhaustion_reports_no_drivers_and_rejects_late_acceptance() {
    let mut cfg = config();
    cfg.max_rounds = 1;
    let server = server_with(cfg);

    let mut passenger = identify(&server, "passageiro").await;
    passenger.send_json(&nova_corrida("r3", (-23.550, -46.633), (-23.500, -46.600))).await;

    let none: Value = passenger.receive_json().await;
    assert_eq!(none["event"], "sem_motoristas");
    assert_eq!(none["rideId"], "r3");

    let mut driver = identify(&server, "motorista").await;
    driver
        .send_json(&json!({
            "event": "corrida_aceita",
            "rideId": "r3",
            "offerId": "whatever",
            "driverId": "d1",
            "driverName": "Bob",
            "driverPhone": "555-1111",
            "vehicleModel": "Civic",
            "vehiclePlate": "ABC1234",
        }))
        .await;

    let lost: Value = driver.receive_json().await;
    assert_eq!(lost["event"], "offer_lost");
    assert_eq!(lost["reason"], "not_searching");
}

#[allow(clippy::expect_used)]
#[tokio::test]
async fn s2_second_driver_wins_after_first_round_expires_unanswered() {
    let mut cfg = config();
    cfg.batch_size = 1;
    cfg.offer_ttl_ms = 500;
    let server = server_with(cfg);

    let mut d1 = identify(&server, "motorista").await;
    go_available(&mut d1, -23.550, -46.634).await;
    let mut d2 = identify(&server, "motorista").await;
    go_available(&mut d2, -23.560, -46.640).await;
    let mut passenger = identify(&server, "passageiro").await;

    passenger.send_json(&nova_corrida("r2", (-23.550, -46.633), (-23.500, -46.600))).await;

    // Round 0: only d1 is offered (BATCH_SIZE=1) and never responds.
    let round0: Value = d1.receive_json().await;
    assert_eq!(round0["event"], "corrida_disponivel");

    // Round 1 fires after the TTL with d2 as the sole remaining candidate.
    let round1: Value = d2.receive_json().await;
    assert_eq!(round1["event"], "corrida_disponivel");
    let offer_id = round1["offerId"].as_str().expect("offer carries an offerId").to_owned();

    d2.send_json(&json!({
        "event": "corrida_aceita",
        "rideId": "r2",
        "offerId": offer_id,
        "driverId": "d2",
        "driverName": "Carol",
        "driverPhone": "555-2222",
        "vehicleModel": "Corolla",
        "vehiclePlate": "XYZ9876",
    }))
    .await;

    let won: Value = d2.receive_json().await;
    assert_eq!(won["event"], "offer_won");

    let lost: Value = d1.receive_json().await;
    assert_eq!(lost["event"], "offer_lost");
    assert_eq!(lost["reason"], "already_taken");
}

#[allow(clippy::expect_used)]
#[tokio::test]
async fn s6_concurrent_acceptance_has_exactly_one_winner() {
    let server = server_with(config());

    let mut d1 = identify(&server, "motorista").await;
    go_available(&mut d1, -23.550, -46.634).await;
    let mut d2 = identify(&server, "motorista").await;
    go_available(&mut d2, -23.560, -46.640).await;
    let mut passenger = identify(&server, "passageiro").await;

    passenger.send_json(&nova_corrida("r6", (-23.550, -46.633), (-23.500, -46.600))).await;

    let offer1: Value = d1.receive_json().await;
    let offer_id1 = offer1["offerId"].as_str().expect("offer carries an offerId").to_owned();
    let offer2: Value = d2.receive_json().await;
    let offer_id2 = offer2["offerId"].as_str().expect("offer carries an offerId").to_owned();

    let accept = |offer_id: String, driver_id: &'static str| {
        json!({
            "event": "corrida_aceita",
            "rideId": "r6",
            "offerId": offer_id,
            "driverId": driver_id,
            "driverName": "Driver",
            "driverPhone": "555-0000",
            "vehicleModel": "Sedan",
            "vehiclePlate": "CONCUR1",
        })
    };

    // Fire both acceptances back-to-back with no await between sends, so the
    // server sees them arrive nearly simultaneously.
    d1.send_json(&accept(offer_id1, "d1")).await;
    d2.send_json(&accept(offer_id2, "d2")).await;

    let d1_reply: Value = d1.receive_json().await;
    let d2_reply: Value = d2.receive_json().await;

    let winners = [&d1_reply, &d2_reply].into_iter().filter(|r| r["event"] == "offer_won").count();
    let losers = [&d1_reply, &d2_reply].into_iter().filter(|r| r["event"] == "offer_lost").count();
    assert_eq!(winners, 1, "exactly one driver must win: {d1_reply:?} / {d2_reply:?}");
    assert_eq!(losers, 1);
}

#[tokio::test]
async fn s4_quick_test_mode_ignores_availability_and_freshness() {
    let mut cfg = config();
    cfg.quick_test_mode = true;
    let server = server_with(cfg);

    // Never sent driver_status or driver_localizacao - unavailable and stale by definition.
    let mut driver = identify(&server, "motorista").await;
    let mut passenger = identify(&server, "passageiro").await;

    passenger.send_json(&nova_corrida("r4", (-23.550, -46.633), (-23.500, -46.600))).await;

    let offer: Value = driver.receive_json().await;
    assert_eq!(offer["event"], "corrida_disponivel");
}

#[allow(clippy::expect_used)]
#[tokio::test]
async fn s5_terminal_status_lingers_then_tears_down_the_room() {
    let server = server_with(config());

    let mut driver = identify(&server, "motorista").await;
    go_available(&mut driver, -23.550, -46.634).await;
    let mut passenger = identify(&server, "passageiro").await;

    passenger.send_json(&nova_corrida("r5", (-23.550, -46.633), (-23.500, -46.600))).await;
    let offer: Value = driver.receive_json().await;
    let offer_id = offer["offerId"].as_str().expect("offer carries an offerId").to_owned();

    driver
        .send_json(&json!({
            "event": "corrida_aceita",
            "rideId": "r5",
            "offerId": offer_id,
            "driverId": "d1",
            "driverName": "Bob",
            "driverPhone": "555-1111",
            "vehicleModel": "Civic",
            "vehiclePlate": "ABC1234",
        }))
        .await;
    // The winning driver joined the ride room before the award broadcast, so
    // it receives both the direct offer_won and the room-wide corrida_aceita.
    let _won: Value = driver.receive_json().await;
    let _driver_room_event: Value = driver.receive_json().await;
    let _room: Value = passenger.receive_json().await;

    passenger.send_json(&json!({"event": "corrida_status", "rideId": "r5", "status": "completed"})).await;
    let update: Value = passenger.receive_json().await;
    assert_eq!(update["event"], "corrida_status_atualizada");
    assert_eq!(update["status"], "completed");
    let _driver_update: Value = driver.receive_json().await;

    tokio::time::sleep(Duration::from_millis(3_200)).await;

    passenger.send_json(&json!({"event": "enviar_mensagem", "rideId": "r5", "from": "passenger", "message": "hello?"})).await;

    let result = tokio::time::timeout(Duration::from_millis(300), driver.receive_text()).await;
    assert!(result.is_err(), "driver should not receive a message after the ride room was torn down");
}
