// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Inbound event dispatch: reads the `event` tag out of an arbitrary JSON
//! payload and routes to the matching handler. Anything malformed or
//! precondition-violating is logged and dropped — never replied to with an
//! error, per the protocol-error policy.

use std::sync::Arc;

use tracing::debug;

use crate::events::{
    CorridaAceitaPayload, CorridaStatusPayload, DriverLocalizacaoPayload, DriverStatusPayload, EnviarMensagemPayload,
    IdentificarPayload, NovaCorridaPayload, RideStatusUpdate, ServerEvent,
};
use crate::geo::Coordinate;
use crate::matching::{arbiter, auction};
use crate::ride::{Ride, RideStatus};
use crate::rooms::ride_room;
use crate::state::{epoch_ms, AppState};

/// What a connection identified as. `None` until `identificar` succeeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tipo {
    Motorista,
    Passageiro,
}

pub const PASSAGEIROS_GROUP: &str = "passageiros";

/// Handle one inbound text frame. `tipo` is the connection's own mutable
/// identity slot — there is exactly one reader of it (this connection's
/// single-threaded read loop), so no lock is needed.
pub async fn handle_inbound(state: &Arc<AppState>, conn_id: &str, tipo: &mut Option<Tipo>, raw: &str) {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(raw) else {
        debug!(conn_id, "malformed json frame, dropping");
        return;
    };
    let Some(event) = value.get("event").and_then(|v| v.as_str()) else {
        debug!(conn_id, "frame missing event tag, dropping");
        return;
    };

    match event {
        "identificar" => handle_identificar(state, conn_id, tipo, value).await,
        "driver_status" => handle_driver_status(state, conn_id, *tipo, value).await,
        "driver_localizacao" => handle_driver_localizacao(state, conn_id, *tipo, value).await,
        "nova_corrida" => handle_nova_corrida(state, conn_id, *tipo, value).await,
        "corrida_aceita" => handle_corrida_aceita(state, conn_id, *tipo, value).await,
        "enviar_mensagem" => handle_enviar_mensagem(state, conn_id, value).await,
        "corrida_status" => handle_corrida_status(state, conn_id, value).await,
        other => debug!(conn_id, event = other, "unknown event, dropping"),
    }
}

/// Connection teardown: called once, from the connection's own task, when
/// its socket closes.
pub async fn handle_disconnect(state: &Arc<AppState>, conn_id: &str, tipo: Option<Tipo>) {
    if tipo == Some(Tipo::Motorista) {
        state.drivers.remove(conn_id).await;
    }
    state.rooms.remove_connection(conn_id).await;
    tracing::info!(conn_id, ?tipo, "connection closed");
}

async fn handle_identificar(state: &Arc<AppState>, conn_id: &str, tipo: &mut Option<Tipo>, value: serde_json::Value) {
    let Ok(payload) = serde_json::from_value::<IdentificarPayload>(value) else {
        debug!(conn_id, "malformed identificar payload, dropping");
        return;
    };

    match payload.tipo.as_str() {
        "motorista" => {
            *tipo = Some(Tipo::Motorista);
            state.drivers.register(conn_id.to_owned(), payload.driver_id).await;
            state
                .rooms
                .emit_to(
                    conn_id,
                    &ServerEvent::Status { ok: true, tipo: Some("motorista".into()), error: None, quick_test: Some(state.config.quick_test_mode) },
                )
                .await;
        }
        "passageiro" => {
            *tipo = Some(Tipo::Passageiro);
            state.rooms.join(PASSAGEIROS_GROUP, conn_id).await;
            state
                .rooms
                .emit_to(
                    conn_id,
                    &ServerEvent::Status { ok: true, tipo: Some("passageiro".into()), error: None, quick_test: Some(state.config.quick_test_mode) },
                )
                .await;
        }
        _ => {
            state
                .rooms
                .emit_to(conn_id, &ServerEvent::Status { ok: false, tipo: None, error: Some("tipo_invalido".into()), quick_test: None })
                .await;
        }
    }
}

async fn handle_driver_status(state: &Arc<AppState>, conn_id: &str, tipo: Option<Tipo>, value: serde_json::Value) {
    if tipo != Some(Tipo::Motorista) {
        debug!(conn_id, "driver_status from non-driver connection, dropping");
        return;
    }
    let Ok(payload) = serde_json::from_value::<DriverStatusPayload>(value) else {
        debug!(conn_id, "malformed driver_status payload, dropping");
        return;
    };
    state.drivers.set_available(conn_id, payload.available).await;
}

async fn handle_driver_localizacao(state: &Arc<AppState>, conn_id: &str, tipo: Option<Tipo>, value: serde_json::Value) {
    if tipo != Some(Tipo::Motorista) {
        debug!(conn_id, "driver_localizacao from non-driver connection, dropping");
        return;
    }
    let Ok(payload) = serde_json::from_value::<DriverLocalizacaoPayload>(value) else {
        debug!(conn_id, "malformed driver_localizacao payload, dropping");
        return;
    };
    let coord = Coordinate::new(payload.lat, payload.lng);
    if !coord.is_finite() {
        debug!(conn_id, "non-finite driver_localizacao, dropping");
        return;
    }

    let now = epoch_ms();
    state.drivers.update_location(conn_id, coord, now).await;

    let Some(ride_id) = payload.ride_id else { return };
    let room = ride_room(&ride_id);
    if !state.rooms.is_member(&room, conn_id).await {
        debug!(conn_id, ride_id, "driver_localizacao for a ride this connection isn't in, dropping");
        return;
    }
    state
        .rooms
        .emit_to_room(
            &room,
            &ServerEvent::DriverLocalizacao { ride_id, lat: payload.lat, lng: payload.lng, heading: payload.heading, speed: payload.speed, timestamp: now },
        )
        .await;
}

async fn handle_nova_corrida(state: &Arc<AppState>, conn_id: &str, tipo: Option<Tipo>, value: serde_json::Value) {
    if tipo != Some(Tipo::Passageiro) {
        debug!(conn_id, "nova_corrida from non-passenger connection, dropping");
        return;
    }
    let Ok(payload) = serde_json::from_value::<NovaCorridaPayload>(value) else {
        debug!(conn_id, "malformed nova_corrida payload, dropping");
        return;
    };

    let ride = Ride::new(
        payload.ride_id.clone(),
        conn_id.to_owned(),
        payload.passenger_name,
        payload.pickup_address,
        payload.destination_address,
        payload.pickup_location.into(),
        payload.destination_location.into(),
        payload.route_polyline,
        payload.fare,
    );

    if !state.rides.create(Arc::clone(&ride)).await {
        debug!(conn_id, ride_id = %payload.ride_id, "duplicate ride id, dropping");
        return;
    }

    state.rooms.join(&ride_room(&payload.ride_id), conn_id).await;
    auction::dispatch_round(Arc::clone(state), ride).await;
}

async fn handle_corrida_aceita(state: &Arc<AppState>, conn_id: &str, tipo: Option<Tipo>, value: serde_json::Value) {
    if tipo != Some(Tipo::Motorista) {
        debug!(conn_id, "corrida_aceita from non-driver connection, dropping");
        return;
    }
    let Ok(payload) = serde_json::from_value::<CorridaAceitaPayload>(value) else {
        debug!(conn_id, "malformed corrida_aceita payload, dropping");
        return;
    };

    let Some(ride) = state.rides.get(&payload.ride_id).await else {
        state
            .rooms
            .emit_to(conn_id, &ServerEvent::OfferLost { ride_id: payload.ride_id, reason: crate::error::OfferLostReason::NotSearching })
            .await;
        return;
    };

    arbiter::accept_offer(state, &ride, conn_id, &payload).await;
}

async fn handle_enviar_mensagem(state: &Arc<AppState>, conn_id: &str, value: serde_json::Value) {
    let Ok(payload) = serde_json::from_value::<EnviarMensagemPayload>(value) else {
        debug!(conn_id, "malformed enviar_mensagem payload, dropping");
        return;
    };
    let room = ride_room(&payload.ride_id);
    if !state.rooms.is_member(&room, conn_id).await {
        debug!(conn_id, ride_id = %payload.ride_id, "enviar_mensagem from a non-member, dropping");
        return;
    }
    state
        .rooms
        .emit_to_room(&room, &ServerEvent::NovaMensagem { from: payload.from, message: payload.message, timestamp: epoch_ms() })
        .await;
}

async fn handle_corrida_status(state: &Arc<AppState>, conn_id: &str, value: serde_json::Value) {
    let Ok(payload) = serde_json::from_value::<CorridaStatusPayload>(value) else {
        debug!(conn_id, "malformed corrida_status payload, dropping");
        return;
    };
    let room = ride_room(&payload.ride_id);
    if !state.rooms.is_member(&room, conn_id).await {
        debug!(conn_id, ride_id = %payload.ride_id, "corrida_status from a non-member, dropping");
        return;
    }
    let Some(update) = RideStatusUpdate::parse(&payload.status) else {
        debug!(conn_id, status = %payload.status, "unrecognized corrida_status value, dropping");
        return;
    };

    let timestamp = epoch_ms();
    state
        .rooms
        .emit_to_room(
            &room,
            &ServerEvent::CorridaStatusAtualizada { ride_id: payload.ride_id.clone(), by: payload.by, status: payload.status, timestamp },
        )
        .await;

    if !update.is_terminal() {
        return;
    }

    if let Some(ride) = state.rides.get(&payload.ride_id).await {
        ride.cancel_timer().await;
        let terminal = if update == RideStatusUpdate::Completed { RideStatus::Completed } else { RideStatus::Canceled };
        ride.force_status(terminal).await;
    }

    let state = Arc::clone(state);
    let ride_id = payload.ride_id;
    tokio::spawn(async move {
        tokio::select! {
            _ = tokio::time::sleep(crate::config::LINGER) => {
                state.rooms.clear_room(&ride_room(&ride_id)).await;
                state.rides.delete(&ride_id).await;
            }
            _ = state.shutdown.cancelled() => {}
        }
    });
}
