// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire-format event payloads. Inbound messages arrive as a JSON object with
//! an `event` tag plus event-specific fields; the tag is read out-of-band
//! (see `transport::dispatch::event_name`) and the remainder deserialized
//! into the matching `*Payload` struct. Outbound messages are a single
//! internally-tagged enum so every event the server emits carries its own
//! `event` field for free.

use serde::{Deserialize, Serialize};

use crate::error::OfferLostReason;
use crate::geo::Coordinate;

/// `{latitude, longitude}` as used on the wire for pickup/destination points.
/// Distinct from `Coordinate` (`lat`/`lng`) because that's the wire's naming,
/// not ours.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl From<GeoPoint> for Coordinate {
    fn from(p: GeoPoint) -> Self {
        Coordinate::new(p.latitude, p.longitude)
    }
}

impl From<Coordinate> for GeoPoint {
    fn from(c: Coordinate) -> Self {
        GeoPoint { latitude: c.lat, longitude: c.lng }
    }
}

// -- Inbound payloads ---------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentificarPayload {
    pub tipo: String,
    #[serde(default)]
    pub driver_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DriverStatusPayload {
    pub available: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverLocalizacaoPayload {
    #[serde(default)]
    pub ride_id: Option<String>,
    pub lat: f64,
    pub lng: f64,
    #[serde(default)]
    pub heading: Option<f64>,
    #[serde(default)]
    pub speed: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NovaCorridaPayload {
    pub ride_id: String,
    #[serde(default)]
    pub passenger_id: Option<String>,
    pub passenger_name: String,
    pub pickup_address: String,
    pub pickup_location: GeoPoint,
    pub destination_address: String,
    pub destination_location: GeoPoint,
    #[serde(default)]
    pub fare: Option<serde_json::Value>,
    #[serde(default)]
    pub route_polyline: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorridaAceitaPayload {
    pub ride_id: String,
    pub offer_id: String,
    pub driver_id: String,
    pub driver_name: String,
    pub driver_phone: String,
    pub vehicle_model: String,
    pub vehicle_plate: String,
    #[serde(default)]
    pub approach_polyline: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnviarMensagemPayload {
    pub ride_id: String,
    pub from: String,
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorridaStatusPayload {
    pub ride_id: String,
    #[serde(default)]
    pub by: Option<String>,
    pub status: String,
}

/// The `status` values `corrida_status` accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RideStatusUpdate {
    ArrivedPickup,
    Ongoing,
    ArrivedDropoff,
    Completed,
    Canceled,
    NoShow,
}

impl RideStatusUpdate {
    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "arrived_pickup" => Self::ArrivedPickup,
            "ongoing" => Self::Ongoing,
            "arrived_dropoff" => Self::ArrivedDropoff,
            "completed" => Self::Completed,
            "canceled" => Self::Canceled,
            "no_show" => Self::NoShow,
            _ => return None,
        })
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Canceled)
    }
}

// -- Outbound payloads ---------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ServerEvent {
    Status {
        ok: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        tipo: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        quick_test: Option<bool>,
    },
    CorridaDisponivel {
        offer_id: String,
        ride_id: String,
        passenger_name: String,
        pickup_address: String,
        pickup_location: GeoPoint,
        destination_address: String,
        destination_location: GeoPoint,
        #[serde(skip_serializing_if = "Option::is_none")]
        route_polyline: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        fare: Option<serde_json::Value>,
        expires_at: u64,
    },
    OfferLost {
        ride_id: String,
        reason: OfferLostReason,
    },
    OfferWon {
        ride_id: String,
    },
    CorridaAceita {
        ride_id: String,
        driver_id: String,
        driver_name: String,
        driver_phone: String,
        vehicle_model: String,
        vehicle_plate: String,
        status: &'static str,
        message: String,
        timestamp: u64,
        #[serde(skip_serializing_if = "Option::is_none")]
        approach_polyline: Option<String>,
    },
    SemMotoristas {
        ride_id: String,
    },
    DriverLocalizacao {
        ride_id: String,
        lat: f64,
        lng: f64,
        #[serde(skip_serializing_if = "Option::is_none")]
        heading: Option<f64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        speed: Option<f64>,
        timestamp: u64,
    },
    NovaMensagem {
        from: String,
        message: String,
        timestamp: u64,
    },
    CorridaStatusAtualizada {
        ride_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        by: Option<String>,
        status: String,
        timestamp: u64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corrida_disponivel_serializes_camel_case_with_event_tag() {
        let evt = ServerEvent::CorridaDisponivel {
            offer_id: "o1".into(),
            ride_id: "r1".into(),
            passenger_name: "Alice".into(),
            pickup_address: "123 Main St".into(),
            pickup_location: GeoPoint { latitude: 1.0, longitude: 2.0 },
            destination_address: "456 Oak Ave".into(),
            destination_location: GeoPoint { latitude: 3.0, longitude: 4.0 },
            route_polyline: None,
            fare: None,
            expires_at: 1234,
        };
        let json = serde_json::to_value(&evt).unwrap();
        assert_eq!(json["event"], "corrida_disponivel");
        assert_eq!(json["offerId"], "o1");
        assert_eq!(json["pickupLocation"]["latitude"], 1.0);
        assert!(json.get("routePolyline").is_none());
    }

    #[test]
    fn offer_lost_reason_round_trips() {
        let evt = ServerEvent::OfferLost { ride_id: "r1".into(), reason: OfferLostReason::AlreadyTaken };
        let json = serde_json::to_value(&evt).unwrap();
        assert_eq!(json["reason"], "already_taken");
    }

    #[test]
    fn ride_status_update_parses_known_values_only() {
        assert_eq!(RideStatusUpdate::parse("completed"), Some(RideStatusUpdate::Completed));
        assert_eq!(RideStatusUpdate::parse("bogus"), None);
        assert!(RideStatusUpdate::parse("completed").unwrap().is_terminal());
        assert!(!RideStatusUpdate::parse("ongoing").unwrap().is_terminal());
    }

    #[test]
    fn nova_corrida_payload_deserializes_camel_case() {
        let raw = serde_json::json!({
            "rideId": "r1",
            "passengerName": "Alice",
            "pickupAddress": "123 Main St",
            "pickupLocation": {"latitude": 1.0, "longitude": 2.0},
            "destinationAddress": "456 Oak Ave",
            "destinationLocation": {"latitude": 3.0, "longitude": 4.0},
            "fare": 25,
        });
        let payload: NovaCorridaPayload = serde_json::from_value(raw).unwrap();
        assert_eq!(payload.ride_id, "r1");
        assert_eq!(payload.pickup_location.latitude, 1.0);
    }
}
