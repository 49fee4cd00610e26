// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::fmt;

use serde::{Deserialize, Serialize};

/// Why an outstanding offer was lost. Surfaced to the acceptor as part of
/// `offer_lost`, never exposed as an HTTP status — this is a WebSocket-only
/// protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OfferLostReason {
    /// The ride is no longer SEARCHING (already accepted, failed, or gone).
    NotSearching,
    /// The offer id is unknown, targets a different connection, or is no longer PENDING.
    OfferInvalid,
    /// Another driver's acceptance won the ride first.
    AlreadyTaken,
}

impl OfferLostReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotSearching => "not_searching",
            Self::OfferInvalid => "offer_invalid",
            Self::AlreadyTaken => "already_taken",
        }
    }
}

impl fmt::Display for OfferLostReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
