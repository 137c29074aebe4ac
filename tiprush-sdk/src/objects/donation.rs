//! Donation submission and admission reply types.
//!
//! A donation arrives as a single JSON object posted to the ingestion
//! endpoint. The `parameters` object is loose on the wire; the server
//! validates its shape against `kind` before anything is queued.

use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The effect class of a donation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DonationKind {
    /// Temporary multiplicative attack modifier.
    Boost,
    /// Restore session health, clamped to the maximum.
    Heal,
    /// Queue a regular enemy spawn for the game client.
    SpawnEnemy,
    /// Queue a dragon spawn. High impact, long cooldown.
    SpawnDragon,
}

impl std::fmt::Display for DonationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DonationKind::Boost => write!(f, "boost"),
            DonationKind::Heal => write!(f, "heal"),
            DonationKind::SpawnEnemy => write!(f, "spawn_enemy"),
            DonationKind::SpawnDragon => write!(f, "spawn_dragon"),
        }
    }
}

/// Kind-specific donation parameters, as found on the wire.
///
/// All fields are optional here; which of them must be present is decided
/// by [`DonationRequest::kind`] during validation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DonationParameters {
    /// Attack boost percentage (`Boost` only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub boost_percent: Option<u32>,
    /// Boost duration in seconds (`Boost` only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<u32>,
    /// Health points to restore (`Heal` only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heal_amount: Option<u32>,
    /// Enemy type to spawn (`SpawnEnemy`; optional for `SpawnDragon`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enemy_type: Option<CompactString>,
}

/// An inbound viewer donation, posted by the donation platform bridge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DonationRequest {
    /// Opaque unique token assigned by the ingestion boundary.
    pub id: Uuid,
    /// Stable identifier of the donating viewer.
    pub actor_id: CompactString,
    /// Display name of the donating viewer.
    pub actor_name: CompactString,
    /// Donation amount in minor currency units. Must be positive.
    pub amount_minor_units: u64,
    /// Effect class requested by the donation.
    pub kind: DonationKind,
    /// Kind-specific parameters.
    #[serde(default)]
    pub parameters: DonationParameters,
}

/// Why a donation was turned away at the admission gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    /// The global or per-actor rate window is full.
    RateLimited,
    /// The per-kind cooldown has not elapsed yet.
    OnCooldown,
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RejectReason::RateLimited => write!(f, "rate_limited"),
            RejectReason::OnCooldown => write!(f, "on_cooldown"),
        }
    }
}

/// Positive admission reply: the donation is queued for processing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DonationAccepted {
    pub accepted: bool,
    /// Id of the queued event, echoing the request id.
    pub event_id: Uuid,
}

impl DonationAccepted {
    pub fn new(event_id: Uuid) -> Self {
        Self {
            accepted: true,
            event_id,
        }
    }
}

/// Negative admission reply, carrying the human-presentable reason.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DonationRejected {
    pub accepted: bool,
    pub reason: RejectReason,
    /// Milliseconds until a retry can succeed.
    pub retry_after_ms: u64,
}

impl DonationRejected {
    pub fn new(reason: RejectReason, retry_after_ms: u64) -> Self {
        Self {
            accepted: false,
            reason,
            retry_after_ms,
        }
    }
}

/// Echo of an admitted donation, broadcast for alert rendering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DonationEventView {
    pub id: Uuid,
    pub actor_id: CompactString,
    pub actor_name: CompactString,
    pub amount_minor_units: u64,
    pub kind: DonationKind,
    pub parameters: DonationParameters,
}
