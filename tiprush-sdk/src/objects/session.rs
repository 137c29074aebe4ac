//! Session state snapshots and display projections.

use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::donation::DonationKind;

/// Lifecycle status of the play session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Running,
    Paused,
    Stopped,
}

/// Boost state as seen by subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoostView {
    pub active: bool,
    /// Attack boost percentage. Zero when inactive.
    pub percent: u32,
    /// Whole seconds until the boost expires. Zero when inactive.
    pub seconds_remaining: u64,
}

impl BoostView {
    pub fn inactive() -> Self {
        Self {
            active: false,
            percent: 0,
            seconds_remaining: 0,
        }
    }
}

/// A spawn the game client has been asked to perform but has not yet
/// reported as handled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingSpawnView {
    pub spawn_id: Uuid,
    pub enemy_type: CompactString,
    /// Name of the viewer whose donation caused the spawn.
    pub actor_name: CompactString,
    /// Id of the donation event this spawn originated from.
    pub source_event_id: Uuid,
    /// Unix timestamp in milliseconds.
    pub created_at: i64,
}

/// Full snapshot of the authoritative session state.
///
/// Broadcast as the payload of `gamestate_update` frames.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub status: SessionStatus,
    /// Health in `[0, 100]`.
    pub health: u8,
    pub base_attack: u32,
    /// `base_attack * (1 + percent/100)` while boosted, else `base_attack`.
    pub effective_attack: f64,
    pub score: u64,
    /// Wave counter, always at least 1.
    pub wave: u32,
    pub boost: BoostView,
    pub pending_spawns: Vec<PendingSpawnView>,
    /// Unix timestamp in milliseconds of the last mutation.
    pub last_updated_at: i64,
}

/// Compressed summary of the most recently applied donation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DonationSummary {
    pub actor_name: CompactString,
    pub amount_minor_units: u64,
    pub kind: DonationKind,
    /// Unix timestamp in milliseconds the effect was applied.
    pub received_at: i64,
}

/// Display-only projection pushed to overlay subscribers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverlayUpdate {
    pub score: u64,
    pub wave: u32,
    pub health: u8,
    pub boost_active: bool,
    pub boost_seconds_remaining: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_donation: Option<DonationSummary>,
}
