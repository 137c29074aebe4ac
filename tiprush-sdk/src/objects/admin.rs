//! Admin API response types.

use serde::{Deserialize, Serialize};

use super::donation::DonationKind;
use super::session::SessionSnapshot;

/// Per-kind cooldown status, as reported by the stats endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CooldownStatusView {
    pub kind: DonationKind,
    pub ready: bool,
    /// Milliseconds until the kind becomes admissible again. Zero when ready.
    pub remaining_ms: u64,
}

/// Global rate window status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateWindowStatus {
    pub window_ms: u64,
    pub global_count: u32,
    pub global_limit: u32,
    pub per_actor_limit: u32,
    /// Number of per-actor windows currently tracked.
    pub tracked_actors: usize,
}

/// Read-only snapshot served by `GET /admin/stats`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsResponse {
    pub session: SessionSnapshot,
    pub queue_length: usize,
    pub cooldowns: Vec<CooldownStatusView>,
    pub rate: RateWindowStatus,
    pub subscribers: usize,
}

/// Reply to a session control operation, carrying the resulting state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlResponse {
    pub session: SessionSnapshot,
}
