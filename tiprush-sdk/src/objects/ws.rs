//! WebSocket message types for the subscriber stream.
//!
//! The `GET /ws` endpoint upgrades to a WebSocket connection shared by
//! every subscriber class.
//!
//! # Protocol
//!
//! 1. The client connects and is treated as role `unknown`. It still
//!    receives broadcasts.
//! 2. The client sends [`ClientMessage::Identify`] to declare its role.
//!    Play-client-only messages (`gamestate_update`, `game_over`,
//!    `spawn_handled`) are ignored until the connection has identified
//!    as `play_client`.
//! 3. The server pushes [`ServerMessage`] frames: donation alerts, full
//!    state snapshots, and overlay projections on independent schedules.
//! 4. The server pings on its liveness sweep; a connection that stays
//!    silent past the timeout window is evicted.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::donation::DonationEventView;
use super::session::{OverlayUpdate, SessionSnapshot};

/// Subscriber classification, declared by an `identify` message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// The rendering/game-loop client. Authoritative state is not echoed
    /// back to this role when it was the one reporting it.
    PlayClient,
    /// A display-only overlay page.
    Overlay,
    /// Connected but not yet identified.
    Unknown,
}

/// Server-to-client WebSocket message.
///
/// Serialized as an internally-tagged JSON object so the client can
/// dispatch on the `"type"` field:
///
/// ```json
/// {"type":"donation_event","donation":{ ... }}
/// {"type":"gamestate_update","state":{ ... }}
/// {"type":"overlay_update","overlay":{ ... }}
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Echo of an admitted donation, for alert rendering.
    DonationEvent { donation: DonationEventView },
    /// Full authoritative state snapshot.
    GamestateUpdate { state: SessionSnapshot },
    /// Display-only projection for overlays.
    OverlayUpdate { overlay: OverlayUpdate },
    /// Reply to an application-level `ping`.
    Pong,
}

/// Client-to-server WebSocket message.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Declare the subscriber's role. May be sent once, immediately
    /// after connecting.
    Identify { role: Role },
    /// Client-observed state report (play client only). Values are
    /// merged through validated clamped setters, never raw overwrite.
    GamestateUpdate { health: u32, score: u64, wave: u32 },
    /// The play client's run ended; the session resets.
    GameOver { final_score: u64, final_wave: u32 },
    /// A previously broadcast pending spawn has been performed.
    SpawnHandled { spawn_id: Uuid },
    /// Application-level heartbeat probe.
    Ping,
    /// Reply to a server heartbeat.
    Pong,
}
