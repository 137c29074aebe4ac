//! Command and frame definitions for the internal channels.

use std::sync::Arc;
use tokio::sync::oneshot;
use uuid::Uuid;

use tiprush_sdk::objects::{
    CooldownStatusView, DonationRequest, RateWindowStatus, Role, ServerMessage, SessionSnapshot,
};

use crate::admission::Rejection;
use crate::config::{CooldownConfig, RateLimiterConfig};
use crate::donation::ValidationError;
use crate::events::channels::FrameSender;

/// A frame on its way to one subscriber's transport task.
#[derive(Debug, Clone)]
pub enum OutboundFrame {
    /// A serialized [`ServerMessage`]. Serialized once per publish and
    /// shared between subscribers.
    Text(Arc<str>),
    /// Liveness probe; the transport maps this to a protocol-level ping.
    Ping,
}

/// Commands handled by the broadcast hub task.
#[derive(Debug)]
pub enum HubCommand {
    /// A new subscriber connected. Role starts as [`Role::Unknown`].
    Register { id: Uuid, frame_tx: FrameSender },
    /// Out-of-band role declaration for a connected subscriber.
    Identify { id: Uuid, role: Role },
    /// The subscriber's transport closed.
    Unregister { id: Uuid },
    /// Liveness evidence (a pong) was observed for a subscriber.
    Heartbeat { id: Uuid },
    /// Fan a message out to every live subscriber, minus an excluded role.
    Publish {
        message: ServerMessage,
        exclude_role: Option<Role>,
    },
    /// Report the number of live subscribers.
    SubscriberCount { reply: oneshot::Sender<usize> },
}

/// Session control operations, mapped 1:1 from the admin surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlAction {
    Start,
    Stop,
    Pause,
    Resume,
    Reset,
}

/// Outcome of a donation submission, delivered back to the origin.
#[derive(Debug)]
pub enum SubmitOutcome {
    /// Queued for processing.
    Accepted { event_id: Uuid },
    /// Turned away by the admission gate.
    Rejected(Rejection),
    /// Malformed payload, rejected before the gate.
    Invalid(ValidationError),
}

/// Read-only pipeline snapshot for the stats endpoint.
#[derive(Debug, Clone)]
pub struct PipelineStats {
    pub session: SessionSnapshot,
    pub queue_length: usize,
    pub cooldowns: Vec<CooldownStatusView>,
    pub rate: RateWindowStatus,
}

/// Commands handled by the pipeline task.
#[derive(Debug)]
pub enum PipelineCommand {
    /// An inbound donation; the admission outcome is reported back
    /// through `reply` so a rejection reason can be shown to a human.
    SubmitDonation {
        request: DonationRequest,
        reply: oneshot::Sender<SubmitOutcome>,
    },
    /// Client-observed health/score/wave from the play client.
    ClientReport { health: u32, score: u64, wave: u32 },
    /// The play client's run ended.
    GameOver { final_score: u64, final_wave: u32 },
    /// The play client performed a previously broadcast spawn.
    SpawnHandled { spawn_id: Uuid },
    /// Admin session control; replies with the resulting snapshot.
    Control {
        action: ControlAction,
        reply: oneshot::Sender<SessionSnapshot>,
    },
    /// Administrative cancellation of a queued event.
    CancelQueued {
        event_id: Uuid,
        reply: oneshot::Sender<bool>,
    },
    /// Read-only stats snapshot.
    Stats {
        reply: oneshot::Sender<PipelineStats>,
    },
    /// Swap rate/cooldown limits after a config reload.
    ReloadLimits {
        rate: RateLimiterConfig,
        cooldowns: CooldownConfig,
    },
}
