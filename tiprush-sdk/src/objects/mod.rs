pub mod admin;
pub mod donation;
pub mod session;
pub mod ws;

pub use admin::{ControlResponse, CooldownStatusView, RateWindowStatus, StatsResponse};
pub use donation::{
    DonationAccepted, DonationEventView, DonationKind, DonationParameters, DonationRejected,
    DonationRequest, RejectReason,
};
pub use session::{
    BoostView, DonationSummary, OverlayUpdate, PendingSpawnView, SessionSnapshot, SessionStatus,
};
pub use ws::{ClientMessage, Role, ServerMessage};
