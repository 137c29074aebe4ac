//! Layered admission control for incoming donations.
//!
//! A donation passes through two independent checks before it may be
//! queued:
//!
//! 1. [`CooldownTracker`] — per-kind minimum inter-arrival time.
//! 2. [`RateLimiter`] — fixed-window counters, global and per actor.
//!
//! [`AdmissionGate`] composes both. The check-then-mutate path is fully
//! synchronous; the pipeline task must not yield between the check and the
//! recording of a successful admission.

pub mod cooldown;
pub mod gate;
pub mod rate_limiter;

pub use cooldown::CooldownTracker;
pub use gate::{AdmissionGate, Rejection};
pub use rate_limiter::RateLimiter;
