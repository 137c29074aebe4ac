//! The admission gate: cooldown check, then rate check, then record.

use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;

use tiprush_sdk::objects::{CooldownStatusView, DonationKind, RateWindowStatus, RejectReason};

use crate::admission::{CooldownTracker, RateLimiter};
use crate::config::{CooldownConfig, RateLimiterConfig};

/// A donation turned away before queueing. Expected and user-visible;
/// the retry hint travels back to the donation's origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("admission rejected: {reason} (retry after {retry_after:?})")]
pub struct Rejection {
    pub reason: RejectReason,
    pub retry_after: Duration,
}

/// Composes the cooldown tracker and the rate limiter into a single
/// accept/reject decision.
pub struct AdmissionGate {
    limiter: RateLimiter,
    cooldowns: CooldownTracker,
}

impl AdmissionGate {
    pub fn new(limiter: RateLimiter, cooldowns: CooldownTracker) -> Self {
        Self { limiter, cooldowns }
    }

    /// Admit or reject one donation.
    ///
    /// Check order: cooldown for the kind first, then the rate windows.
    /// On success both trackers are mutated before this returns; the whole
    /// path is synchronous so two near-simultaneous donations can never
    /// both pass a since-invalidated check.
    pub fn try_admit(
        &mut self,
        kind: DonationKind,
        actor_id: &str,
        now: Instant,
    ) -> Result<(), Rejection> {
        if !self.cooldowns.is_ready(kind, now) {
            return Err(Rejection {
                reason: RejectReason::OnCooldown,
                retry_after: self.cooldowns.remaining(kind, now),
            });
        }

        if let Err(retry_after) = self.limiter.admit(actor_id, now) {
            return Err(Rejection {
                reason: RejectReason::RateLimited,
                retry_after,
            });
        }

        self.cooldowns.mark_used(kind, now);
        self.limiter.record(actor_id, now);
        Ok(())
    }

    /// Purge idle per-actor rate windows.
    pub fn sweep(&mut self, now: Instant) -> usize {
        self.limiter.sweep(now)
    }

    /// Clear every cooldown. Part of the admin reset.
    pub fn reset_cooldowns(&mut self) {
        self.cooldowns.reset();
    }

    /// Swap both limit configurations at runtime.
    pub fn reconfigure(&mut self, rate: RateLimiterConfig, cooldowns: CooldownConfig) {
        self.limiter.reconfigure(rate);
        self.cooldowns.reconfigure(cooldowns);
    }

    pub fn rate_status(&self, now: Instant) -> RateWindowStatus {
        self.limiter.status(now)
    }

    pub fn cooldown_statuses(&self, now: Instant) -> Vec<CooldownStatusView> {
        self.cooldowns.statuses(now)
    }
}
