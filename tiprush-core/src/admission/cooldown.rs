//! Per-kind cooldown enforcement.
//!
//! At most one admission per kind may succeed before its cooldown elapses,
//! independent of the rate limiter. This serializes high-impact effects
//! (dragon spawns in particular) no matter how many donations request them.

use std::time::Duration;
use tokio::time::Instant;

use tiprush_sdk::objects::{CooldownStatusView, DonationKind};

use crate::config::CooldownConfig;

const ALL_KINDS: [DonationKind; 4] = [
    DonationKind::Boost,
    DonationKind::Heal,
    DonationKind::SpawnEnemy,
    DonationKind::SpawnDragon,
];

/// Cooldown bookkeeping for a single kind.
#[derive(Debug, Clone, Copy, Default)]
struct CooldownState {
    last_admitted_at: Option<Instant>,
    cooldown_until: Option<Instant>,
}

/// Tracks the admission cooldown of every donation kind.
pub struct CooldownTracker {
    config: CooldownConfig,
    /// Fixed array indexed by kind; four entries make a map pointless.
    states: [(DonationKind, CooldownState); 4],
}

impl CooldownTracker {
    pub fn new(config: CooldownConfig) -> Self {
        Self {
            config,
            states: ALL_KINDS.map(|kind| (kind, CooldownState::default())),
        }
    }

    fn index(kind: DonationKind) -> usize {
        match kind {
            DonationKind::Boost => 0,
            DonationKind::Heal => 1,
            DonationKind::SpawnEnemy => 2,
            DonationKind::SpawnDragon => 3,
        }
    }

    fn state(&self, kind: DonationKind) -> &CooldownState {
        &self.states[Self::index(kind)].1
    }

    fn state_mut(&mut self, kind: DonationKind) -> &mut CooldownState {
        &mut self.states[Self::index(kind)].1
    }

    /// Whether an admission of `kind` is allowed right now.
    pub fn is_ready(&self, kind: DonationKind, now: Instant) -> bool {
        match self.state(kind).cooldown_until {
            Some(until) => now >= until,
            None => true,
        }
    }

    /// Time left until `kind` becomes admissible. Zero when ready.
    pub fn remaining(&self, kind: DonationKind, now: Instant) -> Duration {
        match self.state(kind).cooldown_until {
            Some(until) => until.saturating_duration_since(now),
            None => Duration::ZERO,
        }
    }

    /// Start the cooldown for `kind`. Called at admission time only.
    pub fn mark_used(&mut self, kind: DonationKind, now: Instant) {
        let duration = self.config.duration(kind);
        let state = self.state_mut(kind);
        state.last_admitted_at = Some(now);
        state.cooldown_until = Some(now + duration);
    }

    /// Clear every cooldown. Admin reset.
    pub fn reset(&mut self) {
        for (_, state) in &mut self.states {
            *state = CooldownState::default();
        }
    }

    /// Swap the duration configuration. Running cooldowns keep their
    /// original expiry.
    pub fn reconfigure(&mut self, config: CooldownConfig) {
        self.config = config;
    }

    pub fn statuses(&self, now: Instant) -> Vec<CooldownStatusView> {
        self.states
            .iter()
            .map(|(kind, _)| CooldownStatusView {
                kind: *kind,
                ready: self.is_ready(*kind, now),
                remaining_ms: self.remaining(*kind, now).as_millis() as u64,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_tracker_is_ready_for_every_kind() {
        let tracker = CooldownTracker::new(CooldownConfig::default());
        let now = Instant::now();
        for kind in ALL_KINDS {
            assert!(tracker.is_ready(kind, now));
            assert_eq!(tracker.remaining(kind, now), Duration::ZERO);
        }
    }

    #[test]
    fn dragon_admissions_are_serialized_by_the_cooldown() {
        let config = CooldownConfig {
            spawn_dragon: Duration::from_secs(600),
            ..Default::default()
        };
        let mut tracker = CooldownTracker::new(config);
        let now = Instant::now();

        assert!(tracker.is_ready(DonationKind::SpawnDragon, now));
        tracker.mark_used(DonationKind::SpawnDragon, now);

        let shortly_after = now + Duration::from_secs(30);
        assert!(!tracker.is_ready(DonationKind::SpawnDragon, shortly_after));
        assert_eq!(
            tracker.remaining(DonationKind::SpawnDragon, shortly_after),
            Duration::from_secs(570)
        );

        let after_cooldown = now + Duration::from_secs(600);
        assert!(tracker.is_ready(DonationKind::SpawnDragon, after_cooldown));
    }

    #[test]
    fn kinds_cool_down_independently() {
        let mut tracker = CooldownTracker::new(CooldownConfig::default());
        let now = Instant::now();
        tracker.mark_used(DonationKind::SpawnDragon, now);
        assert!(tracker.is_ready(DonationKind::Heal, now));
    }

    #[test]
    fn reset_clears_running_cooldowns() {
        let mut tracker = CooldownTracker::new(CooldownConfig::default());
        let now = Instant::now();
        tracker.mark_used(DonationKind::Boost, now);
        assert!(!tracker.is_ready(DonationKind::Boost, now));
        tracker.reset();
        assert!(tracker.is_ready(DonationKind::Boost, now));
    }
}
