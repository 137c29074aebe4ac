//! The session state machine.
//!
//! Single authoritative record of the play session. Every mutating
//! operation stamps `last_updated_at`, pushes the fresh snapshot through
//! the broadcast hub before returning, and returns that snapshot, so
//! "state changed" and "broadcast triggered" can never drift apart.
//!
//! Reaching zero health *is* the reset transition: score and wave return
//! to their defaults, the boost and spawn backlog clear, and health
//! refills, all inside the same operation.

use compact_str::CompactString;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, info};
use uuid::Uuid;

use tiprush_sdk::objects::{
    BoostView, PendingSpawnView, Role, SessionSnapshot, SessionStatus,
};

use crate::hub::HubHandle;
use crate::utils::unix_now_ms;

/// Unmodified attack value.
pub const BASE_ATTACK: u32 = 20;
/// Health ceiling; also the refill value after a reset.
pub const MAX_HEALTH: u8 = 100;

/// Which side of the system triggered a mutation. Decides whether the
/// resulting `gamestate_update` is echoed back to the play client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// The donation pipeline (event processor or admission layer).
    Pipeline,
    /// A message from the play client itself.
    PlayClient,
    /// The administrative surface.
    Admin,
}

impl Origin {
    fn exclude_role(self) -> Option<Role> {
        match self {
            Origin::PlayClient => Some(Role::PlayClient),
            Origin::Pipeline | Origin::Admin => None,
        }
    }
}

/// Effect application failure. The event is dropped and the tick loop
/// continues; nothing here is fatal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ProcessError {
    #[error("spawn backlog full ({cap} pending)")]
    SpawnBacklogFull { cap: usize },
}

#[derive(Debug, Clone, Copy)]
struct BoostState {
    percent: u32,
    expires_at: Instant,
}

#[derive(Debug, Clone)]
struct PendingSpawn {
    spawn_id: Uuid,
    enemy_type: CompactString,
    actor_name: CompactString,
    source_event_id: Uuid,
    created_at: i64,
}

/// Owns the session record and enforces its invariants. Only this type
/// mutates the record; everything else sees immutable snapshots.
pub struct SessionMachine {
    status: SessionStatus,
    health: u8,
    score: u64,
    wave: u32,
    boost: Option<BoostState>,
    pending_spawns: Vec<PendingSpawn>,
    last_updated_at: i64,
    spawn_backlog_cap: usize,
    hub: HubHandle,
}

impl SessionMachine {
    pub fn new(spawn_backlog_cap: usize, hub: HubHandle) -> Self {
        Self {
            status: SessionStatus::Running,
            health: MAX_HEALTH,
            score: 0,
            wave: 1,
            boost: None,
            pending_spawns: Vec::new(),
            last_updated_at: unix_now_ms(),
            spawn_backlog_cap,
            hub,
        }
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn is_running(&self) -> bool {
        self.status == SessionStatus::Running
    }

    /// Immutable snapshot of the current state.
    pub fn snapshot(&self, now: Instant) -> SessionSnapshot {
        let boost = match self.active_boost(now) {
            Some(b) => BoostView {
                active: true,
                percent: b.percent,
                seconds_remaining: b.expires_at.saturating_duration_since(now).as_secs(),
            },
            None => BoostView::inactive(),
        };

        SessionSnapshot {
            status: self.status,
            health: self.health,
            base_attack: BASE_ATTACK,
            effective_attack: self.effective_attack(now),
            score: self.score,
            wave: self.wave,
            boost,
            pending_spawns: self
                .pending_spawns
                .iter()
                .map(|s| PendingSpawnView {
                    spawn_id: s.spawn_id,
                    enemy_type: s.enemy_type.clone(),
                    actor_name: s.actor_name.clone(),
                    source_event_id: s.source_event_id,
                    created_at: s.created_at,
                })
                .collect(),
            last_updated_at: self.last_updated_at,
        }
    }

    fn active_boost(&self, now: Instant) -> Option<BoostState> {
        self.boost.filter(|b| b.expires_at > now)
    }

    fn effective_attack(&self, now: Instant) -> f64 {
        match self.active_boost(now) {
            Some(b) => f64::from(BASE_ATTACK) * (1.0 + f64::from(b.percent) / 100.0),
            None => f64::from(BASE_ATTACK),
        }
    }

    /// Stamp the record, publish the snapshot, return it.
    fn commit(&mut self, now: Instant, origin: Origin) -> SessionSnapshot {
        self.last_updated_at = unix_now_ms();
        let snapshot = self.snapshot(now);
        self.hub
            .publish_state(snapshot.clone(), origin.exclude_role());
        snapshot
    }

    /// Return score, wave, boost, spawns and health to their defaults.
    /// Status is left alone; death does not stop the session.
    fn reset_record(&mut self) {
        self.health = MAX_HEALTH;
        self.score = 0;
        self.wave = 1;
        self.boost = None;
        self.pending_spawns.clear();
    }

    /// Start a boost, or extend the active one.
    ///
    /// An unexpired boost keeps its expiry base: the new duration is added
    /// onto the current `expires_at`, while the percentage is replaced by
    /// the new request's value. A reward in progress is never interrupted.
    pub fn apply_boost(
        &mut self,
        percent: u32,
        duration: Duration,
        now: Instant,
        origin: Origin,
    ) -> SessionSnapshot {
        match self.active_boost(now) {
            Some(active) => {
                self.boost = Some(BoostState {
                    percent,
                    expires_at: active.expires_at + duration,
                });
                debug!(percent, ?duration, "boost extended");
            }
            None => {
                self.boost = Some(BoostState {
                    percent,
                    expires_at: now + duration,
                });
                debug!(percent, ?duration, "boost started");
            }
        }
        self.commit(now, origin)
    }

    /// Restore health, clamped to [`MAX_HEALTH`].
    pub fn apply_heal(&mut self, amount: u32, now: Instant, origin: Origin) -> SessionSnapshot {
        let healed = u32::from(self.health).saturating_add(amount);
        self.health = healed.min(u32::from(MAX_HEALTH)) as u8;
        debug!(amount, health = self.health, "heal applied");
        self.commit(now, origin)
    }

    /// Subtract health; hitting zero performs the full reset transition
    /// within the same call.
    pub fn apply_damage(&mut self, delta: u32, now: Instant, origin: Origin) -> SessionSnapshot {
        if delta >= u32::from(self.health) {
            info!(delta, "health depleted, resetting session");
            self.reset_record();
        } else {
            self.health -= delta as u8;
        }
        self.commit(now, origin)
    }

    /// Append a spawn for the game client to perform.
    pub fn add_pending_spawn(
        &mut self,
        enemy_type: CompactString,
        actor_name: CompactString,
        source_event_id: Uuid,
        now: Instant,
        origin: Origin,
    ) -> Result<SessionSnapshot, ProcessError> {
        if self.pending_spawns.len() >= self.spawn_backlog_cap {
            return Err(ProcessError::SpawnBacklogFull {
                cap: self.spawn_backlog_cap,
            });
        }
        self.pending_spawns.push(PendingSpawn {
            spawn_id: Uuid::new_v4(),
            enemy_type,
            actor_name,
            source_event_id,
            created_at: unix_now_ms(),
        });
        Ok(self.commit(now, origin))
    }

    /// Remove a spawn the game client reported as handled. Idempotent:
    /// removing an unknown id is a no-op and publishes nothing.
    pub fn remove_spawn(&mut self, spawn_id: Uuid, now: Instant, origin: Origin) -> bool {
        let before = self.pending_spawns.len();
        self.pending_spawns.retain(|s| s.spawn_id != spawn_id);
        if self.pending_spawns.len() == before {
            return false;
        }
        self.commit(now, origin);
        true
    }

    /// Admin-triggered equivalent of the death-reset transition.
    pub fn reset_session(&mut self, now: Instant, origin: Origin) -> SessionSnapshot {
        info!("session reset");
        self.reset_record();
        self.commit(now, origin)
    }

    /// Merge a play-client state report through clamped setters.
    ///
    /// Health is clamped to the scale and a reported zero takes the same
    /// death-reset path as pipeline damage. Wave is floored at 1.
    pub fn merge_client_report(
        &mut self,
        health: u32,
        score: u64,
        wave: u32,
        now: Instant,
    ) -> SessionSnapshot {
        self.score = score;
        self.wave = wave.max(1);
        if health == 0 {
            info!("client reported zero health, resetting session");
            self.reset_record();
        } else {
            self.health = health.min(u32::from(MAX_HEALTH)) as u8;
        }
        self.commit(now, Origin::PlayClient)
    }

    pub fn pause(&mut self, now: Instant, origin: Origin) -> SessionSnapshot {
        if self.status == SessionStatus::Running {
            info!("session paused");
            self.status = SessionStatus::Paused;
        }
        self.commit(now, origin)
    }

    pub fn resume(&mut self, now: Instant, origin: Origin) -> SessionSnapshot {
        if self.status == SessionStatus::Paused {
            info!("session resumed");
            self.status = SessionStatus::Running;
        }
        self.commit(now, origin)
    }

    pub fn stop(&mut self, now: Instant, origin: Origin) -> SessionSnapshot {
        if self.status != SessionStatus::Stopped {
            info!("session stopped");
            self.status = SessionStatus::Stopped;
        }
        self.commit(now, origin)
    }

    /// Reinitialize to defaults and run. From any status.
    pub fn start(&mut self, now: Instant, origin: Origin) -> SessionSnapshot {
        info!("session started");
        self.reset_record();
        self.status = SessionStatus::Running;
        self.commit(now, origin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{hub_command_channel, HubCommand, HubCommandReceiver};

    fn new_machine() -> (SessionMachine, HubCommandReceiver, Instant) {
        let (tx, rx) = hub_command_channel();
        let machine = SessionMachine::new(8, HubHandle::new(tx));
        (machine, rx, Instant::now())
    }

    fn assert_reset_snapshot(snapshot: &SessionSnapshot) {
        assert_eq!(snapshot.health, 100);
        assert_eq!(snapshot.score, 0);
        assert_eq!(snapshot.wave, 1);
        assert!(!snapshot.boost.active);
        assert!(snapshot.pending_spawns.is_empty());
    }

    #[test]
    fn heal_clamps_at_the_ceiling() {
        let (mut machine, _rx, now) = new_machine();
        machine.apply_damage(20, now, Origin::Pipeline);
        let snapshot = machine.apply_heal(25, now, Origin::Pipeline);
        assert_eq!(snapshot.health, 100);
    }

    #[test]
    fn boost_extension_adds_duration_and_replaces_percent() {
        let (mut machine, _rx, now) = new_machine();

        let first = machine.apply_boost(50, Duration::from_secs(600), now, Origin::Pipeline);
        assert_eq!(first.boost.percent, 50);
        assert_eq!(first.boost.seconds_remaining, 600);

        // Second boost lands 100s in; durations add onto the original
        // expiry, the later percent wins.
        let later = now + Duration::from_secs(100);
        let second =
            machine.apply_boost(100, Duration::from_secs(300), later, Origin::Pipeline);
        assert_eq!(second.boost.percent, 100);
        assert_eq!(second.boost.seconds_remaining, 800);
        assert_eq!(second.effective_attack, 40.0);
    }

    #[test]
    fn expired_boost_starts_fresh() {
        let (mut machine, _rx, now) = new_machine();
        machine.apply_boost(50, Duration::from_secs(10), now, Origin::Pipeline);

        let later = now + Duration::from_secs(11);
        let snapshot = machine.apply_boost(30, Duration::from_secs(60), later, Origin::Pipeline);
        assert_eq!(snapshot.boost.percent, 30);
        assert_eq!(snapshot.boost.seconds_remaining, 60);
    }

    #[test]
    fn effective_attack_stays_within_bounds() {
        let (mut machine, _rx, now) = new_machine();
        assert_eq!(machine.snapshot(now).effective_attack, 20.0);

        machine.apply_boost(500, Duration::from_secs(60), now, Origin::Pipeline);
        assert_eq!(machine.snapshot(now).effective_attack, 120.0);

        let expired = now + Duration::from_secs(61);
        assert_eq!(machine.snapshot(expired).effective_attack, 20.0);
    }

    #[test]
    fn death_reset_is_identical_regardless_of_path() {
        // Path one: damage in one hit.
        let (mut machine, _rx, now) = new_machine();
        machine.apply_heal(0, now, Origin::Pipeline);
        machine.apply_boost(50, Duration::from_secs(600), now, Origin::Pipeline);
        let by_damage = machine.apply_damage(100, now, Origin::Pipeline);
        assert_reset_snapshot(&by_damage);

        // Path two: chip damage with spawns and score on the board.
        let (mut machine, _rx, now) = new_machine();
        let _ = machine.add_pending_spawn(
            "goblin".into(),
            "Viewer".into(),
            Uuid::new_v4(),
            now,
            Origin::Pipeline,
        );
        machine.merge_client_report(40, 9000, 4, now);
        let by_chip = machine.apply_damage(40, now, Origin::Pipeline);
        assert_reset_snapshot(&by_chip);

        // Path three: client reports zero health.
        let (mut machine, _rx, now) = new_machine();
        machine.merge_client_report(0, 500, 2, now);
        assert_reset_snapshot(&machine.snapshot(now));
    }

    #[test]
    fn damage_never_underflows() {
        let (mut machine, _rx, now) = new_machine();
        let snapshot = machine.apply_damage(40, now, Origin::Pipeline);
        assert_eq!(snapshot.health, 60);
        let snapshot = machine.apply_damage(1_000_000, now, Origin::Pipeline);
        assert_eq!(snapshot.health, 100); // reset refill
    }

    #[test]
    fn spawn_backlog_is_capped() {
        let (mut machine, _rx, now) = new_machine();
        for _ in 0..8 {
            assert!(machine
                .add_pending_spawn(
                    "goblin".into(),
                    "Viewer".into(),
                    Uuid::new_v4(),
                    now,
                    Origin::Pipeline,
                )
                .is_ok());
        }
        let overflow = machine.add_pending_spawn(
            "goblin".into(),
            "Viewer".into(),
            Uuid::new_v4(),
            now,
            Origin::Pipeline,
        );
        assert!(matches!(
            overflow,
            Err(ProcessError::SpawnBacklogFull { cap: 8 })
        ));
    }

    #[test]
    fn remove_spawn_is_idempotent() {
        let (mut machine, _rx, now) = new_machine();
        let snapshot = match machine.add_pending_spawn(
            "goblin".into(),
            "Viewer".into(),
            Uuid::new_v4(),
            now,
            Origin::PlayClient,
        ) {
            Ok(s) => s,
            Err(e) => unreachable!("backlog cannot be full: {e}"),
        };
        let spawn_id = snapshot.pending_spawns[0].spawn_id;

        assert!(machine.remove_spawn(spawn_id, now, Origin::PlayClient));
        assert!(!machine.remove_spawn(spawn_id, now, Origin::PlayClient));
    }

    #[test]
    fn pause_and_resume_leave_the_record_alone() {
        let (mut machine, _rx, now) = new_machine();
        machine.apply_heal(0, now, Origin::Pipeline);
        machine.merge_client_report(70, 1234, 3, now);

        let paused = machine.pause(now, Origin::Admin);
        assert_eq!(paused.status, SessionStatus::Paused);
        assert_eq!(paused.health, 70);
        assert_eq!(paused.score, 1234);

        let resumed = machine.resume(now, Origin::Admin);
        assert_eq!(resumed.status, SessionStatus::Running);
        assert_eq!(resumed.score, 1234);
    }

    #[test]
    fn start_from_stopped_reinitializes() {
        let (mut machine, _rx, now) = new_machine();
        machine.merge_client_report(55, 42, 2, now);
        machine.stop(now, Origin::Admin);

        let started = machine.start(now, Origin::Admin);
        assert_eq!(started.status, SessionStatus::Running);
        assert_reset_snapshot(&started);
    }

    #[test]
    fn client_report_mutations_exclude_the_play_client() {
        let (mut machine, mut rx, now) = new_machine();
        machine.merge_client_report(90, 100, 1, now);

        match rx.try_recv() {
            Ok(HubCommand::Publish { exclude_role, .. }) => {
                assert_eq!(exclude_role, Some(Role::PlayClient));
            }
            other => unreachable!("expected a publish, got {other:?}"),
        }
    }

    #[test]
    fn pipeline_mutations_reach_every_role() {
        let (mut machine, mut rx, now) = new_machine();
        machine.apply_heal(5, now, Origin::Pipeline);

        match rx.try_recv() {
            Ok(HubCommand::Publish { exclude_role, .. }) => {
                assert_eq!(exclude_role, None);
            }
            other => unreachable!("expected a publish, got {other:?}"),
        }
    }
}
