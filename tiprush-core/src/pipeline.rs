//! The donation pipeline task.
//!
//! One task owns the admission gate, the event queue, the session machine
//! and the most-recent donation summary; every mutation of those happens
//! here, on this single logical thread. The boundary talks to it through
//! [`PipelineHandle`] over a bounded command channel.
//!
//! Three independent timers run alongside the command stream:
//!
//! - the process tick drains at most one queued event per period;
//! - the overlay tick pushes a display projection so silent stretches
//!   still refresh overlays;
//! - the sweep tick purges idle per-actor rate windows.

use thiserror::Error;
use tokio::sync::{oneshot, watch};
use tokio::time::{Instant, MissedTickBehavior, interval};
use tracing::{debug, error, info};
use uuid::Uuid;

use tiprush_sdk::objects::{
    DonationRequest, DonationSummary, OverlayUpdate, Role, ServerMessage, SessionSnapshot,
};

use crate::admission::AdmissionGate;
use crate::config::{CooldownConfig, PipelineConfig, RateLimiterConfig};
use crate::donation::{DonationEvent, EffectParams};
use crate::events::{
    ControlAction, PipelineCommand, PipelineCommandReceiver, PipelineCommandSender, PipelineStats,
    SubmitOutcome,
};
use crate::hub::HubHandle;
use crate::queue::EventQueue;
use crate::session::{Origin, ProcessError, SessionMachine};
use crate::utils::unix_now_ms;

/// The pipeline task is gone; the server is shutting down.
#[derive(Debug, Error)]
#[error("pipeline unavailable")]
pub struct PipelineClosed;

/// Owns the whole donation path from admission to broadcast.
pub struct DonationPipeline {
    gate: AdmissionGate,
    queue: EventQueue,
    machine: SessionMachine,
    hub: HubHandle,
    config: PipelineConfig,
    last_donation: Option<DonationSummary>,
}

impl DonationPipeline {
    pub fn new(
        gate: AdmissionGate,
        queue: EventQueue,
        machine: SessionMachine,
        hub: HubHandle,
        config: PipelineConfig,
    ) -> Self {
        Self {
            gate,
            queue,
            machine,
            hub,
            config,
            last_donation: None,
        }
    }

    /// Run the pipeline until shutdown is signaled.
    pub async fn run(
        mut self,
        mut shutdown_rx: watch::Receiver<bool>,
        mut command_rx: PipelineCommandReceiver,
    ) {
        let mut process = interval(self.config.process_interval);
        let mut overlay = interval(self.config.overlay_interval);
        let mut sweep = interval(self.config.sweep_interval);
        // At most one in-flight application; a tick that would overlap a
        // slow predecessor is skipped, not queued up.
        process.set_missed_tick_behavior(MissedTickBehavior::Skip);
        overlay.set_missed_tick_behavior(MissedTickBehavior::Skip);
        sweep.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!("DonationPipeline started");

        loop {
            tokio::select! {
                biased;

                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        info!("DonationPipeline received shutdown signal");
                        break;
                    }
                }

                Some(command) = command_rx.recv() => {
                    self.handle_command(command, Instant::now());
                }

                _ = process.tick() => {
                    self.process_one(Instant::now());
                }

                _ = overlay.tick() => {
                    self.publish_overlay(Instant::now());
                }

                _ = sweep.tick() => {
                    let purged = self.gate.sweep(Instant::now());
                    if purged > 0 {
                        debug!(purged, "purged idle rate windows");
                    }
                }

                else => {
                    info!("Pipeline command channel closed");
                    break;
                }
            }
        }

        info!("DonationPipeline shutdown complete");
    }

    fn handle_command(&mut self, command: PipelineCommand, now: Instant) {
        match command {
            PipelineCommand::SubmitDonation { request, reply } => {
                let outcome = self.submit(request, now);
                let _ = reply.send(outcome);
            }
            PipelineCommand::ClientReport {
                health,
                score,
                wave,
            } => {
                self.machine.merge_client_report(health, score, wave, now);
            }
            PipelineCommand::GameOver {
                final_score,
                final_wave,
            } => {
                info!(final_score, final_wave, "game over reported");
                self.machine.reset_session(now, Origin::PlayClient);
            }
            PipelineCommand::SpawnHandled { spawn_id } => {
                if !self.machine.remove_spawn(spawn_id, now, Origin::PlayClient) {
                    debug!(%spawn_id, "spawn_handled for unknown spawn, ignoring");
                }
            }
            PipelineCommand::Control { action, reply } => {
                let snapshot = self.handle_control(action, now);
                let _ = reply.send(snapshot);
            }
            PipelineCommand::CancelQueued { event_id, reply } => {
                let removed = self.queue.remove_by_id(event_id);
                if removed {
                    info!(%event_id, "queued event canceled");
                }
                let _ = reply.send(removed);
            }
            PipelineCommand::Stats { reply } => {
                let _ = reply.send(self.stats(now));
            }
            PipelineCommand::ReloadLimits { rate, cooldowns } => {
                self.gate.reconfigure(rate, cooldowns);
                info!("admission limits reloaded");
            }
        }
    }

    /// Validate, gate, and queue one donation. The whole path is
    /// synchronous: no other admission can interleave between the check
    /// and the recording.
    fn submit(&mut self, request: DonationRequest, now: Instant) -> SubmitOutcome {
        let event = match DonationEvent::from_request(request, now) {
            Ok(event) => event,
            Err(e) => {
                debug!(error = %e, "donation failed validation");
                return SubmitOutcome::Invalid(e);
            }
        };

        if let Err(rejection) = self.gate.try_admit(event.kind, &event.actor_id, now) {
            debug!(
                event_id = %event.id,
                actor = %event.actor_id,
                reason = %rejection.reason,
                retry_after_ms = rejection.retry_after.as_millis() as u64,
                "donation rejected at admission"
            );
            return SubmitOutcome::Rejected(rejection);
        }

        let event_id = event.id;
        debug!(
            %event_id,
            kind = %event.kind,
            actor = %event.actor_id,
            queued = self.queue.len() + 1,
            "donation admitted"
        );
        self.queue.enqueue(event);
        SubmitOutcome::Accepted { event_id }
    }

    /// One process tick: dequeue at most one event and apply its effect.
    ///
    /// Effects only land on a running session; while paused or stopped the
    /// queue simply holds.
    fn process_one(&mut self, now: Instant) {
        if !self.machine.is_running() {
            return;
        }
        let Some(event) = self.queue.dequeue() else {
            return;
        };

        match self.apply_effect(&event, now) {
            Ok(_) => {
                self.last_donation = Some(DonationSummary {
                    actor_name: event.actor_name.clone(),
                    amount_minor_units: event.amount_minor_units,
                    kind: event.kind,
                    received_at: unix_now_ms(),
                });
                self.hub.publish(
                    ServerMessage::DonationEvent {
                        donation: event.to_view(),
                    },
                    None,
                );
            }
            Err(e) => {
                error!(
                    event_id = %event.id,
                    kind = %event.kind,
                    error = %e,
                    outcome = "processing_failed",
                    "dropping donation event"
                );
            }
        }
    }

    fn apply_effect(
        &mut self,
        event: &DonationEvent,
        now: Instant,
    ) -> Result<SessionSnapshot, ProcessError> {
        match &event.effect {
            EffectParams::Boost { percent, duration } => {
                Ok(self
                    .machine
                    .apply_boost(*percent, *duration, now, Origin::Pipeline))
            }
            EffectParams::Heal { amount } => {
                Ok(self.machine.apply_heal(*amount, now, Origin::Pipeline))
            }
            EffectParams::Spawn { enemy_type } => self.machine.add_pending_spawn(
                enemy_type.clone(),
                event.actor_name.clone(),
                event.id,
                now,
                Origin::Pipeline,
            ),
        }
    }

    /// Push the display projection to overlay-class subscribers.
    fn publish_overlay(&mut self, now: Instant) {
        let snapshot = self.machine.snapshot(now);
        let overlay = OverlayUpdate {
            score: snapshot.score,
            wave: snapshot.wave,
            health: snapshot.health,
            boost_active: snapshot.boost.active,
            boost_seconds_remaining: snapshot.boost.seconds_remaining,
            last_donation: self.last_donation.clone(),
        };
        self.hub.publish(
            ServerMessage::OverlayUpdate { overlay },
            Some(Role::PlayClient),
        );
    }

    fn handle_control(&mut self, action: ControlAction, now: Instant) -> SessionSnapshot {
        match action {
            ControlAction::Start => self.machine.start(now, Origin::Admin),
            ControlAction::Stop => self.machine.stop(now, Origin::Admin),
            ControlAction::Pause => self.machine.pause(now, Origin::Admin),
            ControlAction::Resume => self.machine.resume(now, Origin::Admin),
            ControlAction::Reset => {
                let dropped = self.queue.len();
                self.queue.clear();
                self.gate.reset_cooldowns();
                if dropped > 0 {
                    info!(dropped, "dropped queued events on admin reset");
                }
                self.machine.reset_session(now, Origin::Admin)
            }
        }
    }

    fn stats(&self, now: Instant) -> PipelineStats {
        PipelineStats {
            session: self.machine.snapshot(now),
            queue_length: self.queue.len(),
            cooldowns: self.gate.cooldown_statuses(now),
            rate: self.gate.rate_status(now),
        }
    }
}

/// Cloneable handle for the server boundary.
#[derive(Clone)]
pub struct PipelineHandle {
    command_tx: PipelineCommandSender,
}

impl PipelineHandle {
    pub fn new(command_tx: PipelineCommandSender) -> Self {
        Self { command_tx }
    }

    /// Submit a donation and wait for the admission outcome.
    pub async fn submit_donation(
        &self,
        request: DonationRequest,
    ) -> Result<SubmitOutcome, PipelineClosed> {
        let (reply, rx) = oneshot::channel();
        self.command_tx
            .send(PipelineCommand::SubmitDonation { request, reply })
            .await
            .map_err(|_| PipelineClosed)?;
        rx.await.map_err(|_| PipelineClosed)
    }

    pub async fn client_report(
        &self,
        health: u32,
        score: u64,
        wave: u32,
    ) -> Result<(), PipelineClosed> {
        self.command_tx
            .send(PipelineCommand::ClientReport {
                health,
                score,
                wave,
            })
            .await
            .map_err(|_| PipelineClosed)
    }

    pub async fn game_over(&self, final_score: u64, final_wave: u32) -> Result<(), PipelineClosed> {
        self.command_tx
            .send(PipelineCommand::GameOver {
                final_score,
                final_wave,
            })
            .await
            .map_err(|_| PipelineClosed)
    }

    pub async fn spawn_handled(&self, spawn_id: Uuid) -> Result<(), PipelineClosed> {
        self.command_tx
            .send(PipelineCommand::SpawnHandled { spawn_id })
            .await
            .map_err(|_| PipelineClosed)
    }

    /// Run a session control operation and wait for the resulting snapshot.
    pub async fn control(&self, action: ControlAction) -> Result<SessionSnapshot, PipelineClosed> {
        let (reply, rx) = oneshot::channel();
        self.command_tx
            .send(PipelineCommand::Control { action, reply })
            .await
            .map_err(|_| PipelineClosed)?;
        rx.await.map_err(|_| PipelineClosed)
    }

    pub async fn cancel_queued(&self, event_id: Uuid) -> Result<bool, PipelineClosed> {
        let (reply, rx) = oneshot::channel();
        self.command_tx
            .send(PipelineCommand::CancelQueued { event_id, reply })
            .await
            .map_err(|_| PipelineClosed)?;
        rx.await.map_err(|_| PipelineClosed)
    }

    pub async fn stats(&self) -> Result<PipelineStats, PipelineClosed> {
        let (reply, rx) = oneshot::channel();
        self.command_tx
            .send(PipelineCommand::Stats { reply })
            .await
            .map_err(|_| PipelineClosed)?;
        rx.await.map_err(|_| PipelineClosed)
    }

    pub async fn reload_limits(
        &self,
        rate: RateLimiterConfig,
        cooldowns: CooldownConfig,
    ) -> Result<(), PipelineClosed> {
        self.command_tx
            .send(PipelineCommand::ReloadLimits { rate, cooldowns })
            .await
            .map_err(|_| PipelineClosed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::admission::{CooldownTracker, RateLimiter};
    use crate::events::{HubCommandReceiver, hub_command_channel};
    use tiprush_sdk::objects::{DonationKind, DonationParameters, RejectReason};

    fn request(actor: &str, kind: DonationKind, parameters: DonationParameters) -> DonationRequest {
        DonationRequest {
            id: Uuid::new_v4(),
            actor_id: actor.into(),
            actor_name: actor.into(),
            amount_minor_units: 250,
            kind,
            parameters,
        }
    }

    fn heal_request(actor: &str, amount: u32) -> DonationRequest {
        request(
            actor,
            DonationKind::Heal,
            DonationParameters {
                heal_amount: Some(amount),
                ..Default::default()
            },
        )
    }

    fn pipeline() -> (DonationPipeline, HubCommandReceiver, Instant) {
        let now = Instant::now();
        let (hub_tx, hub_rx) = hub_command_channel();
        let hub = HubHandle::new(hub_tx);
        let gate = AdmissionGate::new(
            RateLimiter::new(RateLimiterConfig::default(), now),
            CooldownTracker::new(CooldownConfig::default()),
        );
        let machine = SessionMachine::new(PipelineConfig::default().spawn_backlog_cap, hub.clone());
        let pipeline = DonationPipeline::new(
            gate,
            EventQueue::new(),
            machine,
            hub,
            PipelineConfig::default(),
        );
        (pipeline, hub_rx, now)
    }

    fn drain(rx: &mut HubCommandReceiver) -> Vec<crate::events::HubCommand> {
        let mut commands = Vec::new();
        while let Ok(command) = rx.try_recv() {
            commands.push(command);
        }
        commands
    }

    #[tokio::test]
    async fn heal_is_admitted_applied_and_broadcast_once() {
        let (mut pipeline, mut hub_rx, now) = pipeline();

        // Bring health to 80 first.
        pipeline.machine.apply_damage(20, now, Origin::Pipeline);
        drain(&mut hub_rx);

        let outcome = pipeline.submit(heal_request("alice", 25), now);
        assert!(matches!(outcome, SubmitOutcome::Accepted { .. }));

        pipeline.process_one(now);
        assert_eq!(pipeline.machine.snapshot(now).health, 100);
        assert!(pipeline.queue.is_empty());

        let published = drain(&mut hub_rx);
        let gamestate_updates = published
            .iter()
            .filter(|c| {
                matches!(
                    c,
                    crate::events::HubCommand::Publish {
                        message: ServerMessage::GamestateUpdate { .. },
                        ..
                    }
                )
            })
            .count();
        let donation_events = published
            .iter()
            .filter(|c| {
                matches!(
                    c,
                    crate::events::HubCommand::Publish {
                        message: ServerMessage::DonationEvent { .. },
                        ..
                    }
                )
            })
            .count();
        assert_eq!(gamestate_updates, 1);
        assert_eq!(donation_events, 1);
    }

    #[tokio::test]
    async fn over_limit_actor_is_rejected_with_rate_limited() {
        let (mut pipeline, _hub_rx, now) = pipeline();
        let per_actor = RateLimiterConfig::default().per_actor_max;

        for _ in 0..per_actor {
            let outcome = pipeline.submit(heal_request("alice", 5), now);
            assert!(matches!(outcome, SubmitOutcome::Accepted { .. }));
            // Heals share a cooldown; clear it so only the rate limit acts.
            pipeline.gate.reset_cooldowns();
        }

        let outcome = pipeline.submit(heal_request("alice", 5), now);
        assert!(matches!(
            outcome,
            SubmitOutcome::Rejected(rejection)
                if rejection.reason == RejectReason::RateLimited
        ));
    }

    #[tokio::test]
    async fn dragon_spawns_are_serialized_by_cooldown() {
        let (mut pipeline, _hub_rx, now) = pipeline();

        let first = pipeline.submit(
            request("a", DonationKind::SpawnDragon, DonationParameters::default()),
            now,
        );
        assert!(matches!(first, SubmitOutcome::Accepted { .. }));

        let second = pipeline.submit(
            request("b", DonationKind::SpawnDragon, DonationParameters::default()),
            now,
        );
        assert!(matches!(
            second,
            SubmitOutcome::Rejected(rejection)
                if rejection.reason == RejectReason::OnCooldown
        ));

        let after = now + CooldownConfig::default().spawn_dragon;
        let third = pipeline.submit(
            request("c", DonationKind::SpawnDragon, DonationParameters::default()),
            after,
        );
        assert!(matches!(third, SubmitOutcome::Accepted { .. }));
    }

    #[tokio::test]
    async fn malformed_donation_never_reaches_the_queue() {
        let (mut pipeline, _hub_rx, now) = pipeline();
        let outcome = pipeline.submit(
            request("a", DonationKind::Boost, DonationParameters::default()),
            now,
        );
        assert!(matches!(outcome, SubmitOutcome::Invalid(_)));
        assert!(pipeline.queue.is_empty());
    }

    #[tokio::test]
    async fn paused_session_holds_the_queue() {
        let (mut pipeline, _hub_rx, now) = pipeline();
        pipeline.machine.pause(now, Origin::Admin);

        let outcome = pipeline.submit(heal_request("alice", 10), now);
        assert!(matches!(outcome, SubmitOutcome::Accepted { .. }));

        pipeline.process_one(now);
        assert_eq!(pipeline.queue.len(), 1);

        pipeline.machine.resume(now, Origin::Admin);
        pipeline.process_one(now);
        assert!(pipeline.queue.is_empty());
    }

    #[tokio::test]
    async fn admin_reset_clears_queue_and_cooldowns() {
        let (mut pipeline, _hub_rx, now) = pipeline();

        let admitted = pipeline.submit(
            request("a", DonationKind::SpawnDragon, DonationParameters::default()),
            now,
        );
        assert!(matches!(admitted, SubmitOutcome::Accepted { .. }));
        assert_eq!(pipeline.queue.len(), 1);

        pipeline.handle_control(ControlAction::Reset, now);
        assert!(pipeline.queue.is_empty());

        // Dragon cooldown is gone after the reset.
        let readmitted = pipeline.submit(
            request("b", DonationKind::SpawnDragon, DonationParameters::default()),
            now,
        );
        assert!(matches!(readmitted, SubmitOutcome::Accepted { .. }));
    }

    #[tokio::test]
    async fn failed_effect_is_dropped_and_loop_continues() {
        let now = Instant::now();
        let (hub_tx, mut hub_rx) = hub_command_channel();
        let hub = HubHandle::new(hub_tx);
        let gate = AdmissionGate::new(
            RateLimiter::new(RateLimiterConfig::default(), now),
            CooldownTracker::new(CooldownConfig::default()),
        );
        // Cap of 1 so the second spawn overflows.
        let machine = SessionMachine::new(1, hub.clone());
        let mut pipeline = DonationPipeline::new(
            gate,
            EventQueue::new(),
            machine,
            hub,
            PipelineConfig::default(),
        );

        let first = pipeline.submit(
            request(
                "a",
                DonationKind::SpawnEnemy,
                DonationParameters {
                    enemy_type: Some("goblin".into()),
                    ..Default::default()
                },
            ),
            now,
        );
        assert!(matches!(first, SubmitOutcome::Accepted { .. }));
        pipeline.process_one(now);

        pipeline.gate.reset_cooldowns();
        let after = now + std::time::Duration::from_secs(1);
        let second = pipeline.submit(
            request(
                "b",
                DonationKind::SpawnEnemy,
                DonationParameters {
                    enemy_type: Some("ogre".into()),
                    ..Default::default()
                },
            ),
            after,
        );
        assert!(matches!(second, SubmitOutcome::Accepted { .. }));

        drain(&mut hub_rx);
        pipeline.process_one(after);

        // The overflowing spawn was dropped: no broadcast, backlog still 1.
        assert!(drain(&mut hub_rx).is_empty());
        assert_eq!(pipeline.machine.snapshot(after).pending_spawns.len(), 1);

        // Later events keep flowing.
        let heal = pipeline.submit(heal_request("c", 5), after);
        assert!(matches!(heal, SubmitOutcome::Accepted { .. }));
        pipeline.process_one(after);
        assert!(pipeline.queue.is_empty());
    }

    #[tokio::test]
    async fn cancel_removes_a_queued_event() {
        let (mut pipeline, _hub_rx, now) = pipeline();
        let outcome = pipeline.submit(heal_request("alice", 10), now);
        let event_id = match outcome {
            SubmitOutcome::Accepted { event_id } => event_id,
            other => unreachable!("expected accepted, got {other:?}"),
        };

        assert!(pipeline.queue.remove_by_id(event_id));
        pipeline.process_one(now);
        assert_eq!(pipeline.machine.snapshot(now).health, 100);
    }

    #[tokio::test]
    async fn overlay_projection_excludes_the_play_client() {
        let (mut pipeline, mut hub_rx, now) = pipeline();
        pipeline.publish_overlay(now);

        match hub_rx.try_recv() {
            Ok(crate::events::HubCommand::Publish {
                message: ServerMessage::OverlayUpdate { .. },
                exclude_role,
            }) => assert_eq!(exclude_role, Some(Role::PlayClient)),
            other => unreachable!("expected overlay publish, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn stats_reflect_queue_and_windows() {
        let (mut pipeline, _hub_rx, now) = pipeline();
        let _ = pipeline.submit(heal_request("alice", 10), now);

        let stats = pipeline.stats(now);
        assert_eq!(stats.queue_length, 1);
        assert_eq!(stats.rate.global_count, 1);
        assert!(stats.cooldowns.iter().any(|c| !c.ready));
    }
}
