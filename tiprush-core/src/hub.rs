//! Broadcast hub.
//!
//! The hub owns the subscriber registry and the fan-out logic, never the
//! transport itself. The WebSocket boundary registers a frame channel per
//! connection; the hub serializes each published message once and pushes
//! the shared frame to every live, non-excluded subscriber.
//!
//! Writes are `try_send` only: a subscriber whose frame channel is full or
//! closed is marked for removal, and removal is applied after the fan-out
//! iteration completes, never during it. A periodic liveness sweep pings
//! every subscriber and evicts any that have not been seen within the
//! timeout window.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{oneshot, watch};
use tokio::time::{Instant, MissedTickBehavior, interval};
use tracing::{debug, info, warn};
use uuid::Uuid;

use tiprush_sdk::objects::{Role, ServerMessage, SessionSnapshot};

use crate::config::HubConfig;
use crate::events::{FrameSender, HubCommand, HubCommandReceiver, HubCommandSender, OutboundFrame};

/// A connected endpoint as the hub sees it.
struct Subscriber {
    role: Role,
    last_seen_at: Instant,
    frame_tx: FrameSender,
}

/// Subscriber registry and fan-out task.
pub struct BroadcastHub {
    config: HubConfig,
    subscribers: HashMap<Uuid, Subscriber>,
}

impl BroadcastHub {
    pub fn new(config: HubConfig) -> Self {
        Self {
            config,
            subscribers: HashMap::new(),
        }
    }

    /// Run the hub until shutdown is signaled.
    pub async fn run(mut self, mut shutdown_rx: watch::Receiver<bool>, mut command_rx: HubCommandReceiver) {
        let mut sweep = interval(self.config.sweep_interval);
        sweep.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!("BroadcastHub started");

        loop {
            tokio::select! {
                biased;

                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        info!("BroadcastHub received shutdown signal");
                        break;
                    }
                }

                Some(command) = command_rx.recv() => {
                    self.handle_command(command, Instant::now());
                }

                _ = sweep.tick() => {
                    self.sweep(Instant::now());
                }

                else => {
                    info!("Hub command channel closed");
                    break;
                }
            }
        }

        info!("BroadcastHub shutdown complete");
    }

    fn handle_command(&mut self, command: HubCommand, now: Instant) {
        match command {
            HubCommand::Register { id, frame_tx } => self.register(id, frame_tx, now),
            HubCommand::Identify { id, role } => self.identify(id, role, now),
            HubCommand::Unregister { id } => self.unregister(id),
            HubCommand::Heartbeat { id } => self.heartbeat(id, now),
            HubCommand::Publish {
                message,
                exclude_role,
            } => self.publish(&message, exclude_role),
            HubCommand::SubscriberCount { reply } => {
                let _ = reply.send(self.subscribers.len());
            }
        }
    }

    /// Add a subscriber. New connections start as [`Role::Unknown`] and
    /// already receive broadcasts (fail-open for delivery).
    fn register(&mut self, id: Uuid, frame_tx: FrameSender, now: Instant) {
        debug!(subscriber = %id, "subscriber registered");
        self.subscribers.insert(
            id,
            Subscriber {
                role: Role::Unknown,
                last_seen_at: now,
                frame_tx,
            },
        );
    }

    fn identify(&mut self, id: Uuid, role: Role, now: Instant) {
        if let Some(subscriber) = self.subscribers.get_mut(&id) {
            debug!(subscriber = %id, ?role, "subscriber identified");
            subscriber.role = role;
            subscriber.last_seen_at = now;
        }
    }

    fn unregister(&mut self, id: Uuid) {
        if self.subscribers.remove(&id).is_some() {
            debug!(subscriber = %id, "subscriber unregistered");
        }
    }

    fn heartbeat(&mut self, id: Uuid, now: Instant) {
        if let Some(subscriber) = self.subscribers.get_mut(&id) {
            subscriber.last_seen_at = now;
        }
    }

    /// Serialize once and write to every live subscriber whose role is not
    /// excluded. Failed writes mark the subscriber; marked subscribers are
    /// removed after the iteration.
    fn publish(&mut self, message: &ServerMessage, exclude_role: Option<Role>) {
        let json = match serde_json::to_string(message) {
            Ok(json) => json,
            Err(e) => {
                warn!(error = %e, "failed to serialize broadcast message");
                return;
            }
        };
        let frame: Arc<str> = json.into();

        let mut dead = Vec::new();
        for (id, subscriber) in &self.subscribers {
            if exclude_role == Some(subscriber.role) {
                continue;
            }
            if subscriber
                .frame_tx
                .try_send(OutboundFrame::Text(frame.clone()))
                .is_err()
            {
                dead.push(*id);
            }
        }

        for id in dead {
            warn!(subscriber = %id, "dropping unresponsive subscriber");
            self.subscribers.remove(&id);
        }
    }

    /// Liveness sweep: ping everyone, evict the silent.
    fn sweep(&mut self, now: Instant) {
        let timeout = self.config.idle_timeout;
        let mut dead = Vec::new();

        for (id, subscriber) in &self.subscribers {
            if now.saturating_duration_since(subscriber.last_seen_at) >= timeout {
                dead.push(*id);
                continue;
            }
            if subscriber.frame_tx.try_send(OutboundFrame::Ping).is_err() {
                dead.push(*id);
            }
        }

        for id in dead {
            warn!(subscriber = %id, "evicting subscriber after liveness timeout");
            self.subscribers.remove(&id);
        }
    }
}

/// Cloneable handle for talking to the hub task.
///
/// All sends are `try_send`: the pipeline must never block on the hub. A
/// full hub channel drops the command; delivery is best-effort and
/// reconnect-driven resync covers the gap.
#[derive(Clone)]
pub struct HubHandle {
    command_tx: HubCommandSender,
}

impl HubHandle {
    pub fn new(command_tx: HubCommandSender) -> Self {
        Self { command_tx }
    }

    fn send(&self, command: HubCommand) {
        if self.command_tx.try_send(command).is_err() {
            warn!("hub command channel full or closed, dropping command");
        }
    }

    pub fn register(&self, id: Uuid, frame_tx: FrameSender) {
        self.send(HubCommand::Register { id, frame_tx });
    }

    pub fn identify(&self, id: Uuid, role: Role) {
        self.send(HubCommand::Identify { id, role });
    }

    pub fn unregister(&self, id: Uuid) {
        self.send(HubCommand::Unregister { id });
    }

    pub fn heartbeat(&self, id: Uuid) {
        self.send(HubCommand::Heartbeat { id });
    }

    pub fn publish(&self, message: ServerMessage, exclude_role: Option<Role>) {
        self.send(HubCommand::Publish {
            message,
            exclude_role,
        });
    }

    /// Publish an authoritative state snapshot.
    pub fn publish_state(&self, state: SessionSnapshot, exclude_role: Option<Role>) {
        self.publish(ServerMessage::GamestateUpdate { state }, exclude_role);
    }

    /// Number of live subscribers, for the stats endpoint.
    pub async fn subscriber_count(&self) -> usize {
        let (reply, rx) = oneshot::channel();
        if self
            .command_tx
            .send(HubCommand::SubscriberCount { reply })
            .await
            .is_err()
        {
            return 0;
        }
        rx.await.unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::frame_channel;
    use tiprush_sdk::objects::{OverlayUpdate, SessionStatus};

    fn hub() -> BroadcastHub {
        BroadcastHub::new(HubConfig::default())
    }

    fn snapshot() -> SessionSnapshot {
        SessionSnapshot {
            status: SessionStatus::Running,
            health: 100,
            base_attack: 20,
            effective_attack: 20.0,
            score: 0,
            wave: 1,
            boost: tiprush_sdk::objects::BoostView::inactive(),
            pending_spawns: Vec::new(),
            last_updated_at: 0,
        }
    }

    #[tokio::test]
    async fn publish_respects_role_exclusion() {
        let mut hub = hub();
        let now = Instant::now();

        let (play_tx, mut play_rx) = frame_channel();
        let (overlay_tx, mut overlay_rx) = frame_channel();
        let play_id = Uuid::new_v4();
        let overlay_id = Uuid::new_v4();

        hub.register(play_id, play_tx, now);
        hub.register(overlay_id, overlay_tx, now);
        hub.identify(play_id, Role::PlayClient, now);
        hub.identify(overlay_id, Role::Overlay, now);

        hub.publish(
            &ServerMessage::GamestateUpdate { state: snapshot() },
            Some(Role::PlayClient),
        );

        assert!(play_rx.try_recv().is_err());
        assert!(matches!(
            overlay_rx.try_recv(),
            Ok(OutboundFrame::Text(_))
        ));
    }

    #[tokio::test]
    async fn unknown_subscribers_still_receive_broadcasts() {
        let mut hub = hub();
        let now = Instant::now();

        let (tx, mut rx) = frame_channel();
        hub.register(Uuid::new_v4(), tx, now);

        hub.publish(
            &ServerMessage::OverlayUpdate {
                overlay: OverlayUpdate {
                    score: 0,
                    wave: 1,
                    health: 100,
                    boost_active: false,
                    boost_seconds_remaining: 0,
                    last_donation: None,
                },
            },
            Some(Role::PlayClient),
        );

        assert!(matches!(rx.try_recv(), Ok(OutboundFrame::Text(_))));
    }

    #[tokio::test]
    async fn failed_write_evicts_the_subscriber() {
        let mut hub = hub();
        let now = Instant::now();

        let (dead_tx, dead_rx) = frame_channel();
        drop(dead_rx);
        let (live_tx, mut live_rx) = frame_channel();

        hub.register(Uuid::new_v4(), dead_tx, now);
        hub.register(Uuid::new_v4(), live_tx, now);

        hub.publish(&ServerMessage::Pong, None);

        assert_eq!(hub.subscribers.len(), 1);
        assert!(matches!(live_rx.try_recv(), Ok(OutboundFrame::Text(_))));
    }

    #[tokio::test]
    async fn sweep_pings_fresh_and_evicts_silent() {
        let mut hub = hub();
        let now = Instant::now();

        let (fresh_tx, mut fresh_rx) = frame_channel();
        let (silent_tx, _silent_rx) = frame_channel();
        let fresh_id = Uuid::new_v4();
        let silent_id = Uuid::new_v4();

        hub.register(fresh_id, fresh_tx, now);
        hub.register(silent_id, silent_tx, now);

        let past_timeout = now + HubConfig::default().idle_timeout;
        hub.heartbeat(fresh_id, past_timeout);
        hub.sweep(past_timeout);

        assert!(hub.subscribers.contains_key(&fresh_id));
        assert!(!hub.subscribers.contains_key(&silent_id));
        assert!(matches!(fresh_rx.try_recv(), Ok(OutboundFrame::Ping)));
    }
}
