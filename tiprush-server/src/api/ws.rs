//! Subscriber WebSocket endpoint.
//!
//! `GET /ws` upgrades the connection and registers it with the broadcast
//! hub. Outbound frames arrive over the subscriber's frame channel and are
//! forwarded onto the socket; inbound messages are dispatched to the hub
//! (identify, heartbeats) or the pipeline (play-client reports).
//!
//! Play-client-only messages are dropped until the connection has
//! identified itself as `play_client`: delivery is fail-open for unknown
//! roles, effects are not.

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use uuid::Uuid;

use tiprush_core::events::{OutboundFrame, frame_channel};
use tiprush_sdk::objects::{ClientMessage, Role, ServerMessage};

use crate::state::AppState;

/// `GET /ws` — subscriber WebSocket stream.
pub async fn subscriber_ws(state: State<AppState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    let app_state = state.0.clone();
    ws.on_upgrade(move |socket| handle_subscriber_ws(socket, app_state))
}

/// Background task that drives a single subscriber connection.
async fn handle_subscriber_ws(mut socket: WebSocket, state: AppState) {
    let subscriber_id = Uuid::new_v4();
    let (frame_tx, mut frame_rx) = frame_channel();
    state.hub.register(subscriber_id, frame_tx);
    tracing::debug!(subscriber = %subscriber_id, "WS: subscriber connected");

    // Role as this connection has declared it. The hub keeps its own copy
    // for broadcast filtering; this one gates inbound effects.
    let mut role = Role::Unknown;

    loop {
        tokio::select! {
            frame = frame_rx.recv() => {
                match frame {
                    Some(OutboundFrame::Text(json)) => {
                        let text = json.as_ref().to_owned();
                        if socket.send(Message::Text(text.into())).await.is_err() {
                            break;
                        }
                    }
                    Some(OutboundFrame::Ping) => {
                        if socket.send(Message::Ping(Default::default())).await.is_err() {
                            break;
                        }
                    }
                    // The hub evicted this subscriber.
                    None => break,
                }
            }

            message = socket.recv() => {
                match message {
                    Some(Ok(Message::Text(text))) => {
                        if handle_client_message(
                            &state,
                            subscriber_id,
                            &mut role,
                            &mut socket,
                            text.as_str(),
                        )
                        .await
                        .is_err()
                        {
                            break;
                        }
                    }
                    Some(Ok(Message::Pong(_))) => {
                        state.hub.heartbeat(subscriber_id);
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(_)) => break,
                }
            }
        }
    }

    state.hub.unregister(subscriber_id);
    tracing::debug!(subscriber = %subscriber_id, "WS: subscriber disconnected");
}

/// Dispatch one inbound text frame.
///
/// Returns `Err(())` when the connection should close (pipeline gone or
/// socket write failed). Unparseable frames are logged and skipped.
async fn handle_client_message(
    state: &AppState,
    subscriber_id: Uuid,
    role: &mut Role,
    socket: &mut WebSocket,
    text: &str,
) -> Result<(), ()> {
    let message: ClientMessage = match serde_json::from_str(text) {
        Ok(message) => message,
        Err(e) => {
            tracing::debug!(
                subscriber = %subscriber_id,
                error = %e,
                "WS: ignoring unparseable frame"
            );
            return Ok(());
        }
    };

    match message {
        ClientMessage::Identify { role: declared } => {
            tracing::debug!(subscriber = %subscriber_id, ?declared, "WS: identify");
            *role = declared;
            state.hub.identify(subscriber_id, declared);
        }
        ClientMessage::GamestateUpdate {
            health,
            score,
            wave,
        } => {
            if *role != Role::PlayClient {
                tracing::debug!(
                    subscriber = %subscriber_id,
                    "WS: gamestate_update from non-play-client, ignoring"
                );
                return Ok(());
            }
            state
                .pipeline
                .client_report(health, score, wave)
                .await
                .map_err(|_| ())?;
        }
        ClientMessage::GameOver {
            final_score,
            final_wave,
        } => {
            if *role != Role::PlayClient {
                tracing::debug!(
                    subscriber = %subscriber_id,
                    "WS: game_over from non-play-client, ignoring"
                );
                return Ok(());
            }
            state
                .pipeline
                .game_over(final_score, final_wave)
                .await
                .map_err(|_| ())?;
        }
        ClientMessage::SpawnHandled { spawn_id } => {
            if *role != Role::PlayClient {
                return Ok(());
            }
            state.pipeline.spawn_handled(spawn_id).await.map_err(|_| ())?;
        }
        ClientMessage::Ping => {
            state.hub.heartbeat(subscriber_id);
            send_json(socket, &ServerMessage::Pong).await?;
        }
        ClientMessage::Pong => {
            state.hub.heartbeat(subscriber_id);
        }
    }

    Ok(())
}

/// Serialize `value` as JSON and send it as a text WebSocket frame.
///
/// Returns `Err(())` if the send fails (client disconnected).
async fn send_json<T: serde::Serialize>(socket: &mut WebSocket, value: &T) -> Result<(), ()> {
    let json = serde_json::to_string(value).map_err(|_| ())?;
    socket
        .send(Message::Text(json.into()))
        .await
        .map_err(|_| ())
}
