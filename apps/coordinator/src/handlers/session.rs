//! Worker session protocol: the handshake, heartbeat, and frame routing
//! for a single worker's long-lived WebSocket connection.

use crate::services::settlement;
use crate::state::AppState;
use axum::extract::ws::{close_code, CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use gridx_domain_models::{Capabilities, SessionMessage, WorkerStatus};
use std::borrow::Cow;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::{info, instrument, warn};

/// Handshake reply must arrive within this long after the socket opens.
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(30);

/// A single session frame must fit in this many bytes.
const MAX_FRAME_BYTES: usize = 10 * 1024 * 1024;

pub async fn upgrade(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.max_message_size(MAX_FRAME_BYTES)
        .max_frame_size(MAX_FRAME_BYTES)
        .on_upgrade(move |socket| handle_socket(socket, state))
}

fn close_with(code: u16, reason: impl Into<Cow<'static, str>>) -> Message {
    Message::Close(Some(CloseFrame {
        code,
        reason: reason.into(),
    }))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = socket.split();

    let hello = match timeout(HANDSHAKE_TIMEOUT, receiver.next()).await {
        Ok(Some(Ok(Message::Text(text)))) => text,
        _ => {
            let _ = sender.send(close_with(close_code::PROTOCOL, "handshake timeout")).await;
            return;
        }
    };

    let SessionMessage::Hello {
        worker_id,
        owner_id,
        auth_token,
        capabilities,
    } = (match serde_json::from_str::<SessionMessage>(&hello) {
        Ok(msg) => msg,
        Err(_) => {
            let _ = sender.send(close_with(close_code::PROTOCOL, "malformed hello")).await;
            return;
        }
    })
    else {
        let _ = sender.send(close_with(close_code::PROTOCOL, "expected hello")).await;
        return;
    };

    let (resolved_owner, resolved_token) = match authenticate(&state, &worker_id, owner_id, auth_token).await {
        Ok(pair) => pair,
        Err(AuthOutcome::Rejected) => {
            let reply = SessionMessage::AuthError {
                reason: "invalid credential".into(),
            };
            if let Ok(text) = serde_json::to_string(&reply) {
                let _ = sender.send(Message::Text(text)).await;
            }
            let _ = sender.send(close_with(4401, "auth failed")).await;
            return;
        }
    };

    let ip = None;
    if let Err(e) = state
        .workers
        .upsert_connected(
            &worker_id,
            &resolved_owner,
            &resolved_token,
            capabilities.cpu_cores,
            capabilities.gpu,
            capabilities.can_execute,
            ip,
        )
        .await
    {
        warn!(worker_id, error = %e, "failed to persist worker on hello");
        let _ = sender.send(close_with(close_code::ERROR, "store fault")).await;
        return;
    }

    if let Ok(Some(worker)) = state.workers.find(&worker_id).await {
        if worker.restriction.is_restricted() {
            info!(worker_id, restriction = ?worker.restriction, "restricted worker reconnect, closing without ack");
            let _ = sender.send(close_with(4400, "worker restricted")).await;
            return;
        }
    }

    let (tx, mut rx) = mpsc::unbounded_channel::<SessionMessage>();
    let (close_tx, mut close_rx) = mpsc::unbounded_channel::<(u16, String)>();
    state
        .register_worker_session(&worker_id, &resolved_owner, capabilities, tx, close_tx)
        .await;

    if let Ok(text) = serde_json::to_string(&SessionMessage::HelloAck {
        worker_id: worker_id.clone(),
    }) {
        if sender.send(Message::Text(text)).await.is_err() {
            state.unregister_worker_session(&worker_id).await;
            state.mark_worker_offline_durable(&worker_id).await;
            return;
        }
    }
    info!(worker_id, owner = %resolved_owner, "worker session established");
    state.request_dispatch();

    // A single cooperative loop drives both directions of the socket plus
    // an admin-triggered forced close, rather than splitting reader and
    // writer across separate tasks.
    loop {
        tokio::select! {
            frame = receiver.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => {
                        state.touch_worker_last_seen(&worker_id).await;
                        state.workers.touch_heartbeat(&worker_id).await.ok();
                        handle_frame(&state, &worker_id, &text).await;
                    }
                    Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => {
                        state.touch_worker_last_seen(&worker_id).await;
                    }
                    Some(Ok(Message::Binary(_))) => {
                        // The protocol only defines textual frames; binary
                        // frames are silently dropped.
                    }
                    Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                }
            }
            outgoing = rx.recv() => {
                match outgoing {
                    Some(message) => {
                        let Ok(text) = serde_json::to_string(&message) else {
                            continue;
                        };
                        if sender.send(Message::Text(text)).await.is_err() {
                            warn!(worker_id, "send to worker failed");
                            break;
                        }
                    }
                    None => break,
                }
            }
            closing = close_rx.recv() => {
                if let Some((code, reason)) = closing {
                    let _ = sender.send(close_with(code, reason)).await;
                }
                break;
            }
        }
    }

    state.unregister_worker_session(&worker_id).await;
    state.mark_worker_offline_durable(&worker_id).await;
    info!(worker_id, "worker session closed");
    state.request_dispatch();
}

enum AuthOutcome {
    Rejected,
}

/// Implements the four-case hello authentication branch. Returns the
/// resolved owner id and the token to bind on the worker record.
async fn authenticate(
    state: &AppState,
    worker_id: &str,
    owner_id: Option<String>,
    auth_token: Option<String>,
) -> Result<(String, String), AuthOutcome> {
    match (owner_id, auth_token) {
        (Some(owner), Some(token)) => match state.users.find(&owner).await {
            Ok(Some(user)) => {
                if user.credential_token == token {
                    state.users.touch_login(&owner).await.ok();
                    Ok((owner, token))
                } else {
                    Err(AuthOutcome::Rejected)
                }
            }
            Ok(None) => {
                state.users.register(&owner, &token).await.ok();
                state.credits.ensure_user(&owner, state.settings.initial_credits).await.ok();
                Ok((owner, token))
            }
            Err(_) => Err(AuthOutcome::Rejected),
        },
        _ => {
            // Parked under the coordinator's own owner id rather than an
            // empty string, so these workers land in bucket (b) of the
            // dispatcher's selection policy — preferred behind any
            // genuinely third-party worker, but still usable, rather than
            // competing in bucket (a) on equal footing with owned workers.
            warn!(worker_id, "unauthenticated hello accepted in backward-compatible mode");
            Ok((state.settings.coordinator_owner.clone(), String::new()))
        }
    }
}

/// Routes a single inbound frame: `hb` is a pure liveness signal
/// (last-seen already touched by the caller), `job_started`
/// flips the job to `running`, `job_result` settles it, `job_log` is
/// accepted and discarded from durable storage (optionally tailed in
/// the in-memory session record).
#[instrument(skip(state, raw))]
async fn handle_frame(state: &AppState, worker_id: &str, raw: &str) {
    let message = match serde_json::from_str::<SessionMessage>(raw) {
        Ok(m) => m,
        Err(_) => {
            warn!(worker_id, "dropped unparseable frame");
            return;
        }
    };

    match message {
        SessionMessage::Hb => {}
        SessionMessage::JobStarted { job_id } => {
            if let Err(e) = state.jobs.mark_running(&job_id).await {
                warn!(worker_id, job_id, error = %e, "failed to mark job running");
            }
        }
        SessionMessage::JobLog { job_id, line } => {
            state.push_worker_log_line(worker_id, &job_id, line).await;
        }
        SessionMessage::JobResult {
            job_id,
            exit_code,
            stdout,
            stderr,
            duration_seconds,
        } => {
            settlement::settle(state, &job_id, worker_id, exit_code, &stdout, &stderr, duration_seconds).await;
            state.mark_worker_idle_in_registry(worker_id).await;
            state.workers.set_status(worker_id, WorkerStatus::Idle).await.ok();
            state.request_dispatch();
        }
        SessionMessage::Hello { .. } | SessionMessage::HelloAck { .. } | SessionMessage::AuthError { .. } => {
            warn!(worker_id, "unexpected frame type after handshake");
        }
    }
}
