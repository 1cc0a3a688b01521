//! Per-connection handler: handshake, request routing, and outbound
//! event forwarding.
//!
//! Each accepted connection gets its own Tokio task running this
//! handler. The flow is:
//!   1. Receive `Hello` → validate version → send `Welcome`
//!   2. Register with the coordinator → board pool + snapshot are pushed
//!   3. Loop: forward coordinator events out, route client requests in
//!   4. On any exit path, signal the coordinator that the connection is
//!      gone — this is what releases boards and ends hostless sessions.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tombola_protocol::{
    ClientRequest, Codec, Envelope, PlayerId, ProtocolError, ServerEvent,
};
use tombola_session::{CoordinatorHandle, GameError};
use tombola_transport::{Connection, WebSocketConnection};

use crate::ServerError;
use crate::server::{PROTOCOL_VERSION, ServerState};

/// How long the first frame (the `Hello`) may take.
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

/// How long a connection may stay silent before it's dropped. Clients
/// are expected to heartbeat well inside this window.
const IDLE_TIMEOUT: Duration = Duration::from_secs(60);

/// Drop guard that signals the coordinator when the handler exits.
///
/// Cleanup must happen on every exit path, panics included. `Drop` is
/// synchronous, so the async disconnect is a fire-and-forget task.
struct DisconnectGuard {
    player_id: PlayerId,
    coordinator: CoordinatorHandle,
}

impl Drop for DisconnectGuard {
    fn drop(&mut self) {
        let coordinator = self.coordinator.clone();
        let player_id = self.player_id;
        tokio::spawn(async move {
            coordinator.disconnect(player_id).await;
        });
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<C: Codec>(
    conn: WebSocketConnection,
    state: Arc<ServerState<C>>,
) -> Result<(), ServerError> {
    // Identity is the connection: no separate authentication step.
    let player_id = PlayerId(conn.id().into_inner());
    let start = Instant::now();
    let mut seq: u64 = 1;

    tracing::debug!(%player_id, "handling new connection");

    perform_handshake(&conn, &state, player_id, &mut seq, &start).await?;

    // Register the outbound channel; the coordinator immediately pushes
    // the board pool and current snapshot through it.
    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    state.coordinator.register(player_id, event_tx).await?;
    let _guard = DisconnectGuard {
        player_id,
        coordinator: state.coordinator.clone(),
    };

    loop {
        tokio::select! {
            maybe_event = event_rx.recv() => {
                match maybe_event {
                    Some(event) => {
                        send_event(&conn, &state.codec, event, &mut seq, &start)
                            .await?;
                    }
                    // The coordinator dropped us — nothing left to forward.
                    None => break,
                }
            }

            result = tokio::time::timeout(IDLE_TIMEOUT, conn.recv()) => {
                let data = match result {
                    Ok(Ok(Some(data))) => data,
                    Ok(Ok(None)) => {
                        tracing::info!(%player_id, "connection closed cleanly");
                        break;
                    }
                    Ok(Err(e)) => {
                        tracing::debug!(%player_id, error = %e, "recv error");
                        break;
                    }
                    Err(_) => {
                        tracing::info!(%player_id, "connection idle, dropping");
                        break;
                    }
                };

                let envelope: Envelope<ClientRequest> =
                    match state.codec.decode(&data) {
                        Ok(env) => env,
                        Err(e) => {
                            tracing::debug!(
                                %player_id, error = %e,
                                "failed to decode request, skipping frame"
                            );
                            continue;
                        }
                    };

                let should_close = handle_request(
                    &conn, &state, player_id, envelope.payload, &mut seq,
                    &start,
                )
                .await?;
                if should_close {
                    break;
                }
            }
        }
    }

    // _guard drops here → disconnect signal fires.
    Ok(())
}

/// Performs the handshake: receive `Hello`, check the version, reply
/// with `Welcome`.
async fn perform_handshake<C: Codec>(
    conn: &WebSocketConnection,
    state: &Arc<ServerState<C>>,
    player_id: PlayerId,
    seq: &mut u64,
    start: &Instant,
) -> Result<(), ServerError> {
    let data =
        match tokio::time::timeout(HANDSHAKE_TIMEOUT, conn.recv()).await {
            Ok(Ok(Some(data))) => data,
            Ok(Ok(None)) => {
                return Err(ProtocolError::InvalidMessage(
                    "connection closed before handshake".into(),
                )
                .into());
            }
            Ok(Err(e)) => return Err(ServerError::Transport(e)),
            Err(_) => {
                return Err(ProtocolError::InvalidMessage(
                    "handshake timed out".into(),
                )
                .into());
            }
        };

    let envelope: Envelope<ClientRequest> = state.codec.decode(&data)?;

    let version = match envelope.payload {
        ClientRequest::Hello { version } => version,
        _ => {
            send_error(conn, &state.codec, 400, "expected Hello", seq, start)
                .await?;
            return Err(ProtocolError::InvalidMessage(
                "first message must be Hello".into(),
            )
            .into());
        }
    };

    if version != PROTOCOL_VERSION {
        send_error(
            conn,
            &state.codec,
            400,
            &format!(
                "version mismatch: expected {PROTOCOL_VERSION}, got {version}"
            ),
            seq,
            start,
        )
        .await?;
        return Err(ProtocolError::InvalidMessage(
            "protocol version mismatch".into(),
        )
        .into());
    }

    send_event(
        conn,
        &state.codec,
        ServerEvent::Welcome {
            player_id,
            server_time: start.elapsed().as_millis() as u64,
        },
        seq,
        start,
    )
    .await?;

    tracing::info!(%player_id, "handshake complete");
    Ok(())
}

/// Routes one request to the coordinator and sends the direct reply.
/// Returns `true` if the connection should close.
async fn handle_request<C: Codec>(
    conn: &WebSocketConnection,
    state: &Arc<ServerState<C>>,
    player_id: PlayerId,
    request: ClientRequest,
    seq: &mut u64,
    start: &Instant,
) -> Result<bool, ServerError> {
    match request {
        ClientRequest::Hello { .. } => {
            tracing::debug!(%player_id, "ignoring repeated Hello");
        }

        ClientRequest::CreateSession => {
            // Success needs no direct reply — the full-state broadcast
            // reaches the requester too.
            if let Err(e) =
                state.coordinator.create_session(player_id).await
            {
                reply_game_error(conn, state, &e, seq, start).await?;
            }
        }

        ClientRequest::DrawCard => {
            // The CardDrawn broadcast covers the host as well.
            if let Err(e) = state.coordinator.draw_card(player_id).await {
                reply_game_error(conn, state, &e, seq, start).await?;
            }
        }

        ClientRequest::JoinSession {
            name,
            contact,
            board_id,
        } => match state
            .coordinator
            .join(player_id, name, contact, board_id)
            .await
        {
            Ok(board) => {
                send_event(
                    conn,
                    &state.codec,
                    ServerEvent::BoardAssigned { board },
                    seq,
                    start,
                )
                .await?;
            }
            Err(e) => reply_game_error(conn, state, &e, seq, start).await?,
        },

        ClientRequest::ClaimWin => {
            match state.coordinator.claim_win(player_id).await {
                Ok(confirmed) => {
                    send_event(
                        conn,
                        &state.codec,
                        ServerEvent::WinConfirmed { confirmed },
                        seq,
                        start,
                    )
                    .await?;
                }
                Err(e) => {
                    reply_game_error(conn, state, &e, seq, start).await?
                }
            }
        }

        ClientRequest::Heartbeat { client_time } => {
            send_event(
                conn,
                &state.codec,
                ServerEvent::HeartbeatAck {
                    client_time,
                    server_time: start.elapsed().as_millis() as u64,
                },
                seq,
                start,
            )
            .await?;
        }

        ClientRequest::Goodbye { reason } => {
            tracing::info!(%player_id, %reason, "client said goodbye");
            return Ok(true);
        }
    }

    Ok(false)
}

/// Maps a session rejection to an HTTP-style error code.
fn error_code(err: &GameError) -> u16 {
    match err {
        GameError::SessionInProgress => 409,
        GameError::NotHost(_) => 403,
        GameError::DeckExhausted => 410,
        GameError::SessionNotStarted => 412,
        GameError::BoardUnavailable(_) => 409,
        GameError::UnknownPlayer(_) => 404,
        GameError::Unavailable => 503,
    }
}

/// Sends a rejected request back as an `Error` event.
async fn reply_game_error<C: Codec>(
    conn: &WebSocketConnection,
    state: &Arc<ServerState<C>>,
    err: &GameError,
    seq: &mut u64,
    start: &Instant,
) -> Result<(), ServerError> {
    send_error(
        conn,
        &state.codec,
        error_code(err),
        &err.to_string(),
        seq,
        start,
    )
    .await
}

/// Sends a `ServerEvent::Error` to the client.
async fn send_error(
    conn: &WebSocketConnection,
    codec: &impl Codec,
    code: u16,
    message: &str,
    seq: &mut u64,
    start: &Instant,
) -> Result<(), ServerError> {
    send_event(
        conn,
        codec,
        ServerEvent::Error {
            code,
            message: message.to_string(),
        },
        seq,
        start,
    )
    .await
}

/// Encodes an event into an envelope and writes it to the connection.
async fn send_event(
    conn: &WebSocketConnection,
    codec: &impl Codec,
    event: ServerEvent,
    seq: &mut u64,
    start: &Instant,
) -> Result<(), ServerError> {
    let envelope = Envelope {
        seq: next_seq(seq),
        timestamp: start.elapsed().as_millis() as u64,
        payload: event,
    };
    let bytes = codec.encode(&envelope)?;
    conn.send(&bytes).await.map_err(ServerError::Transport)
}

/// Increments and returns the next sequence number.
fn next_seq(seq: &mut u64) -> u64 {
    let current = *seq;
    *seq += 1;
    current
}
