//! End-to-end tests: a real server, real WebSocket clients, full game
//! flows over the wire.
//!
//! Direct replies (BoardAssigned, WinConfirmed, Error) arrive in
//! request order on the requester's own connection. Broadcasts triggered
//! by *other* connections land asynchronously, so assertions go through
//! `wait_for`, which skips unrelated events instead of assuming an exact
//! interleaving.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::Message;
use tombola_protocol::{
    BoardId, CardId, ClientRequest, Envelope, PlayerId, ServerEvent,
    SessionPhase,
};
use tombola_server::{PROTOCOL_VERSION, TombolaServerBuilder};
use tombola_session::{GameConfig, NullAuditSink};

type Ws = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

/// The worked example setup: 8 cards, 4 boards of 4.
fn small_config() -> GameConfig {
    GameConfig {
        universe: (1..=8).map(CardId).collect(),
        board_count: 4,
        cards_per_board: 4,
    }
}

async fn start() -> String {
    let server = TombolaServerBuilder::new()
        .bind("127.0.0.1:0")
        .config(small_config())
        .audit(NullAuditSink)
        .build()
        .await
        .expect("server should build");
    let addr = server.local_addr().unwrap().to_string();
    tokio::spawn(async move {
        let _ = server.run().await;
    });
    addr
}

async fn ws(addr: &str) -> Ws {
    let (ws, _) =
        tokio_tungstenite::connect_async(format!("ws://{addr}"))
            .await
            .expect("client should connect");
    ws
}

fn enc(req: &ClientRequest, seq: u64) -> Message {
    let envelope = Envelope {
        seq,
        timestamp: 0,
        payload: req.clone(),
    };
    Message::Binary(serde_json::to_vec(&envelope).unwrap().into())
}

async fn send(ws: &mut Ws, req: ClientRequest) {
    ws.send(enc(&req, 0)).await.expect("send should succeed");
}

/// Receives the next server event, with a timeout.
async fn recv_event(ws: &mut Ws) -> ServerEvent {
    let msg = tokio::time::timeout(Duration::from_secs(5), ws.next())
        .await
        .expect("timed out waiting for an event")
        .expect("stream ended")
        .expect("websocket error");
    let envelope: Envelope<ServerEvent> =
        serde_json::from_slice(&msg.into_data()).unwrap();
    envelope.payload
}

/// Receives events until one matches, skipping the rest. Panics after
/// too many non-matching events.
async fn wait_for(
    ws: &mut Ws,
    mut matches: impl FnMut(&ServerEvent) -> bool,
) -> ServerEvent {
    for _ in 0..64 {
        let event = recv_event(ws).await;
        if matches(&event) {
            return event;
        }
    }
    panic!("expected event did not arrive within 64 events");
}

/// Completes the handshake and drains the registration pushes.
/// Returns the connection's identity and the advertised board pool.
async fn handshake(ws: &mut Ws) -> (PlayerId, Vec<BoardId>) {
    send(ws, ClientRequest::Hello { version: PROTOCOL_VERSION }).await;

    let player_id = match recv_event(ws).await {
        ServerEvent::Welcome { player_id, .. } => player_id,
        other => panic!("expected Welcome, got {other:?}"),
    };
    let boards = match recv_event(ws).await {
        ServerEvent::BoardPool { boards } => {
            boards.iter().map(|b| b.id).collect()
        }
        other => panic!("expected BoardPool, got {other:?}"),
    };
    match recv_event(ws).await {
        ServerEvent::SessionState { .. } => {}
        other => panic!("expected SessionState, got {other:?}"),
    }
    (player_id, boards)
}

/// Handshake + CreateSession; waits for the in-progress broadcast.
async fn start_hosting(ws: &mut Ws) -> PlayerId {
    let (host_id, _) = handshake(ws).await;
    send(ws, ClientRequest::CreateSession).await;
    wait_for(ws, |e| {
        matches!(
            e,
            ServerEvent::SessionState { snapshot }
                if snapshot.phase == SessionPhase::InProgress
        )
    })
    .await;
    host_id
}

// =========================================================================
// Handshake
// =========================================================================

#[tokio::test]
async fn test_handshake_advertises_board_pool() {
    let addr = start().await;
    let mut client = ws(&addr).await;

    let (player_id, boards) = handshake(&mut client).await;

    assert!(player_id.0 > 0);
    assert_eq!(boards.len(), 4, "the configured pool is advertised");
}

#[tokio::test]
async fn test_handshake_version_mismatch_rejected() {
    let addr = start().await;
    let mut client = ws(&addr).await;

    send(&mut client, ClientRequest::Hello { version: 99 }).await;

    let event = recv_event(&mut client).await;
    assert!(
        matches!(event, ServerEvent::Error { code: 400, .. }),
        "got {event:?}"
    );
}

// =========================================================================
// Session lifecycle over the wire
// =========================================================================

#[tokio::test]
async fn test_second_create_rejected_while_in_progress() {
    let addr = start().await;
    let mut host = ws(&addr).await;
    start_hosting(&mut host).await;

    let mut rival = ws(&addr).await;
    handshake(&mut rival).await;
    send(&mut rival, ClientRequest::CreateSession).await;

    let event = wait_for(&mut rival, |e| {
        matches!(e, ServerEvent::Error { .. })
    })
    .await;
    assert!(matches!(event, ServerEvent::Error { code: 409, .. }));
}

#[tokio::test]
async fn test_host_disconnect_ends_session_for_players() {
    let addr = start().await;
    let mut host = ws(&addr).await;
    start_hosting(&mut host).await;

    let mut player = ws(&addr).await;
    let (_, boards) = handshake(&mut player).await;
    send(
        &mut player,
        ClientRequest::JoinSession {
            name: "Lupe".into(),
            contact: "table 4".into(),
            board_id: boards[0],
        },
    )
    .await;
    wait_for(&mut player, |e| {
        matches!(e, ServerEvent::BoardAssigned { .. })
    })
    .await;

    // The host walks away.
    host.close(None).await.unwrap();

    wait_for(&mut player, |e| {
        matches!(e, ServerEvent::SessionEnded { .. })
    })
    .await;

    // The same player can immediately host a fresh session.
    send(&mut player, ClientRequest::CreateSession).await;
    let event = wait_for(&mut player, |e| {
        matches!(
            e,
            ServerEvent::SessionState { snapshot }
                if snapshot.phase == SessionPhase::InProgress
        )
    })
    .await;
    if let ServerEvent::SessionState { snapshot } = event {
        assert!(
            snapshot.players.is_empty(),
            "prior players are gone from the new session"
        );
    }
}

// =========================================================================
// Joining
// =========================================================================

#[tokio::test]
async fn test_join_before_create_rejected() {
    let addr = start().await;
    let mut player = ws(&addr).await;
    let (_, boards) = handshake(&mut player).await;

    send(
        &mut player,
        ClientRequest::JoinSession {
            name: "Lupe".into(),
            contact: "table 4".into(),
            board_id: boards[0],
        },
    )
    .await;

    let event = wait_for(&mut player, |e| {
        matches!(e, ServerEvent::Error { .. })
    })
    .await;
    assert!(matches!(event, ServerEvent::Error { code: 412, .. }));
}

#[tokio::test]
async fn test_board_exclusivity_over_the_wire() {
    let addr = start().await;
    let mut host = ws(&addr).await;
    start_hosting(&mut host).await;

    let mut first = ws(&addr).await;
    let (_, boards) = handshake(&mut first).await;
    let contested = boards[1];

    send(
        &mut first,
        ClientRequest::JoinSession {
            name: "Lupe".into(),
            contact: "t4".into(),
            board_id: contested,
        },
    )
    .await;
    let event = wait_for(&mut first, |e| {
        matches!(e, ServerEvent::BoardAssigned { .. })
    })
    .await;
    if let ServerEvent::BoardAssigned { board } = event {
        assert_eq!(board.id, contested);
        assert!(board.assigned);
    }

    // A second player wants the same board.
    let mut second = ws(&addr).await;
    handshake(&mut second).await;
    send(
        &mut second,
        ClientRequest::JoinSession {
            name: "Chuy".into(),
            contact: "t5".into(),
            board_id: contested,
        },
    )
    .await;
    let event = wait_for(&mut second, |e| {
        matches!(e, ServerEvent::Error { .. })
    })
    .await;
    assert!(matches!(event, ServerEvent::Error { code: 409, .. }));
}

// =========================================================================
// Drawing and winning
// =========================================================================

#[tokio::test]
async fn test_draw_by_non_host_rejected() {
    let addr = start().await;
    let mut host = ws(&addr).await;
    start_hosting(&mut host).await;

    let mut player = ws(&addr).await;
    handshake(&mut player).await;
    send(&mut player, ClientRequest::DrawCard).await;

    let event = wait_for(&mut player, |e| {
        matches!(e, ServerEvent::Error { .. })
    })
    .await;
    assert!(matches!(event, ServerEvent::Error { code: 403, .. }));
}

#[tokio::test]
async fn test_full_game_flow() {
    let addr = start().await;
    let mut host = ws(&addr).await;
    let host_id = start_hosting(&mut host).await;
    assert!(host_id.0 > 0);

    // A player joins with the first advertised board.
    let mut player = ws(&addr).await;
    let (player_id, boards) = handshake(&mut player).await;
    send(
        &mut player,
        ClientRequest::JoinSession {
            name: "Lupe".into(),
            contact: "table 4".into(),
            board_id: boards[0],
        },
    )
    .await;
    wait_for(&mut player, |e| {
        matches!(e, ServerEvent::BoardAssigned { .. })
    })
    .await;

    // The host hears about the join, contact included.
    let event = wait_for(&mut host, |e| {
        matches!(e, ServerEvent::PlayerJoined { .. })
    })
    .await;
    if let ServerEvent::PlayerJoined { player_id: id, contact, .. } = event
    {
        assert_eq!(id, player_id);
        assert_eq!(contact, "table 4");
    }

    // Claiming early is answered, not ignored.
    send(&mut player, ClientRequest::ClaimWin).await;
    let event = wait_for(&mut player, |e| {
        matches!(e, ServerEvent::WinConfirmed { .. })
    })
    .await;
    assert!(matches!(
        event,
        ServerEvent::WinConfirmed { confirmed: false }
    ));

    // The host draws the entire 8-card deck; every draw is broadcast.
    for _ in 0..8 {
        send(&mut host, ClientRequest::DrawCard).await;
        wait_for(&mut host, |e| {
            matches!(e, ServerEvent::CardDrawn { .. })
        })
        .await;
    }
    // One more draw: the deck is exhausted.
    send(&mut host, ClientRequest::DrawCard).await;
    let event =
        wait_for(&mut host, |e| matches!(e, ServerEvent::Error { .. }))
            .await;
    assert!(matches!(event, ServerEvent::Error { code: 410, .. }));

    // The player saw all 8 draws too.
    for _ in 0..8 {
        wait_for(&mut player, |e| {
            matches!(e, ServerEvent::CardDrawn { .. })
        })
        .await;
    }

    // With the full deck drawn, the claim is confirmed...
    send(&mut player, ClientRequest::ClaimWin).await;
    let event = wait_for(&mut player, |e| {
        matches!(e, ServerEvent::WinConfirmed { .. })
    })
    .await;
    assert!(matches!(
        event,
        ServerEvent::WinConfirmed { confirmed: true }
    ));

    // ...and the host — only the host — gets the win notice.
    let event = wait_for(&mut host, |e| {
        matches!(e, ServerEvent::PlayerWon { .. })
    })
    .await;
    if let ServerEvent::PlayerWon { player_id: id, name, .. } = event {
        assert_eq!(id, player_id);
        assert_eq!(name, "Lupe");
    }
}

#[tokio::test]
async fn test_heartbeat_echoes_client_time() {
    let addr = start().await;
    let mut client = ws(&addr).await;
    handshake(&mut client).await;

    send(&mut client, ClientRequest::Heartbeat { client_time: 4242 })
        .await;

    let event = wait_for(&mut client, |e| {
        matches!(e, ServerEvent::HeartbeatAck { .. })
    })
    .await;
    assert!(matches!(
        event,
        ServerEvent::HeartbeatAck { client_time: 4242, .. }
    ));
}
