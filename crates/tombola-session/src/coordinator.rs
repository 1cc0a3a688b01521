//! Session coordinator: an isolated Tokio task that owns the game state.
//!
//! The coordinator runs in its own task, communicating with connection
//! handlers through an mpsc channel. This is the single serialization
//! point: every mutating request is processed to completion before the
//! next one begins, so check-and-set operations like board assignment
//! are indivisible without any locking inside the store.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tombola_protocol::{
    BoardId, BoardInfo, CardId, PlayerId, Recipient, ServerEvent,
    SessionSnapshot,
};

use crate::{
    AuditSink, ClaimOutcome, GameConfig, GameError, GameSession,
    PlayerJoinedRecord, PlayerWonRecord, audit,
};

/// Default command channel size for the coordinator mailbox.
const DEFAULT_MAILBOX_SIZE: usize = 64;

/// Channel sender for delivering events to one connection.
pub type EventSender = mpsc::UnboundedSender<ServerEvent>;

/// Commands sent to the coordinator through its mailbox.
///
/// The `oneshot::Sender` in most variants is the reply channel — the
/// caller sends a command and awaits the response on it.
enum Command {
    /// Attach a connection's outbound channel. The coordinator pushes
    /// the board pool and current snapshot through it immediately.
    Register {
        id: PlayerId,
        sender: EventSender,
        reply: oneshot::Sender<()>,
    },

    /// Start a new session with the requester as host.
    CreateSession {
        requester: PlayerId,
        reply: oneshot::Sender<Result<SessionSnapshot, GameError>>,
    },

    /// Draw the next card (host only).
    DrawCard {
        requester: PlayerId,
        reply: oneshot::Sender<Result<CardId, GameError>>,
    },

    /// Join the session, claiming a board.
    Join {
        requester: PlayerId,
        name: String,
        contact: String,
        board_id: BoardId,
        reply: oneshot::Sender<Result<BoardInfo, GameError>>,
    },

    /// Verify a win claim.
    ClaimWin {
        requester: PlayerId,
        reply: oneshot::Sender<Result<bool, GameError>>,
    },

    /// The connection is gone. The reply resolves once cleanup (and any
    /// resulting event dispatch) has completed.
    Disconnect {
        id: PlayerId,
        reply: oneshot::Sender<()>,
    },

    /// Read-only snapshot of the committed state.
    Snapshot {
        reply: oneshot::Sender<SessionSnapshot>,
    },
}

/// Handle to the running coordinator. Cheap to clone — it's an
/// `mpsc::Sender` wrapper.
#[derive(Clone)]
pub struct CoordinatorHandle {
    sender: mpsc::Sender<Command>,
}

impl CoordinatorHandle {
    /// Attaches a connection's outbound event channel.
    pub async fn register(
        &self,
        id: PlayerId,
        sender: EventSender,
    ) -> Result<(), GameError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(Command::Register {
                id,
                sender,
                reply: reply_tx,
            })
            .await
            .map_err(|_| GameError::Unavailable)?;
        reply_rx.await.map_err(|_| GameError::Unavailable)
    }

    /// Requests a new session with `requester` as host.
    pub async fn create_session(
        &self,
        requester: PlayerId,
    ) -> Result<SessionSnapshot, GameError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(Command::CreateSession {
                requester,
                reply: reply_tx,
            })
            .await
            .map_err(|_| GameError::Unavailable)?;
        reply_rx.await.map_err(|_| GameError::Unavailable)?
    }

    /// Requests the next draw.
    pub async fn draw_card(
        &self,
        requester: PlayerId,
    ) -> Result<CardId, GameError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(Command::DrawCard {
                requester,
                reply: reply_tx,
            })
            .await
            .map_err(|_| GameError::Unavailable)?;
        reply_rx.await.map_err(|_| GameError::Unavailable)?
    }

    /// Requests to join the session with the given board.
    pub async fn join(
        &self,
        requester: PlayerId,
        name: String,
        contact: String,
        board_id: BoardId,
    ) -> Result<BoardInfo, GameError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(Command::Join {
                requester,
                name,
                contact,
                board_id,
                reply: reply_tx,
            })
            .await
            .map_err(|_| GameError::Unavailable)?;
        reply_rx.await.map_err(|_| GameError::Unavailable)?
    }

    /// Submits a win claim; returns whether it was confirmed.
    pub async fn claim_win(
        &self,
        requester: PlayerId,
    ) -> Result<bool, GameError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(Command::ClaimWin {
                requester,
                reply: reply_tx,
            })
            .await
            .map_err(|_| GameError::Unavailable)?;
        reply_rx.await.map_err(|_| GameError::Unavailable)?
    }

    /// Signals that a connection is gone. Always succeeds; a closed
    /// mailbox means there is nothing left to clean up.
    pub async fn disconnect(&self, id: PlayerId) {
        let (reply_tx, reply_rx) = oneshot::channel();
        if self
            .sender
            .send(Command::Disconnect {
                id,
                reply: reply_tx,
            })
            .await
            .is_ok()
        {
            let _ = reply_rx.await;
        }
    }

    /// Fetches the current committed snapshot.
    pub async fn snapshot(&self) -> Result<SessionSnapshot, GameError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(Command::Snapshot { reply: reply_tx })
            .await
            .map_err(|_| GameError::Unavailable)?;
        reply_rx.await.map_err(|_| GameError::Unavailable)
    }
}

/// The coordinator actor. Runs inside a Tokio task.
struct Coordinator {
    session: GameSession,
    /// Per-connection outbound channels.
    senders: HashMap<PlayerId, EventSender>,
    audit: Arc<dyn AuditSink>,
    receiver: mpsc::Receiver<Command>,
}

impl Coordinator {
    /// Runs the actor loop, processing commands until every handle drops.
    async fn run(mut self) {
        tracing::info!("session coordinator started");

        while let Some(cmd) = self.receiver.recv().await {
            match cmd {
                Command::Register { id, sender, reply } => {
                    self.handle_register(id, sender);
                    let _ = reply.send(());
                }
                Command::CreateSession { requester, reply } => {
                    let result = self.handle_create(requester);
                    let _ = reply.send(result);
                }
                Command::DrawCard { requester, reply } => {
                    let result = self.handle_draw(requester);
                    let _ = reply.send(result);
                }
                Command::Join {
                    requester,
                    name,
                    contact,
                    board_id,
                    reply,
                } => {
                    let result =
                        self.handle_join(requester, name, contact, board_id);
                    let _ = reply.send(result);
                }
                Command::ClaimWin { requester, reply } => {
                    let result = self.handle_claim(requester);
                    let _ = reply.send(result);
                }
                Command::Disconnect { id, reply } => {
                    self.handle_disconnect(id);
                    let _ = reply.send(());
                }
                Command::Snapshot { reply } => {
                    let _ = reply.send(self.session.snapshot());
                }
            }
        }

        tracing::info!("session coordinator stopped");
    }

    fn handle_register(&mut self, id: PlayerId, sender: EventSender) {
        // Advertise the pool and current state to the newcomer so they
        // can pick a free board (or render the game already in flight).
        let _ = sender.send(ServerEvent::BoardPool {
            boards: self.session.boards().infos(),
        });
        let _ = sender.send(ServerEvent::SessionState {
            snapshot: self.session.snapshot(),
        });
        self.senders.insert(id, sender);
        tracing::debug!(%id, connections = self.senders.len(), "connection registered");
    }

    fn handle_create(
        &mut self,
        requester: PlayerId,
    ) -> Result<SessionSnapshot, GameError> {
        self.session.create(requester)?;
        let snapshot = self.session.snapshot();
        self.dispatch(vec![(
            Recipient::All,
            ServerEvent::SessionState {
                snapshot: snapshot.clone(),
            },
        )]);
        Ok(snapshot)
    }

    fn handle_draw(
        &mut self,
        requester: PlayerId,
    ) -> Result<CardId, GameError> {
        let card = self.session.draw(requester)?;
        self.dispatch(vec![(
            Recipient::All,
            ServerEvent::CardDrawn {
                card,
                remaining: self.session.deck_remaining(),
            },
        )]);
        Ok(card)
    }

    fn handle_join(
        &mut self,
        requester: PlayerId,
        name: String,
        contact: String,
        board_id: BoardId,
    ) -> Result<BoardInfo, GameError> {
        let board_info = self
            .session
            .join(requester, name.clone(), contact.clone(), board_id)?
            .info();

        self.dispatch(vec![
            (
                Recipient::All,
                ServerEvent::SessionState {
                    snapshot: self.session.snapshot(),
                },
            ),
            (
                Recipient::Host,
                ServerEvent::PlayerJoined {
                    player_id: requester,
                    name: name.clone(),
                    contact: contact.clone(),
                    board_id,
                },
            ),
        ]);

        // Post-commit, best-effort.
        let record = PlayerJoinedRecord {
            name,
            contact,
            board_id,
            timestamp_ms: audit::now_ms(),
        };
        if let Err(e) = self.audit.player_joined(record) {
            tracing::warn!(error = %e, "audit sink rejected join record");
        }

        Ok(board_info)
    }

    fn handle_claim(
        &mut self,
        requester: PlayerId,
    ) -> Result<bool, GameError> {
        match self.session.claim_win(requester)? {
            ClaimOutcome::Confirmed { newly: true } => {
                // The player record is present — claim_win just verified it.
                let (name, board_id) = match self.session.player(requester) {
                    Some(p) => (p.name.clone(), p.board_id),
                    None => return Err(GameError::UnknownPlayer(requester)),
                };

                self.dispatch(vec![(
                    Recipient::Host,
                    ServerEvent::PlayerWon {
                        player_id: requester,
                        name: name.clone(),
                        board_id,
                    },
                )]);

                let record = PlayerWonRecord {
                    name,
                    board_id,
                    timestamp_ms: audit::now_ms(),
                };
                if let Err(e) = self.audit.player_won(record) {
                    tracing::warn!(error = %e, "audit sink rejected win record");
                }
                Ok(true)
            }
            // Repeat claim: success, but the win event already fired.
            ClaimOutcome::Confirmed { newly: false } => Ok(true),
            ClaimOutcome::NotCovered => Ok(false),
        }
    }

    fn handle_disconnect(&mut self, id: PlayerId) {
        if self.session.host() == Some(id) {
            tracing::info!(host = %id, "host disconnected, ending session");
            self.dispatch(vec![(
                Recipient::All,
                ServerEvent::SessionEnded {
                    reason: "the host has disconnected".into(),
                },
            )]);
            self.session.end();
        } else if let Some(player) = self.session.remove_player(id) {
            self.dispatch(vec![
                (
                    Recipient::All,
                    ServerEvent::SessionState {
                        snapshot: self.session.snapshot(),
                    },
                ),
                (
                    Recipient::Host,
                    ServerEvent::PlayerLeft {
                        player_id: id,
                        name: player.name,
                    },
                ),
            ]);
        }
        self.senders.remove(&id);
    }

    /// Dispatches events to the correct recipients. Sends to dropped
    /// receivers are silently ignored — the connection is on its way out.
    fn dispatch(&self, events: Vec<(Recipient, ServerEvent)>) {
        for (recipient, event) in events {
            match recipient {
                Recipient::All => {
                    for sender in self.senders.values() {
                        let _ = sender.send(event.clone());
                    }
                }
                Recipient::Player(id) => {
                    if let Some(sender) = self.senders.get(&id) {
                        let _ = sender.send(event);
                    }
                }
                Recipient::Host => {
                    if let Some(host) = self.session.host() {
                        if let Some(sender) = self.senders.get(&host) {
                            let _ = sender.send(event);
                        }
                    }
                }
            }
        }
    }
}

/// Spawns the coordinator task and returns a handle to communicate with
/// it. The task exits once every handle has been dropped.
pub fn spawn_coordinator(
    config: GameConfig,
    audit: Arc<dyn AuditSink>,
) -> CoordinatorHandle {
    let (tx, rx) = mpsc::channel(DEFAULT_MAILBOX_SIZE);

    let actor = Coordinator {
        session: GameSession::new(config),
        senders: HashMap::new(),
        audit,
        receiver: rx,
    };

    tokio::spawn(actor.run());

    CoordinatorHandle { sender: tx }
}
