//! Core protocol types for Tombola's wire format.
//!
//! Everything in this module gets serialized to bytes, sent over the
//! network, and deserialized on the other side. Requests flow client →
//! server ([`ClientRequest`]), events flow server → client
//! ([`ServerEvent`]), and both travel inside an [`Envelope`].

use serde::{Deserialize, Serialize};

use std::fmt;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A unique identifier for a connected actor (host or player).
///
/// Identity is per-connection: the transport assigns each accepted
/// connection an id, and that id is the actor's name for the lifetime of
/// the connection. `#[serde(transparent)]` makes `PlayerId(42)` serialize
/// as plain `42`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub u64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P-{}", self.0)
    }
}

/// A single drawable card in the universe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CardId(pub u16);

impl fmt::Display for CardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "C-{}", self.0)
    }
}

/// A board in the session's pool, unique within that pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BoardId(pub u32);

impl fmt::Display for BoardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "B-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Recipient — who should receive an event?
// ---------------------------------------------------------------------------

/// Specifies who should receive a server event.
///
/// When the coordinator commits a mutation it produces a list of
/// `(Recipient, ServerEvent)` pairs; this enum tells the dispatch layer
/// WHERE to deliver each one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Recipient {
    /// Every connected actor, host included.
    All,

    /// One specific connection.
    Player(PlayerId),

    /// The current host only. Dropped silently if no host is set.
    Host,
}

// ---------------------------------------------------------------------------
// Session phase
// ---------------------------------------------------------------------------

/// The lifecycle phase of the shared session.
///
/// ```text
/// Idle → InProgress → Ended → Idle
/// ```
///
/// `Ended` is transient: the store is reinitialized immediately after the
/// session-ended event goes out, so callers observe `Idle` again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionPhase {
    Idle,
    InProgress,
    Ended,
}

impl SessionPhase {
    /// Returns `true` if a new session can be created right now.
    pub fn accepts_create(&self) -> bool {
        matches!(self, Self::Idle | Self::Ended)
    }

    /// Returns `true` if players can join and the host can draw.
    pub fn is_in_progress(&self) -> bool {
        matches!(self, Self::InProgress)
    }
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::InProgress => write!(f, "InProgress"),
            Self::Ended => write!(f, "Ended"),
        }
    }
}

// ---------------------------------------------------------------------------
// Public views
// ---------------------------------------------------------------------------

/// A board as advertised to clients: its cards plus availability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardInfo {
    /// The board's id within the pool.
    pub id: BoardId,
    /// The cards on the board, in board order.
    pub cards: Vec<CardId>,
    /// Whether some player currently holds this board.
    pub assigned: bool,
}

/// A player as visible to every client.
///
/// The `contact` field a player supplies at join time is NOT part of this
/// view — it goes to the host only, inside [`ServerEvent::PlayerJoined`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerInfo {
    pub id: PlayerId,
    pub name: String,
    pub board_id: BoardId,
    pub won: bool,
}

/// A full snapshot of the committed session state.
///
/// Sent after every create/join/leave so clients can re-render from
/// scratch. The undrawn deck order is deliberately withheld — clients
/// only learn how many cards remain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub phase: SessionPhase,
    pub host: Option<PlayerId>,
    /// Cards drawn so far, in draw order.
    pub drawn: Vec<CardId>,
    /// How many cards are left in the deck.
    pub deck_remaining: usize,
    /// Players sorted by id.
    pub players: Vec<PlayerInfo>,
    /// The board pool with current availability.
    pub boards: Vec<BoardInfo>,
}

// ---------------------------------------------------------------------------
// Requests and events
// ---------------------------------------------------------------------------

/// Messages a client sends to the server.
///
/// `#[serde(tag = "type")]` produces internally tagged JSON:
/// `{ "type": "JoinSession", "name": "...", ... }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientRequest {
    /// First message on every connection. The server rejects mismatched
    /// protocol versions.
    Hello { version: u32 },

    /// Become the host of a new session. Fails if one is in progress.
    CreateSession,

    /// Draw the next card. Host only.
    DrawCard,

    /// Join the current session, claiming the given board.
    JoinSession {
        name: String,
        /// Free-form contact info, forwarded to the host only.
        contact: String,
        board_id: BoardId,
    },

    /// Assert that the sender's board is fully covered. The server
    /// re-verifies; the client's own bookkeeping is only a trigger.
    ClaimWin,

    /// Keep-alive. `client_time` is echoed back for RTT measurement.
    Heartbeat { client_time: u64 },

    /// Orderly goodbye. Equivalent to dropping the connection.
    Goodbye { reason: String },
}

/// Messages the server sends to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerEvent {
    /// Handshake reply: the connection's identity and the server clock.
    Welcome { player_id: PlayerId, server_time: u64 },

    /// The current board pool, pushed once right after the handshake so
    /// the client can pick a free board.
    BoardPool { boards: Vec<BoardInfo> },

    /// Full-state broadcast after create/join/leave.
    SessionState { snapshot: SessionSnapshot },

    /// A card was drawn. Broadcast to everyone.
    CardDrawn { card: CardId, remaining: usize },

    /// Reply to a successful join: the board now held by the requester.
    BoardAssigned { board: BoardInfo },

    /// Host-only: a player joined, with their contact info.
    PlayerJoined {
        player_id: PlayerId,
        name: String,
        contact: String,
        board_id: BoardId,
    },

    /// Host-only: a player left and their board was released.
    PlayerLeft { player_id: PlayerId, name: String },

    /// Host-only: a win claim was verified.
    PlayerWon {
        player_id: PlayerId,
        name: String,
        board_id: BoardId,
    },

    /// Reply to the claimant: whether the claim was confirmed.
    WinConfirmed { confirmed: bool },

    /// The session is over (host disconnected). Clients discard local
    /// state.
    SessionEnded { reason: String },

    /// Heartbeat reply with both clocks.
    HeartbeatAck { client_time: u64, server_time: u64 },

    /// A request was rejected. `code` follows HTTP-style conventions.
    Error { code: u16, message: String },
}

// ---------------------------------------------------------------------------
// Envelope — the top-level wire format
// ---------------------------------------------------------------------------

/// The top-level message wrapper. Every frame on the wire is an Envelope
/// around either a [`ClientRequest`] or a [`ServerEvent`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope<P> {
    /// Auto-incrementing sequence number; each side keeps its own counter.
    pub seq: u64,

    /// Milliseconds since the sender's clock origin. Used for timing and
    /// debugging, not for ordering.
    pub timestamp: u64,

    /// The actual message.
    pub payload: P,
}

// =========================================================================
// Tests
// =========================================================================
