//! Error types for the session engine.

use tombola_protocol::{BoardId, PlayerId};

/// Every expected, recoverable rejection the session can produce.
///
/// None of these terminate the process or leave the store partially
/// mutated: validation happens before any state change.
#[derive(Debug, thiserror::Error)]
pub enum GameError {
    /// A session already has a host; only one can run at a time.
    #[error("a session is already in progress")]
    SessionInProgress,

    /// Only the current host may draw. Also returned for identifiers the
    /// session has never seen.
    #[error("player {0} is not the host")]
    NotHost(PlayerId),

    /// Every card has been drawn; no further draws until a new session.
    #[error("the deck is exhausted")]
    DeckExhausted,

    /// There is no session to join yet.
    #[error("no session has been started")]
    SessionNotStarted,

    /// The board doesn't exist in the pool or is already held.
    #[error("board {0} is unavailable")]
    BoardUnavailable(BoardId),

    /// The requester is not a registered player of this session.
    #[error("unknown player {0}")]
    UnknownPlayer(PlayerId),

    /// The coordinator's mailbox is closed — the session task is gone.
    #[error("session coordinator is unavailable")]
    Unavailable,
}
