//! Authoritative session engine for Tombola.
//!
//! One process hosts exactly one live card-drawing session: a single host
//! draws cards from a shuffled deck, players claim boards from a shared
//! pool, and the server alone decides who has won. This crate owns all of
//! that state and serializes every mutation through one coordinator actor.
//!
//! # Key types
//!
//! - [`GameSession`] — the single mutable aggregate (phase, deck, drawn
//!   history, board pool, player registry)
//! - [`CoordinatorHandle`] — send requests to the running coordinator actor
//! - [`Deck`] / [`BoardPool`] — draw sequencing and exclusive assignment
//! - [`AuditSink`] — post-commit join/win records
//! - [`GameError`] — every expected, recoverable rejection

mod audit;
mod board;
mod config;
mod coordinator;
mod deck;
mod error;
mod session;
mod verify;

pub use audit::{
    AuditError, AuditSink, LogAuditSink, NullAuditSink, PlayerJoinedRecord,
    PlayerWonRecord,
};
pub use board::{Board, BoardPool};
pub use config::GameConfig;
pub use coordinator::{CoordinatorHandle, EventSender, spawn_coordinator};
pub use deck::Deck;
pub use error::GameError;
pub use session::{ClaimOutcome, GameSession, Player};
pub use verify::board_covered;
