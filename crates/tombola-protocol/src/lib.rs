//! Wire protocol for Tombola.
//!
//! This crate defines the "language" that clients and the session server
//! speak:
//!
//! - **Types** ([`Envelope`], [`ClientRequest`], [`ServerEvent`], the id
//!   newtypes) — the structures that travel on the wire.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]) — how those messages are
//!   converted to/from bytes.
//! - **Errors** ([`ProtocolError`]) — what can go wrong during
//!   encoding/decoding.
//!
//! The protocol layer sits between the transport (raw bytes) and the
//! session engine (game rules). It doesn't know about connections or
//! decks — it only knows how to describe and serialize messages.

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{
    BoardId, BoardInfo, CardId, ClientRequest, Envelope, PlayerId,
    PlayerInfo, Recipient, ServerEvent, SessionPhase, SessionSnapshot,
};
