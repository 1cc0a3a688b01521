//! # Tombola server
//!
//! A WebSocket server for one shared, live card-drawing session: a single
//! host draws from a shuffled deck, players claim boards from a shared
//! pool, and the server alone verifies wins.
//!
//! The layers underneath: `tombola-transport` (connections),
//! `tombola-protocol` (wire format), `tombola-session` (the authoritative
//! state machine). This crate ties them together: accept loop, handshake,
//! request routing, and outbound event forwarding.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use tombola_server::TombolaServerBuilder;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let server = TombolaServerBuilder::new()
//!     .bind("0.0.0.0:8080")
//!     .build()
//!     .await?;
//! server.run().await?;
//! # Ok(())
//! # }
//! ```

mod error;
mod handler;
mod server;

pub use error::ServerError;
pub use server::{
    PROTOCOL_VERSION, TombolaServer, TombolaServerBuilder,
};
