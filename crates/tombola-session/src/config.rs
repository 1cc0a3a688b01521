//! Game configuration: the card universe and board-pool dimensions.

use serde::{Deserialize, Serialize};
use tombola_protocol::CardId;

/// Configuration for a session process.
///
/// The universe and pool dimensions are fixed for the process lifetime;
/// every session created by the host reuses them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameConfig {
    /// The fixed, ordered set of drawable cards.
    pub universe: Vec<CardId>,

    /// How many boards to generate per session.
    pub board_count: usize,

    /// Cards per board. Must not exceed the universe size.
    pub cards_per_board: usize,
}

impl Default for GameConfig {
    /// The classic setup: 32 cards, 4x4 boards, a pool of 50.
    fn default() -> Self {
        Self {
            universe: (1..=32).map(CardId).collect(),
            board_count: 50,
            cards_per_board: 16,
        }
    }
}
