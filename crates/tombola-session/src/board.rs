//! Board pool: pre-built boards with exclusivity-tracked assignment.

use rand::seq::SliceRandom;
use tombola_protocol::{BoardId, BoardInfo, CardId, PlayerId};

use crate::{GameConfig, GameError};

/// One board in the pool: a fixed subset of the card universe.
///
/// `cards` is fixed at generation time; only `assigned_to` ever changes.
/// Boards are sampled independently of each other, so two boards may
/// overlap in card content — a known, intentional property of the game.
#[derive(Debug, Clone)]
pub struct Board {
    pub id: BoardId,
    pub cards: Vec<CardId>,
    /// The player currently holding this board, if any.
    pub assigned_to: Option<PlayerId>,
}

impl Board {
    /// Returns `true` if some player holds this board.
    pub fn is_assigned(&self) -> bool {
        self.assigned_to.is_some()
    }

    /// The client-facing view of this board.
    pub fn info(&self) -> BoardInfo {
        BoardInfo {
            id: self.id,
            cards: self.cards.clone(),
            assigned: self.is_assigned(),
        }
    }
}

/// The session's fixed collection of boards.
///
/// Membership never changes for the session's lifetime; assignment is the
/// only mutation. The check-and-set in [`assign`](Self::assign) is made
/// indivisible by the coordinator, which processes one request at a time.
#[derive(Debug, Clone)]
pub struct BoardPool {
    boards: Vec<Board>,
}

impl BoardPool {
    /// Generates a fresh pool: `board_count` boards of `cards_per_board`
    /// cards, each sampled independently from the universe.
    pub fn generate(config: &GameConfig) -> Self {
        let mut rng = rand::rng();
        let boards = (0..config.board_count)
            .map(|i| {
                let mut cards = config.universe.clone();
                cards.shuffle(&mut rng);
                cards.truncate(config.cards_per_board);
                Board {
                    id: BoardId(i as u32),
                    cards,
                    assigned_to: None,
                }
            })
            .collect();
        Self { boards }
    }

    /// Assigns a board to a player.
    ///
    /// # Errors
    /// Returns [`GameError::BoardUnavailable`] if the board doesn't exist
    /// or is already held by someone.
    pub fn assign(
        &mut self,
        player: PlayerId,
        board_id: BoardId,
    ) -> Result<&Board, GameError> {
        let board = self
            .boards
            .iter_mut()
            .find(|b| b.id == board_id)
            .ok_or(GameError::BoardUnavailable(board_id))?;

        if board.is_assigned() {
            return Err(GameError::BoardUnavailable(board_id));
        }

        board.assigned_to = Some(player);
        Ok(board)
    }

    /// Releases whatever board `player` holds. Idempotent: a player with
    /// no board is a no-op returning `None`.
    pub fn release(&mut self, player: PlayerId) -> Option<BoardId> {
        let board = self
            .boards
            .iter_mut()
            .find(|b| b.assigned_to == Some(player))?;
        board.assigned_to = None;
        Some(board.id)
    }

    /// Looks up a board by id.
    pub fn get(&self, board_id: BoardId) -> Option<&Board> {
        self.boards.iter().find(|b| b.id == board_id)
    }

    /// Client-facing views of every board, pool order.
    pub fn infos(&self) -> Vec<BoardInfo> {
        self.boards.iter().map(Board::info).collect()
    }

    /// Number of boards in the pool.
    pub fn len(&self) -> usize {
        self.boards.len()
    }

    /// Returns `true` if the pool has no boards.
    pub fn is_empty(&self) -> bool {
        self.boards.is_empty()
    }
}
