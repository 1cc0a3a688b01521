//! The session store: one mutable record combining phase, deck state,
//! drawn history, board pool, and player registry.
//!
//! # Concurrency note
//!
//! `GameSession` is NOT thread-safe by itself — plain `Vec`s and a plain
//! `HashMap`. This is intentional: the store is owned by exactly one task
//! (the coordinator actor) and every mutation runs to completion before
//! the next begins. Keeping it synchronous here means the rules are unit-
//! testable without a runtime.

use std::collections::HashMap;

use tombola_protocol::{
    BoardId, CardId, PlayerId, PlayerInfo, SessionPhase, SessionSnapshot,
};

use crate::{Board, BoardPool, Deck, GameConfig, GameError, verify};

/// A registered player: identity, how the host can reach them, and the
/// board they hold.
#[derive(Debug, Clone)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    /// Free-form contact info, visible to the host only.
    pub contact: String,
    /// Set exactly once at join time, never reassigned while the player
    /// remains.
    pub board_id: BoardId,
    pub won: bool,
}

impl Player {
    /// The view of this player every client may see (no contact info).
    pub fn info(&self) -> PlayerInfo {
        PlayerInfo {
            id: self.id,
            name: self.name.clone(),
            board_id: self.board_id,
            won: self.won,
        }
    }
}

/// The result of a win claim that passed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimOutcome {
    /// The board is fully covered. `newly` is false on a repeat claim,
    /// so the win event fires exactly once.
    Confirmed { newly: bool },

    /// Not every board card has been drawn yet. Nothing was mutated.
    NotCovered,
}

/// The single source of truth for the live session.
///
/// Invariants held after every committed mutation:
///
/// 1. At most one host; set only while the phase is `InProgress`.
/// 2. `deck` and `drawn` are disjoint; their union is always the universe.
/// 3. A board is assigned iff exactly one player references it.
/// 4. A player's `board_id` always names a board in the current pool.
/// 5. `won` implies the board was covered by `drawn` when it was set.
#[derive(Debug)]
pub struct GameSession {
    config: GameConfig,
    phase: SessionPhase,
    host: Option<PlayerId>,
    deck: Deck,
    /// Cards drawn so far, in draw order. Append-only between resets.
    drawn: Vec<CardId>,
    boards: BoardPool,
    players: HashMap<PlayerId, Player>,
}

impl GameSession {
    /// Builds an idle store with a deck and board pool already generated,
    /// so the pool can be advertised to clients before a host appears.
    pub fn new(config: GameConfig) -> Self {
        let deck = Deck::shuffled(&config.universe);
        let boards = BoardPool::generate(&config);
        Self {
            config,
            phase: SessionPhase::Idle,
            host: None,
            deck,
            drawn: Vec::new(),
            boards,
            players: HashMap::new(),
        }
    }

    /// Reinitializes everything derived: fresh deck, fresh pool, no
    /// players, no drawn history. Phase and host are the caller's job.
    fn reset(&mut self) {
        self.deck = Deck::shuffled(&self.config.universe);
        self.drawn.clear();
        self.boards = BoardPool::generate(&self.config);
        self.players.clear();
    }

    // -- Lifecycle --------------------------------------------------------

    /// Starts a new session with `requester` as host.
    ///
    /// # Errors
    /// [`GameError::SessionInProgress`] if a host is already set; the
    /// store is untouched in that case.
    pub fn create(&mut self, requester: PlayerId) -> Result<(), GameError> {
        if self.host.is_some() {
            return Err(GameError::SessionInProgress);
        }
        self.reset();
        self.host = Some(requester);
        self.phase = SessionPhase::InProgress;
        tracing::info!(host = %requester, "session created");
        Ok(())
    }

    /// Ends the current session: host cleared, all player and assignment
    /// state discarded, store reinitialized to `Idle` so the next
    /// [`create`](Self::create) succeeds immediately.
    pub fn end(&mut self) {
        self.phase = SessionPhase::Ended;
        self.host = None;
        self.reset();
        self.phase = SessionPhase::Idle;
        tracing::info!("session ended and reset");
    }

    // -- Draws ------------------------------------------------------------

    /// Draws the next card and appends it to the drawn history.
    ///
    /// # Errors
    /// - [`GameError::NotHost`] — `requester` is not the current host
    ///   (including identifiers the session has never seen).
    /// - [`GameError::DeckExhausted`] — every card has been drawn; state
    ///   is left unchanged.
    pub fn draw(&mut self, requester: PlayerId) -> Result<CardId, GameError> {
        if self.host != Some(requester) {
            return Err(GameError::NotHost(requester));
        }
        let card = self.deck.draw().ok_or(GameError::DeckExhausted)?;
        self.drawn.push(card);
        tracing::debug!(%card, remaining = self.deck.remaining(), "card drawn");
        Ok(card)
    }

    // -- Players ----------------------------------------------------------

    /// Registers a player and assigns them the requested board.
    ///
    /// A redelivered join from an already-registered player is answered
    /// with their existing assignment when the board matches (the
    /// transport is at-least-once), and refused otherwise — a player's
    /// board is never reassigned.
    ///
    /// # Errors
    /// - [`GameError::SessionNotStarted`] — no session in progress.
    /// - [`GameError::BoardUnavailable`] — board missing or already held.
    pub fn join(
        &mut self,
        id: PlayerId,
        name: String,
        contact: String,
        board_id: BoardId,
    ) -> Result<&Board, GameError> {
        if !self.phase.is_in_progress() {
            return Err(GameError::SessionNotStarted);
        }

        if let Some(existing) = self.players.get(&id) {
            if existing.board_id == board_id {
                return self
                    .boards
                    .get(board_id)
                    .ok_or(GameError::BoardUnavailable(board_id));
            }
            return Err(GameError::BoardUnavailable(board_id));
        }

        let board = self.boards.assign(id, board_id)?;
        self.players.insert(
            id,
            Player {
                id,
                name,
                contact,
                board_id,
                won: false,
            },
        );
        tracing::info!(player = %id, board = %board_id, "player joined");
        Ok(board)
    }

    /// Removes a player and releases their board. Returns the removed
    /// record, or `None` if the id was never registered.
    pub fn remove_player(&mut self, id: PlayerId) -> Option<Player> {
        let player = self.players.remove(&id)?;
        self.boards.release(id);
        tracing::info!(player = %id, board = %player.board_id, "player removed");
        Some(player)
    }

    // -- Wins -------------------------------------------------------------

    /// Pure check: is this player's board fully covered by the drawn
    /// history? No mutation.
    ///
    /// # Errors
    /// [`GameError::UnknownPlayer`] if the id isn't registered.
    pub fn check_win(&self, id: PlayerId) -> Result<bool, GameError> {
        let player = self
            .players
            .get(&id)
            .ok_or(GameError::UnknownPlayer(id))?;
        let board = self
            .boards
            .get(player.board_id)
            .ok_or(GameError::UnknownPlayer(id))?;
        Ok(verify::board_covered(&board.cards, &self.drawn))
    }

    /// Verifies a win claim server-side and records it.
    ///
    /// The claim itself is only a trigger — the drawn history decides.
    /// Idempotent: a repeat claim after winning returns
    /// `Confirmed { newly: false }` and mutates nothing.
    pub fn claim_win(
        &mut self,
        id: PlayerId,
    ) -> Result<ClaimOutcome, GameError> {
        if !self.check_win(id)? {
            return Ok(ClaimOutcome::NotCovered);
        }
        let player = self
            .players
            .get_mut(&id)
            .ok_or(GameError::UnknownPlayer(id))?;
        let newly = !player.won;
        player.won = true;
        if newly {
            tracing::info!(player = %id, name = %player.name, "win confirmed");
        }
        Ok(ClaimOutcome::Confirmed { newly })
    }

    // -- Views ------------------------------------------------------------

    /// A full snapshot of the committed state, safe to hand to clients.
    pub fn snapshot(&self) -> SessionSnapshot {
        let mut players: Vec<PlayerInfo> =
            self.players.values().map(Player::info).collect();
        players.sort_by_key(|p| p.id);
        SessionSnapshot {
            phase: self.phase,
            host: self.host,
            drawn: self.drawn.clone(),
            deck_remaining: self.deck.remaining(),
            players,
            boards: self.boards.infos(),
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn host(&self) -> Option<PlayerId> {
        self.host
    }

    /// Cards drawn so far, draw order.
    pub fn drawn(&self) -> &[CardId] {
        &self.drawn
    }

    pub fn deck_remaining(&self) -> usize {
        self.deck.remaining()
    }

    pub fn boards(&self) -> &BoardPool {
        &self.boards
    }

    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.get(&id)
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }
}

// =========================================================================
// Tests
// =========================================================================
