//! Deck manager: a shuffled draw order with sequential, non-repeating
//! draws.

use rand::seq::SliceRandom;
use tombola_protocol::CardId;

/// The cards remaining to be drawn, in draw order.
///
/// Created as a uniformly-random permutation of the universe
/// (Fisher–Yates via [`SliceRandom::shuffle`]); the end of the sequence is
/// the "top". Strictly shrinking — cards only ever leave.
#[derive(Debug, Clone)]
pub struct Deck {
    cards: Vec<CardId>,
}

impl Deck {
    /// Builds a freshly shuffled deck from the universe.
    pub fn shuffled(universe: &[CardId]) -> Self {
        let mut cards = universe.to_vec();
        cards.shuffle(&mut rand::rng());
        Self { cards }
    }

    /// Removes and returns the top card, or `None` once exhausted.
    pub fn draw(&mut self) -> Option<CardId> {
        self.cards.pop()
    }

    /// How many cards are left.
    pub fn remaining(&self) -> usize {
        self.cards.len()
    }

    /// Returns `true` once every card has been drawn.
    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// The undrawn cards, top last. Never exposed to clients.
    pub fn cards(&self) -> &[CardId] {
        &self.cards
    }
}
