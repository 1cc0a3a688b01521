//! Win verification: is a board fully covered by the drawn history?

use std::collections::HashSet;

use tombola_protocol::CardId;

/// Returns `true` if every card on the board appears in the drawn
/// history. Pure set containment — order and duplicates are irrelevant.
pub fn board_covered(board: &[CardId], drawn: &[CardId]) -> bool {
    let drawn: HashSet<CardId> = drawn.iter().copied().collect();
    board.iter().all(|card| drawn.contains(card))
}
