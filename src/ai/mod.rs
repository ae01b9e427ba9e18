//! Move selection for the computer opponent.

pub mod heuristic;
pub mod search;

use rand::Rng;

use crate::board::{Board, Move};
use crate::types::{Color, Difficulty};

/// Picks the computer's reply. Sessions hold one behind a `Box<dyn _>` so tests
/// can script the opponent.
pub trait MoveSelector: Send + Sync {
    fn select_move(
        &self,
        board: &Board,
        moves: &[Move],
        difficulty: Difficulty,
        mover: Color,
    ) -> Option<Move>;
}

/// Default selector: dispatches on difficulty with the thread RNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct DifficultySelector;

impl MoveSelector for DifficultySelector {
    fn select_move(
        &self,
        board: &Board,
        moves: &[Move],
        difficulty: Difficulty,
        mover: Color,
    ) -> Option<Move> {
        choose_move(board, moves, difficulty, mover)
    }
}

/// Returns `None` iff `moves` is empty.
pub fn choose_move(
    board: &Board,
    moves: &[Move],
    difficulty: Difficulty,
    mover: Color,
) -> Option<Move> {
    choose_move_with(board, moves, difficulty, mover, &mut rand::rng())
}

/// Like [`choose_move`] but with an explicit RNG (only `Easy` draws from it).
pub fn choose_move_with<R: Rng + ?Sized>(
    board: &Board,
    moves: &[Move],
    difficulty: Difficulty,
    mover: Color,
    rng: &mut R,
) -> Option<Move> {
    if moves.is_empty() {
        return None;
    }

    let picked = match difficulty {
        Difficulty::Easy => heuristic::random(moves, rng),
        Difficulty::Normal => heuristic::greedy(moves),
        Difficulty::Hard => heuristic::positional(moves),
        Difficulty::Max => search::Searcher::new(search::MAX_DEPTH).search(board, moves, mover),
    };

    picked.cloned()
}
