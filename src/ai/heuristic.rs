use rand::Rng;
use rand::seq::IndexedRandom;

use crate::board::Move;

const CORNER_BONUS: usize = 20;
const EDGE_BONUS: usize = 3;

/// Easy: uniform pick.
pub fn random<'a, R: Rng + ?Sized>(moves: &'a [Move], rng: &mut R) -> Option<&'a Move> {
    moves.choose(rng)
}

/// Normal: most captures.
pub fn greedy(moves: &[Move]) -> Option<&Move> {
    best_by(moves, |mv| mv.captured.len())
}

/// Hard: captures plus a corner/edge bonus.
pub fn positional(moves: &[Move]) -> Option<&Move> {
    best_by(moves, positional_score)
}

fn positional_score(mv: &Move) -> usize {
    let pos = mv.position();
    let bonus = if pos.is_corner() {
        CORNER_BONUS
    } else if pos.is_edge() {
        EDGE_BONUS
    } else {
        0
    };
    mv.captured.len() + bonus
}

/// First maximum wins, so ties resolve to canonical (row-major) order.
fn best_by(moves: &[Move], score: impl Fn(&Move) -> usize) -> Option<&Move> {
    let mut best: Option<(&Move, usize)> = None;
    for mv in moves {
        let value = score(mv);
        if best.is_none_or(|(_, best_value)| value > best_value) {
            best = Some((mv, value));
        }
    }
    best.map(|(mv, _)| mv)
}
