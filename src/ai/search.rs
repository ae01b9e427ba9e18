use tracing::debug;

use crate::board::{Board, Move};
use crate::types::Color;

pub const MAX_DEPTH: u8 = 3;
const CORNER_WEIGHT: i32 = 25;
const MIN_SCORE: i32 = i32::MIN;
const MAX_SCORE: i32 = i32::MAX;

/// Static evaluation, always from Black's point of view.
///
/// Disc difference, plus corner ownership, plus mobility difference.
pub fn evaluate(board: &Board) -> i32 {
    let score = board.score();
    let (black_corners, white_corners) = board.corner_counts();
    let mobility =
        board.legal_moves(Color::Black).len() as i32 - board.legal_moves(Color::White).len() as i32;

    (score.black as i32 - score.white as i32)
        + CORNER_WEIGHT * (black_corners - white_corners)
        + mobility
}

/// Utility for the maximising side. The computer always plays White, so White
/// maximises and the Black-oriented evaluation is negated.
fn utility(board: &Board) -> i32 {
    -evaluate(board)
}

/// Fixed-depth minimax with alpha-beta pruning.
pub struct Searcher {
    max_depth: u8,
    nodes: u64,
}

impl Searcher {
    pub fn new(max_depth: u8) -> Self {
        Self {
            max_depth,
            nodes: 0,
        }
    }

    /// Picks among `moves` (played by `mover`).
    ///
    /// The root always maximises White's utility whatever `mover` is; only
    /// meaningful while the computer is hardwired to White.
    pub fn search<'m>(&mut self, board: &Board, moves: &'m [Move], mover: Color) -> Option<&'m Move> {
        self.nodes = 0;
        let first = moves.first()?;
        if moves.len() == 1 {
            return Some(first);
        }

        let mut best_move = first;
        let mut best_score = MIN_SCORE;
        let mut alpha = MIN_SCORE;

        for mv in moves {
            let mut next = *board;
            next.apply_move(mover, mv);
            let score = self.minimax(
                &next,
                mover.opponent(),
                self.max_depth.saturating_sub(1),
                alpha,
                MAX_SCORE,
            );
            if score > best_score {
                best_score = score;
                best_move = mv;
            }
            alpha = alpha.max(score);
        }

        debug!(
            nodes = self.nodes,
            best = %best_move.position(),
            score = best_score,
            "minimax search finished"
        );
        Some(best_move)
    }

    pub fn nodes(&self) -> u64 {
        self.nodes
    }

    fn minimax(&mut self, board: &Board, to_move: Color, depth: u8, alpha: i32, beta: i32) -> i32 {
        self.nodes += 1;

        if depth == 0 || board.is_full() {
            return utility(board);
        }

        let moves = board.legal_moves(to_move);
        if moves.is_empty() {
            if !board.has_legal_move(to_move.opponent()) {
                return utility(board);
            }
            // Pass: the ply is spent, the board is untouched.
            return self.minimax(board, to_move.opponent(), depth - 1, alpha, beta);
        }

        let maximizing = to_move == Color::White;
        let mut alpha = alpha;
        let mut beta = beta;
        let mut best = if maximizing { MIN_SCORE } else { MAX_SCORE };

        for mv in &moves {
            let mut next = *board;
            next.apply_move(to_move, mv);
            let score = self.minimax(&next, to_move.opponent(), depth - 1, alpha, beta);

            if maximizing {
                best = best.max(score);
                alpha = alpha.max(score);
            } else {
                best = best.min(score);
                beta = beta.min(score);
            }
            if alpha >= beta {
                break;
            }
        }

        best
    }
}
