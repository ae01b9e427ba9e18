use crate::types::{Cell, Color, Position, Score};

pub const BOARD_SIZE: usize = 8;
pub const NUM_SQUARES: usize = BOARD_SIZE * BOARD_SIZE;
const DIRECTIONS: [(i32, i32); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

/// A legal placement and the discs it captures.
///
/// Only valid for the board and colour it was computed from; recompute after
/// any mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Move {
    pub row: u8,
    pub col: u8,
    /// Captured squares in row-major order.
    pub captured: Vec<Position>,
}

impl Move {
    pub fn position(&self) -> Position {
        Position::new(self.row, self.col)
    }
}

/// Reversi board state represented by two bitboards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Board {
    black: u64,
    white: u64,
}

impl Board {
    /// Creates the initial board:
    /// d4=white, e4=black, d5=black, e5=white.
    pub fn new() -> Self {
        Self {
            black: bit(28) | bit(35),
            white: bit(27) | bit(36),
        }
    }

    /// Builds a board from raw masks. Squares set in both masks count as black.
    pub fn from_bitboards(black: u64, white: u64) -> Self {
        Self {
            black,
            white: white & !black,
        }
    }

    pub fn cell(&self, pos: Position) -> Cell {
        let square = bit(index(pos));
        if (self.black & square) != 0 {
            Cell::Black
        } else if (self.white & square) != 0 {
            Cell::White
        } else {
            Cell::Empty
        }
    }

    /// Returns every legal move for `color` in row-major order.
    pub fn legal_moves(&self, color: Color) -> Vec<Move> {
        let (me, opp) = self.sides(color);
        let occupied = me | opp;

        (0..NUM_SQUARES)
            .filter(|&pos| (occupied & bit(pos)) == 0)
            .filter_map(|pos| {
                let flips = Self::collect_flips(pos, me, opp);
                if flips == 0 {
                    return None;
                }
                let (row, col) = pos_to_row_col(pos);
                Some(Move {
                    row: row as u8,
                    col: col as u8,
                    captured: mask_to_positions(flips),
                })
            })
            .collect()
    }

    pub fn has_legal_move(&self, color: Color) -> bool {
        let (me, opp) = self.sides(color);
        let occupied = me | opp;
        (0..NUM_SQUARES)
            .any(|pos| (occupied & bit(pos)) == 0 && Self::collect_flips(pos, me, opp) != 0)
    }

    /// Places `mv` for `color` and flips its captured discs.
    ///
    /// Caller contract: `mv` came from `legal_moves(color)` on this exact board.
    pub fn apply_move(&mut self, color: Color, mv: &Move) {
        let placed = mv
            .captured
            .iter()
            .fold(bit(index(mv.position())), |acc, &pos| acc | bit(index(pos)));

        match color {
            Color::Black => {
                self.black |= placed;
                self.white &= !placed;
            }
            Color::White => {
                self.white |= placed;
                self.black &= !placed;
            }
        }
    }

    /// Full board, or neither side can move.
    pub fn is_terminal(&self) -> bool {
        self.is_full() || (!self.has_legal_move(Color::Black) && !self.has_legal_move(Color::White))
    }

    pub fn is_full(&self) -> bool {
        self.empty_count() == 0
    }

    pub fn score(&self) -> Score {
        Score {
            black: self.black.count_ones() as u8,
            white: self.white.count_ones() as u8,
        }
    }

    /// Returns the number of empty squares.
    pub fn empty_count(&self) -> u8 {
        NUM_SQUARES as u8 - (self.black | self.white).count_ones() as u8
    }

    /// Returns the occupied corners as `(black, white)` counts.
    pub fn corner_counts(&self) -> (i32, i32) {
        const CORNERS: u64 = 1 | (1 << 7) | (1 << 56) | (1 << 63);
        (
            (self.black & CORNERS).count_ones() as i32,
            (self.white & CORNERS).count_ones() as i32,
        )
    }

    fn sides(&self, color: Color) -> (u64, u64) {
        match color {
            Color::Black => (self.black, self.white),
            Color::White => (self.white, self.black),
        }
    }

    fn collect_flips(pos: usize, me: u64, opp: u64) -> u64 {
        let move_bit = bit(pos);
        if move_bit == 0 || ((me | opp) & move_bit) != 0 {
            return 0;
        }

        let (row, col) = pos_to_row_col(pos);
        let mut flips = 0u64;

        for (dr, dc) in DIRECTIONS {
            let mut r = row + dr;
            let mut c = col + dc;
            let mut line = 0u64;

            while in_bounds(r, c) {
                let square = bit((r as usize) * BOARD_SIZE + c as usize);
                if (opp & square) != 0 {
                    line |= square;
                } else {
                    if (me & square) != 0 {
                        flips |= line;
                    }
                    break;
                }

                r += dr;
                c += dc;
            }
        }

        flips
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

fn bit(pos: usize) -> u64 {
    if pos < NUM_SQUARES { 1u64 << pos } else { 0 }
}

fn index(pos: Position) -> usize {
    pos.row as usize * BOARD_SIZE + pos.col as usize
}

fn pos_to_row_col(pos: usize) -> (i32, i32) {
    ((pos / BOARD_SIZE) as i32, (pos % BOARD_SIZE) as i32)
}

fn in_bounds(row: i32, col: i32) -> bool {
    (0..BOARD_SIZE as i32).contains(&row) && (0..BOARD_SIZE as i32).contains(&col)
}

fn mask_to_positions(mut mask: u64) -> Vec<Position> {
    let mut out = Vec::with_capacity(mask.count_ones() as usize);
    while mask != 0 {
        let (row, col) = pos_to_row_col(mask.trailing_zeros() as usize);
        out.push(Position::new(row as u8, col as u8));
        mask &= mask - 1;
    }
    out
}
