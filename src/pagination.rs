//! Paging of the legal-move list and the reaction set derived from it.

use std::collections::BTreeMap;

use crate::board::Move;
use crate::messaging::ReactionEmoji;
use crate::types::Position;

/// One digit reaction per move, so a page can never exceed ten.
pub const PAGE_SIZE: usize = 10;

pub fn total_pages(move_count: usize) -> usize {
    move_count.div_ceil(PAGE_SIZE).max(1)
}

pub fn clamp_page(page: usize, move_count: usize) -> usize {
    page.min(total_pages(move_count) - 1)
}

/// The moves shown on `page` (clamped).
pub fn page_slice(moves: &[Move], page: usize) -> &[Move] {
    let start = clamp_page(page, moves.len()) * PAGE_SIZE;
    let end = (start + PAGE_SIZE).min(moves.len());
    &moves[start.min(end)..end]
}

/// Digit labels for the visible moves, keyed by square.
pub fn label_map(visible: &[Move]) -> BTreeMap<Position, u8> {
    visible
        .iter()
        .enumerate()
        .map(|(i, mv)| (mv.position(), i as u8))
        .collect()
}

/// Cheap summary of what the reaction row depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fingerprint {
    pub visible: usize,
    pub page: usize,
    pub total_pages: usize,
}

impl Fingerprint {
    pub fn new(move_count: usize, page: usize) -> Self {
        let page = clamp_page(page, move_count);
        let start = page * PAGE_SIZE;
        Self {
            visible: move_count.saturating_sub(start).min(PAGE_SIZE),
            page,
            total_pages: total_pages(move_count),
        }
    }

    /// Digits for each visible move, then the navigation arrows that apply.
    pub fn desired_reactions(&self) -> Vec<ReactionEmoji> {
        let mut out: Vec<ReactionEmoji> = (0..self.visible as u8).map(ReactionEmoji::Digit).collect();
        if self.page > 0 {
            out.push(ReactionEmoji::Prev);
        }
        if self.page + 1 < self.total_pages {
            out.push(ReactionEmoji::Next);
        }
        out
    }
}
