//! Board rasteriser.

use std::collections::BTreeMap;

use crate::board::{BOARD_SIZE, Board};
use crate::png::{PngError, encode_png};
use crate::types::{Cell, Position};

pub const CELL_PX: u32 = 48;
pub const PAD_PX: u32 = 8;
pub const CANVAS_PX: u32 = BOARD_SIZE as u32 * CELL_PX + 2 * PAD_PX;

const GRID_WIDTH: u32 = 2;
const DISC_RADIUS: u32 = 19;
const RING_WIDTH: u32 = 2;
const LABEL_RADIUS: u32 = 14;
const GLYPH_SCALE: u32 = 4;

type Rgba = [u8; 4];

const BACKGROUND: Rgba = [0x2E, 0x7D, 0x32, 0xFF];
const GRID: Rgba = [0x1B, 0x3A, 0x1E, 0xFF];
const DARK_DISC: Rgba = [0x1C, 0x1C, 0x1C, 0xFF];
const LIGHT_DISC: Rgba = [0xF4, 0xF4, 0xF0, 0xFF];
const LIGHT_RING: Rgba = [0x30, 0x30, 0x30, 0xFF];
const LABEL_FILL: Rgba = [0xFF, 0xD5, 0x4F, 0xFF];
const LABEL_INK: Rgba = [0x21, 0x21, 0x21, 0xFF];

/// 3x5 digit bitmaps; each row uses the low three bits, MSB on the left.
const GLYPHS: [[u8; 5]; 10] = [
    [0b111, 0b101, 0b101, 0b101, 0b111],
    [0b010, 0b110, 0b010, 0b010, 0b111],
    [0b111, 0b001, 0b111, 0b100, 0b111],
    [0b111, 0b001, 0b111, 0b001, 0b111],
    [0b101, 0b101, 0b111, 0b001, 0b001],
    [0b111, 0b100, 0b111, 0b001, 0b111],
    [0b111, 0b100, 0b111, 0b101, 0b111],
    [0b111, 0b001, 0b010, 0b010, 0b010],
    [0b111, 0b101, 0b111, 0b101, 0b111],
    [0b111, 0b101, 0b111, 0b001, 0b111],
];
const GLYPH_W: u32 = 3;
const GLYPH_H: u32 = 5;

/// Tightly packed RGBA8 pixel buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Canvas {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl Canvas {
    pub fn new(width: u32, height: u32, fill: Rgba) -> Self {
        let pixels = fill
            .iter()
            .copied()
            .cycle()
            .take(width as usize * height as usize * 4)
            .collect();
        Self {
            width,
            height,
            pixels,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgba> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        self.pixels[i..i + 4].try_into().ok()
    }

    pub fn to_png(&self) -> Result<Vec<u8>, PngError> {
        encode_png(self.width, self.height, &self.pixels)
    }

    fn put(&mut self, x: u32, y: u32, color: Rgba) {
        if x < self.width && y < self.height {
            let i = (y as usize * self.width as usize + x as usize) * 4;
            self.pixels[i..i + 4].copy_from_slice(&color);
        }
    }

    fn fill_rect(&mut self, x: u32, y: u32, w: u32, h: u32, color: Rgba) {
        for py in y..y.saturating_add(h).min(self.height) {
            for px in x..x.saturating_add(w).min(self.width) {
                self.put(px, py, color);
            }
        }
    }

    /// Fills pixels whose centre lies within `outer` and outside `inner`
    /// (`inner == 0` gives a solid disc).
    fn fill_annulus(&mut self, cx: u32, cy: u32, inner: u32, outer: u32, color: Rgba) {
        // Work in doubled coordinates so pixel centres are integers.
        let (cx2, cy2) = (2 * cx as i64, 2 * cy as i64);
        let outer2 = (2 * outer as i64).pow(2);
        let inner2 = (2 * inner as i64).pow(2);
        for py in cy.saturating_sub(outer)..=(cy + outer).min(self.height - 1) {
            for px in cx.saturating_sub(outer)..=(cx + outer).min(self.width - 1) {
                let dx = 2 * px as i64 + 1 - cx2;
                let dy = 2 * py as i64 + 1 - cy2;
                let d2 = dx * dx + dy * dy;
                if d2 <= outer2 && (inner == 0 || d2 > inner2) {
                    self.put(px, py, color);
                }
            }
        }
    }

    fn draw_digit(&mut self, cx: u32, cy: u32, digit: u8, color: Rgba) {
        let Some(glyph) = GLYPHS.get(digit as usize) else {
            return;
        };
        let left = cx - GLYPH_W * GLYPH_SCALE / 2;
        let top = cy - GLYPH_H * GLYPH_SCALE / 2;
        for (row, bits) in glyph.iter().enumerate() {
            for col in 0..GLYPH_W {
                if bits & (1 << (GLYPH_W - 1 - col)) != 0 {
                    self.fill_rect(
                        left + col * GLYPH_SCALE,
                        top + row as u32 * GLYPH_SCALE,
                        GLYPH_SCALE,
                        GLYPH_SCALE,
                        color,
                    );
                }
            }
        }
    }
}

/// Pixel centre of a square.
pub fn cell_center(pos: Position) -> (u32, u32) {
    (
        PAD_PX + pos.col as u32 * CELL_PX + CELL_PX / 2,
        PAD_PX + pos.row as u32 * CELL_PX + CELL_PX / 2,
    )
}

/// Draws the board, then a numbered marker on every square in `labels`.
pub fn render_board(board: &Board, labels: &BTreeMap<Position, u8>) -> Canvas {
    let mut canvas = Canvas::new(CANVAS_PX, CANVAS_PX, BACKGROUND);
    let span = BOARD_SIZE as u32 * CELL_PX + GRID_WIDTH;

    for i in 0..=BOARD_SIZE as u32 {
        let offset = PAD_PX + i * CELL_PX - GRID_WIDTH / 2;
        canvas.fill_rect(offset, PAD_PX - GRID_WIDTH / 2, GRID_WIDTH, span, GRID);
        canvas.fill_rect(PAD_PX - GRID_WIDTH / 2, offset, span, GRID_WIDTH, GRID);
    }

    for row in 0..BOARD_SIZE as u8 {
        for col in 0..BOARD_SIZE as u8 {
            let pos = Position::new(row, col);
            let (cx, cy) = cell_center(pos);
            match board.cell(pos) {
                Cell::Empty => {}
                Cell::Black => canvas.fill_annulus(cx, cy, 0, DISC_RADIUS, DARK_DISC),
                Cell::White => {
                    canvas.fill_annulus(cx, cy, 0, DISC_RADIUS, LIGHT_DISC);
                    canvas.fill_annulus(cx, cy, DISC_RADIUS - RING_WIDTH, DISC_RADIUS, LIGHT_RING);
                }
            }
        }
    }

    for (&pos, &digit) in labels {
        let (cx, cy) = cell_center(pos);
        canvas.fill_annulus(cx, cy, 0, LABEL_RADIUS, LABEL_FILL);
        canvas.draw_digit(cx, cy, digit, LABEL_INK);
    }

    canvas
}
