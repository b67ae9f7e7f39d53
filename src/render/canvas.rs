//! Character grid with playfield-to-cell mapping

use crate::consts::{FIELD_HEIGHT, FIELD_WIDTH};

/// Rows reserved above and below the playfield (score line, status line)
pub const HUD_ROWS: u16 = 2;

#[derive(Debug, Clone)]
pub struct Canvas {
    cols: u16,
    rows: u16,
    cells: Vec<char>,
}

impl Canvas {
    pub fn new(cols: u16, rows: u16) -> Self {
        let cols = cols.max(1);
        let rows = rows.max(HUD_ROWS + 1);
        Self {
            cols,
            rows,
            cells: vec![' '; cols as usize * rows as usize],
        }
    }

    pub fn cols(&self) -> u16 {
        self.cols
    }

    pub fn rows(&self) -> u16 {
        self.rows
    }

    pub fn get(&self, col: u16, row: u16) -> Option<char> {
        (col < self.cols && row < self.rows)
            .then(|| self.cells[row as usize * self.cols as usize + col as usize])
    }

    pub fn put(&mut self, col: i32, row: i32, ch: char) {
        if col >= 0 && row >= 0 && (col as u16) < self.cols && (row as u16) < self.rows {
            self.cells[row as usize * self.cols as usize + col as usize] = ch;
        }
    }

    /// Write text starting at `col`; clipped at the right edge
    pub fn text(&mut self, col: i32, row: i32, text: &str) {
        for (i, ch) in text.chars().enumerate() {
            self.put(col + i as i32, row, ch);
        }
    }

    pub fn text_centered(&mut self, row: i32, text: &str) {
        let width = text.chars().count() as i32;
        self.text((self.cols as i32 - width) / 2, row, text);
    }

    pub fn text_right(&mut self, row: i32, text: &str) {
        let width = text.chars().count() as i32;
        self.text(self.cols as i32 - width, row, text);
    }

    /// Rows available to the playfield
    pub fn field_rows(&self) -> u16 {
        self.rows - HUD_ROWS
    }

    /// Playfield x (px) to column
    pub fn col_for(&self, x: f32) -> i32 {
        ((x / FIELD_WIDTH) * self.cols as f32).floor() as i32
    }

    /// Playfield y (px) to row; the field starts below the score line
    pub fn row_for(&self, y: f32) -> i32 {
        let row = ((y / FIELD_HEIGHT) * self.field_rows() as f32).floor() as i32;
        1 + row.clamp(0, self.field_rows() as i32 - 1)
    }

    pub fn lines(&self) -> impl Iterator<Item = String> + '_ {
        self.cells
            .chunks(self.cols as usize)
            .map(|row| row.iter().collect())
    }
}
