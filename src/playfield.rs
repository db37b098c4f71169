//! Playfield: walled grid of settled blocks, locking and line clears.

use crate::piece::{Piece, Shape, TetrominoKind};

/// Grid columns including both walls.
pub const COLS: usize = 12;
/// Grid rows including the floor and the buffer zone above the skyline.
pub const ROWS: usize = 24;
/// Highest visible row; anything above is the buffer zone.
pub const SKYLINE: usize = 20;

/// Single cell of the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cell {
    Empty,
    Wall,
    Block(TetrominoKind),
}

/// Outcome of writing a piece into the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockResult {
    /// At least one block settled above the skyline.
    pub locked_out: bool,
}

/// Playfield: `rows[y][x]`, y = 0 is the floor.
#[derive(Debug, Clone)]
pub struct Playfield {
    rows: [[Cell; COLS]; ROWS],
}

impl Playfield {
    pub fn new() -> Self {
        let mut rows = [[Cell::Empty; COLS]; ROWS];
        for (y, row) in rows.iter_mut().enumerate() {
            *row = Self::empty_row();
            if y == 0 {
                *row = [Cell::Wall; COLS];
            }
        }
        Self { rows }
    }

    fn empty_row() -> [Cell; COLS] {
        let mut row = [Cell::Empty; COLS];
        row[0] = Cell::Wall;
        row[COLS - 1] = Cell::Wall;
        row
    }

    fn is_wall(x: usize, y: usize) -> bool {
        x == 0 || x == COLS - 1 || y == 0
    }

    #[inline]
    pub fn get(&self, x: i32, y: i32) -> Option<Cell> {
        if x < 0 || y < 0 {
            return None;
        }
        self.rows
            .get(y as usize)
            .and_then(|row| row.get(x as usize))
            .copied()
    }

    #[inline]
    pub fn is_free(&self, x: i32, y: i32) -> bool {
        self.get(x, y) == Some(Cell::Empty)
    }

    /// Overwrite a playable cell; walls, floor and out-of-range writes are ignored.
    pub fn set(&mut self, x: i32, y: i32, cell: Cell) {
        if self.get(x, y).is_none() || Self::is_wall(x as usize, y as usize) {
            return;
        }
        self.rows[y as usize][x as usize] = cell;
    }

    /// True if `shape` placed with its bottom-left corner at (x, y) overlaps anything.
    pub fn collides(&self, shape: &Shape, x: i32, y: i32) -> bool {
        shape
            .offsets()
            .any(|(dx, dy)| !self.is_free(x + dx, y + dy))
    }

    /// Write the piece's blocks into the grid.
    pub fn lock(&mut self, piece: &Piece) -> LockResult {
        let mut locked_out = false;
        for (x, y) in piece.cells() {
            self.set(x, y, Cell::Block(piece.kind));
            if y > SKYLINE as i32 {
                locked_out = true;
            }
        }
        LockResult { locked_out }
    }

    fn is_full(row: &[Cell; COLS]) -> bool {
        row[1..COLS - 1]
            .iter()
            .all(|c| matches!(c, Cell::Block(_)))
    }

    /// Rows (bottom-up) whose playable cells are all blocks.
    pub fn full_rows(&self) -> Vec<usize> {
        (1..ROWS).filter(|&y| Self::is_full(&self.rows[y])).collect()
    }

    /// Remove `rows` and let everything above drop into the gap.
    pub fn clear_rows(&mut self, rows: &[usize]) -> usize {
        let mut kept = Vec::with_capacity(ROWS);
        for (y, row) in self.rows.iter().enumerate().skip(1) {
            if !rows.contains(&y) {
                kept.push(*row);
            }
        }
        let cleared = ROWS - 1 - kept.len();
        kept.resize(ROWS - 1, Self::empty_row());
        for (dst, src) in self.rows[1..].iter_mut().zip(kept) {
            *dst = src;
        }
        cleared
    }

    /// Clear every full row; returns how many were removed.
    pub fn refresh(&mut self) -> usize {
        let rows = self.full_rows();
        self.clear_rows(&rows)
    }

    /// Number of settled blocks.
    pub fn block_count(&self) -> usize {
        self.rows
            .iter()
            .flatten()
            .filter(|c| matches!(c, Cell::Block(_)))
            .count()
    }
}

impl Default for Playfield {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn fill_row(field: &mut Playfield, y: i32, gap: Option<i32>) {
        for x in 1..(COLS as i32 - 1) {
            if Some(x) != gap {
                field.set(x, y, Cell::Block(TetrominoKind::Z));
            }
        }
    }

    #[test]
    fn test_new_has_walls_and_floor() {
        let field = Playfield::new();
        for y in 0..ROWS as i32 {
            assert_eq!(field.get(0, y), Some(Cell::Wall));
            assert_eq!(field.get(COLS as i32 - 1, y), Some(Cell::Wall));
        }
        for x in 0..COLS as i32 {
            assert_eq!(field.get(x, 0), Some(Cell::Wall));
        }
        assert!(field.is_free(5, 1));
        assert_eq!(field.block_count(), 0);
    }

    #[test]
    fn test_get_out_of_bounds() {
        let field = Playfield::new();
        assert_eq!(field.get(-1, 3), None);
        assert_eq!(field.get(3, -1), None);
        assert_eq!(field.get(COLS as i32, 3), None);
        assert_eq!(field.get(3, ROWS as i32), None);
        assert!(!field.is_free(3, ROWS as i32));
    }

    #[test]
    fn test_set_ignores_walls() {
        let mut field = Playfield::new();
        field.set(0, 5, Cell::Empty);
        field.set(4, 0, Cell::Empty);
        field.set(99, 5, Cell::Block(TetrominoKind::T));
        assert_eq!(field.get(0, 5), Some(Cell::Wall));
        assert_eq!(field.get(4, 0), Some(Cell::Wall));
    }

    #[test]
    fn test_lock_writes_blocks() {
        let mut field = Playfield::new();
        let piece = Piece::at(TetrominoKind::S, 1, 1, Duration::ZERO);
        let result = field.lock(&piece);
        assert!(!result.locked_out);
        // S bottom matrix row is empty: cells at (1,2),(2,2),(2,3),(3,3).
        assert_eq!(field.get(1, 2), Some(Cell::Block(TetrominoKind::S)));
        assert_eq!(field.get(2, 2), Some(Cell::Block(TetrominoKind::S)));
        assert_eq!(field.get(2, 3), Some(Cell::Block(TetrominoKind::S)));
        assert_eq!(field.get(3, 3), Some(Cell::Block(TetrominoKind::S)));
        assert_eq!(field.block_count(), 4);
    }

    #[test]
    fn test_lock_above_skyline_is_lock_out() {
        let mut field = Playfield::new();
        let piece = Piece::spawn(TetrominoKind::T, Duration::ZERO);
        assert!(field.lock(&piece).locked_out);
    }

    #[test]
    fn test_full_rows_and_clear() {
        let mut field = Playfield::new();
        fill_row(&mut field, 1, None);
        fill_row(&mut field, 2, Some(4));
        fill_row(&mut field, 3, None);
        field.set(7, 4, Cell::Block(TetrominoKind::I));
        assert_eq!(field.full_rows(), vec![1, 3]);

        assert_eq!(field.refresh(), 2);
        assert!(field.full_rows().is_empty());
        // The gapped row drops to the bottom, the lone block lands on top of it.
        assert!(field.is_free(4, 1));
        assert_eq!(field.get(5, 1), Some(Cell::Block(TetrominoKind::Z)));
        assert_eq!(field.get(7, 2), Some(Cell::Block(TetrominoKind::I)));
        assert!(field.is_free(7, 4));
        assert_eq!(field.block_count(), 10);
        // Walls survive the shift.
        assert_eq!(field.get(0, ROWS as i32 - 1), Some(Cell::Wall));
        assert_eq!(field.get(COLS as i32 - 1, ROWS as i32 - 1), Some(Cell::Wall));
    }

    #[test]
    fn test_collides_with_blocks() {
        let mut field = Playfield::new();
        let shape = TetrominoKind::O.shape();
        assert!(!field.collides(&shape, 4, 1));
        field.set(5, 2, Cell::Block(TetrominoKind::L));
        assert!(field.collides(&shape, 4, 1));
        // O's bottom matrix row is empty, so it may hang over the floor row.
        assert!(!field.collides(&shape, 6, 0));
        assert!(field.collides(&shape, 6, -1));
    }
}
