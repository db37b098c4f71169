//! Tetrominoes: shape matrices, movement, rotation, gravity and lock-down timers.

use crate::playfield::Playfield;
use crate::sound::Sound;
use std::time::Duration;

/// Column of the matrix's left edge when a piece spawns.
pub const SPAWN_X: i32 = 4;
/// Row of the matrix's bottom edge when a piece spawns (the I piece sits one lower).
pub const SPAWN_Y: i32 = 19;

/// After this many move/rotate resets, the lock-down timer keeps running.
pub const LOCK_RESET_LIMIT: u32 = 15;

/// Tetromino kinds (I, O, T, S, Z, J, L).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TetrominoKind {
    I,
    O,
    T,
    S,
    Z,
    J,
    L,
}

impl TetrominoKind {
    pub const ALL: [Self; 7] = [Self::I, Self::O, Self::T, Self::S, Self::Z, Self::J, Self::L];

    /// Spawn orientation, top row first.
    fn rows(self) -> &'static [&'static str] {
        match self {
            Self::O => &[".OO.", ".OO.", "...."],
            Self::I => &["....", "IIII", "....", "...."],
            Self::T => &[".T.", "TTT", "..."],
            Self::L => &["..L", "LLL", "..."],
            Self::J => &["J..", "JJJ", "..."],
            Self::S => &[".SS", "SS.", "..."],
            Self::Z => &["ZZ.", ".ZZ", "..."],
        }
    }

    pub fn shape(self) -> Shape {
        Shape::parse(self.rows())
    }

    /// Theme colour slot (0..7).
    pub fn color_index(self) -> usize {
        match self {
            Self::O => 0,
            Self::I => 1,
            Self::T => 2,
            Self::L => 3,
            Self::J => 4,
            Self::S => 5,
            Self::Z => 6,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::I => "I",
            Self::O => "O",
            Self::T => "T",
            Self::S => "S",
            Self::Z => "Z",
            Self::J => "J",
            Self::L => "L",
        }
    }
}

/// Piece matrix of at most 4x4 cells. `cells[row][col]`, row 0 is the top.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shape {
    width: usize,
    height: usize,
    cells: [[bool; 4]; 4],
}

impl Shape {
    fn parse(rows: &[&str]) -> Self {
        let mut cells = [[false; 4]; 4];
        let mut width = 0;
        for (r, row) in rows.iter().enumerate() {
            width = width.max(row.len());
            for (c, ch) in row.chars().enumerate() {
                cells[r][c] = ch != '.';
            }
        }
        Self {
            width,
            height: rows.len(),
            cells,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn is_filled(&self, row: usize, col: usize) -> bool {
        row < self.height && col < self.width && self.cells[row][col]
    }

    /// Filled cells as (dx, dy) offsets from the bottom-left corner, dy growing upwards.
    pub fn offsets(&self) -> impl Iterator<Item = (i32, i32)> + '_ {
        (0..self.height).flat_map(move |r| {
            (0..self.width)
                .filter(move |&c| self.cells[r][c])
                .map(move |c| (c as i32, (self.height - 1 - r) as i32))
        })
    }

    /// Reverse the rows, then transpose.
    pub fn rotated_cw(&self) -> Self {
        let mut cells = [[false; 4]; 4];
        for (r, row) in cells.iter_mut().enumerate().take(self.width) {
            for (c, cell) in row.iter_mut().enumerate().take(self.height) {
                *cell = self.cells[self.height - 1 - c][r];
            }
        }
        Self {
            width: self.height,
            height: self.width,
            cells,
        }
    }

    /// Transpose, then reverse the rows.
    pub fn rotated_ccw(&self) -> Self {
        let mut cells = [[false; 4]; 4];
        for (r, row) in cells.iter_mut().enumerate().take(self.width) {
            for (c, cell) in row.iter_mut().enumerate().take(self.height) {
                *cell = self.cells[c][self.width - 1 - r];
            }
        }
        Self {
            width: self.height,
            height: self.width,
            cells,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rotation {
    Clockwise,
    CounterClockwise,
}

/// What a frame of gravity and lock-down did to the piece.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PieceUpdate {
    Falling,
    Lock,
}

/// The falling piece: matrix, position of its bottom-left corner, and timers.
#[derive(Debug, Clone)]
pub struct Piece {
    pub kind: TetrominoKind,
    pub shape: Shape,
    pub x: i32,
    pub y: i32,
    lock_delay: Duration,
    gravity_elapsed: Duration,
    /// Time spent since touchdown; `None` while airborne.
    lock_elapsed: Option<Duration>,
    lock_resets: u32,
}

impl Piece {
    pub fn spawn(kind: TetrominoKind, lock_delay: Duration) -> Self {
        let y = if kind == TetrominoKind::I { SPAWN_Y - 1 } else { SPAWN_Y };
        Self::at(kind, SPAWN_X, y, lock_delay)
    }

    pub fn at(kind: TetrominoKind, x: i32, y: i32, lock_delay: Duration) -> Self {
        Self {
            kind,
            shape: kind.shape(),
            x,
            y,
            lock_delay,
            gravity_elapsed: Duration::ZERO,
            lock_elapsed: None,
            lock_resets: 0,
        }
    }

    /// Grid cells covered by the piece.
    pub fn cells(&self) -> impl Iterator<Item = (i32, i32)> + '_ {
        self.shape.offsets().map(|(dx, dy)| (self.x + dx, self.y + dy))
    }

    pub fn is_blocked_out(&self, field: &Playfield) -> bool {
        field.collides(&self.shape, self.x, self.y)
    }

    pub fn is_landed(&self, field: &Playfield) -> bool {
        field.collides(&self.shape, self.x, self.y - 1)
    }

    pub fn is_lock_pending(&self) -> bool {
        self.lock_elapsed.is_some()
    }

    /// Rows the piece can fall before it lands.
    pub fn drop_distance(&self, field: &Playfield) -> i32 {
        let mut distance = 0;
        while !field.collides(&self.shape, self.x, self.y - distance - 1) {
            distance += 1;
        }
        distance
    }

    pub fn move_left(&mut self, field: &Playfield, sounds: &mut Vec<Sound>) -> bool {
        self.shift(field, -1, sounds)
    }

    pub fn move_right(&mut self, field: &Playfield, sounds: &mut Vec<Sound>) -> bool {
        self.shift(field, 1, sounds)
    }

    fn shift(&mut self, field: &Playfield, dx: i32, sounds: &mut Vec<Sound>) -> bool {
        if field.collides(&self.shape, self.x + dx, self.y) {
            return false;
        }
        self.x += dx;
        self.reset_lock_delay();
        sounds.push(Sound::Move);
        true
    }

    /// One row down. On touchdown the lock-down timer starts.
    pub fn move_down(&mut self, field: &Playfield, sounds: &mut Vec<Sound>) -> bool {
        if !field.collides(&self.shape, self.x, self.y - 1) {
            self.y -= 1;
            self.lock_elapsed = None;
            sounds.push(Sound::Fall);
            return true;
        }
        if self.lock_elapsed.is_none() {
            self.lock_elapsed = Some(Duration::ZERO);
            sounds.push(Sound::Touchdown);
        }
        false
    }

    /// Rotate in place. The O piece has no distinct rotations.
    pub fn rotate(&mut self, field: &Playfield, rotation: Rotation, sounds: &mut Vec<Sound>) -> bool {
        if self.kind == TetrominoKind::O {
            return false;
        }
        let attempt = match rotation {
            Rotation::Clockwise => self.shape.rotated_cw(),
            Rotation::CounterClockwise => self.shape.rotated_ccw(),
        };
        if field.collides(&attempt, self.x, self.y) {
            sounds.push(Sound::RotateFail);
            return false;
        }
        self.shape = attempt;
        self.reset_lock_delay();
        sounds.push(Sound::Rotate);
        true
    }

    /// Move straight to the landing row; returns rows travelled.
    pub fn hard_drop(&mut self, field: &Playfield) -> u32 {
        let distance = self.drop_distance(field);
        self.y -= distance;
        distance as u32
    }

    fn reset_lock_delay(&mut self) {
        if self.lock_elapsed.is_some() && self.lock_resets < LOCK_RESET_LIMIT {
            self.lock_elapsed = Some(Duration::ZERO);
            self.lock_resets += 1;
        }
    }

    /// Advance gravity and lock-down by `dt`.
    pub fn update(
        &mut self,
        dt: Duration,
        field: &Playfield,
        fall_interval: Duration,
        sounds: &mut Vec<Sound>,
    ) -> PieceUpdate {
        if let Some(elapsed) = self.lock_elapsed.as_mut() {
            *elapsed += dt;
            if *elapsed >= self.lock_delay {
                if self.is_landed(field) {
                    return PieceUpdate::Lock;
                }
                // Slid off a ledge: airborne again.
                self.lock_elapsed = None;
            }
        }

        self.gravity_elapsed += dt;
        while self.gravity_elapsed >= fall_interval {
            self.gravity_elapsed -= fall_interval;
            if !self.move_down(field, sounds) {
                self.gravity_elapsed = Duration::ZERO;
                break;
            }
        }
        PieceUpdate::Falling
    }
}

/// Time between gravity steps at `level` (1-based).
pub fn fall_interval(level: u32) -> Duration {
    let n = level.saturating_sub(1) as i32;
    let seconds = (0.8 - f64::from(n) * 0.007).powi(n);
    Duration::from_secs_f64(seconds)
}
