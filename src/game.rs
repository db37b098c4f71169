//! Game state: playfield, falling piece, bag, score and level.

use crate::GameConfig;
use crate::bag::Bag;
use crate::input::Action;
use crate::piece::{Piece, PieceUpdate, Rotation, TetrominoKind, fall_interval};
use crate::playfield::Playfield;
use crate::sound::Sound;
use std::time::Duration;

/// One simulation step at 60 Hz.
pub const FRAME: Duration = Duration::from_nanos(1_000_000_000 / 60);

pub const MAX_LEVEL: u32 = 15;
pub const LINES_PER_LEVEL: u32 = 10;

/// Base points for clearing 1..=4 lines, multiplied by the level.
const LINE_SCORES: [u32; 5] = [0, 100, 300, 500, 800];
const SOFT_DROP_POINTS: u32 = 1;
const HARD_DROP_POINTS: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameOverReason {
    /// A piece settled above the skyline.
    LockOut,
    /// A new piece spawned on top of settled blocks.
    BlockOut,
}

/// Points awarded for clearing `lines` rows at `level`.
pub fn line_clear_score(lines: usize, level: u32) -> u32 {
    LINE_SCORES.get(lines).copied().unwrap_or(0) * level
}

/// Level reached after `lines` cleared when starting at `initial_level`.
pub fn level_for(initial_level: u32, lines: u32) -> u32 {
    (initial_level + lines / LINES_PER_LEVEL).min(MAX_LEVEL)
}

#[derive(Debug)]
pub struct GameState {
    pub playfield: Playfield,
    pub piece: Option<Piece>,
    bag: Bag,
    config: GameConfig,
    pub score: u32,
    pub level: u32,
    pub lines_cleared: u32,
    pub game_over: Option<GameOverReason>,
    pub paused: bool,
    /// Full rows waiting for the clear animation to finish; the simulation holds meanwhile.
    pub clearing_rows: Vec<usize>,
    sounds: Vec<Sound>,
}

impl GameState {
    pub fn new(config: &GameConfig) -> Self {
        let bag = config.seed.map_or_else(Bag::new, Bag::with_seed);
        let mut state = Self {
            playfield: Playfield::new(),
            piece: None,
            bag,
            config: config.clone(),
            score: 0,
            level: config.initial_level,
            lines_cleared: 0,
            game_over: None,
            paused: false,
            clearing_rows: Vec::new(),
            sounds: Vec::new(),
        };
        state.spawn_next();
        state
    }

    /// Start over with the same configuration.
    pub fn restart(&mut self) {
        log::info!(
            "restart (previous game: score {}, level {}, lines {})",
            self.score,
            self.level,
            self.lines_cleared
        );
        *self = Self::new(&self.config);
    }

    pub fn is_over(&self) -> bool {
        self.game_over.is_some()
    }

    pub fn is_clearing(&self) -> bool {
        !self.clearing_rows.is_empty()
    }

    fn can_control(&self) -> bool {
        !self.paused && !self.is_over() && !self.is_clearing()
    }

    /// Pause or resume. Ignored after game over and while cleared rows fade out.
    pub fn toggle_pause(&mut self) {
        if self.is_over() || self.is_clearing() {
            return;
        }
        self.paused = !self.paused;
        log::debug!("paused: {}", self.paused);
    }

    /// Upcoming pieces for the Next preview.
    pub fn next_pieces(&self) -> impl Iterator<Item = TetrominoKind> + '_ {
        self.bag.peek(self.config.preview)
    }

    /// Sound cues raised since the last call.
    pub fn drain_sounds(&mut self) -> std::vec::Drain<'_, Sound> {
        self.sounds.drain(..)
    }

    /// Lines cleared within the current level, out of a full level step.
    pub fn level_progress(&self) -> (u32, u32) {
        (self.lines_cleared % LINES_PER_LEVEL, LINES_PER_LEVEL)
    }

    /// Forward a player action to the falling piece.
    pub fn handle(&mut self, action: Action) {
        match action {
            Action::MoveLeft => self.move_left(),
            Action::MoveRight => self.move_right(),
            Action::RotateCw => self.rotate(Rotation::Clockwise),
            Action::RotateCcw => self.rotate(Rotation::CounterClockwise),
            Action::SoftDrop => self.soft_drop(),
            Action::HardDrop => self.hard_drop(),
            Action::Pause => self.toggle_pause(),
            Action::Restart => {
                if self.is_over() {
                    self.restart();
                }
            }
            Action::Quit | Action::None => {}
        }
    }

    pub fn move_left(&mut self) {
        if !self.can_control() {
            return;
        }
        if let Some(piece) = self.piece.as_mut() {
            piece.move_left(&self.playfield, &mut self.sounds);
        }
    }

    pub fn move_right(&mut self) {
        if !self.can_control() {
            return;
        }
        if let Some(piece) = self.piece.as_mut() {
            piece.move_right(&self.playfield, &mut self.sounds);
        }
    }

    pub fn rotate(&mut self, rotation: Rotation) {
        if !self.can_control() {
            return;
        }
        if let Some(piece) = self.piece.as_mut() {
            piece.rotate(&self.playfield, rotation, &mut self.sounds);
        }
    }

    pub fn soft_drop(&mut self) {
        if !self.can_control() {
            return;
        }
        if let Some(piece) = self.piece.as_mut() {
            if piece.move_down(&self.playfield, &mut self.sounds) {
                self.score += SOFT_DROP_POINTS;
            }
        }
    }

    pub fn hard_drop(&mut self) {
        if !self.can_control() {
            return;
        }
        if let Some(piece) = self.piece.as_mut() {
            let rows = piece.hard_drop(&self.playfield);
            self.score += rows * HARD_DROP_POINTS;
            self.sounds.push(Sound::HardDrop);
            self.lock_piece();
        }
    }

    /// Advance gravity and lock-down by `dt`.
    pub fn tick(&mut self, dt: Duration) {
        if !self.can_control() {
            return;
        }
        let interval = fall_interval(self.level);
        let update = match self.piece.as_mut() {
            Some(piece) => piece.update(dt, &self.playfield, interval, &mut self.sounds),
            None => return,
        };
        if update == PieceUpdate::Lock {
            self.lock_piece();
        }
    }

    fn lock_piece(&mut self) {
        let Some(piece) = self.piece.take() else {
            return;
        };
        let result = self.playfield.lock(&piece);
        self.sounds.push(Sound::Lockdown);
        log::debug!(
            "locked {} at ({}, {}), {} blocks settled",
            piece.kind.name(),
            piece.x,
            piece.y,
            self.playfield.block_count()
        );

        if result.locked_out {
            self.end(GameOverReason::LockOut);
            return;
        }

        let rows = self.playfield.full_rows();
        if rows.is_empty() {
            self.spawn_next();
            return;
        }
        self.award_lines(rows.len());
        if self.config.animate_clears {
            self.clearing_rows = rows;
        } else {
            self.playfield.refresh();
            self.spawn_next();
        }
    }

    fn award_lines(&mut self, count: usize) {
        let points = line_clear_score(count, self.level);
        self.score += points;
        self.lines_cleared += count as u32;
        self.sounds.push(Sound::LineClear);
        log::info!("cleared {count} line(s) for {points} points at level {}", self.level);

        let level = level_for(self.config.initial_level, self.lines_cleared);
        if level > self.level {
            self.level = level;
            self.sounds.push(Sound::LevelUp);
            log::info!("level up: {level}");
        }
    }

    /// Remove the rows held for the clear animation and continue with the next piece.
    pub fn finish_line_clear(&mut self) {
        if self.clearing_rows.is_empty() {
            return;
        }
        let rows = std::mem::take(&mut self.clearing_rows);
        self.playfield.clear_rows(&rows);
        self.spawn_next();
    }

    fn spawn_next(&mut self) {
        let kind = self.bag.next();
        let piece = Piece::spawn(kind, Duration::from_millis(self.config.lock_delay_ms));
        let blocked = piece.is_blocked_out(&self.playfield);
        self.piece = Some(piece);
        if blocked {
            self.end(GameOverReason::BlockOut);
        }
    }

    fn end(&mut self, reason: GameOverReason) {
        self.game_over = Some(reason);
        self.sounds.push(Sound::GameOver);
        log::info!(
            "game over ({reason:?}): score {}, level {}, lines {}",
            self.score,
            self.level,
            self.lines_cleared
        );
    }
}
