//! Layout and drawing: playfield, falling piece, next preview, stats, pause and game over.

use crate::game::{GameOverReason, GameState};
use crate::piece::TetrominoKind;
use crate::playfield::{COLS, Cell, SKYLINE};
use crate::theme::Theme;
use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Position, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Gauge, Paragraph, Widget};
use std::collections::HashSet;
use std::time::Instant;
use tachyonfx::{
    CellFilter, Duration as TfxDuration, Effect, EffectRenderer, Interpolation, fx, ref_count,
};

/// Each grid cell is two terminal columns wide so blocks look square.
const CELL_WIDTH: u16 = 2;
/// Board in terminal cells: every column including walls, rows from the floor to the skyline.
const BOARD_WIDTH: u16 = COLS as u16 * CELL_WIDTH;
const BOARD_HEIGHT: u16 = SKYLINE as u16 + 1;
/// Title line above the board.
const HEADER_HEIGHT: u16 = 1;
const SIDEBAR_WIDTH: u16 = 24;
const SIDEBAR_GAP: u16 = 2;
/// Rows per piece in the Next box.
const PREVIEW_SLOT: u16 = 3;

/// Duration of the line-clear fade (TachyonFX) in ms.
const LINE_CLEAR_FADE_MS: u32 = 300;

const BLOCK: &str = "██";

/// Line-clear fade effect and the time it was last advanced.
#[derive(Default)]
pub struct LineClearFx {
    effect: Option<Effect>,
    last_process: Option<Instant>,
}

impl LineClearFx {
    /// True once the fade has run to completion.
    pub fn is_done(&self) -> bool {
        self.effect.as_ref().is_some_and(Effect::done)
    }

    pub fn reset(&mut self) {
        self.effect = None;
        self.last_process = None;
    }
}

/// Terminal size needed to show the whole game.
pub fn required_size() -> (u16, u16) {
    (
        BOARD_WIDTH + SIDEBAR_GAP + SIDEBAR_WIDTH,
        BOARD_HEIGHT + HEADER_HEIGHT,
    )
}

/// Board rect (walls included) for the given screen area; matches `draw` layout.
fn board_rect(area: Rect) -> Rect {
    let (w, h) = required_size();
    let x = area.x + area.width.saturating_sub(w) / 2;
    let y = area.y + area.height.saturating_sub(h) / 2 + HEADER_HEIGHT;
    Rect {
        x,
        y,
        width: BOARD_WIDTH,
        height: BOARD_HEIGHT,
    }
}

/// Screen position of grid cell (x, y); `None` above the skyline.
fn cell_position(board: Rect, x: i32, y: i32) -> Option<(u16, u16)> {
    if x < 0 || y < 0 || y > SKYLINE as i32 || x >= COLS as i32 {
        return None;
    }
    Some((
        board.x + x as u16 * CELL_WIDTH,
        board.y + (SKYLINE as i32 - y) as u16,
    ))
}

/// Draw the whole game screen.
pub fn draw(frame: &mut Frame, state: &GameState, theme: &Theme, fx: &mut LineClearFx, now: Instant) {
    let area = frame.area();
    let (need_w, need_h) = required_size();
    if area.width < need_w || area.height < need_h {
        draw_too_small(frame, theme, area, need_w, need_h);
        return;
    }

    let board = board_rect(area);
    draw_header(frame, state, theme, board);
    draw_playfield(frame, state, theme, board);
    let sidebar = Rect {
        x: board.x + board.width + SIDEBAR_GAP,
        y: board.y - HEADER_HEIGHT,
        width: SIDEBAR_WIDTH,
        height: board.height + HEADER_HEIGHT,
    };
    draw_sidebar(frame, state, theme, sidebar);

    if state.is_clearing() {
        apply_line_clear_effect(frame, state, theme, board, fx, now);
    }
    if let Some(reason) = state.game_over {
        draw_game_over(frame, state, theme, board, reason);
    } else if state.paused {
        draw_pause_overlay(frame, theme, board);
    }
}

fn draw_too_small(frame: &mut Frame, theme: &Theme, area: Rect, need_w: u16, need_h: u16) {
    let lines = vec![
        Line::from(Span::styled(
            " Terminal too small ",
            Style::default().fg(Color::Black).bg(theme.title),
        )),
        Line::from(format!("need {}×{}, have {}×{}", need_w, need_h, area.width, area.height)),
    ];
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .style(Style::default().fg(theme.main_fg))
        .render(area, frame.buffer_mut());
}

fn draw_header(frame: &mut Frame, state: &GameState, theme: &Theme, board: Rect) {
    let title = Line::from(vec![
        Span::styled(
            " Tetrix ",
            Style::default().fg(theme.title).add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!("tui  L{} ", state.level),
            Style::default().fg(theme.main_fg),
        ),
    ]);
    let header = Rect {
        x: board.x,
        y: board.y.saturating_sub(HEADER_HEIGHT),
        width: board.width,
        height: HEADER_HEIGHT,
    };
    Paragraph::new(title)
        .alignment(Alignment::Center)
        .render(header, frame.buffer_mut());
}

fn paint(frame: &mut Frame, pos: (u16, u16), fg: Color, bg: Color) {
    let buf = frame.buffer_mut();
    for dx in 0..CELL_WIDTH {
        buf[(pos.0 + dx, pos.1)]
            .set_symbol("█")
            .set_style(Style::default().fg(fg).bg(bg));
    }
}

fn draw_playfield(frame: &mut Frame, state: &GameState, theme: &Theme, board: Rect) {
    for y in 0..=SKYLINE as i32 {
        for x in 0..COLS as i32 {
            let Some(pos) = cell_position(board, x, y) else {
                continue;
            };
            match state.playfield.get(x, y) {
                Some(Cell::Wall) => paint(frame, pos, theme.wall, theme.bg),
                Some(Cell::Block(kind)) => paint(frame, pos, theme.piece_color(kind), theme.bg),
                _ => {
                    let buf = frame.buffer_mut();
                    for dx in 0..CELL_WIDTH {
                        buf[(pos.0 + dx, pos.1)]
                            .set_symbol(if dx == 0 { "·" } else { " " })
                            .set_style(Style::default().fg(theme.div_line).bg(theme.bg));
                    }
                }
            }
        }
    }

    if let Some(piece) = &state.piece {
        let color = theme.piece_color(piece.kind);
        // Cells above the skyline stay hidden.
        for (x, y) in piece.cells() {
            if let Some(pos) = cell_position(board, x, y) {
                paint(frame, pos, color, theme.bg);
            }
        }
    }
}

/// Buffer positions covered by the rows being cleared.
fn clearing_buffer_positions(board: Rect, rows: &[usize]) -> HashSet<(u16, u16)> {
    let mut set = HashSet::new();
    for &y in rows {
        for x in 1..(COLS as i32 - 1) {
            if let Some((bx, by)) = cell_position(board, x, y as i32) {
                for dx in 0..CELL_WIDTH {
                    set.insert((bx + dx, by));
                }
            }
        }
    }
    set
}

/// Create or update the line-clear fade effect and process it.
fn apply_line_clear_effect(
    frame: &mut Frame,
    state: &GameState,
    theme: &Theme,
    board: Rect,
    fx_state: &mut LineClearFx,
    now: Instant,
) {
    let delta = fx_state
        .last_process
        .map(|t| now.saturating_duration_since(t))
        .unwrap_or(std::time::Duration::ZERO);
    let delta_ms = delta.as_millis().min(u32::MAX as u128) as u32;
    let tfx_delta = TfxDuration::from_millis(delta_ms);
    fx_state.last_process = Some(now);

    if fx_state.effect.is_none() {
        let clearing_set = clearing_buffer_positions(board, &state.clearing_rows);
        let filter = CellFilter::PositionFn(ref_count(move |pos: Position| {
            clearing_set.contains(&(pos.x, pos.y))
        }));
        let effect = fx::fade_to(Color::White, theme.bg, (LINE_CLEAR_FADE_MS, Interpolation::Linear))
            .with_filter(filter)
            .with_area(board);
        fx_state.effect = Some(effect);
    }

    if let Some(effect) = fx_state.effect.as_mut() {
        frame.render_effect(effect, board, tfx_delta);
    }
}

fn boxed(title: &str, theme: &Theme) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
        .title(Span::styled(
            format!(" {title} "),
            Style::default().fg(theme.title),
        ))
}

fn draw_sidebar(frame: &mut Frame, state: &GameState, theme: &Theme, area: Rect) {
    let preview: Vec<TetrominoKind> = state.next_pieces().collect();
    // Two rows per piece with a blank row between them.
    let next_height = 2 + (PREVIEW_SLOT * preview.len() as u16).saturating_sub(1);
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(next_height), // Next
            Constraint::Length(6),           // Score, Level, Lines, progress
            Constraint::Fill(1),             // Keys
        ])
        .split(area);

    // --- Next ---
    let next_block = boxed("Next", theme);
    let next_inner = next_block.inner(chunks[0]);
    next_block.render(chunks[0], frame.buffer_mut());
    for (i, kind) in preview.into_iter().enumerate() {
        let slot = Rect {
            x: next_inner.x,
            y: next_inner.y + PREVIEW_SLOT * i as u16,
            width: next_inner.width,
            height: 2.min(next_inner.height.saturating_sub(PREVIEW_SLOT * i as u16)),
        };
        draw_piece_preview(frame, theme, slot, kind);
    }

    // --- Stats ---
    let label = Style::default().fg(theme.title);
    let value = Style::default().fg(theme.main_fg);
    let stats_block = boxed("Stats", theme);
    let stats_inner = stats_block.inner(chunks[1]);
    stats_block.render(chunks[1], frame.buffer_mut());
    let stats = vec![
        Line::from(vec![
            Span::styled("Score: ", label),
            Span::styled(state.score.to_string(), value),
        ]),
        Line::from(vec![
            Span::styled("Level: ", label),
            Span::styled(state.level.to_string(), value),
        ]),
        Line::from(vec![
            Span::styled("Lines: ", label),
            Span::styled(state.lines_cleared.to_string(), value),
        ]),
    ];
    let [text_area, gauge_area] = Layout::vertical([Constraint::Length(3), Constraint::Length(1)])
        .areas(stats_inner);
    Paragraph::new(Text::from(stats)).render(text_area, frame.buffer_mut());

    // Lines toward the next level.
    let (done, step) = state.level_progress();
    let ratio = if state.level >= crate::game::MAX_LEVEL {
        1.0
    } else {
        f64::from(done) / f64::from(step)
    };
    Gauge::default()
        .ratio(ratio)
        .label(format!("{done}/{step} lines"))
        .gauge_style(Style::default().fg(theme.piece_color(TetrominoKind::S)).bg(theme.bg))
        .render(gauge_area, frame.buffer_mut());

    // --- Keys ---
    let keys = [
        ("←→ h l", "move"),
        ("↑x k/z u", "rotate"),
        ("↓j/space", "soft/hard"),
        ("p / q", "pause/quit"),
    ];
    let keys_block = boxed("Keys", theme);
    let keys_inner = keys_block.inner(chunks[2]);
    if keys_inner.height < keys.len() as u16 {
        return;
    }
    keys_block.render(chunks[2], frame.buffer_mut());
    let lines: Vec<Line> = keys
        .iter()
        .map(|(k, what)| {
            Line::from(vec![
                Span::styled(format!("{k:<10}"), label),
                Span::styled(*what, value),
            ])
        })
        .collect();
    Paragraph::new(lines).render(keys_inner, frame.buffer_mut());
}

/// Draw a piece in its spawn orientation, centred in `area`.
fn draw_piece_preview(frame: &mut Frame, theme: &Theme, area: Rect, kind: TetrominoKind) {
    let shape = kind.shape();
    let offsets: Vec<(i32, i32)> = shape.offsets().collect();
    let (min_x, max_x) = offsets
        .iter()
        .fold((i32::MAX, i32::MIN), |(lo, hi), &(x, _)| (lo.min(x), hi.max(x)));
    let (min_y, max_y) = offsets
        .iter()
        .fold((i32::MAX, i32::MIN), |(lo, hi), &(_, y)| (lo.min(y), hi.max(y)));
    let w = (max_x - min_x + 1) as u16 * CELL_WIDTH;
    let h = (max_y - min_y + 1) as u16;
    let off_x = area.width.saturating_sub(w) / 2;
    let off_y = area.height.saturating_sub(h) / 2;

    let color = theme.piece_color(kind);
    for (x, y) in offsets {
        let r = Rect {
            x: area.x + off_x + (x - min_x) as u16 * CELL_WIDTH,
            // Offsets grow upwards; screen rows grow downwards.
            y: area.y + off_y + (max_y - y) as u16,
            width: CELL_WIDTH,
            height: 1,
        };
        if r.y < area.y + area.height && r.x + r.width <= area.x + area.width {
            Paragraph::new(BLOCK)
                .style(Style::default().fg(color).bg(theme.bg))
                .render(r, frame.buffer_mut());
        }
    }
}

fn centered_popup(board: Rect, width: u16, height: u16) -> Rect {
    Rect {
        x: board.x + board.width.saturating_sub(width) / 2,
        y: board.y + board.height.saturating_sub(height) / 2,
        width: width.min(board.width),
        height: height.min(board.height),
    }
}

fn draw_pause_overlay(frame: &mut Frame, theme: &Theme, board: Rect) {
    let popup = centered_popup(board, 22, 5);
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            " Paused ",
            Style::default().fg(Color::Black).bg(Color::Yellow),
        )),
        Line::from(""),
        Line::from(Span::styled(
            "P resume  Q quit",
            Style::default().fg(theme.main_fg),
        )),
    ];
    let p = Paragraph::new(lines).alignment(Alignment::Center).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme.div_line))
            .style(Style::default().bg(theme.bg)),
    );
    p.render(popup, frame.buffer_mut());
}

fn draw_game_over(
    frame: &mut Frame,
    state: &GameState,
    theme: &Theme,
    board: Rect,
    reason: GameOverReason,
) {
    let popup = centered_popup(board, 22, 10);
    let why = match reason {
        GameOverReason::LockOut => "Locked out",
        GameOverReason::BlockOut => "Blocked out",
    };
    let fg = Style::default().fg(theme.main_fg);
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            " Game Over ",
            Style::default().fg(Color::White).bg(Color::Red),
        )),
        Line::from(Span::styled(why, fg)),
        Line::from(""),
        Line::from(Span::styled(format!("Score: {}", state.score), fg)),
        Line::from(Span::styled(
            format!("Level: {}  Lines: {}", state.level, state.lines_cleared),
            fg,
        )),
        Line::from(""),
        Line::from(Span::styled("R restart  Q quit", fg)),
    ];
    let p = Paragraph::new(lines).alignment(Alignment::Center).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme.div_line))
            .style(Style::default().bg(theme.bg)),
    );
    p.render(popup, frame.buffer_mut());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GameConfig;
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;

    fn state() -> GameState {
        GameState::new(&GameConfig {
            initial_level: 1,
            lock_delay_ms: 500,
            seed: Some(11),
            preview: 3,
            animate_clears: true,
        })
    }

    fn render(state: &GameState, width: u16, height: u16) -> String {
        let mut terminal = Terminal::new(TestBackend::new(width, height)).unwrap();
        let mut fx = LineClearFx::default();
        terminal
            .draw(|f| draw(f, state, &Theme::default(), &mut fx, Instant::now()))
            .unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect()
    }

    #[test]
    fn test_cell_position_maps_floor_to_bottom() {
        let board = Rect::new(0, 1, BOARD_WIDTH, BOARD_HEIGHT);
        assert_eq!(cell_position(board, 0, SKYLINE as i32), Some((0, 1)));
        assert_eq!(cell_position(board, 3, 0), Some((6, BOARD_HEIGHT)));
        assert_eq!(cell_position(board, 3, SKYLINE as i32 + 1), None);
    }

    #[test]
    fn test_renders_board_and_sidebar() {
        let (w, h) = required_size();
        let screen = render(&state(), w, h);
        assert!(screen.contains("Tetrix"));
        assert!(screen.contains("Score:"));
        assert!(screen.contains("Next"));
        assert!(screen.contains('█'));
    }

    #[test]
    fn test_key_help_fits_with_largest_preview() {
        let (w, h) = required_size();
        let screen = render(&state(), w, h);
        assert!(screen.contains("rotate"));
        assert!(screen.contains("pause/quit"));
    }

    #[test]
    fn test_small_terminal_shows_notice() {
        let screen = render(&state(), 20, 10);
        assert!(screen.contains("small"));
    }

    #[test]
    fn test_game_over_overlay() {
        let mut s = state();
        s.game_over = Some(GameOverReason::BlockOut);
        let (w, h) = required_size();
        let screen = render(&s, w, h);
        assert!(screen.contains("Game Over"));
        assert!(screen.contains("Blocked out"));
    }

    #[test]
    fn test_clearing_rows_cover_playable_columns() {
        let board = Rect::new(0, 0, BOARD_WIDTH, BOARD_HEIGHT);
        let set = clearing_buffer_positions(board, &[1]);
        assert_eq!(set.len(), (COLS - 2) * CELL_WIDTH as usize);
    }
}
