//! App: terminal init, main loop, fixed-step simulation and key handling.

use crate::GameConfig;
use crate::game::{FRAME, GameState};
use crate::input::{Action, key_to_action};
use crate::sound::SoundSink;
use crate::theme::Theme;
use crate::ui::{self, LineClearFx};
use anyhow::Result;
use crossterm::event::{self, Event, KeyEvent, KeyEventKind};
use ratatui::DefaultTerminal;
use std::time::{Duration, Instant};

/// DAS (Delayed Auto-Shift): delay before movement starts repeating when you hold a key.
const REPEAT_DELAY_MS: u64 = 170;
/// ARR (Auto-Repeat Rate): time between repeated moves while holding. 50 ms ≈ 20 moves/sec.
const REPEAT_INTERVAL_MS: u64 = 50;
/// Longest stall the simulation catches up on; anything beyond is dropped.
const MAX_CATCH_UP: Duration = Duration::from_millis(250);

/// Held-key auto-repeat state.
#[derive(Debug, Default)]
struct Repeat {
    held: Option<(Action, Instant)>,
    last_fire: Option<Instant>,
}

impl Repeat {
    fn press(&mut self, action: Action, now: Instant) {
        self.held = action.repeats().then_some((action, now));
        self.last_fire = None;
    }

    fn release(&mut self, action: Action) {
        if self.action() == Some(action) {
            self.clear();
        }
    }

    fn clear(&mut self) {
        self.held = None;
        self.last_fire = None;
    }

    fn action(&self) -> Option<Action> {
        self.held.map(|(a, _)| a)
    }

    /// Action to fire at `now`, if the repeat delay and rate allow it.
    fn due(&mut self, now: Instant) -> Option<Action> {
        let (action, first) = self.held?;
        if now.saturating_duration_since(first) < Duration::from_millis(REPEAT_DELAY_MS) {
            return None;
        }
        let next = self.last_fire.unwrap_or(first) + Duration::from_millis(REPEAT_INTERVAL_MS);
        if now < next {
            return None;
        }
        self.last_fire = Some(now);
        Some(action)
    }
}

pub struct App {
    theme: Theme,
    state: GameState,
    sink: Box<dyn SoundSink>,
    repeat: Repeat,
    /// Terminal reports key releases, so held keys run on DAS/ARR instead of OS repeat.
    key_releases: bool,
    line_clear_fx: LineClearFx,
    /// Real time not yet fed to the simulation.
    lag: Duration,
    last_frame: Instant,
}

impl App {
    pub fn new(config: &GameConfig, theme: Theme, sink: Box<dyn SoundSink>) -> Self {
        Self {
            theme,
            state: GameState::new(config),
            sink,
            repeat: Repeat::default(),
            key_releases: false,
            line_clear_fx: LineClearFx::default(),
            lag: Duration::ZERO,
            last_frame: Instant::now(),
        }
    }

    pub fn run(&mut self) -> Result<()> {
        use crossterm::{
            event::{KeyboardEnhancementFlags, PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags},
            execute,
            terminal::{
                EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
                supports_keyboard_enhancement,
            },
        };

        enable_raw_mode()?;
        let mut stdout = std::io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        // Release events where the terminal supports them; otherwise the OS key repeat drives held keys.
        let _ = execute!(
            stdout,
            PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
        );
        self.key_releases = supports_keyboard_enhancement().unwrap_or(false);
        log::info!("key release events: {}", self.key_releases);

        let result = ratatui::DefaultTerminal::new(ratatui::backend::CrosstermBackend::new(stdout))
            .map_err(anyhow::Error::from)
            .and_then(|mut terminal| self.run_loop(&mut terminal));

        let _ = execute!(std::io::stdout(), PopKeyboardEnhancementFlags);
        execute!(std::io::stdout(), LeaveAlternateScreen)?;
        disable_raw_mode()?;

        log::info!(
            "exit: score {}, level {}, lines {}",
            self.state.score,
            self.state.level,
            self.state.lines_cleared
        );
        result
    }

    fn run_loop(&mut self, terminal: &mut DefaultTerminal) -> Result<()> {
        self.last_frame = Instant::now();
        loop {
            let now = Instant::now();
            terminal.draw(|f| ui::draw(f, &self.state, &self.theme, &mut self.line_clear_fx, now))?;

            if self.line_clear_fx.is_done() {
                self.state.finish_line_clear();
                self.line_clear_fx.reset();
            }

            let timeout = FRAME.saturating_sub(now.elapsed());
            if event::poll(timeout)? {
                while event::poll(Duration::ZERO)? {
                    if let Event::Key(key) = event::read()? {
                        if self.on_key(key) {
                            return Ok(());
                        }
                    }
                }
            }

            let now = Instant::now();
            if let Some(action) = self.repeat.due(now) {
                self.state.handle(action);
            }
            self.advance(now);
            self.play_sounds();
        }
    }

    /// Handle one key event; true when the player quits.
    fn on_key(&mut self, key: KeyEvent) -> bool {
        let action = key_to_action(key);
        match key.kind {
            KeyEventKind::Release => {
                self.repeat.release(action);
                return false;
            }
            // OS auto-repeat; the DAS/ARR timer drives held keys.
            KeyEventKind::Repeat if self.key_releases => return false,
            KeyEventKind::Repeat | KeyEventKind::Press => {}
        }
        if self.key_releases && self.repeat.action() == Some(action) {
            return false;
        }
        match action {
            Action::Quit => return true,
            Action::None => {}
            Action::Restart => {
                if self.state.is_over() {
                    self.state.restart();
                    self.line_clear_fx.reset();
                    self.repeat.clear();
                }
            }
            _ => {
                self.state.handle(action);
                if self.key_releases {
                    self.repeat.press(action, Instant::now());
                }
            }
        }
        false
    }

    /// Run the simulation in whole frames for the real time elapsed since the last call.
    fn advance(&mut self, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_frame);
        self.last_frame = now;
        self.lag = (self.lag + elapsed).min(MAX_CATCH_UP);
        while self.lag >= FRAME {
            self.state.tick(FRAME);
            self.lag -= FRAME;
        }
    }

    fn play_sounds(&mut self) {
        for sound in self.state.drain_sounds() {
            self.sink.play(sound);
        }
    }
}
