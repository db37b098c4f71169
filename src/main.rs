//! Tetrixtui: classic falling-block puzzle game in the terminal.

mod app;
mod bag;
mod game;
mod input;
mod piece;
mod playfield;
mod sound;
mod theme;
mod ui;

use anyhow::{Context, Result};
use app::App;
use clap::Parser;
use std::path::{Path, PathBuf};

/// Options derived from CLI that affect game behaviour.
#[derive(Debug, Clone)]
pub struct GameConfig {
    pub initial_level: u32,
    pub lock_delay_ms: u64,
    /// Bag seed; `None` draws from system entropy.
    pub seed: Option<u64>,
    /// Pieces shown in the Next box.
    pub preview: usize,
    /// Hold full rows on screen while they fade out.
    pub animate_clears: bool,
}

impl From<&Args> for GameConfig {
    fn from(args: &Args) -> Self {
        Self {
            initial_level: args.initial_level,
            lock_delay_ms: args.lock_delay_ms,
            seed: args.seed,
            preview: args.preview as usize,
            animate_clears: !args.no_animation,
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.log_file.as_deref())?;
    let theme = theme::Theme::load(args.theme.as_deref())
        .with_context(|| format!("loading theme {:?}", args.theme))?;
    let config = GameConfig::from(&args);
    log::info!("starting with {:?}", config);
    let sink = sound::open_sink(args.mute);
    let mut app = App::new(&config, theme, sink);
    app.run()?;
    Ok(())
}

/// Logs go to a file; stderr would draw over the game screen.
fn init_logging(path: Option<&Path>) -> Result<()> {
    let Some(path) = path else {
        return Ok(());
    };
    let file = std::fs::File::create(path)
        .with_context(|| format!("creating log file {}", path.display()))?;
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Pipe(Box::new(file)))
        .init();
    Ok(())
}

/// Classic falling-block puzzle in the terminal.
#[derive(Debug, Parser)]
#[command(
    name = "tetrixtui",
    version,
    about = "Classic falling-block puzzle in the terminal. Fill rows edge to edge to clear them.",
    long_about = "Tetrixtui is a single-player falling-block puzzle game for the terminal.\n\n\
        Pieces come from a shuffled bag of all seven tetrominoes. Complete horizontal rows to \
        clear them; every 10 lines the level and the fall speed go up.\n\n\
        CONTROLS:\n  Left/Right  Move    Up or X   Rotate CW   Z          Rotate CCW\n  Down        Soft drop   Space/Enter Hard drop  P   Pause   Q / Esc   Quit\n\n\
        VIM KEYS:\n  h/l         Move    k         Rotate CW   u          Rotate CCW   j   Soft drop\n\n\
        Set RUST_LOG together with --log-file to control log verbosity."
)]
pub struct Args {
    /// Starting level (1-15). Higher levels fall faster.
    #[arg(long, default_value = "1", value_name = "N", value_parser = clap::value_parser!(u32).range(1..=15))]
    pub initial_level: u32,

    /// Lock delay in ms: time a landed piece can still be moved before it locks.
    #[arg(long, default_value = "500", value_name = "MS")]
    pub lock_delay_ms: u64,

    /// Seed for the piece randomizer (same seed, same piece sequence).
    #[arg(long, value_name = "SEED")]
    pub seed: Option<u64>,

    /// Number of upcoming pieces shown in the Next box (1-3).
    #[arg(long, default_value = "1", value_name = "N", value_parser = clap::value_parser!(u8).range(1..=3))]
    pub preview: u8,

    /// Disable line-clear animation (instant clear).
    #[arg(long)]
    pub no_animation: bool,

    /// Disable sound effects.
    #[arg(long)]
    pub mute: bool,

    /// Path to theme file (btop-style theme[key]=\"#RRGGBB\"). Keys: piece_o, piece_i, piece_t, piece_l, piece_j, piece_s, piece_z, wall, main_bg, div_line, main_fg, title.
    #[arg(short, long, value_name = "FILE")]
    pub theme: Option<PathBuf>,

    /// Write logs to this file (level from RUST_LOG, default info).
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,
}
