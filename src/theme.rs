//! Theme loading: btop-style `theme[key]="value"` and hex → ratatui Color.

use crate::piece::TetrominoKind;
use ratatui::style::Color;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

/// Keys for the seven piece colours, in `TetrominoKind::color_index` order.
const PIECE_KEYS: [&str; 7] = [
    "piece_o", "piece_i", "piece_t", "piece_l", "piece_j", "piece_s", "piece_z",
];

/// Piece and UI colours.
#[derive(Debug, Clone)]
pub struct Theme {
    /// Piece colours (index 0..7): O, I, T, L, J, S, Z.
    pub pieces: [Color; 7],
    /// Walls and floor.
    pub wall: Color,
    /// Playfield background.
    pub bg: Color,
    /// Box borders.
    pub div_line: Color,
    /// Text (score, level).
    pub main_fg: Color,
    /// Highlight / titles.
    pub title: Color,
}

#[derive(Debug, Error)]
pub enum ThemeError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid hex: {0}")]
    InvalidHex(String),
}

impl Default for Theme {
    fn default() -> Self {
        Self::classic()
    }
}

impl Theme {
    /// Guideline piece colours on a dark board.
    pub fn classic() -> Self {
        Self {
            pieces: [
                Color::Rgb(0xFF, 0xFF, 0x00), // O yellow
                Color::Rgb(0xAD, 0xD8, 0xE6), // I light blue
                Color::Rgb(0x80, 0x00, 0x80), // T purple
                Color::Rgb(0xFF, 0xA5, 0x00), // L orange
                Color::Rgb(0x00, 0x00, 0x8B), // J dark blue
                Color::Rgb(0x00, 0xFF, 0x00), // S green
                Color::Rgb(0xFF, 0x00, 0x00), // Z red
            ],
            wall: Color::Rgb(0xA9, 0xA9, 0xA9),
            bg: Color::Rgb(0x31, 0x35, 0x3F),
            div_line: Color::Rgb(0x3F, 0x44, 0x4F),
            main_fg: Color::Rgb(0xAB, 0xB2, 0xBF),
            title: Color::Rgb(0xE5, 0xC0, 0x7B),
        }
    }

    /// Load overrides from a btop-style file: `theme[key]="value"` or `theme[key]='value'`.
    /// Keys not present keep their classic value.
    pub fn load(path: Option<&Path>) -> Result<Self, ThemeError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let s = std::fs::read_to_string(path)?;
        let map = parse_theme_file(&s);
        Self::from_map(&map)
    }

    fn from_map(map: &HashMap<String, String>) -> Result<Self, ThemeError> {
        let mut theme = Self::classic();
        let lookup = |key: &str| map.get(key).map(|v| parse_hex(v)).transpose();
        for (slot, key) in theme.pieces.iter_mut().zip(PIECE_KEYS) {
            if let Some(c) = lookup(key)? {
                *slot = c;
            }
        }
        for (key, slot) in [
            ("wall", &mut theme.wall),
            ("main_bg", &mut theme.bg),
            ("div_line", &mut theme.div_line),
            ("main_fg", &mut theme.main_fg),
            ("title", &mut theme.title),
        ] {
            if let Some(c) = lookup(key)? {
                *slot = c;
            }
        }
        Ok(theme)
    }

    #[inline]
    pub fn piece_color(&self, kind: TetrominoKind) -> Color {
        self.pieces[kind.color_index()]
    }
}

/// Parse btop-style theme file into key -> value map.
fn parse_theme_file(s: &str) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for line in s.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some(stripped) = line.strip_prefix("theme[") {
            if let Some(end) = stripped.find(']') {
                let key = stripped[..end].trim();
                let rest = stripped[end + 1..].trim();
                if let Some(eq) = rest.find('=') {
                    let value = rest[eq + 1..]
                        .trim()
                        .trim_matches('"')
                        .trim_matches('\'')
                        .to_string();
                    if !value.is_empty() {
                        map.insert(key.to_string(), value);
                    }
                }
            }
        }
    }
    map
}

/// Parse hex colour "#RRGGBB" or "#RGB" into ratatui Color.
pub fn parse_hex(s: &str) -> Result<Color, ThemeError> {
    let s = s.trim().trim_start_matches('#');
    // from_str_radix alone would accept a sign.
    if !s.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(ThemeError::InvalidHex(s.to_string()));
    }
    let channel = |range: std::ops::Range<usize>, scale: u8| {
        s.get(range)
            .and_then(|h| u8::from_str_radix(h, 16).ok())
            .map(|v| v * scale)
            .ok_or_else(|| ThemeError::InvalidHex(s.to_string()))
    };
    let (r, g, b) = match s.len() {
        6 => (channel(0..2, 1)?, channel(2..4, 1)?, channel(4..6, 1)?),
        3 => (channel(0..1, 17)?, channel(1..2, 17)?, channel(2..3, 17)?),
        _ => return Err(ThemeError::InvalidHex(s.to_string())),
    };
    Ok(Color::Rgb(r, g, b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_6() {
        let c = parse_hex("#98C379").unwrap();
        assert!(matches!(c, Color::Rgb(0x98, 0xC3, 0x79)));
    }

    #[test]
    fn test_parse_hex_3() {
        let c = parse_hex("#FFF").unwrap();
        assert!(matches!(c, Color::Rgb(255, 255, 255)));
    }

    #[test]
    fn test_parse_hex_rejects_garbage() {
        assert!(parse_hex("#12").is_err());
        assert!(parse_hex("#GG0000").is_err());
        assert!(parse_hex("#+F+F+F").is_err());
        assert!(parse_hex("#+FF").is_err());
    }

    #[test]
    fn test_parse_theme_line() {
        let map = parse_theme_file(r##"theme[main_bg]="#31353F""##);
        assert_eq!(map.get("main_bg"), Some(&"#31353F".to_string()));
    }

    #[test]
    fn test_overrides_keep_other_defaults() {
        let map = parse_theme_file("# comment\ntheme[piece_t]='#C678DD'\ntheme[wall]=\"#5C6370\"\n");
        let theme = Theme::from_map(&map).unwrap();
        assert_eq!(theme.piece_color(TetrominoKind::T), Color::Rgb(0xC6, 0x78, 0xDD));
        assert_eq!(theme.wall, Color::Rgb(0x5C, 0x63, 0x70));
        assert_eq!(theme.piece_color(TetrominoKind::Z), Theme::classic().pieces[6]);
    }

    #[test]
    fn test_bad_colour_is_an_error() {
        let map = parse_theme_file("theme[title]=\"nope\"");
        assert!(matches!(Theme::from_map(&map), Err(ThemeError::InvalidHex(_))));
    }
}
