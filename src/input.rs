//! Key bindings: arrows, classic Z/X rotation and vim-style keys.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Action from a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    MoveLeft,
    MoveRight,
    RotateCw,
    RotateCcw,
    SoftDrop,
    HardDrop,
    Pause,
    Restart,
    Quit,
    None,
}

impl Action {
    /// Actions that keep firing while the key is held.
    pub fn repeats(self) -> bool {
        matches!(self, Self::MoveLeft | Self::MoveRight | Self::SoftDrop)
    }
}

/// Map key event to game action.
pub fn key_to_action(key: KeyEvent) -> Action {
    let KeyEvent { code, modifiers, .. } = key;
    if modifiers == KeyModifiers::CONTROL && code == KeyCode::Char('c') {
        return Action::Quit;
    }
    if !(modifiers.is_empty() || modifiers == KeyModifiers::SHIFT) {
        return Action::None;
    }
    match code {
        KeyCode::Char('q' | 'Q') | KeyCode::Esc => Action::Quit,
        KeyCode::Char('p' | 'P') => Action::Pause,
        KeyCode::Char('r' | 'R') => Action::Restart,
        KeyCode::Left | KeyCode::Char('h') => Action::MoveLeft,
        KeyCode::Right | KeyCode::Char('l') => Action::MoveRight,
        KeyCode::Up | KeyCode::Char('x' | 'X' | 'k') => Action::RotateCw,
        KeyCode::Char('z' | 'Z' | 'u') => Action::RotateCcw,
        KeyCode::Down | KeyCode::Char('j') => Action::SoftDrop,
        KeyCode::Enter | KeyCode::Char(' ') => Action::HardDrop,
        _ => Action::None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_classic_keys() {
        assert_eq!(key_to_action(press(KeyCode::Left)), Action::MoveLeft);
        assert_eq!(key_to_action(press(KeyCode::Right)), Action::MoveRight);
        assert_eq!(key_to_action(press(KeyCode::Up)), Action::RotateCw);
        assert_eq!(key_to_action(press(KeyCode::Char('x'))), Action::RotateCw);
        assert_eq!(key_to_action(press(KeyCode::Char('z'))), Action::RotateCcw);
        assert_eq!(key_to_action(press(KeyCode::Down)), Action::SoftDrop);
        assert_eq!(key_to_action(press(KeyCode::Char(' '))), Action::HardDrop);
        assert_eq!(key_to_action(press(KeyCode::Char('q'))), Action::Quit);
    }

    #[test]
    fn test_vim_keys() {
        assert_eq!(key_to_action(press(KeyCode::Char('h'))), Action::MoveLeft);
        assert_eq!(key_to_action(press(KeyCode::Char('l'))), Action::MoveRight);
        assert_eq!(key_to_action(press(KeyCode::Char('k'))), Action::RotateCw);
        assert_eq!(key_to_action(press(KeyCode::Char('j'))), Action::SoftDrop);
    }

    #[test]
    fn test_modifiers() {
        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(key_to_action(ctrl_c), Action::Quit);
        let alt_h = KeyEvent::new(KeyCode::Char('h'), KeyModifiers::ALT);
        assert_eq!(key_to_action(alt_h), Action::None);
        let shift_z = KeyEvent::new(KeyCode::Char('Z'), KeyModifiers::SHIFT);
        assert_eq!(key_to_action(shift_z), Action::RotateCcw);
    }

    #[test]
    fn test_only_movement_repeats() {
        assert!(Action::MoveLeft.repeats());
        assert!(Action::SoftDrop.repeats());
        assert!(!Action::HardDrop.repeats());
        assert!(!Action::RotateCw.repeats());
    }
}
