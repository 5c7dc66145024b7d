use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

/// What a key press asks the screen to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    CycleFocus,
    Insert(char),
    Backspace,
    TogglePlaying,
    Tap,
    Quit,
}

pub fn map_key(event: KeyEvent) -> Option<Action> {
    if event.kind != KeyEventKind::Press {
        return None;
    }

    match event.code {
        KeyCode::Char('c') if event.modifiers.contains(KeyModifiers::CONTROL) => {
            Some(Action::Quit)
        }
        KeyCode::Char(_) if event.modifiers.contains(KeyModifiers::CONTROL) => None,
        KeyCode::Char(' ') => Some(Action::Tap),
        KeyCode::Char(c) => Some(Action::Insert(c)),
        KeyCode::Tab | KeyCode::BackTab => Some(Action::CycleFocus),
        KeyCode::Backspace => Some(Action::Backspace),
        KeyCode::Enter | KeyCode::F(5) => Some(Action::TogglePlaying),
        KeyCode::Esc => Some(Action::Quit),
        _ => None,
    }
}
