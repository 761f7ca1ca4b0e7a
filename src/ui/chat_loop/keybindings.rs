//! Translating key presses into UI actions for the active screen.

use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::core::controller::GenerationKind;
use crate::ui::state::{Screen, UiState};
use crate::utils::line_editor::{map_key_event_to_action, LineEditAction};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiAction {
    Quit,
    Edit(LineEditAction),
    Submit(GenerationKind),
    ToggleTools,
    MoveToolSelection { down: bool },
    ChooseTool,
    BeginEdit,
    CommitEdit,
    CancelEdit,
    DismissBanner,
    Scroll { up: bool, lines: u16 },
    Logout,
    NextField,
    PreviousField,
    SignIn,
    SkipLogin,
}

const PAGE_LINES: u16 = 10;

fn ctrl(key: &KeyEvent, c: char) -> bool {
    key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char(c)
}

pub fn map_key(ui: &UiState, key: &KeyEvent) -> Option<UiAction> {
    if ctrl(key, 'c') {
        return Some(UiAction::Quit);
    }
    match ui.screen {
        Screen::Login => map_login_key(ui, key),
        Screen::Chat => map_chat_key(ui, key),
    }
}

fn map_login_key(ui: &UiState, key: &KeyEvent) -> Option<UiAction> {
    if ui.login.in_flight {
        return None;
    }
    match key.code {
        KeyCode::Tab | KeyCode::Down => Some(UiAction::NextField),
        KeyCode::BackTab | KeyCode::Up => Some(UiAction::PreviousField),
        KeyCode::Enter => Some(UiAction::SignIn),
        KeyCode::Esc => Some(UiAction::SkipLogin),
        _ => map_key_event_to_action(key).map(UiAction::Edit),
    }
}

fn map_chat_key(ui: &UiState, key: &KeyEvent) -> Option<UiAction> {
    if ui.show_tools {
        return match key.code {
            KeyCode::Up => Some(UiAction::MoveToolSelection { down: false }),
            KeyCode::Down | KeyCode::Tab => Some(UiAction::MoveToolSelection { down: true }),
            KeyCode::Enter => Some(UiAction::ChooseTool),
            KeyCode::Esc => Some(UiAction::ToggleTools),
            _ if ctrl(key, 't') => Some(UiAction::ToggleTools),
            _ => None,
        };
    }

    if ctrl(key, 't') {
        return Some(UiAction::ToggleTools);
    }
    if ctrl(key, 'g') {
        return Some(UiAction::Submit(GenerationKind::Image));
    }
    if ctrl(key, 'e') {
        return Some(UiAction::BeginEdit);
    }
    if ctrl(key, 'l') {
        return Some(UiAction::Logout);
    }

    match key.code {
        KeyCode::Enter if ui.editing.is_some() => Some(UiAction::CommitEdit),
        KeyCode::Enter => Some(UiAction::Submit(GenerationKind::Text)),
        KeyCode::Esc if ui.editing.is_some() => Some(UiAction::CancelEdit),
        KeyCode::Esc => Some(UiAction::DismissBanner),
        KeyCode::Up => Some(UiAction::Scroll { up: true, lines: 1 }),
        KeyCode::Down => Some(UiAction::Scroll { up: false, lines: 1 }),
        KeyCode::PageUp => Some(UiAction::Scroll {
            up: true,
            lines: PAGE_LINES,
        }),
        KeyCode::PageDown => Some(UiAction::Scroll {
            up: false,
            lines: PAGE_LINES,
        }),
        _ => map_key_event_to_action(key).map(UiAction::Edit),
    }
}
