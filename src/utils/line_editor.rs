//! Single-line text editing shared by the chat input, the login form and
//! interactive CLI prompts.

use ratatui::crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode},
};
use std::fmt;
use std::io::{self, Write};
use std::time::Duration;
use unicode_width::UnicodeWidthStr;

/// Text plus a cursor measured in characters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineEditorState {
    pub text: String,
    pub cursor: usize,
}

impl LineEditorState {
    pub fn with_text(text: String) -> Self {
        let cursor = text.chars().count();
        Self { text, cursor }
    }

    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    /// Text as it should be shown, masking every character when `mask` is set.
    pub fn display_text(&self, mask: MaskMode) -> String {
        match mask {
            MaskMode::None => self.text.clone(),
            MaskMode::Hidden => "*".repeat(self.text.chars().count()),
        }
    }

    /// Terminal columns between the start of the text and the cursor.
    pub fn cursor_columns(&self, mask: MaskMode) -> usize {
        let prefix: String = self.display_text(mask).chars().take(self.cursor).collect();
        UnicodeWidthStr::width(prefix.as_str())
    }

    fn byte_index(&self, char_index: usize) -> usize {
        self.text
            .char_indices()
            .nth(char_index)
            .map(|(index, _)| index)
            .unwrap_or(self.text.len())
    }

    fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaskMode {
    None,
    Hidden,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineEditAction {
    Insert(char),
    Paste(String),
    Backspace,
    Delete,
    MoveLeft,
    MoveRight,
    MoveStart,
    MoveEnd,
    DeleteToEnd,
    DeleteWord,
    ClearAll,
}

/// Apply `action` and report whether anything visible changed.
pub fn apply_line_edit_action(state: &mut LineEditorState, action: LineEditAction) -> bool {
    match action {
        LineEditAction::Insert(c) => {
            let at = state.byte_index(state.cursor);
            state.text.insert(at, c);
            state.cursor += 1;
            true
        }
        LineEditAction::Paste(text) => {
            let sanitized: String = text
                .chars()
                .map(|c| if c == '\n' || c == '\r' || c == '\t' { ' ' } else { c })
                .filter(|c| !c.is_control())
                .collect();
            if sanitized.is_empty() {
                return false;
            }
            let at = state.byte_index(state.cursor);
            state.text.insert_str(at, &sanitized);
            state.cursor += sanitized.chars().count();
            true
        }
        LineEditAction::Backspace => {
            if state.cursor == 0 {
                return false;
            }
            let at = state.byte_index(state.cursor - 1);
            state.text.remove(at);
            state.cursor -= 1;
            true
        }
        LineEditAction::Delete => {
            if state.cursor >= state.char_len() {
                return false;
            }
            let at = state.byte_index(state.cursor);
            state.text.remove(at);
            true
        }
        LineEditAction::MoveLeft => {
            if state.cursor == 0 {
                return false;
            }
            state.cursor -= 1;
            true
        }
        LineEditAction::MoveRight => {
            if state.cursor >= state.char_len() {
                return false;
            }
            state.cursor += 1;
            true
        }
        LineEditAction::MoveStart => {
            let moved = state.cursor != 0;
            state.cursor = 0;
            moved
        }
        LineEditAction::MoveEnd => {
            let end = state.char_len();
            let moved = state.cursor != end;
            state.cursor = end;
            moved
        }
        LineEditAction::DeleteToEnd => {
            let at = state.byte_index(state.cursor);
            if at == state.text.len() {
                return false;
            }
            state.text.truncate(at);
            true
        }
        LineEditAction::DeleteWord => {
            if state.cursor == 0 {
                return false;
            }
            let chars: Vec<char> = state.text.chars().collect();
            let mut start = state.cursor;
            while start > 0 && chars[start - 1].is_whitespace() {
                start -= 1;
            }
            while start > 0 && !chars[start - 1].is_whitespace() {
                start -= 1;
            }
            let from = state.byte_index(start);
            let to = state.byte_index(state.cursor);
            state.text.replace_range(from..to, "");
            state.cursor = start;
            true
        }
        LineEditAction::ClearAll => {
            if state.text.is_empty() {
                return false;
            }
            *state = LineEditorState::default();
            true
        }
    }
}

/// Map editing keys; keys with other meanings (Enter, Esc, Tab) return `None`.
pub fn map_key_event_to_action(key: &KeyEvent) -> Option<LineEditAction> {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Backspace => Some(LineEditAction::Backspace),
        KeyCode::Delete => Some(LineEditAction::Delete),
        KeyCode::Left => Some(LineEditAction::MoveLeft),
        KeyCode::Right => Some(LineEditAction::MoveRight),
        KeyCode::Home => Some(LineEditAction::MoveStart),
        KeyCode::End => Some(LineEditAction::MoveEnd),
        KeyCode::Char('a') if ctrl => Some(LineEditAction::MoveStart),
        KeyCode::Char('k') if ctrl => Some(LineEditAction::DeleteToEnd),
        KeyCode::Char('w') if ctrl => Some(LineEditAction::DeleteWord),
        KeyCode::Char('u') if ctrl => Some(LineEditAction::ClearAll),
        KeyCode::Char(c) if !ctrl => Some(LineEditAction::Insert(c)),
        _ => None,
    }
}

#[derive(Debug, Clone)]
pub struct LineEditorError {
    message: String,
}

impl LineEditorError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for LineEditorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for LineEditorError {}

/// Read one line from the terminal in raw mode.
///
/// Enter submits, Esc or Ctrl+C cancels.
pub fn prompt_line_editor(prompt: &str, mask: MaskMode) -> Result<String, LineEditorError> {
    enable_raw_mode().map_err(|err| LineEditorError::new(err.to_string()))?;
    let mut stdout = io::stdout();
    execute!(stdout, event::EnableBracketedPaste)
        .map_err(|err| LineEditorError::new(err.to_string()))?;

    let result = (|| -> Result<String, LineEditorError> {
        let mut state = LineEditorState::default();
        let mut needs_redraw = true;

        loop {
            if needs_redraw {
                redraw_line(prompt, &state, mask)
                    .map_err(|err| LineEditorError::new(err.to_string()))?;
                needs_redraw = false;
            }

            if !event::poll(Duration::from_millis(100))
                .map_err(|err| LineEditorError::new(err.to_string()))?
            {
                continue;
            }

            match event::read().map_err(|err| LineEditorError::new(err.to_string()))? {
                Event::Key(key) if key.kind == KeyEventKind::Press => match key.code {
                    KeyCode::Enter => break Ok(state.text),
                    KeyCode::Esc => break Err(LineEditorError::new("Cancelled by user")),
                    KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                        break Err(LineEditorError::new("Cancelled by user"));
                    }
                    _ => {
                        if let Some(action) = map_key_event_to_action(&key) {
                            needs_redraw = apply_line_edit_action(&mut state, action);
                        }
                    }
                },
                Event::Paste(text) => {
                    needs_redraw = apply_line_edit_action(&mut state, LineEditAction::Paste(text));
                }
                _ => {}
            }
        }
    })();

    let disable_raw_result =
        disable_raw_mode().map_err(|err| LineEditorError::new(err.to_string()));
    let disable_paste_result = execute!(stdout, event::DisableBracketedPaste)
        .map_err(|err| LineEditorError::new(err.to_string()));
    println!();

    let mut final_result = result;
    for cleanup in [disable_raw_result, disable_paste_result] {
        if let Err(err) = cleanup {
            if final_result.is_ok() {
                final_result = Err(err);
            }
        }
    }
    final_result
}

fn redraw_line(prompt: &str, state: &LineEditorState, mask: MaskMode) -> io::Result<()> {
    let display_text = state.display_text(mask);
    let cursor_columns = UnicodeWidthStr::width(prompt) + state.cursor_columns(mask);

    print!("\r\x1b[K{}{}", prompt, display_text);
    if cursor_columns > 0 {
        print!("\r\x1b[{}C", cursor_columns);
    } else {
        print!("\r");
    }

    io::stdout().flush()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent::new(code, modifiers)
    }

    #[test]
    fn insert_and_backspace_respect_multibyte_cursor() {
        let mut state = LineEditorState::with_text("héllo".to_string());
        apply_line_edit_action(&mut state, LineEditAction::MoveLeft);
        apply_line_edit_action(&mut state, LineEditAction::Insert('!'));
        assert_eq!(state.text, "héll!o");

        state.cursor = 2;
        apply_line_edit_action(&mut state, LineEditAction::Backspace);
        assert_eq!(state.text, "hll!o");
        assert_eq!(state.cursor, 1);
    }

    #[test]
    fn delete_word_removes_previous_word_and_spaces() {
        let mut state = LineEditorState::with_text("draw a cat  ".to_string());
        assert!(apply_line_edit_action(&mut state, LineEditAction::DeleteWord));
        assert_eq!(state.text, "draw a ");
        assert_eq!(state.cursor, 7);
    }

    #[test]
    fn paste_flattens_newlines() {
        let mut state = LineEditorState::default();
        apply_line_edit_action(&mut state, LineEditAction::Paste("a\nb\r\nc".to_string()));
        assert_eq!(state.text, "a b  c");
        assert_eq!(state.cursor, 6);
    }

    #[test]
    fn no_op_edits_report_no_redraw() {
        let mut state = LineEditorState::default();
        assert!(!apply_line_edit_action(&mut state, LineEditAction::Backspace));
        assert!(!apply_line_edit_action(&mut state, LineEditAction::MoveRight));
        assert!(!apply_line_edit_action(&mut state, LineEditAction::ClearAll));
    }

    #[test]
    fn hidden_mask_keeps_cursor_width() {
        let state = LineEditorState::with_text("pässword".to_string());
        assert_eq!(state.display_text(MaskMode::Hidden), "********");
        assert_eq!(state.cursor_columns(MaskMode::Hidden), 8);
    }

    #[test]
    fn control_keys_map_to_editing_actions() {
        assert_eq!(
            map_key_event_to_action(&key(KeyCode::Char('u'), KeyModifiers::CONTROL)),
            Some(LineEditAction::ClearAll)
        );
        assert_eq!(
            map_key_event_to_action(&key(KeyCode::Char('x'), KeyModifiers::NONE)),
            Some(LineEditAction::Insert('x'))
        );
        assert_eq!(
            map_key_event_to_action(&key(KeyCode::Enter, KeyModifiers::NONE)),
            None
        );
    }
}
