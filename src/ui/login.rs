//! Sign-in form drawn before the chat when no token is stored.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::ui::state::{LoginField, UiState};
use crate::utils::line_editor::{LineEditorState, MaskMode};

const FORM_WIDTH: u16 = 60;

pub fn draw_login(f: &mut Frame, area: Rect, ui: &UiState) {
    let form = &ui.login;
    let width = FORM_WIDTH.min(area.width);
    let column = Rect {
        x: area.x + (area.width - width) / 2,
        width,
        ..area
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2),
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Length(1),
            Constraint::Min(1),
        ])
        .split(column);

    let heading = Line::from(vec![
        Span::styled(
            "Sign in to Jerry",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ),
        Span::styled(" or Esc to continue as guest", Style::default().fg(Color::DarkGray)),
    ]);
    f.render_widget(Paragraph::new(heading), chunks[0]);

    let fields = [
        (LoginField::Email, "Email", &form.email, MaskMode::None, chunks[1]),
        (LoginField::Password, "Password", &form.password, MaskMode::Hidden, chunks[2]),
        (
            LoginField::GoogleToken,
            "Google token (Enter here signs in with Google)",
            &form.google_token,
            MaskMode::None,
            chunks[3],
        ),
    ];
    for (field, title, state, mask, rect) in fields {
        let focused = form.focus == field;
        draw_field(f, rect, title, state, mask, focused && !form.in_flight);
    }

    let status = if form.in_flight {
        Line::from(Span::styled("Signing in...", Style::default().fg(Color::Yellow)))
    } else if let Some(error) = &form.error {
        Line::from(Span::styled(
            error.clone(),
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        ))
    } else {
        Line::default()
    };
    f.render_widget(Paragraph::new(status), chunks[4]);

    f.render_widget(
        Paragraph::new("Tab next field • Enter sign in • Ctrl+C quit")
            .style(Style::default().fg(Color::DarkGray)),
        chunks[5],
    );
}

fn draw_field(
    f: &mut Frame,
    area: Rect,
    title: &str,
    state: &LineEditorState,
    mask: MaskMode,
    focused: bool,
) {
    let style = if focused {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default()
    };
    let inner_width = usize::from(area.width.saturating_sub(2)).max(1);
    let cursor = state.cursor_columns(mask);
    let hscroll = cursor.saturating_sub(inner_width - 1);

    f.render_widget(
        Paragraph::new(state.display_text(mask))
            .style(style)
            .block(Block::default().borders(Borders::ALL).title(title.to_string()))
            .scroll((0, u16::try_from(hscroll).unwrap_or(u16::MAX))),
        area,
    );

    if focused {
        let x = area.x + 1 + u16::try_from(cursor - hscroll).unwrap_or(0);
        f.set_cursor_position((x, area.y + 1));
    }
}
