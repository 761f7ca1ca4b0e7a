use std::error::Error;
use std::fmt;

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::core::controller::Controller;
use crate::core::message::{Content, Message, Role};
use crate::ui::login::draw_login;
use crate::ui::state::{Screen, UiState, TOOL_ITEMS};
use crate::utils::image::{ImageRef, ImageRefError};
use crate::utils::line_editor::MaskMode;

pub const MIN_WIDTH: u16 = 24;
pub const MIN_HEIGHT: u16 = 8;

const FALLBACK_HEADLINE: &str = "Something went wrong.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    AreaTooSmall { width: u16, height: u16 },
    Image { index: usize, source: ImageRefError },
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::AreaTooSmall { width, height } => write!(
                f,
                "terminal is {width}x{height}; at least {MIN_WIDTH}x{MIN_HEIGHT} is needed"
            ),
            RenderError::Image { index, source } => {
                write!(f, "message {} has an unreadable image: {source}", index + 1)
            }
        }
    }
}

impl Error for RenderError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            RenderError::Image { source, .. } => Some(source),
            RenderError::AreaTooSmall { .. } => None,
        }
    }
}

/// Draw the active screen. Failures are drawn through [`render_fallback`].
pub fn draw(f: &mut Frame, controller: &Controller, ui: &UiState) {
    let area = f.area();
    if area.width < MIN_WIDTH || area.height < MIN_HEIGHT {
        let err = RenderError::AreaTooSmall {
            width: area.width,
            height: area.height,
        };
        render_fallback(f, area, &err);
        return;
    }

    match ui.screen {
        Screen::Login => draw_login(f, area, ui),
        Screen::Chat => draw_chat(f, area, controller, ui),
    }
}

fn draw_chat(f: &mut Frame, area: Rect, controller: &Controller, ui: &UiState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(1),
            Constraint::Length(1),
            Constraint::Length(3),
        ])
        .split(area);

    f.render_widget(Paragraph::new(title_line(controller)), chunks[0]);

    if controller.is_pristine() {
        f.render_widget(Paragraph::new(hero_lines()), chunks[1]);
    } else {
        match build_transcript_lines(controller.messages()) {
            Ok(lines) => {
                let lines = prewrap_lines(lines, chunks[1].width);
                let total = u16::try_from(lines.len()).unwrap_or(u16::MAX);
                let offset = scroll_offset(total, chunks[1].height, ui.scroll_back);
                let transcript = Paragraph::new(lines).scroll((offset, 0));
                f.render_widget(transcript, chunks[1]);
            }
            Err(err) => render_fallback(f, chunks[1], &err),
        }
    }

    f.render_widget(Paragraph::new(status_line(controller, ui)), chunks[2]);
    draw_input(f, chunks[3], controller, ui);

    if ui.show_tools {
        draw_tools(f, chunks[1], ui);
    }
}

fn title_line(controller: &Controller) -> Line<'static> {
    let who = if controller.session().is_authenticated() {
        "signed in"
    } else {
        "guest"
    };
    Line::from(vec![
        Span::styled(
            "Jerry",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!(" v{} • {who}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::DarkGray),
        ),
    ])
}

/// Welcome text shown before anything has been asked.
pub fn hero_lines() -> Vec<Line<'static>> {
    let hint = |keys: &'static str, what: &'static str| {
        Line::from(vec![
            Span::styled(format!("  {keys:<8}"), Style::default().fg(Color::Yellow)),
            Span::raw(what),
        ])
    };
    vec![
        Line::default(),
        Line::from(Span::styled(
            "Jerry",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        )),
        Line::from("Ask a question or describe an image to generate."),
        Line::default(),
        hint("Enter", "ask"),
        hint("Ctrl+G", "generate an image"),
        hint("Ctrl+T", "more tools"),
        hint("Ctrl+E", "edit your last message"),
        hint("Ctrl+L", "sign out"),
    ]
}

/// Transcript in chronological order, one blank line between messages.
pub fn build_transcript_lines(messages: &[Message]) -> Result<Vec<Line<'static>>, RenderError> {
    let mut lines = Vec::new();
    for (index, message) in messages.iter().enumerate() {
        if index > 0 {
            lines.push(Line::default());
        }
        let (label, color) = match message.role {
            Role::User => ("You: ", Color::Cyan),
            Role::Assistant => ("Jerry: ", Color::Green),
        };
        let prefix = Span::styled(label, Style::default().fg(color).add_modifier(Modifier::BOLD));

        match &message.content {
            Content::Text(text) => {
                let mut rows = text.split('\n');
                let first = rows.next().unwrap_or_default();
                lines.push(Line::from(vec![prefix, Span::raw(first.to_string())]));
                lines.extend(rows.map(|row| Line::from(row.to_string())));
            }
            Content::Image(reference) => {
                let image = ImageRef::parse(reference)
                    .map_err(|source| RenderError::Image { index, source })?;
                lines.push(Line::from(vec![
                    prefix,
                    Span::styled("[image] ", Style::default().fg(Color::Magenta)),
                    Span::raw(image.describe()),
                ]));
            }
        }
    }
    Ok(lines)
}

/// Break `lines` into rows at most `width` columns wide.
///
/// Words move to the next row whole; only a word wider than a row is split.
/// The transcript is drawn from these rows without further wrapping, so the
/// row count used for scrolling is exactly what ends up on screen.
pub fn prewrap_lines(lines: Vec<Line<'static>>, width: u16) -> Vec<Line<'static>> {
    let mut rows = Vec::with_capacity(lines.len());
    for line in lines {
        let mut wrapper = RowWrapper::new(usize::from(width.max(1)), line.style);
        for span in &line.spans {
            for run in split_runs(span.content.as_ref()) {
                wrapper.push(run, span.style);
            }
        }
        rows.extend(wrapper.finish());
    }
    rows
}

/// Alternating runs of whitespace and non-whitespace.
fn split_runs(text: &str) -> Vec<&str> {
    let mut runs = Vec::new();
    let mut start = 0;
    let mut in_space = None;
    for (idx, ch) in text.char_indices() {
        let space = ch.is_whitespace();
        if in_space.is_some_and(|prev| prev != space) {
            runs.push(&text[start..idx]);
            start = idx;
        }
        in_space = Some(space);
    }
    if start < text.len() {
        runs.push(&text[start..]);
    }
    runs
}

struct RowWrapper {
    width: usize,
    style: Style,
    rows: Vec<Line<'static>>,
    spans: Vec<Span<'static>>,
    used: usize,
}

impl RowWrapper {
    fn new(width: usize, style: Style) -> Self {
        Self {
            width,
            style,
            rows: Vec::new(),
            spans: Vec::new(),
            used: 0,
        }
    }

    fn push(&mut self, run: &str, style: Style) {
        let run_width = UnicodeWidthStr::width(run);
        if self.used + run_width <= self.width {
            self.append(run.to_string(), run_width, style);
        } else if run.starts_with(char::is_whitespace) {
            // Whitespace at a wrap point is dropped; the next word opens a row.
            self.used = self.width;
        } else if run_width <= self.width {
            self.break_row();
            self.append(run.to_string(), run_width, style);
        } else {
            self.push_long_word(run, style);
        }
    }

    fn push_long_word(&mut self, word: &str, style: Style) {
        let mut chunk = String::new();
        let mut chunk_width = 0;
        for ch in word.chars() {
            let ch_width = UnicodeWidthChar::width(ch).unwrap_or(0);
            let filled = self.used + chunk_width;
            if filled + ch_width > self.width && filled > 0 {
                self.append(std::mem::take(&mut chunk), chunk_width, style);
                chunk_width = 0;
                self.break_row();
            }
            chunk.push(ch);
            chunk_width += ch_width;
        }
        self.append(chunk, chunk_width, style);
    }

    fn append(&mut self, text: String, text_width: usize, style: Style) {
        if text.is_empty() {
            return;
        }
        self.spans.push(Span::styled(text, style));
        self.used += text_width;
    }

    fn break_row(&mut self) {
        let spans = std::mem::take(&mut self.spans);
        self.rows.push(Line::from(spans).style(self.style));
        self.used = 0;
    }

    fn finish(mut self) -> Vec<Line<'static>> {
        self.break_row();
        self.rows
    }
}

/// Top row to show so that the newest output stays visible unless the user
/// has scrolled back.
pub fn scroll_offset(total: u16, visible: u16, scroll_back: u16) -> u16 {
    let max = total.saturating_sub(visible);
    max - scroll_back.min(max)
}

fn status_line(controller: &Controller, ui: &UiState) -> Line<'static> {
    if controller.is_loading() {
        return Line::from(Span::styled(
            "Loading...",
            Style::default().fg(Color::Yellow),
        ));
    }
    if let Some(banner) = controller.banner() {
        return Line::from(Span::styled(
            format!("⚠ {banner}"),
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        ));
    }
    match &ui.notice {
        Some(notice) => Line::from(Span::styled(
            notice.clone(),
            Style::default().fg(Color::Green),
        )),
        None => Line::default(),
    }
}

fn draw_input(f: &mut Frame, area: Rect, controller: &Controller, ui: &UiState) {
    let title = match ui.editing {
        Some(index) => format!("Editing message {} (Enter save • Esc cancel)", index + 1),
        None => "Message (Enter ask • Ctrl+G image • Ctrl+T tools • Ctrl+C quit)".to_string(),
    };
    let style = if ui.editing.is_some() {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default().fg(Color::Cyan)
    };

    let input = controller.input();
    let inner_width = usize::from(area.width.saturating_sub(2)).max(1);
    let cursor = input.cursor_columns(MaskMode::None);
    let hscroll = cursor.saturating_sub(inner_width - 1);

    let paragraph = Paragraph::new(input.display_text(MaskMode::None))
        .style(style)
        .block(Block::default().borders(Borders::ALL).title(title))
        .scroll((0, u16::try_from(hscroll).unwrap_or(u16::MAX)));
    f.render_widget(paragraph, area);

    if !ui.show_tools {
        let x = area.x + 1 + u16::try_from(cursor - hscroll).unwrap_or(0);
        f.set_cursor_position((x, area.y + 1));
    }
}

fn draw_tools(f: &mut Frame, area: Rect, ui: &UiState) {
    let width = 28.min(area.width);
    let height = (TOOL_ITEMS.len() as u16 + 2).min(area.height);
    let popup = Rect {
        x: area.x + area.width.saturating_sub(width) / 2,
        y: area.y + area.height.saturating_sub(height) / 2,
        width,
        height,
    };

    let lines: Vec<Line> = TOOL_ITEMS
        .iter()
        .enumerate()
        .map(|(index, item)| {
            if index == ui.tools_selected {
                Line::from(Span::styled(
                    format!("> {}", item.label()),
                    Style::default().add_modifier(Modifier::REVERSED),
                ))
            } else {
                Line::from(format!("  {}", item.label()))
            }
        })
        .collect();

    f.render_widget(Clear, popup);
    f.render_widget(
        Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Tools")),
        popup,
    );
}

/// Draw `err` in place of the content that failed.
pub fn render_fallback(f: &mut Frame, area: Rect, err: &RenderError) {
    let lines = vec![
        Line::from(Span::styled(
            FALLBACK_HEADLINE,
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        )),
        Line::from(err.to_string()),
    ];
    f.render_widget(Clear, area);
    f.render_widget(Paragraph::new(lines).wrap(Wrap { trim: true }), area);
}
