use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::app::{Focus, Model, TextField};

use super::{panel, status};

pub const APP_TITLE: &str = "CodeAtlas";
pub const APP_SUBTITLE: &str = "Enterprise Architecture Visualizer";

const FIELD_HEIGHT: u16 = 3;

/// Screen regions, top to bottom.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenLayout {
    pub header: Rect,
    pub repository: Rect,
    pub query: Rect,
    pub button: Rect,
    pub banner: Rect,
    pub panel: Rect,
    pub status: Rect,
}

pub fn screen_layout(area: Rect, banner_visible: bool) -> ScreenLayout {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2),
            Constraint::Length(FIELD_HEIGHT),
            Constraint::Length(FIELD_HEIGHT),
            Constraint::Length(1),
            Constraint::Length(u16::from(banner_visible)),
            Constraint::Min(3),
            Constraint::Length(1),
        ])
        .split(area);
    ScreenLayout {
        header: chunks[0],
        repository: chunks[1],
        query: chunks[2],
        button: chunks[3],
        banner: chunks[4],
        panel: chunks[5],
        status: chunks[6],
    }
}

/// Render the complete UI.
pub fn render(model: &mut Model, frame: &mut Frame) {
    let layout = screen_layout(frame.area(), model.banner.is_some());

    render_header(frame, layout.header);
    render_field(
        model,
        frame,
        layout.repository,
        "Repository Path",
        Focus::Repository,
    );
    render_field(model, frame, layout.query, "Analysis Query", Focus::Query);
    render_button(model, frame, layout.button);
    status::render_banner(model, frame, layout.banner);
    panel::render_panel(model, frame, layout.panel);
    if model.active_toast().is_some() {
        status::render_toast_bar(model, frame, layout.status);
    } else {
        status::render_status_bar(model, frame, layout.status);
    }
}

fn render_header(frame: &mut Frame, area: Rect) {
    let lines = vec![
        Line::from(Span::styled(
            APP_TITLE,
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            APP_SUBTITLE,
            Style::default().fg(Color::DarkGray),
        )),
    ];
    frame.render_widget(Paragraph::new(lines), area);
}

fn render_field(model: &Model, frame: &mut Frame, area: Rect, title: &str, focus: Focus) {
    let field = match focus {
        Focus::Query => &model.query,
        _ => &model.repository,
    };
    let focused = model.focus == focus;
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(if focused {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default()
        });
    let inner = block.inner(area);
    let (visible, cursor_col) = field_window(field, inner.width);
    frame.render_widget(Paragraph::new(visible).block(block), area);

    if focused && inner.width > 0 && inner.height > 0 {
        frame.set_cursor_position((inner.x + cursor_col, inner.y));
    }
}

/// The part of `field` that fits in `width` columns, scrolled so the
/// cursor stays visible, plus the cursor's column within it.
pub(super) fn field_window(field: &TextField, width: u16) -> (String, u16) {
    let width = usize::from(width.max(1));
    let before = field.before_cursor();
    let mut skip_cols = before.width().saturating_sub(width - 1);

    let mut visible = String::new();
    let mut used = 0usize;
    let mut cursor_col = 0usize;
    for (idx, c) in field.value().chars().enumerate() {
        let w = c.width().unwrap_or(0);
        if skip_cols > 0 {
            skip_cols = skip_cols.saturating_sub(w);
            continue;
        }
        if idx == field.cursor() {
            cursor_col = used;
        }
        if used + w > width {
            break;
        }
        visible.push(c);
        used += w;
    }
    if field.cursor() >= field.value().chars().count() {
        cursor_col = used.min(width - 1);
    }
    (visible, u16::try_from(cursor_col).unwrap_or(u16::MAX))
}

fn render_button(model: &Model, frame: &mut Frame, area: Rect) {
    let label = if model.loading {
        "[ Generating... ]"
    } else {
        "[ Generate Diagram ]"
    };
    let mut style = if model.can_submit() {
        Style::default().fg(Color::Black).bg(Color::Cyan)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    if model.focus == Focus::Generate {
        style = style.add_modifier(Modifier::REVERSED | Modifier::BOLD);
    }
    frame.render_widget(Paragraph::new(Span::styled(label, style)), area);
}
