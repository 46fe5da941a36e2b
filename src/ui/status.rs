use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

use crate::app::{Model, ToastLevel};
use crate::surface::SurfaceState;

pub fn render_banner(model: &Model, frame: &mut Frame, area: Rect) {
    let Some(message) = model.banner.as_deref() else {
        return;
    };
    let banner = Paragraph::new(format!(" {message}  (Esc to dismiss)"))
        .style(Style::default().bg(Color::Red).fg(Color::White));
    frame.render_widget(banner, area);
}

pub fn render_status_bar(model: &Model, frame: &mut Frame, area: Rect) {
    let actions = match model.surface_state() {
        SurfaceState::Rendered => "  ^S:save svg",
        SurfaceState::RenderFailed => "  ^Y:copy raw  PgUp/PgDn:scroll",
        _ => "",
    };
    let status = format!(" Tab:next field  Enter:generate  ^U:clear{actions}  Esc:quit");
    let status_bar =
        Paragraph::new(status).style(Style::default().bg(Color::DarkGray).fg(Color::White));
    frame.render_widget(status_bar, area);
}

pub fn render_toast_bar(model: &Model, frame: &mut Frame, area: Rect) {
    let Some((message, level)) = model.active_toast() else {
        return;
    };
    let (prefix, style) = match level {
        ToastLevel::Info => (
            "[info]",
            Style::default().bg(Color::DarkGray).fg(Color::White),
        ),
        ToastLevel::Warning => (
            "[warn]",
            Style::default().bg(Color::Yellow).fg(Color::Black),
        ),
        ToastLevel::Error => ("[error]", Style::default().bg(Color::Red).fg(Color::White)),
    };
    let toast = Paragraph::new(format!("{prefix} {message}")).style(style);
    frame.render_widget(toast, area);
}
