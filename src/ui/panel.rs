use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use ratatui_image::protocol::StatefulProtocolType;
use ratatui_image::{Resize, StatefulImage};

use crate::app::Model;
use crate::surface::{RenderResult, SurfaceState};

pub const PANEL_TITLE: &str = "Architecture Diagram";
pub const LOADING_MESSAGE: &str = "Analyzing codebase structure...";
pub const LOADING_DETAIL: &str = "Parsing AST & generating visualization";
pub const EMPTY_PLACEHOLDER: &str = "Ready to visualize your codebase";
pub const PENDING_MESSAGE: &str = "Rendering diagram\u{2026}";
pub const RAW_OUTPUT_LABEL: &str = "Raw output received:";

/// Stands in for `\r` in the raw output view.
const CARRIAGE_RETURN_GLYPH: &str = "\u{240d}";

pub fn nodes_badge(nodes: u64) -> String {
    format!("{nodes} Nodes Parsed")
}

pub fn render_panel(model: &mut Model, frame: &mut Frame, area: Rect) {
    let mut block = Block::default().title(PANEL_TITLE).borders(Borders::ALL);
    if let Some(nodes) = model.nodes_analyzed() {
        block = block.title_top(
            Line::from(Span::styled(
                format!(" {} ", nodes_badge(nodes)),
                Style::default().fg(Color::Green),
            ))
            .right_aligned(),
        );
    }
    let inner = block.inner(area);
    frame.render_widget(block, area);

    match model.surface_state() {
        SurfaceState::Loading => render_centered(
            frame,
            inner,
            vec![
                Line::styled(LOADING_MESSAGE, Style::default().fg(Color::Cyan)),
                Line::styled(LOADING_DETAIL, Style::default().fg(Color::DarkGray)),
            ],
        ),
        SurfaceState::Empty => render_centered(
            frame,
            inner,
            vec![
                Line::styled(EMPTY_PLACEHOLDER, Style::default().add_modifier(Modifier::BOLD)),
                Line::styled(
                    "Fill in a repository path and a query, then press Enter",
                    Style::default().fg(Color::DarkGray),
                ),
            ],
        ),
        SurfaceState::Pending => render_centered(
            frame,
            inner,
            vec![Line::styled(PENDING_MESSAGE, Style::default().fg(Color::Cyan))],
        ),
        SurfaceState::Rendered => render_rendered(model, frame, inner),
        SurfaceState::RenderFailed => render_failure(model, frame, inner),
    }
}

fn render_centered(frame: &mut Frame, area: Rect, lines: Vec<Line<'static>>) {
    let height = u16::try_from(lines.len()).unwrap_or(u16::MAX);
    let top = area.y + area.height.saturating_sub(height) / 2;
    let centered = Rect::new(area.x, top, area.width, height.min(area.height));
    frame.render_widget(Paragraph::new(lines).alignment(Alignment::Center), centered);
}

fn render_rendered(model: &mut Model, frame: &mut Frame, area: Rect) {
    if let Some(protocol) = model.diagram_protocol.as_mut() {
        let resize = if matches!(protocol.protocol_type(), StatefulProtocolType::Halfblocks(_)) {
            // Nearest-neighbor causes strong color aliasing artifacts in half-cell mode.
            Resize::Scale(Some(image::imageops::FilterType::CatmullRom))
        } else {
            Resize::Scale(None)
        };
        frame.render_stateful_widget(StatefulImage::default().resize(resize), area, protocol);
        return;
    }

    let Some(artifact) = model.surface.mount().artifact() else {
        return;
    };
    let lines = vec![
        Line::styled(
            format!("Diagram {} rendered", artifact.id),
            Style::default().fg(Color::Green),
        ),
        Line::styled(
            format!("{} bytes of SVG. Press Ctrl-S to save it.", artifact.svg.len()),
            Style::default().fg(Color::DarkGray),
        ),
    ];
    render_centered(frame, area, lines);
}

fn render_failure(model: &mut Model, frame: &mut Frame, area: Rect) {
    let Some(RenderResult::Failed {
        reason,
        original_payload,
    }) = model.surface.result()
    else {
        return;
    };

    let mut lines = vec![
        Line::styled(
            *reason,
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        ),
        Line::default(),
        Line::styled(RAW_OUTPUT_LABEL, Style::default().fg(Color::DarkGray)),
    ];
    // Carriage returns and trailing blank lines stay visible.
    lines.extend(original_payload.split('\n').map(|line| {
        Line::styled(
            line.replace('\r', CARRIAGE_RETURN_GLYPH),
            Style::default().fg(Color::Gray),
        )
    }));

    let max_scroll = u16::try_from(lines.len().saturating_sub(1)).unwrap_or(u16::MAX);
    let scroll = model.panel_scroll.min(max_scroll);
    model.panel_scroll = scroll;

    let paragraph = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .scroll((scroll, 0));
    frame.render_widget(paragraph, area);
}
