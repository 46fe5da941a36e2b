//! Mermaid rendering engine.
//!
//! The surface treats the engine as a black box: text goes in, an SVG (and a
//! raster of it for terminal display) comes out, or the text is rejected.
//! [`MermaidEngine`] uses `mermaid-rs-renderer` to parse and draw SVG and
//! `resvg` for rasterization.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use image::DynamicImage;
use mermaid_rs_renderer::{
    RenderOptions,
    ir::{DiagramKind, Graph},
    layout::compute_layout,
    parser::parse_mermaid,
    render::render_svg,
};
use resvg::usvg::fontdb;
use thiserror::Error;

/// Default rasterization width in pixels.
pub const DEFAULT_RENDER_WIDTH_PX: u32 = 1600;

/// Why the engine refused a diagram.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The diagram text could not be parsed or laid out.
    #[error("diagram syntax rejected: {0}")]
    Syntax(String),
    /// The generated SVG could not be turned into pixels.
    #[error("rasterization failed: {0}")]
    Raster(String),
    /// The renderer panicked on this input.
    #[error("renderer panicked: {0}")]
    Panicked(String),
}

/// Output of one successful render.
#[derive(Debug, Clone)]
pub struct RenderedDiagram {
    /// Standalone SVG document.
    pub svg: String,
    /// Rasterized form for terminal graphics, when the engine produces one.
    pub image: Option<DynamicImage>,
}

/// A diagram rendering engine.
///
/// `id` is unique per render attempt and may be embedded in the output.
pub trait DiagramEngine: Send {
    /// Render `text`, or reject it.
    ///
    /// # Errors
    ///
    /// Returns an [`EngineError`] when the text is not a diagram the engine
    /// can draw.
    fn render(&self, id: &str, text: &str) -> Result<RenderedDiagram, EngineError>;
}

/// `mermaid-rs-renderer` backed engine.
#[derive(Debug, Clone, Copy)]
pub struct MermaidEngine {
    width_px: u32,
    rasterize: bool,
}

impl MermaidEngine {
    /// Create an engine that rasterizes at `width_px`.
    pub const fn new(width_px: u32) -> Self {
        Self {
            width_px,
            rasterize: true,
        }
    }

    /// Create an engine that only produces SVG.
    pub const fn svg_only() -> Self {
        Self {
            width_px: DEFAULT_RENDER_WIDTH_PX,
            rasterize: false,
        }
    }
}

impl Default for MermaidEngine {
    fn default() -> Self {
        Self::new(DEFAULT_RENDER_WIDTH_PX)
    }
}

impl DiagramEngine for MermaidEngine {
    fn render(&self, id: &str, text: &str) -> Result<RenderedDiagram, EngineError> {
        let _scope = crate::perf::scope("engine.render");
        isolate_panics(|| {
            let svg = draw_svg(text)?;
            tracing::debug!(id, svg_len = svg.len(), "mermaid svg generated");
            let image = if self.rasterize {
                Some(rasterize_svg(&svg, self.width_px)?)
            } else {
                None
            };
            Ok(RenderedDiagram { svg, image })
        })
        .unwrap_or_else(|message| Err(EngineError::Panicked(message)))
    }
}

/// First words the renderer understands as a diagram declaration, lowercased.
const DECLARATIONS: &[&str] = &[
    "graph",
    "flowchart",
    "flowchart-elk",
    "sequencediagram",
    "classdiagram",
    "classdiagram-v2",
    "statediagram",
    "statediagram-v2",
    "erdiagram",
    "pie",
    "mindmap",
    "journey",
    "timeline",
    "gantt",
    "requirementdiagram",
    "gitgraph",
    "c4context",
    "c4container",
    "c4component",
    "c4dynamic",
    "c4deployment",
    "sankey",
    "sankey-beta",
    "quadrantchart",
    "zenuml",
    "block",
    "block-beta",
    "packet",
    "packet-beta",
    "kanban",
    "architecture",
    "architecture-beta",
    "radar",
    "radar-beta",
    "treemap",
    "treemap-beta",
    "xychart",
    "xychart-beta",
];

/// Validate, lay out and draw SVG with repaired font quoting.
///
/// Must run inside [`isolate_panics`].
fn draw_svg(mermaid_source: &str) -> Result<String, EngineError> {
    check_declaration(mermaid_source)?;
    let parsed =
        parse_mermaid(mermaid_source).map_err(|err| EngineError::Syntax(format!("{err:#}")))?;
    let kind = parsed.graph.kind;
    check_statements(mermaid_source, kind)?;
    if has_graph_body(kind) && is_empty_graph(&parsed.graph) {
        return Err(EngineError::Syntax("diagram has no nodes or edges".to_string()));
    }

    let options = RenderOptions::default();
    let layout = compute_layout(&parsed.graph, &options.theme, &options.layout);
    let svg = render_svg(&layout, &options.theme, &options.layout);
    Ok(fix_svg_font_families(&svg))
}

/// Lines that carry diagram content: not blank and not `%%` comments.
fn content_lines(source: &str) -> impl Iterator<Item = &str> {
    source
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with("%%"))
}

/// The renderer falls back to a flowchart for anything it does not
/// recognize, so an unknown first word has to be rejected here.
fn check_declaration(source: &str) -> Result<(), EngineError> {
    let first = content_lines(source).next().unwrap_or_default();
    let word = first
        .split(|c: char| c.is_whitespace() || c == ';')
        .next()
        .unwrap_or_default()
        .trim_end_matches(':')
        .to_ascii_lowercase();
    if DECLARATIONS.contains(&word.as_str()) {
        Ok(())
    } else {
        Err(EngineError::Syntax(format!(
            "expected a diagram declaration, found {:?}",
            first.chars().take(40).collect::<String>()
        )))
    }
}

/// Kinds whose content is nodes joined by edges (or participants).
const fn has_graph_body(kind: DiagramKind) -> bool {
    matches!(
        kind,
        DiagramKind::Flowchart
            | DiagramKind::Sequence
            | DiagramKind::Class
            | DiagramKind::State
            | DiagramKind::Er
    )
}

fn is_empty_graph(graph: &Graph) -> bool {
    graph.nodes.is_empty() && graph.edges.is_empty() && graph.sequence_participants.is_empty()
}

/// Reject truncated statements the parser would otherwise accept.
///
/// Covers links with no target (`A --`, `A->>`) and labels whose bracket
/// never closes (`A[unclosed`, `class Foo {`).
fn check_statements(source: &str, kind: DiagramKind) -> Result<(), EngineError> {
    if !matches!(
        kind,
        DiagramKind::Flowchart | DiagramKind::Sequence | DiagramKind::Class | DiagramKind::State
    ) {
        return Ok(());
    }

    for line in content_lines(source) {
        for statement in line.split(';').map(str::trim) {
            // `<<interface>>` style annotations and `--` state separators.
            if statement.contains("<<") || statement.chars().all(|c| c == '-') {
                continue;
            }
            // Outside flowcharts, text after `:` is a free-form label.
            let link = if kind == DiagramKind::Flowchart {
                statement
            } else {
                statement.split(':').next().unwrap_or_default().trim_end()
            };
            if link.ends_with(['-', '>', '=', '|']) {
                return Err(EngineError::Syntax(format!(
                    "link without a target: {statement:?}"
                )));
            }
        }
    }

    if matches!(kind, DiagramKind::Flowchart | DiagramKind::Class)
        && let Some(open) = unclosed_bracket(source)
    {
        return Err(EngineError::Syntax(format!("unclosed '{open}'")));
    }
    Ok(())
}

/// Find a bracket kind opened more often than it is closed, outside quotes.
fn unclosed_bracket(source: &str) -> Option<char> {
    const PAIRS: [(char, char); 3] = [('[', ']'), ('(', ')'), ('{', '}')];
    let mut balance = [0_i64; 3];
    let mut quoted = false;
    for c in source.chars() {
        if c == '"' {
            quoted = !quoted;
            continue;
        }
        if quoted {
            continue;
        }
        for (slot, (open, close)) in balance.iter_mut().zip(PAIRS) {
            if c == open {
                *slot += 1;
            } else if c == close {
                *slot -= 1;
            }
        }
    }
    balance
        .iter()
        .zip(PAIRS)
        .find(|(count, _)| **count > 0)
        .map(|(_, (open, _))| open)
}

/// Run `f`, turning a panic into its message.
///
/// The default hook is silenced for the duration so a renderer panic does not
/// scribble over the terminal.
pub(crate) fn isolate_panics<T>(f: impl FnOnce() -> T) -> Result<T, String> {
    let prev_hook = panic::take_hook();
    panic::set_hook(Box::new(|_| {}));
    let outcome = panic::catch_unwind(AssertUnwindSafe(f));
    panic::set_hook(prev_hook);
    outcome.map_err(|payload| panic_payload_to_string(payload.as_ref()))
}

fn panic_payload_to_string(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Replace inner double quotes in `font-family` attribute values.
///
/// The renderer emits values like `font-family="Inter, "Segoe UI", sans-serif"`,
/// which no XML parser accepts.
fn fix_svg_font_families(svg: &str) -> String {
    const MARKER: &str = "font-family=\"";
    let mut result = String::with_capacity(svg.len());
    let mut rest = svg;

    while let Some(pos) = rest.find(MARKER) {
        result.push_str(&rest[..pos + MARKER.len()]);
        rest = &rest[pos + MARKER.len()..];

        // The closing quote is the first `"` followed by `>`, ` `, `/` or end of input.
        let mut end_offset = rest.len();
        let mut value_end = rest.len();
        for (i, ch) in rest.char_indices() {
            if ch != '"' {
                continue;
            }
            let after = rest.get(i + 1..i + 2).unwrap_or("");
            if after.is_empty() || after.starts_with(['>', ' ', '/']) {
                value_end = i;
                end_offset = i + 1;
                break;
            }
        }
        result.push_str(&rest[..value_end].replace('"', "'"));
        if end_offset > value_end {
            result.push('"');
        }
        rest = &rest[end_offset..];
    }
    result.push_str(rest);
    result
}

/// Rasterize an SVG so its width matches `target_width_px`.
fn rasterize_svg(svg: &str, target_width_px: u32) -> Result<DynamicImage, EngineError> {
    let mut db = fontdb::Database::new();
    db.load_system_fonts();

    let opts = resvg::usvg::Options {
        fontdb: Arc::new(db),
        ..Default::default()
    };

    let tree = resvg::usvg::Tree::from_str(svg, &opts)
        .map_err(|err| EngineError::Raster(err.to_string()))?;
    let size = tree.size();

    #[allow(clippy::cast_precision_loss)]
    let scale = target_width_px as f32 / size.width();

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let width = (size.width() * scale).ceil() as u32;
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let height = (size.height() * scale).ceil() as u32;

    let mut pixmap = resvg::tiny_skia::Pixmap::new(width, height)
        .ok_or_else(|| EngineError::Raster(format!("cannot allocate pixmap {width}x{height}")))?;

    resvg::render(
        &tree,
        resvg::tiny_skia::Transform::from_scale(scale, scale),
        &mut pixmap.as_mut(),
    );

    let rgba = pixmap.data().to_vec();
    let buffer = image::RgbaImage::from_raw(width, height, rgba)
        .ok_or_else(|| EngineError::Raster("pixmap size mismatch".to_string()))?;

    Ok(DynamicImage::ImageRgba8(buffer))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fix_svg_font_families_replaces_inner_quotes() {
        let input = r#"<text font-family="Inter, "Segoe UI", sans-serif" font-size="14">"#;
        assert_eq!(
            fix_svg_font_families(input),
            r#"<text font-family="Inter, 'Segoe UI', sans-serif" font-size="14">"#
        );
    }

    #[test]
    fn test_fix_svg_font_families_no_op_when_clean() {
        let input = r#"<text font-family="Inter, sans-serif" font-size="14">"#;
        assert_eq!(fix_svg_font_families(input), input);
    }

    #[test]
    fn test_svg_only_engine_renders_flowchart() {
        let engine = MermaidEngine::svg_only();
        let out = engine
            .render("diagram-1", "flowchart LR\n    A[Start] --> B[End]")
            .unwrap();
        assert!(out.svg.contains("<svg"));
        assert!(out.image.is_none());
    }

    #[test]
    fn test_engine_rejects_prose() {
        let err = MermaidEngine::svg_only()
            .render("diagram-1", "I could not produce a diagram.")
            .unwrap_err();
        assert!(matches!(err, EngineError::Syntax(_)), "got {err:?}");
    }

    #[test]
    fn test_engine_rejects_dangling_edge() {
        let engine = MermaidEngine::svg_only();
        for text in ["graph TD\nA--", "graph TD\nA --> B\nB -->", "sequenceDiagram\nA->>"] {
            let result = engine.render("diagram-1", text);
            assert!(
                matches!(result, Err(EngineError::Syntax(_))),
                "{text:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_engine_rejects_unclosed_brackets() {
        let engine = MermaidEngine::svg_only();
        assert!(engine.render("d", "flowchart LR\nA[unclosed --> B").is_err());
        assert!(engine.render("d", "classDiagram\nclass {{{").is_err());
    }

    #[test]
    fn test_engine_rejects_declaration_without_body() {
        let err = MermaidEngine::svg_only()
            .render("diagram-1", "graph TD")
            .unwrap_err();
        assert!(matches!(err, EngineError::Syntax(_)), "got {err:?}");
    }

    #[test]
    fn test_engine_accepts_common_diagram_shapes() {
        let engine = MermaidEngine::svg_only();
        let accepted = [
            "%% generated\ngraph TD;A-->B;",
            "flowchart LR\n    A{Ready?} -->|yes| B[(Store)]\n    A -- no --> C>Retry]",
            "sequenceDiagram\n    participant A as Web\n    A->>B: POST /generate\n    B-->>A: 200",
            "classDiagram\n    class Animal {\n        <<interface>>\n        +name() String\n    }\n    Animal <|-- Duck : is",
            "stateDiagram-v2\n    [*] --> Idle\n    Idle --> Busy : submit\n    Busy --> [*]",
        ];
        for text in accepted {
            let out = engine.render("diagram-1", text);
            assert!(out.is_ok(), "{text:?} was rejected: {:?}", out.err());
        }
    }

    #[test]
    fn test_isolate_panics_returns_message() {
        let outcome: Result<(), String> = isolate_panics(|| panic!("layout exploded"));
        assert_eq!(outcome.unwrap_err(), "layout exploded");
        assert_eq!(isolate_panics(|| 7).unwrap(), 7);
    }

    #[test]
    fn test_engine_rasterizes_sequence_diagram_at_requested_width() {
        let engine = MermaidEngine::new(800);
        let out = engine
            .render("diagram-2", "sequenceDiagram\n    Alice->>Bob: Hello")
            .unwrap();
        let image = out.image.unwrap();
        assert_eq!(image.width(), 800);
        assert!(image.height() > 0);
    }
}
