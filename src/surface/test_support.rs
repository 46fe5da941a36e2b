use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::mermaid::{DiagramEngine, EngineError, RenderedDiagram};

/// Engine double that rejects text with a dangling edge (a line ending in `--`).
pub(crate) struct ScriptedEngine {
    strict: bool,
    calls: Arc<AtomicUsize>,
}

impl ScriptedEngine {
    pub(crate) fn accepting() -> Self {
        Self {
            strict: false,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub(crate) fn strict() -> Self {
        Self {
            strict: true,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn call_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

impl DiagramEngine for ScriptedEngine {
    fn render(&self, id: &str, text: &str) -> Result<RenderedDiagram, EngineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.strict && text.lines().any(|line| line.trim_end().ends_with("--")) {
            return Err(EngineError::Syntax(format!("dangling edge in {id}")));
        }
        Ok(RenderedDiagram {
            svg: format!("<svg id=\"{id}\"></svg>"),
            image: None,
        })
    }
}

/// Engine double whose every render panics.
pub(crate) struct PanickingEngine;

impl DiagramEngine for PanickingEngine {
    fn render(&self, id: &str, _text: &str) -> Result<RenderedDiagram, EngineError> {
        panic!("renderer blew up on {id}");
    }
}
