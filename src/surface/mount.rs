use std::sync::Arc;

use image::DynamicImage;

/// User-facing reason shown for every rejected diagram.
///
/// The engine's own diagnostic goes to the logs, never to this message.
pub const SYNTAX_ERROR_MESSAGE: &str =
    "Syntax Error: generated diagram text is not valid diagram syntax";

/// A rendered diagram ready for display.
#[derive(Debug)]
pub struct DiagramArtifact {
    /// Render id, unique per attempt.
    pub id: String,
    /// Standalone SVG document.
    pub svg: String,
    /// Rasterized SVG for terminal graphics.
    pub image: Option<DynamicImage>,
}

/// Outcome of one render attempt.
#[derive(Debug, Clone)]
pub enum RenderResult {
    Rendered(Arc<DiagramArtifact>),
    Failed {
        reason: &'static str,
        /// The raw text as received, before sanitizing.
        original_payload: String,
    },
}

impl RenderResult {
    pub fn failed(original_payload: impl Into<String>) -> Self {
        Self::Failed {
            reason: SYNTAX_ERROR_MESSAGE,
            original_payload: original_payload.into(),
        }
    }

    pub const fn is_rendered(&self) -> bool {
        matches!(self, Self::Rendered(_))
    }

    pub fn original_payload(&self) -> Option<&str> {
        match self {
            Self::Rendered(_) => None,
            Self::Failed {
                original_payload, ..
            } => Some(original_payload),
        }
    }
}

/// The single display slot for a diagram.
#[derive(Debug, Default)]
pub struct MountTarget {
    content: Option<Arc<DiagramArtifact>>,
}

impl MountTarget {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.content = None;
    }

    pub fn mount(&mut self, artifact: Arc<DiagramArtifact>) {
        self.content = Some(artifact);
    }

    pub fn artifact(&self) -> Option<&Arc<DiagramArtifact>> {
        self.content.as_ref()
    }

    pub const fn is_empty(&self) -> bool {
        self.content.is_none()
    }
}
