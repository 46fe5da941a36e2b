use std::sync::Arc;

use crate::mermaid::DiagramEngine;

use super::mount::{DiagramArtifact, MountTarget, RenderResult};

/// Run one render attempt against `mount`.
///
/// Empty `sanitized` text is a no-op: nothing is rendered, `mount` is left
/// untouched and `None` is returned. Otherwise `mount` is cleared first and
/// only receives an artifact when the engine accepts the text, so a failure
/// never leaves stale output behind.
pub fn render(
    engine: &dyn DiagramEngine,
    id: &str,
    sanitized: &str,
    raw: &str,
    mount: &mut MountTarget,
) -> Option<RenderResult> {
    if sanitized.is_empty() {
        return None;
    }

    mount.clear();
    match engine.render(id, sanitized) {
        Ok(output) => {
            let artifact = Arc::new(DiagramArtifact {
                id: id.to_string(),
                svg: output.svg,
                image: output.image,
            });
            mount.mount(Arc::clone(&artifact));
            crate::perf::log_event("adapter.rendered", format!("id={id}"));
            Some(RenderResult::Rendered(artifact))
        }
        Err(err) => {
            tracing::warn!(id, error = %err, "diagram render failed");
            crate::perf::log_event("adapter.failed", format!("id={id} err={err}"));
            Some(RenderResult::failed(raw))
        }
    }
}
