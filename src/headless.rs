//! One-shot pipeline: fetch or read a payload, render it, write the SVG.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::api::{BackendClient, DiagramRequest};
use crate::mermaid::DiagramEngine;
use crate::sanitize::sanitize;
use crate::surface::{MountTarget, RenderResult, render};

/// Message when a payload holds no diagram text at all.
pub const NO_DIAGRAM_MESSAGE: &str = "No diagram text in payload";

/// Where the raw payload comes from.
#[derive(Debug, Clone)]
pub enum PayloadSource {
    Backend {
        client: BackendClient,
        request: DiagramRequest,
    },
    /// A saved raw payload, rendered without contacting the backend.
    File(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeadlessOutcome {
    Written {
        path: PathBuf,
        nodes_analyzed: Option<u64>,
    },
    Empty,
    RenderFailed {
        reason: &'static str,
        original_payload: String,
    },
    RequestFailed(String),
}

impl HeadlessOutcome {
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Written { .. } => 0,
            Self::Empty | Self::RenderFailed { .. } => 1,
            Self::RequestFailed(_) => 2,
        }
    }
}

/// Run the pipeline once.
///
/// # Errors
///
/// Returns an error if the input file cannot be read or the SVG cannot be
/// written. Request and render failures are reported as outcomes.
pub fn run(
    source: &PayloadSource,
    output: &Path,
    engine: &dyn DiagramEngine,
) -> Result<HeadlessOutcome> {
    let _scope = crate::perf::scope("headless.run");
    let (raw, nodes_analyzed) = match source {
        PayloadSource::Backend { client, request } => match client.generate(request) {
            Ok(response) => (response.diagram_text, Some(response.nodes_analyzed)),
            Err(err) => {
                tracing::warn!(error = %err, "request failed");
                return Ok(HeadlessOutcome::RequestFailed(err.user_message()));
            }
        },
        PayloadSource::File(path) => {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("Failed to read payload {}", path.display()))?;
            (raw, None)
        }
    };

    let sanitized = sanitize(&raw);
    let mut mount = MountTarget::new();
    match render(engine, "diagram-1", &sanitized, &raw, &mut mount) {
        None => Ok(HeadlessOutcome::Empty),
        Some(RenderResult::Failed {
            reason,
            original_payload,
        }) => Ok(HeadlessOutcome::RenderFailed {
            reason,
            original_payload,
        }),
        Some(RenderResult::Rendered(artifact)) => {
            if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
            fs::write(output, artifact.svg.as_bytes())
                .with_context(|| format!("Failed to write {}", output.display()))?;
            tracing::info!(path = %output.display(), bytes = artifact.svg.len(), "diagram written");
            Ok(HeadlessOutcome::Written {
                path: output.to_path_buf(),
                nodes_analyzed,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::SYNTAX_ERROR_MESSAGE;
    use crate::surface::test_support::ScriptedEngine;
    use std::net::TcpListener;
    use std::time::Duration;
    use tempfile::tempdir;

    #[test]
    fn test_file_payload_is_sanitized_and_written() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("raw.txt");
        let output = dir.path().join("out").join("diagram.svg");
        fs::write(&input, "Here you go:\n```mermaid\ngraph TD\nA-->B\n```\n").unwrap();

        let outcome = run(
            &PayloadSource::File(input),
            &output,
            &ScriptedEngine::accepting(),
        )
        .unwrap();

        assert_eq!(outcome.exit_code(), 0);
        assert_eq!(
            fs::read_to_string(&output).unwrap(),
            "<svg id=\"diagram-1\"></svg>"
        );
    }

    #[test]
    fn test_rejected_payload_reports_raw_text() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("raw.txt");
        let output = dir.path().join("diagram.svg");
        let raw = "graph TD\nA --\n";
        fs::write(&input, raw).unwrap();

        let outcome =
            run(&PayloadSource::File(input), &output, &ScriptedEngine::strict()).unwrap();

        assert_eq!(
            outcome,
            HeadlessOutcome::RenderFailed {
                reason: SYNTAX_ERROR_MESSAGE,
                original_payload: raw.to_string(),
            }
        );
        assert_eq!(outcome.exit_code(), 1);
        assert!(!output.exists());
    }

    #[test]
    fn test_blank_payload_is_empty() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("raw.txt");
        fs::write(&input, "```mermaid\n```").unwrap();
        let engine = ScriptedEngine::accepting();

        let outcome = run(
            &PayloadSource::File(input),
            &dir.path().join("x.svg"),
            &engine,
        )
        .unwrap();

        assert_eq!(outcome, HeadlessOutcome::Empty);
        assert_eq!(engine.calls(), 0);
    }

    #[test]
    fn test_missing_input_file_is_an_error() {
        let dir = tempdir().unwrap();
        let result = run(
            &PayloadSource::File(dir.path().join("nope.txt")),
            &dir.path().join("x.svg"),
            &ScriptedEngine::accepting(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_unreachable_backend_exits_with_request_failure() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let dir = tempdir().unwrap();
        let source = PayloadSource::Backend {
            client: BackendClient::new(
                &format!("http://127.0.0.1:{port}/api"),
                Duration::from_secs(2),
            ),
            request: DiagramRequest::new("/repo", "flow"),
        };

        let outcome = run(
            &source,
            &dir.path().join("x.svg"),
            &ScriptedEngine::accepting(),
        )
        .unwrap();

        assert_eq!(
            outcome,
            HeadlessOutcome::RequestFailed(crate::api::CONNECT_FAILURE_MESSAGE.to_string())
        );
        assert_eq!(outcome.exit_code(), 2);
    }
}
