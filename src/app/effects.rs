use std::io::{Write, stdout};
use std::path::PathBuf;

use base64::Engine;

use crate::api::RequestWorker;
use crate::app::{App, Message, Model, ToastLevel};
use crate::surface::RenderResult;

impl App {
    pub(super) fn handle_message_side_effects(
        &self,
        model: &mut Model,
        requests: &mut RequestWorker,
        msg: &Message,
    ) {
        match msg {
            Message::Submit => {
                let Some(request) = model.take_outgoing() else {
                    return;
                };
                match requests.submit(request) {
                    Ok(id) => model.pending_request = Some(id),
                    Err(err) => {
                        tracing::error!(error = %err, "failed to start request thread");
                        model.loading = false;
                        model.banner = Some(format!("Could not start request: {err}"));
                    }
                }
            }
            Message::CopyRawPayload => Self::copy_raw_payload(model),
            Message::ExportSvg => self.export_svg(model),
            _ => {}
        }
    }

    fn copy_raw_payload(model: &mut Model) {
        let raw = match model.surface.result() {
            Some(RenderResult::Failed {
                original_payload, ..
            }) => original_payload.clone(),
            _ => model.surface.raw_payload().to_string(),
        };
        if raw.is_empty() {
            model.show_toast(ToastLevel::Warning, "Nothing to copy");
            return;
        }
        match copy_to_clipboard(&raw) {
            Ok(()) => model.show_toast(
                ToastLevel::Info,
                format!("Copied {} bytes of raw output", raw.len()),
            ),
            Err(err) => model.show_toast(ToastLevel::Error, format!("Copy failed: {err}")),
        }
    }

    fn export_svg(&self, model: &mut Model) {
        let Some(artifact) = model.surface.mount().artifact().cloned() else {
            model.show_toast(ToastLevel::Warning, "No rendered diagram to export");
            return;
        };
        let path = self.export_path(&artifact.id);
        match std::fs::write(&path, artifact.svg.as_bytes()) {
            Ok(()) => {
                tracing::info!(path = %path.display(), "diagram exported");
                model.show_toast(ToastLevel::Info, format!("Saved {}", path.display()));
            }
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "diagram export failed");
                model.show_toast(ToastLevel::Error, format!("Save failed: {err}"));
            }
        }
    }

    pub(super) fn export_path(&self, id: &str) -> PathBuf {
        self.export_dir.join(format!("{id}.svg"))
    }
}

fn copy_to_clipboard(text: &str) -> std::io::Result<()> {
    #[cfg(target_os = "macos")]
    {
        if copy_to_pbcopy(text).is_ok() {
            return Ok(());
        }
    }
    copy_to_clipboard_osc52(text)
}

#[cfg(target_os = "macos")]
fn copy_to_pbcopy(text: &str) -> std::io::Result<()> {
    use std::process::{Command, Stdio};

    let mut child = Command::new("pbcopy").stdin(Stdio::piped()).spawn()?;
    if let Some(mut stdin) = child.stdin.take() {
        stdin.write_all(text.as_bytes())?;
    }
    let status = child.wait()?;
    if status.success() {
        Ok(())
    } else {
        Err(std::io::Error::other("pbcopy failed"))
    }
}

fn copy_to_clipboard_osc52(text: &str) -> std::io::Result<()> {
    let osc = osc52_sequence(text);
    let mut out = stdout();
    out.write_all(osc.as_bytes())?;
    out.flush()
}

pub(super) fn osc52_sequence(text: &str) -> String {
    let encoded = base64::engine::general_purpose::STANDARD.encode(text.as_bytes());
    format!("\x1b]52;c;{encoded}\x07")
}
