use crate::api::{DiagramRequest, DiagramResponse};
use crate::app::Model;

/// All possible events and actions in the application.
///
/// These represent user input, system events, and internal actions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    // Form editing
    /// Insert a character into the focused field
    InsertChar(char),
    /// Delete character before the cursor (Backspace)
    DeleteBack,
    /// Delete character at the cursor (Delete)
    DeleteForward,
    CursorLeft,
    CursorRight,
    CursorHome,
    CursorEnd,
    /// Empty the focused field
    ClearField,
    /// Move focus to the next form control
    FocusNext,
    /// Move focus to the previous form control
    FocusPrev,

    // Requests
    /// Send the form to the backend
    Submit,
    /// A backend request finished; the error side carries banner text
    RequestFinished {
        id: u64,
        outcome: Result<DiagramResponse, String>,
    },
    /// Hide the error banner
    DismissBanner,

    // Diagram panel
    /// Scroll the diagram panel up by n lines
    ScrollUp(u16),
    /// Scroll the diagram panel down by n lines
    ScrollDown(u16),
    /// Copy the raw payload to the clipboard
    CopyRawPayload,
    /// Write the rendered SVG to disk
    ExportSvg,

    // System
    /// Terminal resized
    Resize(u16, u16),
    /// Quit the application
    Quit,
}

/// Pure state transition. Side effects run afterwards in the event loop.
pub fn update(mut model: Model, msg: Message) -> Model {
    match msg {
        Message::InsertChar(c) => {
            if let Some(field) = model.focused_field_mut() {
                field.insert(c);
            }
        }
        Message::DeleteBack => {
            if let Some(field) = model.focused_field_mut() {
                field.delete_back();
            }
        }
        Message::DeleteForward => {
            if let Some(field) = model.focused_field_mut() {
                field.delete_forward();
            }
        }
        Message::CursorLeft => {
            if let Some(field) = model.focused_field_mut() {
                field.move_left();
            }
        }
        Message::CursorRight => {
            if let Some(field) = model.focused_field_mut() {
                field.move_right();
            }
        }
        Message::CursorHome => {
            if let Some(field) = model.focused_field_mut() {
                field.move_home();
            }
        }
        Message::CursorEnd => {
            if let Some(field) = model.focused_field_mut() {
                field.move_end();
            }
        }
        Message::ClearField => {
            if let Some(field) = model.focused_field_mut() {
                field.clear();
            }
        }
        Message::FocusNext => model.focus = model.focus.next(),
        Message::FocusPrev => model.focus = model.focus.prev(),

        Message::Submit => {
            if model.can_submit() {
                model.loading = true;
                model.banner = None;
                model.response = None;
                model.panel_scroll = 0;
                model.outgoing = Some(DiagramRequest::new(
                    model.repository.value().trim(),
                    model.query.value().trim(),
                ));
            }
        }
        Message::RequestFinished { id, outcome } => {
            if model.pending_request == Some(id) {
                model.pending_request = None;
                model.loading = false;
                match outcome {
                    Ok(response) => model.response = Some(response),
                    Err(message) => {
                        model.response = None;
                        model.banner = Some(message);
                    }
                }
            } else {
                crate::perf::log_event(
                    "request.stale",
                    format!("id={id} pending={:?}", model.pending_request),
                );
            }
        }
        Message::DismissBanner => model.banner = None,

        Message::ScrollUp(n) => model.panel_scroll = model.panel_scroll.saturating_sub(n),
        Message::ScrollDown(n) => model.panel_scroll = model.panel_scroll.saturating_add(n),
        // Handled in effects.
        Message::CopyRawPayload | Message::ExportSvg => {}

        Message::Resize(width, height) => model.terminal_size = (width, height),
        Message::Quit => model.should_quit = true,
    }
    model
}
