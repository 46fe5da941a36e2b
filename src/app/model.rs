use std::time::{Duration, Instant};

use ratatui_image::picker::Picker;
use ratatui_image::protocol::StatefulProtocol;

use crate::api::{DiagramRequest, DiagramResponse};
use crate::surface::{DiagramSurface, RenderCompletion, SurfaceState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastLevel {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone)]
struct Toast {
    level: ToastLevel,
    message: String,
    expires_at: Instant,
}

/// Which form control receives keyboard input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Focus {
    #[default]
    Repository,
    Query,
    Generate,
}

impl Focus {
    pub const fn next(self) -> Self {
        match self {
            Self::Repository => Self::Query,
            Self::Query => Self::Generate,
            Self::Generate => Self::Repository,
        }
    }

    pub const fn prev(self) -> Self {
        match self {
            Self::Repository => Self::Generate,
            Self::Query => Self::Repository,
            Self::Generate => Self::Query,
        }
    }
}

/// Single-line editable text with a char-indexed cursor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextField {
    value: String,
    cursor: usize,
}

impl TextField {
    pub fn new(value: impl Into<String>) -> Self {
        let value = value.into();
        let cursor = value.chars().count();
        Self { value, cursor }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    /// Cursor position in chars.
    pub const fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_blank(&self) -> bool {
        self.value.trim().is_empty()
    }

    pub fn insert(&mut self, c: char) {
        let at = self.byte_offset(self.cursor);
        self.value.insert(at, c);
        self.cursor += 1;
    }

    pub fn delete_back(&mut self) {
        if self.cursor == 0 {
            return;
        }
        self.cursor -= 1;
        let at = self.byte_offset(self.cursor);
        self.value.remove(at);
    }

    pub fn delete_forward(&mut self) {
        if self.cursor < self.value.chars().count() {
            let at = self.byte_offset(self.cursor);
            self.value.remove(at);
        }
    }

    pub const fn move_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn move_right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.value.chars().count());
    }

    pub const fn move_home(&mut self) {
        self.cursor = 0;
    }

    pub fn move_end(&mut self) {
        self.cursor = self.value.chars().count();
    }

    pub fn clear(&mut self) {
        self.value.clear();
        self.cursor = 0;
    }

    /// Text before the cursor, used to place the terminal cursor.
    pub fn before_cursor(&self) -> &str {
        &self.value[..self.byte_offset(self.cursor)]
    }

    fn byte_offset(&self, chars: usize) -> usize {
        self.value
            .char_indices()
            .nth(chars)
            .map_or(self.value.len(), |(i, _)| i)
    }
}

/// The complete application state.
///
/// All state lives here - no global or scattered state.
pub struct Model {
    pub repository: TextField,
    pub query: TextField,
    pub focus: Focus,
    /// A request is in flight
    pub loading: bool,
    /// The last successful response, cleared on every new request
    pub response: Option<DiagramResponse>,
    /// Id of the request whose completion we are waiting for
    pub pending_request: Option<u64>,
    /// Request accepted by `update`, waiting to be dispatched
    pub(super) outgoing: Option<DiagramRequest>,
    /// Error banner shown above the diagram panel
    pub banner: Option<String>,
    toast: Option<Toast>,
    pub surface: DiagramSurface,
    /// Terminal protocol for the committed diagram image
    pub diagram_protocol: Option<StatefulProtocol>,
    /// Image picker for terminal rendering
    pub picker: Option<Picker>,
    /// Whether the rendered diagram is drawn as an image
    pub images_enabled: bool,
    /// Scroll offset inside the diagram panel (failure view and text fallback)
    pub panel_scroll: u16,
    /// Last known terminal size
    pub terminal_size: (u16, u16),
    pub should_quit: bool,
}

impl std::fmt::Debug for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Model")
            .field("repository", &self.repository)
            .field("query", &self.query)
            .field("focus", &self.focus)
            .field("loading", &self.loading)
            .field("pending_request", &self.pending_request)
            .field("banner", &self.banner)
            .field("surface_state", &self.surface.state())
            .field("has_protocol", &self.diagram_protocol.is_some())
            .finish_non_exhaustive()
    }
}

impl Model {
    pub fn new(terminal_size: (u16, u16), render_delay_ms: u64) -> Self {
        Self {
            terminal_size,
            surface: DiagramSurface::new(render_delay_ms),
            ..Self::default()
        }
    }

    pub fn with_picker(mut self, picker: Option<Picker>) -> Self {
        self.picker = picker;
        self
    }

    /// Submit is possible only while idle and with both fields filled in.
    pub fn can_submit(&self) -> bool {
        !self.loading && !self.repository.is_blank() && !self.query.is_blank()
    }

    pub fn focused_field_mut(&mut self) -> Option<&mut TextField> {
        match self.focus {
            Focus::Repository => Some(&mut self.repository),
            Focus::Query => Some(&mut self.query),
            Focus::Generate => None,
        }
    }

    pub fn nodes_analyzed(&self) -> Option<u64> {
        self.response.as_ref().map(|response| response.nodes_analyzed)
    }

    pub(super) fn take_outgoing(&mut self) -> Option<DiagramRequest> {
        self.outgoing.take()
    }

    /// Push the orchestrator's current inputs into the surface.
    ///
    /// Returns true when a new payload was accepted.
    pub fn sync_surface(&mut self, now_ms: u64) -> bool {
        let payload = self
            .response
            .as_ref()
            .map(|response| response.diagram_text.as_str());
        let changed = self.surface.submit(payload, self.loading, now_ms);
        if changed {
            self.diagram_protocol = None;
            self.panel_scroll = 0;
        }
        changed
    }

    /// Commit a render completion and build the image protocol for it.
    pub fn apply_render_completion(&mut self, completion: RenderCompletion) -> bool {
        if !self.surface.complete(completion) {
            return false;
        }
        self.diagram_protocol = None;
        if self.images_enabled
            && let Some(picker) = self.picker.as_ref()
            && let Some(image) = self
                .surface
                .mount()
                .artifact()
                .and_then(|artifact| artifact.image.as_ref())
        {
            let _scope = crate::perf::scope("app.diagram_protocol");
            self.diagram_protocol = Some(crate::image::diagram_protocol(picker, image));
        }
        true
    }

    pub fn surface_state(&self) -> SurfaceState {
        self.surface.state()
    }

    pub(super) fn show_toast(&mut self, level: ToastLevel, message: impl Into<String>) {
        self.toast = Some(Toast {
            level,
            message: message.into(),
            expires_at: Instant::now() + Duration::from_secs(4),
        });
    }

    pub(super) fn expire_toast(&mut self, now: Instant) -> bool {
        if self
            .toast
            .as_ref()
            .is_some_and(|toast| toast.expires_at <= now)
        {
            self.toast = None;
            return true;
        }
        false
    }

    pub fn active_toast(&self) -> Option<(&str, ToastLevel)> {
        self.toast
            .as_ref()
            .map(|toast| (toast.message.as_str(), toast.level))
    }
}

// Implement Default for Model to allow std::mem::take
impl Default for Model {
    fn default() -> Self {
        Self {
            repository: TextField::default(),
            query: TextField::default(),
            focus: Focus::default(),
            loading: false,
            response: None,
            pending_request: None,
            outgoing: None,
            banner: None,
            toast: None,
            surface: DiagramSurface::default(),
            diagram_protocol: None,
            picker: None,
            images_enabled: true,
            panel_scroll: 0,
            terminal_size: (80, 24),
            should_quit: false,
        }
    }
}
