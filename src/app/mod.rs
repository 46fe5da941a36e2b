//! Application state and main event loop.
//!
//! This module implements The Elm Architecture (TEA):
//! - [`Model`]: The complete application state
//! - [`Message`]: All possible events and actions
//! - [`update`]: Pure function for state transitions
//! - [`App::run`]: Main event loop with rendering
//!
//! Backend requests and diagram renders run on worker threads. Their
//! completions re-enter through the event loop, which is the only place
//! that mutates the model.

mod effects;
mod event_loop;
mod input;
mod model;
mod update;

pub use model::{Focus, Model, TextField, ToastLevel};
pub use update::{Message, update};

use std::path::PathBuf;

use crate::api::BackendClient;
use crate::mermaid::DEFAULT_RENDER_WIDTH_PX;
use crate::surface::DEFAULT_RENDER_DELAY_MS;

/// Main application struct that owns the terminal and runs the event loop.
pub struct App {
    client: BackendClient,
    render_width: u32,
    render_delay_ms: u64,
    images_enabled: bool,
    force_half_cell: bool,
    export_dir: PathBuf,
    initial_repository: Option<String>,
    initial_query: Option<String>,
}

impl App {
    /// Create a new application talking to `client`.
    pub fn new(client: BackendClient) -> Self {
        Self {
            client,
            render_width: DEFAULT_RENDER_WIDTH_PX,
            render_delay_ms: DEFAULT_RENDER_DELAY_MS,
            images_enabled: true,
            force_half_cell: false,
            export_dir: PathBuf::from("."),
            initial_repository: None,
            initial_query: None,
        }
    }

    /// Rasterization width for diagrams, in pixels.
    pub const fn with_render_width(mut self, width_px: u32) -> Self {
        self.render_width = width_px;
        self
    }

    /// Delay between a payload arriving and its render starting.
    pub const fn with_render_delay_ms(mut self, delay_ms: u64) -> Self {
        self.render_delay_ms = delay_ms;
        self
    }

    /// Enable or disable drawing diagrams as terminal images.
    pub const fn with_images_enabled(mut self, enabled: bool) -> Self {
        self.images_enabled = enabled;
        self
    }

    /// Skip graphics protocol detection and use Unicode half-blocks.
    pub const fn with_force_half_cell(mut self, force: bool) -> Self {
        self.force_half_cell = force;
        self
    }

    /// Directory that exported SVG files are written to.
    pub fn with_export_dir(mut self, dir: PathBuf) -> Self {
        self.export_dir = dir;
        self
    }

    /// Pre-fill the form.
    pub fn with_initial_form(mut self, repository: Option<String>, query: Option<String>) -> Self {
        self.initial_repository = repository;
        self.initial_query = query;
        self
    }
}
