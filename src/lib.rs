// Only allow lints that are either transitive-dependency noise or
// genuinely opinionated style choices that don't indicate real issues.
#![allow(
    // Transitive dependency version mismatches we can't control
    clippy::multiple_crate_versions,
    // module_name_repetitions is pure style preference (e.g. mermaid::MermaidEngine)
    clippy::module_name_repetitions
)]

//! # CodeAtlas
//!
//! Architecture diagrams for a codebase, in the terminal.
//!
//! An analysis backend turns a repository and a question into diagram text
//! produced by a language model. CodeAtlas sends the request, cleans up the
//! untrusted text and renders it, showing either the diagram or the raw
//! output that failed to render.
//!
//! ## Architecture
//!
//! CodeAtlas uses The Elm Architecture (TEA) pattern:
//! - **Model**: Application state
//! - **Message**: Events and actions
//! - **Update**: Pure state transitions
//! - **View**: Render to terminal
//!
//! ## Modules
//!
//! - [`sanitize`]: Strip fences and preambles from diagram text
//! - [`mermaid`]: Rendering engine boundary
//! - [`surface`]: Render adapter, mount target and the diagram state machine
//! - [`api`]: Backend request types and HTTP client
//! - [`app`]: Main application loop and state
//! - [`ui`]: Terminal UI components
//! - [`image`]: Terminal graphics protocols
//! - [`headless`]: One-shot render to an SVG file
//! - [`config`]: Persistent default flags

pub mod api;
pub mod app;
pub mod config;
pub mod headless;
pub mod image;
pub mod mermaid;
pub mod perf;
pub mod sanitize;
pub mod surface;
pub mod ui;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::api::{BackendClient, DiagramRequest, DiagramResponse};
    pub use crate::app::{App, Message, Model};
    pub use crate::mermaid::{DiagramEngine, MermaidEngine};
    pub use crate::sanitize::sanitize;
    pub use crate::surface::{DiagramSurface, RenderResult, SurfaceState};
}
