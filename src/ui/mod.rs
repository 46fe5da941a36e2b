//! Terminal UI components.
//!
//! This module contains all UI-related code including:
//! - [`render`]: Screen layout, header and request form
//! - `panel`: The diagram panel, one view per surface state
//! - `status`: Banner, toast and status bars

mod panel;
mod render;
mod status;

pub use panel::{
    EMPTY_PLACEHOLDER, LOADING_DETAIL, LOADING_MESSAGE, PANEL_TITLE, PENDING_MESSAGE,
    RAW_OUTPUT_LABEL, nodes_badge,
};
pub use render::{APP_SUBTITLE, APP_TITLE, ScreenLayout, render, screen_layout};
