//! Backend protocol.
//!
//! The analysis backend parses a repository and asks a language model for a
//! diagram. This module only knows its HTTP boundary:
//! `POST /generate` with a [`DiagramRequest`], answered by a [`DiagramResponse`].

mod client;
mod worker;

pub use client::{BackendClient, DEFAULT_BACKEND_URL, DEFAULT_TIMEOUT_SECS, RequestError};
pub use worker::{RequestCompletion, RequestWorker};

use serde::{Deserialize, Serialize};

/// Banner text when the backend cannot be reached or gives no usable reason.
pub const CONNECT_FAILURE_MESSAGE: &str = "Failed to connect to backend";

/// A diagram request. Both fields must be non-blank before it is sent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagramRequest {
    #[serde(rename = "repo_path")]
    pub repository_path: String,
    pub query: String,
}

impl DiagramRequest {
    pub fn new(repository_path: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            repository_path: repository_path.into(),
            query: query.into(),
        }
    }

    pub fn is_ready(&self) -> bool {
        !self.repository_path.trim().is_empty() && !self.query.trim().is_empty()
    }
}

/// The backend's answer to one request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagramResponse {
    /// Raw, untrusted diagram text from the model.
    #[serde(rename = "mermaid_code", default)]
    pub diagram_text: String,
    #[serde(default)]
    pub nodes_analyzed: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DiagramResponse {
    /// Split a response into a displayable payload or a banner message.
    ///
    /// A populated `error` is terminal for the request: the surface never
    /// sees the payload.
    ///
    /// # Errors
    ///
    /// Returns the service-reported error text.
    pub fn into_payload(self) -> Result<Self, String> {
        match self.error.as_deref().map(str::trim) {
            Some(message) if !message.is_empty() => Err(message.to_string()),
            _ => Ok(self),
        }
    }
}
