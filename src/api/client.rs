use std::time::Duration;

use thiserror::Error;

use super::{CONNECT_FAILURE_MESSAGE, DiagramRequest, DiagramResponse};

pub const DEFAULT_BACKEND_URL: &str = "http://127.0.0.1:8000/api";
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Why a request produced no diagram.
#[derive(Debug, Error)]
pub enum RequestError {
    /// Connection refused, DNS failure, timeout.
    #[error("cannot reach backend at {url}: {reason}")]
    Transport { url: String, reason: String },
    /// Non-2xx status; `detail` is the server's explanation when it gave one.
    #[error("backend returned HTTP {status}")]
    Status { status: u16, detail: Option<String> },
    /// The service answered but reported an error for this request.
    #[error("backend reported: {0}")]
    Service(String),
    /// 2xx status with a body that is not a diagram response.
    #[error("backend returned an unreadable response: {0}")]
    Decode(String),
}

impl RequestError {
    /// Text for the banner shown above the diagram panel.
    pub fn user_message(&self) -> String {
        match self {
            Self::Transport { .. } | Self::Status { detail: None, .. } => {
                CONNECT_FAILURE_MESSAGE.to_string()
            }
            Self::Status {
                detail: Some(detail),
                ..
            } => detail.clone(),
            Self::Service(message) => message.clone(),
            Self::Decode(_) => "Backend returned an unreadable response".to_string(),
        }
    }
}

/// Blocking HTTP client for the analysis backend.
#[derive(Debug, Clone)]
pub struct BackendClient {
    base: String,
    agent: ureq::Agent,
}

impl BackendClient {
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(Duration::from_secs(10).min(timeout))
            .timeout(timeout)
            .build();
        Self {
            base: base_url.trim_end_matches('/').to_string(),
            agent,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base
    }

    /// Ask the backend for a diagram.
    ///
    /// # Errors
    ///
    /// Returns a [`RequestError`] on transport failure, non-2xx status, a
    /// service-reported error, or an undecodable body.
    pub fn generate(&self, request: &DiagramRequest) -> Result<DiagramResponse, RequestError> {
        let url = format!("{}/generate", self.base);
        tracing::info!(%url, repo = %request.repository_path, "requesting diagram");

        let response = match self
            .agent
            .post(&url)
            .set("Accept", "application/json")
            .send_json(request)
        {
            Ok(response) => response,
            Err(ureq::Error::Status(status, response)) => {
                let body = response.into_string().unwrap_or_default();
                tracing::warn!(%url, status, "backend rejected request");
                return Err(status_error(status, &body));
            }
            Err(ureq::Error::Transport(transport)) => {
                tracing::warn!(%url, error = %transport, "backend unreachable");
                return Err(RequestError::Transport {
                    url,
                    reason: transport.to_string(),
                });
            }
        };

        let body = response
            .into_json::<DiagramResponse>()
            .map_err(|err| RequestError::Decode(err.to_string()))?;
        tracing::debug!(
            nodes = body.nodes_analyzed,
            text_len = body.diagram_text.len(),
            "diagram response received"
        );
        body.into_payload().map_err(RequestError::Service)
    }
}

/// Pull the server's explanation out of an error body.
///
/// `detail` is preferred, then the response's own `error` field.
fn status_error(status: u16, body: &str) -> RequestError {
    let detail = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| {
            ["detail", "error"].iter().find_map(|key| {
                value
                    .get(key)
                    .and_then(serde_json::Value::as_str)
                    .map(str::trim)
                    .filter(|text| !text.is_empty())
                    .map(ToOwned::to_owned)
            })
        });
    RequestError::Status { status, detail }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader, Read, Write};
    use std::net::TcpListener;
    use std::thread;

    /// Serve exactly one canned HTTP response on an ephemeral port.
    fn serve_once(
        status_line: &'static str,
        body: &'static str,
    ) -> (String, thread::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream);
            let mut content_length = 0usize;
            let mut request_line = String::new();
            reader.read_line(&mut request_line).unwrap();
            loop {
                let mut line = String::new();
                reader.read_line(&mut line).unwrap();
                if line == "\r\n" || line.is_empty() {
                    break;
                }
                if let Some(value) = line.to_ascii_lowercase().strip_prefix("content-length:") {
                    content_length = value.trim().parse().unwrap();
                }
            }
            let mut request_body = vec![0u8; content_length];
            reader.read_exact(&mut request_body).unwrap();

            let mut stream = reader.into_inner();
            write!(
                stream,
                "{status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            )
            .unwrap();
            stream.flush().unwrap();
            format!("{request_line}{}", String::from_utf8(request_body).unwrap())
        });
        (format!("http://{addr}/api"), handle)
    }

    #[test]
    fn test_generate_posts_request_and_decodes_response() {
        let (url, server) = serve_once(
            "HTTP/1.1 200 OK",
            r#"{"mermaid_code":"graph TD\nA-->B","nodes_analyzed":4}"#,
        );
        let client = BackendClient::new(&url, Duration::from_secs(5));

        let response = client
            .generate(&DiagramRequest::new("/repo", "auth flow"))
            .unwrap();

        assert_eq!(response.diagram_text, "graph TD\nA-->B");
        assert_eq!(response.nodes_analyzed, 4);
        let seen = server.join().unwrap();
        assert!(seen.starts_with("POST /api/generate "));
        assert!(seen.contains(r#""repo_path":"/repo""#));
        assert!(seen.contains(r#""query":"auth flow""#));
    }

    #[test]
    fn test_server_error_body_becomes_banner_text() {
        let (url, server) = serve_once(
            "HTTP/1.1 500 Internal Server Error",
            r#"{"mermaid_code":"","nodes_analyzed":0,"error":"No such directory"}"#,
        );
        let client = BackendClient::new(&url, Duration::from_secs(5));

        let err = client
            .generate(&DiagramRequest::new("/missing", "flow"))
            .unwrap_err();

        assert!(matches!(err, RequestError::Status { status: 500, .. }));
        assert_eq!(err.user_message(), "No such directory");
        server.join().unwrap();
    }

    #[test]
    fn test_service_error_in_success_body_is_reported() {
        let (url, server) = serve_once(
            "HTTP/1.1 200 OK",
            r#"{"mermaid_code":"","nodes_analyzed":0,"error":"LLM quota exceeded"}"#,
        );
        let client = BackendClient::new(&url, Duration::from_secs(5));

        let err = client.generate(&DiagramRequest::new("/repo", "flow")).unwrap_err();

        assert_eq!(err.user_message(), "LLM quota exceeded");
        server.join().unwrap();
    }

    #[test]
    fn test_unreachable_backend_uses_connect_message() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let client =
            BackendClient::new(&format!("http://127.0.0.1:{port}"), Duration::from_secs(2));

        let err = client.generate(&DiagramRequest::new("/repo", "flow")).unwrap_err();

        assert!(matches!(err, RequestError::Transport { .. }));
        assert_eq!(err.user_message(), CONNECT_FAILURE_MESSAGE);
    }

    #[test]
    fn test_status_error_prefers_detail_then_error() {
        let with_detail = status_error(422, r#"{"detail":"repo_path required","error":"x"}"#);
        assert_eq!(with_detail.user_message(), "repo_path required");

        let with_error = status_error(500, r#"{"error":"boom"}"#);
        assert_eq!(with_error.user_message(), "boom");

        let html = status_error(502, "<html>Bad Gateway</html>");
        assert_eq!(html.user_message(), CONNECT_FAILURE_MESSAGE);
    }

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let client = BackendClient::new("http://localhost:8000/api/", Duration::from_secs(1));
        assert_eq!(client.base_url(), "http://localhost:8000/api");
    }
}
