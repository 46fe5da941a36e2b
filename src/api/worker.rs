use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::Duration;

use super::{BackendClient, DiagramRequest, DiagramResponse, RequestError};

/// A finished request, tagged with the id [`RequestWorker::submit`] returned.
#[derive(Debug)]
pub struct RequestCompletion {
    pub id: u64,
    pub outcome: Result<DiagramResponse, RequestError>,
}

/// Runs backend requests off the UI thread.
///
/// Each request gets its own thread; there is no cancellation, callers
/// drop completions whose id they no longer wait for.
pub struct RequestWorker {
    client: BackendClient,
    tx: Sender<RequestCompletion>,
    rx: Receiver<RequestCompletion>,
    next_id: u64,
}

impl RequestWorker {
    pub fn new(client: BackendClient) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            client,
            tx,
            rx,
            next_id: 0,
        }
    }

    /// Start a request and return its id.
    ///
    /// # Errors
    ///
    /// Returns an error if the request thread cannot be spawned.
    pub fn submit(&mut self, request: DiagramRequest) -> std::io::Result<u64> {
        self.next_id += 1;
        let id = self.next_id;
        let client = self.client.clone();
        let tx = self.tx.clone();
        thread::Builder::new()
            .name(format!("codeatlas-request-{id}"))
            .spawn(move || {
                let outcome = client.generate(&request);
                let _ = tx.send(RequestCompletion { id, outcome });
            })?;
        crate::perf::log_event("request.submit", format!("id={id}"));
        Ok(id)
    }

    pub fn try_recv(&self) -> Option<RequestCompletion> {
        self.rx.try_recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<RequestCompletion> {
        match self.rx.recv_timeout(timeout) {
            Ok(completion) => Some(completion),
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
        }
    }
}
