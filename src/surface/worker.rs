use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::mermaid::{DiagramEngine, isolate_panics};

use super::adapter;
use super::mount::{MountTarget, RenderResult};
use super::{RenderCompletion, RenderJob};

/// Background thread that owns the engine and runs render attempts.
///
/// Jobs are processed in order. When several are queued, only the newest is
/// rendered; an attempt already running is never aborted, its completion is
/// simply stale by the time it arrives.
pub struct RenderWorker {
    jobs: Option<Sender<RenderJob>>,
    done: Receiver<RenderCompletion>,
    handle: Option<JoinHandle<()>>,
}

impl RenderWorker {
    /// Start the worker thread.
    ///
    /// # Errors
    ///
    /// Returns an error if the thread cannot be spawned.
    pub fn spawn(engine: Box<dyn DiagramEngine>) -> std::io::Result<Self> {
        let (job_tx, job_rx) = mpsc::channel::<RenderJob>();
        let (done_tx, done_rx) = mpsc::channel();

        let handle = thread::Builder::new()
            .name("codeatlas-render".to_string())
            .spawn(move || run(engine.as_ref(), &job_rx, &done_tx))?;

        Ok(Self {
            jobs: Some(job_tx),
            done: done_rx,
            handle: Some(handle),
        })
    }

    /// Queue a job.
    ///
    /// # Errors
    ///
    /// Hands the job back if the worker has gone away.
    pub fn dispatch(&self, job: RenderJob) -> Result<(), RenderJob> {
        match &self.jobs {
            Some(tx) => tx.send(job).map_err(|err| err.0),
            None => Err(job),
        }
    }

    pub fn try_recv(&self) -> Option<RenderCompletion> {
        self.done.try_recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<RenderCompletion> {
        match self.done.recv_timeout(timeout) {
            Ok(completion) => Some(completion),
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
        }
    }
}

impl Drop for RenderWorker {
    fn drop(&mut self) {
        // Closing the job channel ends the loop once the current attempt resolves.
        self.jobs = None;
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn run(engine: &dyn DiagramEngine, jobs: &Receiver<RenderJob>, done: &Sender<RenderCompletion>) {
    while let Ok(mut job) = jobs.recv() {
        while let Ok(newer) = jobs.try_recv() {
            crate::perf::log_event(
                "worker.coalesce",
                format!("skipped={} newer={}", job.seq, newer.seq),
            );
            job = newer;
        }

        let mut mount = MountTarget::new();
        let result = match isolate_panics(|| {
            adapter::render(engine, &job.id, &job.sanitized, &job.raw, &mut mount)
        }) {
            Ok(result) => result,
            Err(message) => {
                tracing::error!(seq = job.seq, %message, "render attempt panicked");
                mount.clear();
                Some(RenderResult::failed(job.raw.as_str()))
            }
        };
        tracing::debug!(
            seq = job.seq,
            rendered = ?result.as_ref().map(RenderResult::is_rendered),
            "render attempt resolved"
        );

        let completion = RenderCompletion {
            seq: job.seq,
            result,
            mount,
        };
        if done.send(completion).is_err() {
            break;
        }
    }
}
