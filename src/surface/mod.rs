//! The diagram surface: one display slot fed by a stream of raw payloads.
//!
//! [`DiagramSurface`] is a plain state machine. It never runs the engine
//! itself; the event loop asks it for the next [`RenderJob`] once the
//! coalescing delay has passed, hands the job to a [`RenderWorker`], and
//! feeds the [`RenderCompletion`] back. Every payload change issues a new
//! sequence number and only a completion carrying the latest one is ever
//! committed, whatever order completions arrive in.

mod adapter;
mod mount;
mod worker;

pub use adapter::render;
pub use mount::{DiagramArtifact, MountTarget, RenderResult, SYNTAX_ERROR_MESSAGE};
pub use worker::RenderWorker;

use crate::sanitize::sanitize;

/// Delay before a queued payload is rendered, in milliseconds.
pub const DEFAULT_RENDER_DELAY_MS: u64 = 100;

/// What the surface is currently showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceState {
    /// No payload yet.
    Empty,
    /// A request is in flight; takes precedence over everything else.
    Loading,
    /// A payload is waiting for its render to resolve.
    Pending,
    Rendered,
    RenderFailed,
}

/// A render attempt handed to the worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderJob {
    pub seq: u64,
    pub id: String,
    pub sanitized: String,
    pub raw: String,
}

/// A resolved render attempt coming back from the worker.
#[derive(Debug)]
pub struct RenderCompletion {
    pub seq: u64,
    pub result: Option<RenderResult>,
    pub mount: MountTarget,
}

impl RenderCompletion {
    /// Settle a job that never reached a worker as a failed render.
    pub fn abandoned(job: RenderJob) -> Self {
        Self {
            seq: job.seq,
            result: Some(RenderResult::failed(job.raw)),
            mount: MountTarget::new(),
        }
    }
}

#[derive(Debug)]
struct QueuedJob {
    job: RenderJob,
    queued_at_ms: u64,
}

#[derive(Debug)]
pub struct DiagramSurface {
    delay_ms: u64,
    loading: bool,
    raw: String,
    latest_seq: u64,
    queued: Option<QueuedJob>,
    in_flight: Option<u64>,
    result: Option<RenderResult>,
    mount: MountTarget,
}

impl Default for DiagramSurface {
    fn default() -> Self {
        Self::new(DEFAULT_RENDER_DELAY_MS)
    }
}

impl DiagramSurface {
    pub fn new(delay_ms: u64) -> Self {
        Self {
            delay_ms,
            loading: false,
            raw: String::new(),
            latest_seq: 0,
            queued: None,
            in_flight: None,
            result: None,
            mount: MountTarget::new(),
        }
    }

    /// Re-derive the surface from the orchestrator's latest inputs.
    ///
    /// `payload` is the raw diagram text of the current response, if any.
    /// Returns true when the payload changed and a new sequence number was
    /// issued. Identical text is not rendered again.
    pub fn submit(&mut self, payload: Option<&str>, loading: bool, now_ms: u64) -> bool {
        self.loading = loading;
        let raw = payload.unwrap_or_default();
        if raw == self.raw {
            return false;
        }

        self.latest_seq += 1;
        self.raw = raw.to_string();
        self.result = None;
        self.queued = None;
        self.in_flight = None;
        self.mount.clear();

        let sanitized = sanitize(raw);
        crate::perf::log_event(
            "surface.payload",
            format!(
                "seq={} raw_len={} sanitized_len={}",
                self.latest_seq,
                raw.len(),
                sanitized.len()
            ),
        );
        if sanitized.is_empty() {
            return true;
        }

        self.queued = Some(QueuedJob {
            job: RenderJob {
                seq: self.latest_seq,
                id: format!("diagram-{}", self.latest_seq),
                sanitized,
                raw: self.raw.clone(),
            },
            queued_at_ms: now_ms,
        });
        true
    }

    /// Take the queued job once the coalescing delay has elapsed.
    pub fn take_ready(&mut self, now_ms: u64) -> Option<RenderJob> {
        let queued_at_ms = self.queued.as_ref()?.queued_at_ms;
        if now_ms.saturating_sub(queued_at_ms) < self.delay_ms {
            return None;
        }
        let job = self.queued.take()?.job;
        self.in_flight = Some(job.seq);
        crate::perf::log_event("surface.dispatch", format!("seq={}", job.seq));
        Some(job)
    }

    /// Milliseconds until the queued job becomes ready, if one is queued.
    pub fn ready_in(&self, now_ms: u64) -> Option<u64> {
        self.queued.as_ref().map(|queued| {
            self.delay_ms
                .saturating_sub(now_ms.saturating_sub(queued.queued_at_ms))
        })
    }

    /// Commit a worker result. Stale completions are dropped.
    ///
    /// Returns true when the visible state changed.
    pub fn complete(&mut self, completion: RenderCompletion) -> bool {
        if completion.seq != self.latest_seq || self.in_flight != Some(completion.seq) {
            crate::perf::log_event(
                "surface.stale",
                format!("seq={} latest={}", completion.seq, self.latest_seq),
            );
            return false;
        }
        self.in_flight = None;
        self.mount = completion.mount;
        self.result = completion.result;
        crate::perf::log_event(
            "surface.commit",
            format!(
                "seq={} rendered={}",
                completion.seq,
                self.result.as_ref().is_some_and(RenderResult::is_rendered)
            ),
        );
        true
    }

    pub fn state(&self) -> SurfaceState {
        if self.loading {
            return SurfaceState::Loading;
        }
        match &self.result {
            Some(RenderResult::Rendered(_)) => SurfaceState::Rendered,
            Some(RenderResult::Failed { .. }) => SurfaceState::RenderFailed,
            None if self.queued.is_some() || self.in_flight.is_some() => SurfaceState::Pending,
            None => SurfaceState::Empty,
        }
    }

    pub const fn latest_seq(&self) -> u64 {
        self.latest_seq
    }

    pub const fn result(&self) -> Option<&RenderResult> {
        self.result.as_ref()
    }

    pub const fn mount(&self) -> &MountTarget {
        &self.mount
    }

    /// The raw payload currently held, before sanitizing.
    pub fn raw_payload(&self) -> &str {
        &self.raw
    }
}

#[cfg(test)]
pub(crate) mod test_support;

#[cfg(test)]
mod tests;
