use std::io::stdout;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::event;
use crossterm::event::{DisableMouseCapture, EnableMouseCapture};
use crossterm::execute;
use ratatui::DefaultTerminal;

use crate::api::RequestWorker;
use crate::app::model::TextField;
use crate::app::{App, Message, Model, update};
use crate::mermaid::{DiagramEngine, MermaidEngine};
use crate::surface::{RenderCompletion, RenderWorker, SurfaceState};

/// Poll interval while a request or render is outstanding.
const BUSY_POLL_MS: u64 = 16;
const IDLE_POLL_MS: u64 = 250;

const RENDERER_STOPPED_MESSAGE: &str = "Diagram renderer stopped unexpectedly";

pub(super) struct ResizeDebouncer {
    delay_ms: u64,
    pending: Option<(u16, u16, u64)>,
}

impl ResizeDebouncer {
    pub(super) const fn new(delay_ms: u64) -> Self {
        Self {
            delay_ms,
            pending: None,
        }
    }

    pub(super) const fn queue(&mut self, width: u16, height: u16, now_ms: u64) {
        self.pending = Some((width, height, now_ms));
    }

    pub(super) fn take_ready(&mut self, now_ms: u64) -> Option<(u16, u16)> {
        let (width, height, queued_at) = self.pending?;
        if now_ms.saturating_sub(queued_at) >= self.delay_ms {
            self.pending = None;
            Some((width, height))
        } else {
            None
        }
    }

    pub(super) const fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}

/// How long the loop may block waiting for input.
pub(super) fn poll_interval_ms(
    model: &Model,
    now_ms: u64,
    needs_render: bool,
    resize_pending: bool,
) -> u64 {
    if needs_render {
        return 0;
    }
    if let Some(ready_in) = model.surface.ready_in(now_ms) {
        return ready_in.clamp(1, IDLE_POLL_MS);
    }
    if resize_pending || model.loading || model.surface_state() == SurfaceState::Pending {
        return BUSY_POLL_MS;
    }
    IDLE_POLL_MS
}

impl App {
    /// Run the main event loop.
    ///
    /// # Errors
    ///
    /// Returns an error if the render worker cannot start, the terminal
    /// cannot be initialized, or the event loop hits an I/O failure.
    pub fn run(&mut self) -> Result<()> {
        let _run_scope = crate::perf::scope("app.run.total");

        // Create image picker BEFORE initializing terminal (queries stdio)
        let picker = if self.images_enabled {
            let _picker_scope = crate::perf::scope("app.create_picker");
            crate::image::create_picker(self.force_half_cell)
        } else {
            None
        };

        let engine: Box<dyn DiagramEngine> = if picker.is_some() {
            Box::new(MermaidEngine::new(self.render_width))
        } else {
            Box::new(MermaidEngine::svg_only())
        };
        let renderer = RenderWorker::spawn(engine).context("Failed to start render worker")?;
        let mut requests = RequestWorker::new(self.client.clone());

        let init_scope = crate::perf::scope("app.ratatui_init");
        let mut terminal = ratatui::try_init()
            .context("Failed to initialize terminal - codeatlas requires an interactive terminal")?;
        let size = terminal.size()?;
        drop(init_scope);
        tracing::info!(
            backend = self.client.base_url(),
            width = size.width,
            height = size.height,
            "terminal ui started"
        );

        let mut model =
            Model::new((size.width, size.height), self.render_delay_ms).with_picker(picker);
        model.images_enabled = model.picker.is_some();
        if let Some(repository) = &self.initial_repository {
            model.repository = TextField::new(repository.as_str());
        }
        if let Some(query) = &self.initial_query {
            model.query = TextField::new(query.as_str());
        }

        let result = execute!(stdout(), EnableMouseCapture)
            .context("Failed to enable mouse capture")
            .and_then(|()| self.event_loop(&mut terminal, &mut model, &renderer, &mut requests));

        // Restore terminal
        let _ = execute!(stdout(), DisableMouseCapture);
        ratatui::restore();

        result
    }

    fn apply_message(
        &self,
        model: &mut Model,
        requests: &mut RequestWorker,
        msg: Message,
        now_ms: u64,
    ) {
        let side_msg = msg.clone();
        *model = update(std::mem::take(model), msg);
        self.handle_message_side_effects(model, requests, &side_msg);
        model.sync_surface(now_ms);
    }

    fn event_loop(
        &self,
        terminal: &mut DefaultTerminal,
        model: &mut Model,
        renderer: &RenderWorker,
        requests: &mut RequestWorker,
    ) -> Result<()> {
        let start = Instant::now();
        let mut resize_debouncer = ResizeDebouncer::new(100);
        let mut frame_idx: u64 = 0;
        let mut needs_render = true;

        loop {
            if model.expire_toast(Instant::now()) {
                needs_render = true;
            }

            let now_ms = elapsed_ms(start);

            if let Some((width, height)) = resize_debouncer.take_ready(now_ms) {
                crate::perf::log_event(
                    "event.resize.apply",
                    format!("frame={frame_idx} width={width} height={height}"),
                );
                self.apply_message(model, requests, Message::Resize(width, height), now_ms);
                needs_render = true;
            }

            while let Some(completion) = requests.try_recv() {
                let msg = Message::RequestFinished {
                    id: completion.id,
                    outcome: completion.outcome.map_err(|err| err.user_message()),
                };
                self.apply_message(model, requests, msg, now_ms);
                needs_render = true;
            }

            if model.sync_surface(now_ms) {
                needs_render = true;
            }

            if let Some(job) = model.surface.take_ready(now_ms) {
                if let Err(job) = renderer.dispatch(job) {
                    tracing::error!(seq = job.seq, "render worker is gone");
                    model.banner = Some(RENDERER_STOPPED_MESSAGE.to_string());
                    model.apply_render_completion(RenderCompletion::abandoned(job));
                }
                needs_render = true;
            }

            while let Some(completion) = renderer.try_recv() {
                if model.apply_render_completion(completion) {
                    needs_render = true;
                }
            }

            // Handle events
            let poll_ms =
                poll_interval_ms(model, now_ms, needs_render, resize_debouncer.is_pending());
            if event::poll(Duration::from_millis(poll_ms))? {
                // Refresh timestamp after poll wait so debouncers use accurate times.
                let event_ms = elapsed_ms(start);
                let msg =
                    Self::handle_event(&event::read()?, model, event_ms, &mut resize_debouncer);
                if let Some(msg) = msg {
                    crate::perf::log_event(
                        "event.message",
                        format!("frame={frame_idx} msg={msg:?}"),
                    );
                    self.apply_message(model, requests, msg, event_ms);
                    needs_render = true;
                }

                // Coalesce key repeat bursts into a single render.
                let mut drained = 0_u32;
                while event::poll(Duration::from_millis(0))? {
                    let drain_ms = elapsed_ms(start);
                    let msg =
                        Self::handle_event(&event::read()?, model, drain_ms, &mut resize_debouncer);
                    if let Some(msg) = msg {
                        drained += 1;
                        self.apply_message(model, requests, msg, drain_ms);
                        needs_render = true;
                    }
                }
                if drained > 0 {
                    crate::perf::log_event(
                        "event.drain",
                        format!("frame={frame_idx} drained={drained}"),
                    );
                }
            }

            if needs_render {
                frame_idx += 1;
                let draw_start = Instant::now();
                terminal.draw(|frame| crate::ui::render(model, frame))?;
                crate::perf::log_event(
                    "frame.draw",
                    format!(
                        "frame={} draw_ms={:.3} surface={:?}",
                        frame_idx,
                        draw_start.elapsed().as_secs_f64() * 1000.0,
                        model.surface_state()
                    ),
                );
                needs_render = false;
            }

            if model.should_quit {
                break;
            }
        }
        Ok(())
    }
}
