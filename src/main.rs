//! CodeAtlas - architecture diagrams for a codebase, in the terminal.
//!
//! # Usage
//!
//! ```bash
//! codeatlas
//! codeatlas --backend http://10.0.0.5:8000/api --repo ./src --query "auth flow"
//! codeatlas --repo ./src --query "auth flow" --output auth.svg
//! codeatlas --input raw.txt --output diagram.svg
//! ```

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::Parser;

use codeatlas::api::{BackendClient, DiagramRequest};
use codeatlas::app::App;
use codeatlas::config::{
    ConfigFlags, clear_config_flags, global_config_path, load_config_flags, local_override_path,
    save_config_flags,
};
use codeatlas::headless::{self, HeadlessOutcome, NO_DIAGRAM_MESSAGE, PayloadSource};
use codeatlas::mermaid::MermaidEngine;
use codeatlas::perf;

/// Generate and view architecture diagrams of a codebase
#[derive(Parser, Debug)]
#[command(name = "codeatlas", version, about, long_about = None)]
struct Cli {
    /// Analysis backend base URL
    #[arg(long, value_name = "URL")]
    backend: Option<String>,

    /// Request timeout in seconds
    #[arg(long, value_name = "SECS")]
    timeout_secs: Option<u64>,

    /// Delay between a payload arriving and its render starting
    #[arg(long, value_name = "MS")]
    render_delay_ms: Option<u64>,

    /// Rasterization width for diagrams, in pixels
    #[arg(long, value_name = "PX")]
    render_width: Option<u32>,

    /// Disable terminal graphics (show a text summary instead)
    #[arg(long)]
    no_images: bool,

    /// Force image rendering to use half-cell fallback mode
    #[arg(long)]
    force_half_cell: bool,

    /// Enable performance logging
    #[arg(long)]
    perf: bool,

    /// Write detailed render debug events to a file
    #[arg(long, value_name = "PATH")]
    render_debug_log: Option<PathBuf>,

    /// Write tracing output to a file
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,

    /// Save current command-line flags as defaults
    #[arg(long)]
    save: bool,

    /// Clear saved defaults
    #[arg(long)]
    clear: bool,

    /// Repository path to analyze (pre-fills the form, or used with --output)
    #[arg(long, value_name = "PATH")]
    repo: Option<String>,

    /// Analysis query (pre-fills the form, or used with --output)
    #[arg(long, value_name = "TEXT")]
    query: Option<String>,

    /// Render a saved raw payload instead of calling the backend
    #[arg(long, value_name = "FILE", requires = "output", conflicts_with_all = ["repo", "query"])]
    input: Option<PathBuf>,

    /// Write the rendered SVG here and exit instead of starting the UI
    #[arg(long, value_name = "FILE")]
    output: Option<PathBuf>,
}

impl Cli {
    fn config_flags(&self) -> ConfigFlags {
        ConfigFlags {
            backend: self.backend.clone(),
            timeout_secs: self.timeout_secs,
            render_delay_ms: self.render_delay_ms,
            render_width: self.render_width,
            no_images: self.no_images,
            force_half_cell: self.force_half_cell,
            perf: self.perf,
            render_debug_log: self.render_debug_log.clone(),
            log_file: self.log_file.clone(),
        }
    }
}

fn init_tracing(log_file: Option<&PathBuf>, headless: bool) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(tracing::Level::WARN.into());
    if let Some(path) = log_file {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Failed to open log file {}", path.display()))?;
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .init();
    } else if headless {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
    // The TUI owns the terminal; without a log file tracing stays silent.
    Ok(())
}

fn run_headless(cli: &Cli, effective: &ConfigFlags, output: PathBuf) -> Result<ExitCode> {
    let source = if let Some(input) = &cli.input {
        PayloadSource::File(input.clone())
    } else {
        let request = DiagramRequest::new(
            cli.repo.clone().unwrap_or_default(),
            cli.query.clone().unwrap_or_default(),
        );
        if !request.is_ready() {
            anyhow::bail!("--output needs --input, or both --repo and --query");
        }
        PayloadSource::Backend {
            client: BackendClient::new(effective.backend_url(), effective.timeout()),
            request,
        }
    };

    let engine = MermaidEngine::svg_only();
    let outcome = headless::run(&source, &output, &engine)?;
    match &outcome {
        HeadlessOutcome::Written {
            path,
            nodes_analyzed,
        } => match nodes_analyzed {
            Some(nodes) => println!("Wrote {} ({nodes} nodes parsed)", path.display()),
            None => println!("Wrote {}", path.display()),
        },
        HeadlessOutcome::Empty => eprintln!("{NO_DIAGRAM_MESSAGE}"),
        HeadlessOutcome::RenderFailed {
            reason,
            original_payload,
        } => {
            eprintln!("{reason}");
            eprintln!("Raw output received:");
            eprintln!("{original_payload}");
        }
        HeadlessOutcome::RequestFailed(message) => eprintln!("{message}"),
    }
    Ok(ExitCode::from(outcome.exit_code()))
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let global_path = global_config_path();
    let local_path = local_override_path();
    let cli_flags = cli.config_flags();

    if cli.clear {
        clear_config_flags(&global_path)?;
    }
    if cli.save {
        save_config_flags(&global_path, &cli_flags)?;
    }

    let file_flags = if cli.clear {
        ConfigFlags::default()
    } else {
        let global_flags = load_config_flags(&global_path)?;
        let local_flags = load_config_flags(&local_path)?;
        global_flags.union(&local_flags)
    };
    let effective = file_flags.union(&cli_flags);

    init_tracing(effective.log_file.as_ref(), cli.output.is_some())?;

    perf::set_enabled(effective.perf);
    let render_debug_log_path = effective
        .render_debug_log
        .clone()
        .or_else(|| std::env::var_os("CODEATLAS_RENDER_DEBUG_LOG").map(PathBuf::from));
    if let Err(err) = perf::set_debug_log_path(render_debug_log_path.as_deref()) {
        eprintln!(
            "[warn] Failed to initialize render debug log {}: {}",
            render_debug_log_path
                .as_ref()
                .map_or_else(|| "<unset>".to_string(), |p| p.display().to_string()),
            err
        );
    }

    if let Some(output) = cli.output.clone() {
        return run_headless(&cli, &effective, output);
    }

    let client = BackendClient::new(effective.backend_url(), effective.timeout());
    let export_dir = std::env::current_dir().context("Failed to read working directory")?;
    let mut app = App::new(client)
        .with_render_width(effective.render_width())
        .with_render_delay_ms(effective.render_delay_ms())
        .with_images_enabled(!effective.no_images)
        .with_force_half_cell(effective.force_half_cell)
        .with_export_dir(export_dir)
        .with_initial_form(cli.repo.clone(), cli.query.clone());

    app.run().context("Application error")?;
    Ok(ExitCode::SUCCESS)
}
