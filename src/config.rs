//! Persistent default flags.
//!
//! Defaults live in plain files holding whitespace-separated command-line
//! flags: a global file under the platform config directory and a local
//! `.codeatlasrc` in the working directory. Effective flags are
//! global, then local, then the command line, each overriding the last.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};

use crate::api::{DEFAULT_BACKEND_URL, DEFAULT_TIMEOUT_SECS};
use crate::mermaid::DEFAULT_RENDER_WIDTH_PX;
use crate::surface::DEFAULT_RENDER_DELAY_MS;

const LOCAL_FILE_NAME: &str = ".codeatlasrc";

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConfigFlags {
    pub backend: Option<String>,
    pub timeout_secs: Option<u64>,
    pub render_delay_ms: Option<u64>,
    pub render_width: Option<u32>,
    pub no_images: bool,
    pub force_half_cell: bool,
    pub perf: bool,
    pub render_debug_log: Option<PathBuf>,
    pub log_file: Option<PathBuf>,
}

impl ConfigFlags {
    /// Merge `other` over `self`: booleans accumulate, values from `other` win.
    pub fn union(&self, other: &Self) -> Self {
        Self {
            backend: other.backend.clone().or_else(|| self.backend.clone()),
            timeout_secs: other.timeout_secs.or(self.timeout_secs),
            render_delay_ms: other.render_delay_ms.or(self.render_delay_ms),
            render_width: other.render_width.or(self.render_width),
            no_images: self.no_images || other.no_images,
            force_half_cell: self.force_half_cell || other.force_half_cell,
            perf: self.perf || other.perf,
            render_debug_log: other
                .render_debug_log
                .clone()
                .or_else(|| self.render_debug_log.clone()),
            log_file: other.log_file.clone().or_else(|| self.log_file.clone()),
        }
    }

    pub fn backend_url(&self) -> &str {
        self.backend.as_deref().unwrap_or(DEFAULT_BACKEND_URL)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS).max(1))
    }

    pub fn render_delay_ms(&self) -> u64 {
        self.render_delay_ms.unwrap_or(DEFAULT_RENDER_DELAY_MS)
    }

    pub fn render_width(&self) -> u32 {
        self.render_width.unwrap_or(DEFAULT_RENDER_WIDTH_PX).max(1)
    }
}

pub fn global_config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        if let Some(appdata) = std::env::var_os("APPDATA") {
            return PathBuf::from(appdata).join("codeatlas").join("config");
        }
    }

    #[cfg(target_os = "macos")]
    {
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home)
                .join("Library")
                .join("Application Support")
                .join("codeatlas")
                .join("config");
        }
    }

    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME") {
            return PathBuf::from(xdg).join("codeatlas").join("config");
        }
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home)
                .join(".config")
                .join("codeatlas")
                .join("config");
        }
    }

    PathBuf::from(LOCAL_FILE_NAME)
}

pub fn local_override_path() -> PathBuf {
    PathBuf::from(LOCAL_FILE_NAME)
}

/// Read flags from `path`; a missing file yields defaults.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read.
pub fn load_config_flags(path: &Path) -> Result<ConfigFlags> {
    if !path.exists() {
        return Ok(ConfigFlags::default());
    }
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    let tokens = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .flat_map(|line| line.split_whitespace().map(ToOwned::to_owned))
        .collect::<Vec<_>>();
    Ok(parse_flag_tokens(&tokens))
}

/// Write `flags` to `path`, creating parent directories.
///
/// # Errors
///
/// Returns an error if the directory or file cannot be written.
pub fn save_config_flags(path: &Path, flags: &ConfigFlags) -> Result<()> {
    let mut lines = vec!["# codeatlas defaults (saved with --save)".to_string()];
    if let Some(backend) = &flags.backend {
        lines.push(format!("--backend {backend}"));
    }
    if let Some(secs) = flags.timeout_secs {
        lines.push(format!("--timeout-secs {secs}"));
    }
    if let Some(ms) = flags.render_delay_ms {
        lines.push(format!("--render-delay-ms {ms}"));
    }
    if let Some(px) = flags.render_width {
        lines.push(format!("--render-width {px}"));
    }
    if flags.no_images {
        lines.push("--no-images".to_string());
    }
    if flags.force_half_cell {
        lines.push("--force-half-cell".to_string());
    }
    if flags.perf {
        lines.push("--perf".to_string());
    }
    if let Some(path) = &flags.render_debug_log {
        lines.push(format!("--render-debug-log {}", path.display()));
    }
    if let Some(path) = &flags.log_file {
        lines.push(format!("--log-file {}", path.display()));
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config dir {}", parent.display()))?;
    }
    fs::write(path, format!("{}\n", lines.join("\n")))
        .with_context(|| format!("Failed to write config {}", path.display()))
}

/// Remove the config file at `path` if present.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be removed.
pub fn clear_config_flags(path: &Path) -> Result<()> {
    if path.exists() {
        fs::remove_file(path).with_context(|| format!("Failed to remove {}", path.display()))?;
    }
    Ok(())
}

/// Extract persistable flags from raw tokens; anything unknown is ignored.
pub fn parse_flag_tokens(tokens: &[String]) -> ConfigFlags {
    let mut flags = ConfigFlags::default();
    let mut i = 0;
    while i < tokens.len() {
        let token = tokens[i].as_str();
        match token {
            "--no-images" => flags.no_images = true,
            "--force-half-cell" => flags.force_half_cell = true,
            "--perf" => flags.perf = true,
            _ => {
                let (name, inline) = match token.split_once('=') {
                    Some((name, value)) => (name, Some(value)),
                    None => (token, None),
                };
                if is_value_flag(name) {
                    let value = match inline {
                        Some(value) => Some(value),
                        None => {
                            let next = tokens.get(i + 1).map(String::as_str);
                            if next.is_some() {
                                i += 1;
                            }
                            next
                        }
                    };
                    if let Some(value) = value {
                        apply_value(&mut flags, name, value);
                    }
                }
            }
        }
        i += 1;
    }
    flags
}

fn is_value_flag(name: &str) -> bool {
    matches!(
        name,
        "--backend"
            | "--timeout-secs"
            | "--render-delay-ms"
            | "--render-width"
            | "--render-debug-log"
            | "--log-file"
    )
}

fn apply_value(flags: &mut ConfigFlags, name: &str, value: &str) {
    match name {
        "--backend" => flags.backend = Some(value.to_string()),
        "--timeout-secs" => flags.timeout_secs = value.parse().ok(),
        "--render-delay-ms" => flags.render_delay_ms = value.parse().ok(),
        "--render-width" => flags.render_width = value.parse().ok(),
        "--render-debug-log" => flags.render_debug_log = Some(PathBuf::from(value)),
        "--log-file" => flags.log_file = Some(PathBuf::from(value)),
        _ => {}
    }
}
