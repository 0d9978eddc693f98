//! Tracing configuration and log routing.
//!
//! The binary always logs to stdout using a compact formatter. A file layer
//! is added only when `DOCFLOW_LOG_FILE` names a destination; missing parent
//! directories are created on the way. A non‑blocking writer is used so
//! worker hot paths never wait on log I/O.
use std::fs::File;
use std::path::Path;
use std::sync::OnceLock;

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Configure tracing subscribers for stdout and optional file logging.
///
/// - Respects `RUST_LOG` for filtering (defaults to `info`).
/// - Installs a compact stdout layer and, when `DOCFLOW_LOG_FILE` is set, a
///   file layer appending to that path.
/// - Uses a global guard to keep the non‑blocking writer alive for the
///   process lifetime.
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let stdout_layer = fmt::layer().with_target(false).compact();

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer);

    if let Some(writer) = configure_file_writer() {
        let file_layer = fmt::layer()
            .with_writer(writer)
            .with_target(true)
            .with_ansi(false)
            .compact();

        registry.with(file_layer).init();
    } else {
        registry.init();
    }
}

/// Build a non‑blocking writer for the file destination, if one is configured.
///
/// Returns `None` when `DOCFLOW_LOG_FILE` is unset or the file cannot be
/// opened; the pipeline then logs to stdout only.
fn configure_file_writer() -> Option<NonBlocking> {
    let path = std::env::var("DOCFLOW_LOG_FILE").ok()?;
    let file = open_log_file(Path::new(&path))?;
    let (non_blocking, guard) = tracing_appender::non_blocking(file);
    let _ = LOG_GUARD.set(guard);
    Some(non_blocking)
}

/// Open `path` for appending, creating missing parent directories.
fn open_log_file(path: &Path) -> Option<File> {
    if let Some(parent) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        if let Err(err) = std::fs::create_dir_all(parent) {
            eprintln!(
                "Failed to create log directory {}: {err}",
                parent.display()
            );
            return None;
        }
    }
    match std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
    {
        Ok(file) => Some(file),
        Err(err) => {
            eprintln!("Failed to open log file {}: {err}", path.display());
            None
        }
    }
}
