//! Log sink setup: stdout plus an optional append-only file.
//!
//! The file is best-effort. If it cannot be opened the node logs to stdout
//! only, and write errors on an open file are dropped by the fmt layer.

use chrono::Local;
use std::fs::{File, OpenOptions};
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry};

/// Local wall-clock timestamps with millisecond precision
#[derive(Debug, Clone, Copy, Default)]
pub struct LogTimer;

impl FormatTime for LogTimer {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        write!(w, "{}", Local::now().format("%Y-%m-%d %H:%M:%S%.3f"))
    }
}

/// Open `path` for appending, or `None` if that is not possible.
pub fn open_log_file(path: &Path) -> Option<File> {
    match OpenOptions::new().create(true).append(true).open(path) {
        Ok(file) => Some(file),
        Err(e) => {
            eprintln!("Failed to open log file {}: {}", path.display(), e);
            None
        }
    }
}

/// Layer writing plain-text lines to an already opened file
pub fn file_layer(file: File) -> impl Layer<Registry> + Send + Sync {
    tracing_subscriber::fmt::layer()
        .with_timer(LogTimer)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
}

/// Install the global subscriber. `RUST_LOG` takes priority over `level`.
/// Calling this twice keeps the first subscriber.
pub fn init_logging(level: &str, log_file: Option<&Path>) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let file = log_file.and_then(open_log_file).map(file_layer);

    let _ = tracing_subscriber::registry()
        .with(file)
        .with(tracing_subscriber::fmt::layer().with_timer(LogTimer))
        .with(filter)
        .try_init();
}
