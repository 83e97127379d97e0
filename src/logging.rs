//! File logging. The terminal belongs to the UI, so tracing output goes to
//! `<cache dir>/mdview/mdview.log`.

use std::fs;
use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Environment variable holding the log filter directives.
pub const LOG_ENV: &str = "MDVIEW_LOG";
const DEFAULT_FILTER: &str = "info";

/// Directory that receives the log file.
pub fn log_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("mdview")
}

/// Install the global subscriber. Returns the writer guard, which must live
/// until exit so buffered lines are flushed. Any failure leaves logging off.
pub fn init() -> Option<WorkerGuard> {
    let dir = log_dir();
    if let Err(e) = fs::create_dir_all(&dir) {
        eprintln!("Warning: cannot create log directory {}: {e}", dir.display());
        return None;
    }
    let file = match fs::File::create(dir.join("mdview.log")) {
        Ok(file) => file,
        Err(e) => {
            eprintln!("Warning: cannot open log file: {e}");
            return None;
        }
    };

    let (writer, guard) = tracing_appender::non_blocking(file);
    let filter =
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let installed = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(writer).with_ansi(false))
        .with(filter)
        .try_init();

    match installed {
        Ok(()) => Some(guard),
        Err(_) => None,
    }
}
