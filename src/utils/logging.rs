//! Diagnostic logging.
//!
//! The full-screen UI owns stdout and stderr, so tracing output only goes
//! somewhere when a log file is requested.

use std::error::Error;
use std::fs::{File, OpenOptions};
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "jerry=debug";

fn open_log_file(path: &str) -> Result<File, Box<dyn Error>> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    Ok(file)
}

/// `RUST_LOG` when set and valid, otherwise debug output for this crate.
pub fn log_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Install a global subscriber appending plain-text events to `path`.
pub fn init_file_logging(path: &str) -> Result<(), Box<dyn Error>> {
    let file = open_log_file(path)?;
    tracing_subscriber::fmt()
        .with_env_filter(log_filter())
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init()
        .map_err(|e| e as Box<dyn Error>)?;
    tracing::debug!(version = env!("CARGO_PKG_VERSION"), "logging started");
    Ok(())
}
