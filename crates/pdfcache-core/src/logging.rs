//! Tracing setup: append to `pdfcache.log` under the XDG state dir, or
//! stderr when that file cannot be opened.

use anyhow::{Context, Result};
use std::fs::{self, File};
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info,pdfcache=debug,pdfcache_core=debug";
const LOG_FILE: &str = "pdfcache.log";

/// Where log output goes after [`init_logging`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    File(PathBuf),
    Stderr,
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// `~/.local/state/pdfcache/pdfcache.log`, opened for append.
fn open_log_file() -> Result<(PathBuf, File)> {
    let log_dir = xdg::BaseDirectories::with_prefix("pdfcache")?.get_state_home();
    fs::create_dir_all(&log_dir)
        .with_context(|| format!("create log directory {}", log_dir.display()))?;
    let path = log_dir.join(LOG_FILE);
    let file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("open {}", path.display()))?;
    Ok((path, file))
}

/// Install the global subscriber. A read-only state dir falls back to
/// stderr rather than failing; a second call leaves the first in place.
pub fn init_logging() -> LogTarget {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_ansi(false);
    match open_log_file() {
        Ok((path, file)) => {
            let _ = builder.with_writer(Mutex::new(file)).try_init();
            tracing::info!("pdfcache logging initialized at {}", path.display());
            LogTarget::File(path)
        }
        Err(err) => {
            let _ = builder.with_writer(std::io::stderr).try_init();
            tracing::warn!("file logging unavailable, using stderr: {:#}", err);
            LogTarget::Stderr
        }
    }
}
