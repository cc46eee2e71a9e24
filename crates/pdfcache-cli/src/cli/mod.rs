//! CLI for pdfcache.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use pdfcache_core::config::{self, FetcherConfig};
use std::path::PathBuf;

use commands::{run_checksum, run_path, run_resolve};

/// Top-level CLI for pdfcache.
#[derive(Debug, Parser)]
#[command(name = "pdfcache")]
#[command(about = "pdfcache: resolve document URLs to cached local files", long_about = None)]
pub struct Cli {
    /// Cache directory. Overrides `cache_dir` from config.toml; default is the system temp dir.
    #[arg(long, global = true, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Abort a download that takes longer than this many seconds.
    #[arg(long, global = true, value_name = "SECS")]
    pub timeout: Option<u64>,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Print the local path for a URL, downloading it on first use.
    Resolve {
        /// Direct HTTP/HTTPS URL of the document.
        url: String,
    },

    /// Print the cache path a URL maps to, without downloading.
    Path {
        /// Direct HTTP/HTTPS URL of the document.
        url: String,
    },

    /// Print SHA-256 of the cached content for a URL. Fails if it is not cached.
    Checksum {
        /// Direct HTTP/HTTPS URL of the document.
        url: String,
    },
}

impl Cli {
    /// Apply command-line overrides on top of the loaded config.
    pub fn apply_overrides(&self, mut cfg: FetcherConfig) -> FetcherConfig {
        if let Some(dir) = &self.cache_dir {
            cfg.cache_dir = Some(dir.clone());
        }
        if let Some(secs) = self.timeout {
            cfg.timeout_secs = Some(secs);
        }
        cfg
    }
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = cli.apply_overrides(config::load_or_init()?);
        tracing::debug!("effective config: {:?}", cfg);

        match cli.command {
            CliCommand::Resolve { url } => run_resolve(&cfg, &url).await?,
            CliCommand::Path { url } => run_path(&cfg, &url).await?,
            CliCommand::Checksum { url } => run_checksum(&cfg, &url).await?,
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
