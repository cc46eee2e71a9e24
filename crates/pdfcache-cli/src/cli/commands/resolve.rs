//! Resolve command: fetch on miss, print the local path.

use anyhow::{Context, Result};
use pdfcache_core::config::FetcherConfig;
use pdfcache_core::{CacheFetcher, CancelToken};

/// Resolve `url` to a local file and print its path.
///
/// The blocking fetch runs on the blocking pool; Ctrl-C trips the cancel
/// token so the transfer stops and the staging file is cleaned up.
pub async fn run_resolve(cfg: &FetcherConfig, url: &str) -> Result<()> {
    let fetcher = CacheFetcher::from_config(cfg);
    let token = CancelToken::new();
    let worker_token = token.clone();
    let owned_url = url.to_string();
    let mut worker = tokio::task::spawn_blocking(move || {
        fetcher.resolve_local_path_with(&owned_url, &worker_token)
    });

    let joined = tokio::select! {
        res = &mut worker => res,
        Ok(()) = tokio::signal::ctrl_c() => {
            tracing::info!("interrupt received, cancelling download of {}", url);
            token.cancel();
            worker.await
        }
    };
    let path = joined.context("fetch worker panicked")??;

    println!("{}", path.display());
    Ok(())
}
