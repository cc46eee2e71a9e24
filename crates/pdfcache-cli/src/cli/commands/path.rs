//! Path command: show where a URL would be cached.

use anyhow::Result;
use pdfcache_core::config::FetcherConfig;
use pdfcache_core::CacheFetcher;

/// Print the cache path for `url`. No network access; the file may not exist yet.
pub async fn run_path(cfg: &FetcherConfig, url: &str) -> Result<()> {
    let fetcher = CacheFetcher::from_config(cfg);
    let path = fetcher.cache_path(url)?;
    tracing::debug!(url, cached = path.is_file(), "computed cache path");
    println!("{}", path.display());
    Ok(())
}
