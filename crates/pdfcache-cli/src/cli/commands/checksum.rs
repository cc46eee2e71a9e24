//! Checksum command: SHA-256 of the cached entry for a URL.

use anyhow::{bail, Result};
use pdfcache_core::config::FetcherConfig;
use pdfcache_core::CacheFetcher;

/// Print `<sha256>  <path>` for the entry cached for `url`. Never downloads.
pub async fn run_checksum(cfg: &FetcherConfig, url: &str) -> Result<()> {
    let fetcher = CacheFetcher::from_config(cfg);
    let Some(digest) = fetcher.entry_digest(url)? else {
        bail!("{} is not cached (run `pdfcache resolve` first)", url);
    };
    tracing::debug!(url, bytes = digest.len, "hashed cache entry");
    println!("{}  {}", digest.sha256, digest.path.display());
    Ok(())
}
