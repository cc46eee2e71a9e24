//! Content digest of a published cache entry.
//!
//! Not to be confused with the cache key, which hashes the URL. Computed on
//! demand only; the fetch path never re-hashes content.

use std::fs::File;
use std::io;
use std::path::PathBuf;

use sha2::{Digest, Sha256};

use crate::error::FetchError;
use crate::fetcher::CacheFetcher;
use crate::transport::Transport;

/// SHA-256 of the bytes stored for one URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryDigest {
    pub path: PathBuf,
    pub len: u64,
    /// Lowercase hex.
    pub sha256: String,
}

impl<T: Transport> CacheFetcher<T> {
    /// Hash the entry cached for `url`. `Ok(None)` when nothing is published
    /// for it; never downloads.
    pub fn entry_digest(&self, url: &str) -> Result<Option<EntryDigest>, FetchError> {
        let path = self.cache_path(url)?;
        let mut file = match File::open(&path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(FetchError::filesystem("open", &path, e)),
        };
        let meta = file
            .metadata()
            .map_err(|e| FetchError::filesystem("stat", &path, e))?;
        if !meta.is_file() {
            return Ok(None);
        }

        let mut hasher = Sha256::new();
        let len = io::copy(&mut file, &mut hasher)
            .map_err(|e| FetchError::filesystem("read", &path, e))?;
        Ok(Some(EntryDigest {
            path,
            len,
            sha256: hex::encode(hasher.finalize()),
        }))
    }
}
