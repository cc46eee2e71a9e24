//! URL → local path resolution with a filename-addressed cache.
//!
//! Flow per call: validate the URL, derive the cache key, check the cache
//! root, and on a miss stream the body into `<key>.pdf.part` and rename it
//! to `<key>.pdf`. There is no index; the file name is the index.
//!
//! Concurrent callers for the same cold key, in one process or several, are
//! serialized by an exclusive lock on the staging file: one streams, the
//! others poll until it publishes and then return the published path. With
//! `lock_per_key`, same-key callers of one fetcher wait on an in-process
//! mutex instead of polling.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use tracing::{debug, info, warn};
use url::Url;

use crate::cache_key::CacheKey;
use crate::config::FetcherConfig;
use crate::control::{CancelToken, KeyLocks};
use crate::error::{FetchError, TransferError};
use crate::storage::{self, StagingFile};
use crate::transport::{CurlOptions, CurlTransport, Transport};
use crate::url_model::validate_source_url;

/// Interval between checks while another writer holds the staging file.
const BUSY_POLL: Duration = Duration::from_millis(50);

/// Directory holding cache entries. Defaults to the platform temp directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheRoot(PathBuf);

impl CacheRoot {
    /// Use `dir` as the cache root. Relative paths are resolved against the
    /// current directory so returned entry paths are absolute.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        CacheRoot(std::path::absolute(&dir).unwrap_or(dir))
    }

    /// The shared system temp directory (`std::env::temp_dir()`).
    pub fn system_temp() -> Self {
        Self::new(std::env::temp_dir())
    }

    pub fn path(&self) -> &Path {
        &self.0
    }

    /// Full path of the published entry for `key`.
    pub fn entry_path(&self, key: &CacheKey) -> PathBuf {
        self.0.join(key.file_name())
    }
}

impl Default for CacheRoot {
    fn default() -> Self {
        Self::system_temp()
    }
}

/// Resolves URLs to local files, downloading on cache miss.
pub struct CacheFetcher<T = CurlTransport> {
    root: CacheRoot,
    transport: T,
    fsync_before_publish: bool,
    key_locks: Option<KeyLocks>,
}

impl CacheFetcher<CurlTransport> {
    /// Build a libcurl-backed fetcher from configuration.
    pub fn from_config(cfg: &FetcherConfig) -> Self {
        let root = cfg
            .cache_dir
            .as_ref()
            .map(CacheRoot::new)
            .unwrap_or_default();
        CacheFetcher::with_transport(root, CurlTransport::new(CurlOptions::from_config(cfg)))
            .fsync_before_publish(cfg.fsync_before_publish)
            .lock_per_key(cfg.lock_per_key)
    }
}

impl Default for CacheFetcher<CurlTransport> {
    fn default() -> Self {
        Self::from_config(&FetcherConfig::default())
    }
}

impl<T: Transport> CacheFetcher<T> {
    pub fn with_transport(root: CacheRoot, transport: T) -> Self {
        Self {
            root,
            transport,
            fsync_before_publish: false,
            key_locks: None,
        }
    }

    /// fsync staged bytes before the rename.
    pub fn fsync_before_publish(mut self, enabled: bool) -> Self {
        self.fsync_before_publish = enabled;
        self
    }

    /// Serialize same-key fetches made through this fetcher.
    pub fn lock_per_key(mut self, enabled: bool) -> Self {
        self.key_locks = enabled.then(KeyLocks::new);
        self
    }

    pub fn root(&self) -> &CacheRoot {
        &self.root
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Validate `url` and compute its cache path without touching disk or network.
    pub fn cache_path(&self, url: &str) -> Result<PathBuf, FetchError> {
        validate_source_url(url)?;
        Ok(self.root.entry_path(&CacheKey::from_url(url)))
    }

    /// Local path of `url`'s content, downloading it first on a cache miss.
    pub fn resolve_local_path(&self, url: &str) -> Result<PathBuf, FetchError> {
        self.resolve_local_path_with(url, &CancelToken::new())
    }

    /// Like [`resolve_local_path`](Self::resolve_local_path), aborting the
    /// download when `cancel` is tripped or its deadline passes.
    pub fn resolve_local_path_with(
        &self,
        url: &str,
        cancel: &CancelToken,
    ) -> Result<PathBuf, FetchError> {
        let parsed = validate_source_url(url)?;
        let key = CacheKey::from_url(url);
        let final_path = self.root.entry_path(&key);

        if let Some(hit) = self.lookup(&final_path)? {
            return Ok(hit);
        }

        let Some(locks) = &self.key_locks else {
            return self.download(url, &parsed, &final_path, cancel);
        };
        let result = {
            let handle = locks.lock_for(&key);
            let _guard = handle.lock().unwrap_or_else(|e| e.into_inner());
            // Another caller may have published while we waited.
            self.lookup(&final_path).and_then(|hit| match hit {
                Some(p) => Ok(p),
                None => self.download(url, &parsed, &final_path, cancel),
            })
        };
        locks.release(&key);
        result
    }

    /// Fast path: `Some` when a regular file already sits at `final_path`.
    fn lookup(&self, final_path: &Path) -> Result<Option<PathBuf>, FetchError> {
        match fs::metadata(final_path) {
            Ok(meta) if meta.is_file() => {
                debug!(path = %final_path.display(), "cache hit");
                Ok(Some(final_path.to_path_buf()))
            }
            Ok(_) => Ok(None),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(FetchError::filesystem("stat", final_path, e)),
        }
    }

    /// Slow path: take the staging file, stream into it, publish.
    ///
    /// When another writer holds the staging file we poll until it publishes
    /// (fast path) or gives up (we take over).
    fn download(
        &self,
        url: &str,
        parsed: &Url,
        final_path: &Path,
        cancel: &CancelToken,
    ) -> Result<PathBuf, FetchError> {
        let root = self.root.path();
        fs::create_dir_all(root)
            .map_err(|e| FetchError::filesystem("create cache directory", root, e))?;

        let staging_path = storage::staging_path(final_path);
        let mut staging = loop {
            match StagingFile::try_acquire(&staging_path) {
                Ok(Some(staging)) => break staging,
                Ok(None) => {}
                Err(e) => return Err(FetchError::filesystem("create", &staging_path, e)),
            }
            debug!(url, staging = %staging_path.display(), "staging file busy, waiting for writer");
            cancel.check().map_err(|e| FetchError::download(url, e))?;
            thread::sleep(BUSY_POLL);
            if let Some(hit) = self.lookup(final_path)? {
                return Ok(hit);
            }
        };

        // A writer may have published between our miss and the lock.
        match self.lookup(final_path) {
            Ok(None) => {}
            Ok(Some(hit)) => {
                staging.discard();
                return Ok(hit);
            }
            Err(e) => {
                staging.discard();
                return Err(e);
            }
        }

        info!(url, staging = %staging_path.display(), "cache miss, downloading");
        let outcome = self.fill(url, parsed, &mut staging, cancel).and_then(|received| {
            staging
                .publish(final_path)
                .map(|()| received)
                .map_err(|e| FetchError::filesystem("rename staging file to", final_path, e))
        });
        match outcome {
            Ok(bytes) => {
                drop(staging);
                info!(url, path = %final_path.display(), bytes, "cached download");
                Ok(final_path.to_path_buf())
            }
            Err(e) => {
                warn!(url, error = %e, "fetch failed");
                staging.discard();
                Err(e)
            }
        }
    }

    /// Stream the body into `staging` and make it durable enough to publish.
    fn fill(
        &self,
        url: &str,
        parsed: &Url,
        staging: &mut StagingFile,
        cancel: &CancelToken,
    ) -> Result<u64, FetchError> {
        let received = self
            .transport
            .get(parsed, staging, cancel)
            .map_err(|e| match e {
                TransferError::Sink(io_err) => {
                    FetchError::filesystem("write", staging.path(), io_err)
                }
                other => FetchError::download(url, other),
            })?;

        staging
            .flush()
            .map_err(|e| FetchError::filesystem("write", staging.path(), e))?;
        if self.fsync_before_publish {
            staging
                .sync()
                .map_err(|e| FetchError::filesystem("sync", staging.path(), e))?;
        }
        cancel.check().map_err(|e| FetchError::download(url, e))?;
        Ok(received)
    }
}

/// Resolve `url` with the default configuration: libcurl transport, cache in
/// the system temp directory.
pub fn resolve_local_path(url: &str) -> Result<PathBuf, FetchError> {
    CacheFetcher::default().resolve_local_path(url)
}
