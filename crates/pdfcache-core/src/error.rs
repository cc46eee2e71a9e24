//! Error types for the fetch path.
//!
//! `FetchError` separates caller mistakes (`InvalidUrl`), remote/network
//! failures (`Download`) and local environment failures (`Filesystem`) so
//! callers can decide what to retry. Transport failures are kept as
//! `TransferError` and wrapped as the source of `Download`.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Error returned by a transport while streaming a response body.
#[derive(Debug)]
pub enum TransferError {
    /// Curl reported an error (timeout, connection reset, DNS, TLS, etc.).
    Curl(curl::Error),
    /// HTTP response had a non-2xx status.
    Http(u32),
    /// The cancel token was tripped by the caller.
    Cancelled,
    /// The cancel token's deadline passed before the body was complete.
    DeadlineExceeded,
    /// Writing received bytes to the local sink failed (disk full, permission denied).
    Sink(io::Error),
}

impl fmt::Display for TransferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferError::Curl(e) => write!(f, "{}", e),
            TransferError::Http(code) => write!(f, "HTTP {}", code),
            TransferError::Cancelled => write!(f, "transfer cancelled"),
            TransferError::DeadlineExceeded => write!(f, "transfer deadline exceeded"),
            TransferError::Sink(e) => write!(f, "sink: {}", e),
        }
    }
}

impl std::error::Error for TransferError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TransferError::Curl(e) => Some(e),
            TransferError::Sink(e) => Some(e),
            TransferError::Http(_) | TransferError::Cancelled | TransferError::DeadlineExceeded => {
                None
            }
        }
    }
}

/// Error returned by [`CacheFetcher`](crate::CacheFetcher) operations.
#[derive(Debug, Error)]
pub enum FetchError {
    /// URL failed to parse or its scheme is not http/https. Raised before any I/O.
    #[error("invalid URL {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },

    /// Network failure, non-success status, timeout or cancellation while fetching.
    #[error("download of {url} failed: {source}")]
    Download {
        url: String,
        #[source]
        source: TransferError,
    },

    /// Creating, writing, renaming or inspecting a file in the cache root failed.
    #[error("failed to {op} {}: {source}", .path.display())]
    Filesystem {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl FetchError {
    pub fn invalid_url(url: &str, reason: impl Into<String>) -> Self {
        FetchError::InvalidUrl {
            url: url.to_string(),
            reason: reason.into(),
        }
    }

    pub fn download(url: &str, source: TransferError) -> Self {
        FetchError::Download {
            url: url.to_string(),
            source,
        }
    }

    pub fn filesystem(op: &'static str, path: &Path, source: io::Error) -> Self {
        FetchError::Filesystem {
            op,
            path: path.to_path_buf(),
            source,
        }
    }

    /// HTTP status of a failed download, when the server answered with one.
    pub fn http_status(&self) -> Option<u32> {
        match self {
            FetchError::Download {
                source: TransferError::Http(code),
                ..
            } => Some(*code),
            _ => None,
        }
    }

    /// Whether calling again with the same input may succeed.
    ///
    /// Invalid URLs never are. Downloads are, except for explicit cancellation
    /// and 4xx statuses other than 408/429. Filesystem errors are reported as
    /// retryable only for interruptions and timeouts.
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::InvalidUrl { .. } => false,
            FetchError::Download { source, .. } => match source {
                TransferError::Cancelled => false,
                TransferError::Http(code) => {
                    matches!(*code, 408 | 429) || (500..=599).contains(code)
                }
                TransferError::Curl(e) => !e.is_url_malformed() && !e.is_unsupported_protocol(),
                TransferError::DeadlineExceeded | TransferError::Sink(_) => true,
            },
            FetchError::Filesystem { source, .. } => matches!(
                source.kind(),
                io::ErrorKind::Interrupted | io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock
            ),
        }
    }
}
