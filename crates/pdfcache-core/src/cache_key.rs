//! Cache key derivation: SHA-256 of the exact URL string.
//!
//! No normalization is applied. Trailing slashes, query order and casing all
//! change the key; the cache is keyed on string identity.

use sha2::{Digest, Sha256};
use std::fmt;

/// Extension appended to every cache entry name.
pub const CACHE_EXTENSION: &str = ".pdf";

/// Lowercase hex SHA-256 digest identifying one cache entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    /// Hash the UTF-8 bytes of `url` exactly as given.
    pub fn from_url(url: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(url.as_bytes());
        CacheKey(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// File name of the published entry, e.g. `<digest>.pdf`.
    pub fn file_name(&self) -> String {
        format!("{}{}", self.0, CACHE_EXTENSION)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
