pub mod config;
pub mod logging;

pub mod cache_key;
pub mod checksum;
pub mod control;
pub mod error;
pub mod fetcher;
pub mod storage;
pub mod transport;
pub mod url_model;

pub use cache_key::CacheKey;
pub use checksum::EntryDigest;
pub use control::CancelToken;
pub use error::{FetchError, TransferError};
pub use fetcher::{resolve_local_path, CacheFetcher, CacheRoot};
