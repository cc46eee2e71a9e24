//! Cancellation and optional per-key serialization.
//!
//! A `CancelToken` is cloned into the transport; the download loop polls it
//! and stops with `TransferError::Cancelled` or `DeadlineExceeded`.
//! `KeyLocks` is an in-process registry of cache key -> mutex, used only when
//! `lock_per_key` is enabled.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::cache_key::CacheKey;
use crate::error::TransferError;

/// Shared abort flag with an optional deadline.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Token that expires at `deadline` unless cancelled earlier.
    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            flag: Arc::new(AtomicBool::new(false)),
            deadline: Some(deadline),
        }
    }

    /// Token that expires `timeout` from now.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now() + timeout)
    }

    /// Request abort. Every clone observes it.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// `Err` once cancelled or past the deadline. Cancellation wins over expiry.
    pub fn check(&self) -> Result<(), TransferError> {
        if self.is_cancelled() {
            return Err(TransferError::Cancelled);
        }
        match self.deadline {
            Some(d) if Instant::now() >= d => Err(TransferError::DeadlineExceeded),
            _ => Ok(()),
        }
    }
}

/// In-process registry of per-key mutexes.
#[derive(Default)]
pub struct KeyLocks {
    locks: Mutex<HashMap<CacheKey, Arc<Mutex<()>>>>,
}

impl KeyLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mutex shared by every caller asking for `key`. Lock it for the duration of the fetch.
    pub fn lock_for(&self, key: &CacheKey) -> Arc<Mutex<()>> {
        let mut map = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        Arc::clone(map.entry(key.clone()).or_default())
    }

    /// Drop the registry entry for `key` if nobody else holds its mutex.
    /// Call after the handle from `lock_for` has been dropped.
    pub fn release(&self, key: &CacheKey) {
        let mut map = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        if map.get(key).is_some_and(|m| Arc::strong_count(m) == 1) {
            map.remove(key);
        }
    }

    pub fn len(&self) -> usize {
        self.locks.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
