//! Cache layer that orchestrates caching logic with network fetching.

use chrono::Duration;
use color_eyre::Result;
use serde::{de::DeserializeOwned, Serialize};
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info};

use super::storage::CacheStorage;
use super::traits::{CacheResult, Envelope, QueryKey};

/// Per-request caching options.
#[derive(Debug, Clone)]
pub struct FetchOptions {
  /// Whether the cache is consulted and written at all
  pub enable_cache: bool,
  /// Maximum age for a cached value to be served
  pub ttl: Duration,
  /// Skip the cache read but still write the fresh result
  pub force: bool,
}

impl Default for FetchOptions {
  fn default() -> Self {
    Self {
      enable_cache: true,
      ttl: Duration::minutes(5),
      force: false,
    }
  }
}

impl FetchOptions {
  /// Set the TTL for cached data.
  pub fn with_ttl(mut self, ttl: Duration) -> Self {
    self.ttl = ttl;
    self
  }

  /// Bypass the cache read while keeping the write.
  pub fn forced(mut self) -> Self {
    self.force = true;
    self
  }

  /// Disable caching entirely, reads and writes both.
  pub fn uncached(mut self) -> Self {
    self.enable_cache = false;
    self
  }
}

/// Cache layer that manages caching logic and network fetching.
///
/// This layer sits between the application and the network client. The
/// read-check-write sequence in [`CacheLayer::fetch`] spans an await, so two
/// callers racing on the same key can both miss and both fetch; the later
/// write wins. That is a benign inefficiency, not a correctness bug, and
/// there is deliberately no request de-duplication here.
pub struct CacheLayer<S: CacheStorage> {
  storage: Arc<S>,
}

impl<S: CacheStorage> CacheLayer<S> {
  /// Create a new cache layer with the given storage backend.
  pub fn new(storage: S) -> Self {
    Self {
      storage: Arc::new(storage),
    }
  }

  /// Fetch with a cache-first strategy.
  ///
  /// 1. If caching is enabled and a fresh entry exists, return it - no
  ///    network call.
  /// 2. Otherwise invoke the fetcher. On success, store the envelope's data
  ///    (when caching is enabled) and return it.
  /// 3. On failure, propagate the error; the cache keeps whatever it held.
  ///
  /// `options.force` skips step 1 but keeps step 2's cache write.
  pub async fn fetch<T, K, F, Fut>(
    &self,
    key: &K,
    options: &FetchOptions,
    fetcher: F,
  ) -> Result<CacheResult<T>>
  where
    T: Serialize + DeserializeOwned,
    K: QueryKey + ?Sized,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<Envelope<T>>>,
  {
    let hash = key.cache_hash();

    if options.enable_cache && !options.force {
      if let Some(entry) = self.storage.get(&hash)? {
        if entry.is_fresh(options.ttl) {
          if let Ok(value) = serde_json::from_value(entry.value) {
            debug!(query = %key.description(), "cache hit");
            return Ok(CacheResult::from_cache(value, entry.stored_at));
          }
          // Entry under this key no longer matches the requested shape;
          // fall through and refetch
        }
      }
    }

    debug!(query = %key.description(), force = options.force, "fetching from network");
    let envelope = fetcher().await?;

    if options.enable_cache {
      self
        .storage
        .set(&hash, serde_json::to_value(&envelope.data)?)?;
    }

    Ok(CacheResult::from_network(envelope.data))
  }

  /// Synchronous fresh-read: the cached value for `key` if one exists and is
  /// younger than the TTL, without touching the network.
  pub fn get_fresh<T, K>(&self, key: &K, options: &FetchOptions) -> Result<Option<T>>
  where
    T: DeserializeOwned,
    K: QueryKey + ?Sized,
  {
    if !options.enable_cache || options.force {
      return Ok(None);
    }

    match self.storage.get(&key.cache_hash())? {
      Some(entry) if entry.is_fresh(options.ttl) => Ok(serde_json::from_value(entry.value).ok()),
      _ => Ok(None),
    }
  }

  /// Drop the entry for a key so the next fetch hits the network.
  pub fn invalidate<K: QueryKey + ?Sized>(&self, key: &K) -> Result<()> {
    debug!(query = %key.description(), "invalidating cache entry");
    self.storage.invalidate(&key.cache_hash())
  }

  /// Drop every cached entry.
  pub fn clear(&self) -> Result<()> {
    info!("clearing cache");
    self.storage.clear()
  }
}

impl<S: CacheStorage> Clone for CacheLayer<S> {
  fn clone(&self) -> Self {
    Self {
      storage: Arc::clone(&self.storage),
    }
  }
}
