//! Cache storage trait and in-memory implementation.

use chrono::{DateTime, Duration, Utc};
use color_eyre::{eyre::eyre, Result};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;

/// A single cached value with its storage timestamp.
///
/// Entries are owned by the store and cloned out on `get`; callers never hold
/// a reference into the store.
#[derive(Debug, Clone)]
pub struct CacheEntry {
  /// The cached value, stored as JSON so one store can hold results of
  /// different shapes
  pub value: Value,
  /// When the value was stored
  pub stored_at: DateTime<Utc>,
}

impl CacheEntry {
  /// Whether this entry is younger than the given TTL.
  pub fn is_fresh(&self, ttl: Duration) -> bool {
    Utc::now() - self.stored_at < ttl
  }
}

/// Trait for cache storage backends.
///
/// Expiry is evaluated lazily at read time via `is_fresh`; nothing sweeps old
/// entries, so a key that is never re-requested keeps its entry for the life
/// of the store.
pub trait CacheStorage: Send + Sync {
  /// Get the entry for a key. No side effects.
  fn get(&self, key: &str) -> Result<Option<CacheEntry>>;

  /// Store a value under a key, overwriting unconditionally and stamping the
  /// current time.
  fn set(&self, key: &str, value: Value) -> Result<()>;

  /// True iff an entry exists and is younger than `ttl`.
  fn is_fresh(&self, key: &str, ttl: Duration) -> Result<bool>;

  /// Remove the entry for a key, forcing the next fetch to hit the network.
  fn invalidate(&self, key: &str) -> Result<()>;

  /// Remove all entries.
  fn clear(&self) -> Result<()>;
}

/// Storage implementation that doesn't cache anything.
/// Used when caching is disabled - all operations are no-ops.
pub struct NoopStorage;

impl CacheStorage for NoopStorage {
  fn get(&self, _key: &str) -> Result<Option<CacheEntry>> {
    Ok(None) // Always miss
  }

  fn set(&self, _key: &str, _value: Value) -> Result<()> {
    Ok(()) // Discard
  }

  fn is_fresh(&self, _key: &str, _ttl: Duration) -> Result<bool> {
    Ok(false) // Never fresh
  }

  fn invalidate(&self, _key: &str) -> Result<()> {
    Ok(())
  }

  fn clear(&self) -> Result<()> {
    Ok(())
  }
}

/// In-memory cache storage with process lifetime.
///
/// Unbounded by design: the store lives for one session and is torn down with
/// the process. There is no eviction policy and no size bound.
#[derive(Default)]
pub struct MemoryStorage {
  entries: Mutex<HashMap<String, CacheEntry>>,
}

impl MemoryStorage {
  /// Create an empty store.
  pub fn new() -> Self {
    Self::default()
  }

  fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, CacheEntry>>> {
    self
      .entries
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))
  }

  /// Number of stored entries, fresh or not.
  pub fn len(&self) -> Result<usize> {
    Ok(self.lock()?.len())
  }

  /// Whether the store holds no entries.
  pub fn is_empty(&self) -> Result<bool> {
    Ok(self.lock()?.is_empty())
  }
}

impl CacheStorage for MemoryStorage {
  fn get(&self, key: &str) -> Result<Option<CacheEntry>> {
    Ok(self.lock()?.get(key).cloned())
  }

  fn set(&self, key: &str, value: Value) -> Result<()> {
    self.lock()?.insert(
      key.to_string(),
      CacheEntry {
        value,
        stored_at: Utc::now(),
      },
    );
    Ok(())
  }

  fn is_fresh(&self, key: &str, ttl: Duration) -> Result<bool> {
    Ok(
      self
        .lock()?
        .get(key)
        .map(|entry| entry.is_fresh(ttl))
        .unwrap_or(false),
    )
  }

  fn invalidate(&self, key: &str) -> Result<()> {
    self.lock()?.remove(key);
    Ok(())
  }

  fn clear(&self) -> Result<()> {
    self.lock()?.clear();
    Ok(())
  }
}
