//! Core traits and types for the caching system.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Response envelope produced by a fetcher.
///
/// Mirrors the HTTP client response shape: the layer only ever looks at
/// `data`, everything else (status, headers) stays with the transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
  pub data: T,
}

impl<T> Envelope<T> {
  pub fn new(data: T) -> Self {
    Self { data }
  }
}

/// Trait for cache lookup keys.
///
/// Implementors produce a stable hash used as the storage key, and a human
/// readable description for logging.
pub trait QueryKey {
  /// Stable, fixed-length key for this query.
  fn cache_hash(&self) -> String;

  /// Human readable description, used in log lines.
  fn description(&self) -> String;
}

/// SHA256-hash an input string into a stable, fixed-length hex key.
///
/// Two calls with equal input always produce the same key.
pub fn hash_key(input: &str) -> String {
  let mut hasher = Sha256::new();
  hasher.update(input.as_bytes());
  hex::encode(hasher.finalize())
}

/// Cache key derived from a fetcher's identity plus its parameter tuple.
///
/// Two keys with equal name and equal parameters always hash identically, so
/// repeat requests land on the same entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetcherKey {
  name: String,
  params: Vec<String>,
}

impl FetcherKey {
  pub fn new(name: impl Into<String>, params: &[String]) -> Self {
    Self {
      name: name.into(),
      params: params.to_vec(),
    }
  }
}

impl QueryKey for FetcherKey {
  fn cache_hash(&self) -> String {
    hash_key(&format!("{}|{}", self.name, self.params.join("|")))
  }

  fn description(&self) -> String {
    if self.params.is_empty() {
      self.name.clone()
    } else {
      format!("{}({})", self.name, self.params.join(", "))
    }
  }
}

/// Result from a cache operation, including data and metadata about the source.
#[derive(Debug, Clone)]
pub struct CacheResult<T> {
  /// The actual data
  pub data: T,
  /// Where the data came from
  pub source: CacheSource,
  /// When the data was cached (if from cache)
  pub cached_at: Option<DateTime<Utc>>,
}

impl<T> CacheResult<T> {
  /// Create a new cache result from fresh network data.
  pub fn from_network(data: T) -> Self {
    Self {
      data,
      source: CacheSource::Network,
      cached_at: None,
    }
  }

  /// Create a new cache result from cached data.
  pub fn from_cache(data: T, cached_at: DateTime<Utc>) -> Self {
    Self {
      data,
      source: CacheSource::Cache,
      cached_at: Some(cached_at),
    }
  }

  /// Whether the data was served from cache without a network call.
  pub fn is_cached(&self) -> bool {
    self.source == CacheSource::Cache
  }
}

/// Indicates where fetched data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheSource {
  /// Fresh data from network
  Network,
  /// Data from cache, younger than the caller's TTL
  Cache,
}
