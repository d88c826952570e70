//! Async query state machine for dashboard data fetching.
//!
//! A [`Query`] encapsulates a fetcher closure, its parameter tuple, and an
//! explicit fetch state machine. Results are delivered over a channel and
//! picked up with `poll()` from the consumer's tick, so rendering code never
//! blocks on the network.
//!
//! # Example
//!
//! ```ignore
//! let layer = CacheLayer::new(MemoryStorage::new());
//! let mut query = Query::cached("revenue", &layer, QueryOptions::default(), |params| {
//!     let timeframe = params[0].clone();
//!     async move { api.revenue(&timeframe).await }
//! });
//!
//! // In the event loop tick
//! if query.poll() {
//!     // State changed, trigger re-render
//! }
//! ```
//!
//! [`ResilientQuery`] is the never-blank variant: it is constructed with a
//! fallback value, `data()` is always renderable, and a failed fetch swaps
//! the fallback back in while keeping the real error for display.

use color_eyre::Result;
use futures::future::BoxFuture;
use serde::{de::DeserializeOwned, Serialize};
use std::future::Future;
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::warn;

use crate::cache::{CacheLayer, CacheStorage, Envelope, FetchOptions, FetcherKey};

/// Options for a cached query.
#[derive(Debug, Clone)]
pub struct QueryOptions {
  /// Whether fetched values are cached and cache reads are attempted
  pub enable_cache: bool,
  /// Maximum age for a cached value to be served
  pub ttl: chrono::Duration,
  /// Start the first fetch from the constructor
  pub fetch_on_create: bool,
}

impl Default for QueryOptions {
  fn default() -> Self {
    Self {
      enable_cache: true,
      ttl: chrono::Duration::minutes(5),
      fetch_on_create: true,
    }
  }
}

/// The state of a query.
///
/// One explicit machine instead of independent loading/error/fallback flags:
/// transitions are triggered by fetch start, resolve, and reject only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryState {
  /// No fetch has been started
  Idle,
  /// A fetch is in flight
  Loading,
  /// The last fetch resolved with server data
  Success,
  /// The last fetch failed and a fallback value is being served
  Fallback(String),
  /// The last fetch failed and no fallback is available
  Error(String),
}

impl QueryState {
  pub fn is_loading(&self) -> bool {
    matches!(self, QueryState::Loading)
  }

  pub fn is_success(&self) -> bool {
    matches!(self, QueryState::Success)
  }

  /// Whether the value being served is a substitute rather than server data.
  pub fn used_fallback(&self) -> bool {
    matches!(self, QueryState::Fallback(_))
  }

  /// The failure cause, if the last fetch rejected.
  pub fn error(&self) -> Option<&str> {
    match self {
      QueryState::Fallback(e) | QueryState::Error(e) => Some(e),
      _ => None,
    }
  }
}

/// A boxed future resolving to fetched data or a failure cause
type QueryFuture<T> = BoxFuture<'static, Result<T, String>>;

/// A factory producing fetch futures from the current parameter tuple;
/// the bool requests a forced (cache-bypassing) fetch
type FetcherFn<T> = Box<dyn Fn(&[String], bool) -> QueryFuture<T> + Send + Sync>;

/// Synchronous cache probe, consulted before spawning a fetch
type ProbeFn<T> = Box<dyn Fn(&[String]) -> Option<T> + Send + Sync>;

/// Async query with cache-first fetching and explicit state.
///
/// On failure the last good `data` value is left untouched; only the state
/// carries the error. Dropping the query drops its result receiver, so a
/// response arriving afterwards is a no-op - the underlying network future
/// still runs to completion, there is no cancellation.
pub struct Query<T> {
  state: QueryState,
  data: Option<T>,
  fetcher: FetcherFn<T>,
  params: Vec<String>,
  receiver: Option<mpsc::UnboundedReceiver<Result<T, String>>>,
  probe: Option<ProbeFn<T>>,
  fetched_at: Option<Instant>,
}

impl<T: Send + 'static> Query<T> {
  /// Create an uncached query from a fetcher closure.
  ///
  /// The closure receives the current parameter tuple and returns a future
  /// resolving to a response envelope. It is called once per fetch.
  pub fn new<F, Fut>(fetcher: F) -> Self
  where
    F: Fn(&[String]) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Envelope<T>>> + Send + 'static,
  {
    Self {
      state: QueryState::Idle,
      data: None,
      fetcher: Box::new(move |params, _force| {
        let future = fetcher(params);
        Box::pin(async move { future.await.map(|e| e.data).map_err(|e| e.to_string()) })
      }),
      params: Vec::new(),
      receiver: None,
      probe: None,
      fetched_at: None,
    }
  }

  /// Create a cached query.
  ///
  /// `name` is the fetcher's identity for cache key derivation: together with
  /// the parameter tuple it determines the cache entry, so two queries with
  /// equal name and parameters share one entry. A fresh cached value is
  /// served synchronously without ever entering `Loading`.
  ///
  /// With `fetch_on_create` set, the first fetch starts before this returns,
  /// so the constructor must run inside a tokio runtime.
  pub fn cached<S, F, Fut>(
    name: &'static str,
    layer: &CacheLayer<S>,
    options: QueryOptions,
    fetcher: F,
  ) -> Self
  where
    T: Serialize + DeserializeOwned,
    S: CacheStorage + 'static,
    F: Fn(&[String]) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Envelope<T>>> + Send + 'static,
  {
    let fetch_options = FetchOptions {
      enable_cache: options.enable_cache,
      ttl: options.ttl,
      force: false,
    };
    let probe_options = fetch_options.clone();
    let fetch_layer = layer.clone();
    let probe_layer = layer.clone();

    let mut query = Self {
      state: QueryState::Idle,
      data: None,
      fetcher: Box::new(move |params, force| {
        let key = FetcherKey::new(name, params);
        let layer = fetch_layer.clone();
        let mut opts = fetch_options.clone();
        opts.force = force;
        let future = fetcher(params);
        Box::pin(async move {
          layer
            .fetch(&key, &opts, || future)
            .await
            .map(|result| result.data)
            .map_err(|e| e.to_string())
        })
      }),
      params: Vec::new(),
      receiver: None,
      probe: Some(Box::new(move |params| {
        let key = FetcherKey::new(name, params);
        probe_layer.get_fresh(&key, &probe_options).ok().flatten()
      })),
      fetched_at: None,
    };

    if options.fetch_on_create {
      query.fetch();
    }
    query
  }

  /// Get the current state of the query.
  pub fn state(&self) -> &QueryState {
    &self.state
  }

  /// The last successfully fetched (or cache-served) value.
  pub fn data(&self) -> Option<&T> {
    self.data.as_ref()
  }

  pub fn is_loading(&self) -> bool {
    self.state.is_loading()
  }

  pub fn error(&self) -> Option<&str> {
    self.state.error()
  }

  /// The current parameter tuple.
  pub fn params(&self) -> &[String] {
    &self.params
  }

  /// When data last arrived, from cache or network.
  pub fn last_fetched(&self) -> Option<Instant> {
    self.fetched_at
  }

  /// Replace the parameter tuple, re-running the query if it changed.
  ///
  /// An unchanged tuple is a no-op. A changed tuple supersedes any in-flight
  /// fetch: its late result is discarded, never written over newer data.
  pub fn set_params(&mut self, params: Vec<String>) {
    if self.params == params {
      return;
    }
    self.params = params;
    self.receiver = None;
    self.state = QueryState::Idle;
    self.fetch();
  }

  /// Start fetching if not already loading.
  ///
  /// Consults the cache probe first: a fresh cached value transitions
  /// straight to `Success` with no network call.
  pub fn fetch(&mut self) {
    if self.state.is_loading() {
      return;
    }

    if let Some(probe) = &self.probe {
      if let Some(value) = probe(&self.params) {
        self.data = Some(value);
        self.state = QueryState::Success;
        self.fetched_at = Some(Instant::now());
        return;
      }
    }

    self.start_fetch(false);
  }

  /// Force a refetch: bypass the cache read, keep the cache write.
  pub fn refetch(&mut self) {
    self.start_fetch(true);
  }

  /// Poll for results from a pending fetch.
  ///
  /// Returns `true` if the state changed (data arrived or an error occurred).
  /// Call this in your event loop tick handler.
  pub fn poll(&mut self) -> bool {
    let receiver = match &mut self.receiver {
      Some(rx) => rx,
      None => return false,
    };

    match receiver.try_recv() {
      Ok(Ok(data)) => {
        self.data = Some(data);
        self.state = QueryState::Success;
        self.fetched_at = Some(Instant::now());
        self.receiver = None;
        true
      }
      Ok(Err(error)) => {
        // The error is surfaced; the last good value stays in place
        self.state = QueryState::Error(error);
        self.receiver = None;
        true
      }
      Err(mpsc::error::TryRecvError::Empty) => false,
      Err(mpsc::error::TryRecvError::Disconnected) => {
        self.state = QueryState::Error("query was cancelled".to_string());
        self.receiver = None;
        true
      }
    }
  }

  fn start_fetch(&mut self, force: bool) {
    let (tx, rx) = mpsc::unbounded_channel();
    // Replacing the receiver discards any in-flight result: a superseded
    // fetch's send fails silently, so stale data cannot clobber newer data
    self.receiver = Some(rx);
    self.state = QueryState::Loading;

    let future = (self.fetcher)(&self.params, force);
    tokio::spawn(async move {
      let result = future.await;
      // Ignore send errors - receiver may have been dropped
      let _ = tx.send(result);
    });
  }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Query<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Query")
      .field("state", &self.state)
      .field("params", &self.params)
      .field("fetched_at", &self.fetched_at)
      .finish_non_exhaustive()
  }
}

/// A factory producing fetch futures from the current parameter tuple
type ResilientFetcherFn<T> = Box<dyn Fn(&[String]) -> QueryFuture<T> + Send + Sync>;

/// Query that always has renderable data.
///
/// Constructed with a fallback value that `data()` serves from the first
/// render onward, so the consumer is never blank. A failed fetch resets
/// `data` to the fallback and records the cause; consumers are expected to
/// show a "sample data" notice whenever [`ResilientQuery::used_fallback`]
/// is true.
pub struct ResilientQuery<T> {
  state: QueryState,
  data: T,
  fallback: T,
  fetcher: ResilientFetcherFn<T>,
  params: Vec<String>,
  receiver: Option<mpsc::UnboundedReceiver<Result<T, String>>>,
  fetched_at: Option<Instant>,
}

impl<T: Clone + Send + 'static> ResilientQuery<T> {
  /// Create a resilient query from a fallback value and a fetcher closure.
  pub fn new<F, Fut>(fallback: T, fetcher: F) -> Self
  where
    F: Fn(&[String]) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Envelope<T>>> + Send + 'static,
  {
    Self {
      state: QueryState::Idle,
      data: fallback.clone(),
      fallback,
      fetcher: Box::new(move |params| {
        let future = fetcher(params);
        Box::pin(async move { future.await.map(|e| e.data).map_err(|e| e.to_string()) })
      }),
      params: Vec::new(),
      receiver: None,
      fetched_at: None,
    }
  }

  pub fn state(&self) -> &QueryState {
    &self.state
  }

  /// The value to render. Always present: server data after a successful
  /// fetch, the fallback otherwise.
  pub fn data(&self) -> &T {
    &self.data
  }

  /// Whether the value being served is the fallback rather than server data.
  pub fn used_fallback(&self) -> bool {
    self.state.used_fallback()
  }

  pub fn is_loading(&self) -> bool {
    self.state.is_loading()
  }

  pub fn error(&self) -> Option<&str> {
    self.state.error()
  }

  pub fn params(&self) -> &[String] {
    &self.params
  }

  /// When server data last arrived.
  pub fn last_fetched(&self) -> Option<Instant> {
    self.fetched_at
  }

  /// Replace the parameter tuple, re-running the query if it changed.
  pub fn set_params(&mut self, params: Vec<String>) {
    if self.params == params {
      return;
    }
    self.params = params;
    self.receiver = None;
    self.state = QueryState::Idle;
    self.fetch();
  }

  /// Start fetching if not already loading.
  pub fn fetch(&mut self) {
    if self.state.is_loading() {
      return;
    }
    self.start_fetch();
  }

  /// Re-run the fetch, superseding any in-flight one.
  pub fn refetch(&mut self) {
    self.start_fetch();
  }

  /// Poll for results from a pending fetch.
  ///
  /// Returns `true` if the state changed. On failure `data` is reset to the
  /// fallback value and the cause is kept for display.
  pub fn poll(&mut self) -> bool {
    let receiver = match &mut self.receiver {
      Some(rx) => rx,
      None => return false,
    };

    match receiver.try_recv() {
      Ok(Ok(data)) => {
        self.data = data;
        self.state = QueryState::Success;
        self.fetched_at = Some(Instant::now());
        self.receiver = None;
        true
      }
      Ok(Err(error)) => {
        warn!(error = %error, "fetch failed, serving fallback dataset");
        self.data = self.fallback.clone();
        self.state = QueryState::Fallback(error);
        self.receiver = None;
        true
      }
      Err(mpsc::error::TryRecvError::Empty) => false,
      Err(mpsc::error::TryRecvError::Disconnected) => {
        self.data = self.fallback.clone();
        self.state = QueryState::Fallback("query was cancelled".to_string());
        self.receiver = None;
        true
      }
    }
  }

  fn start_fetch(&mut self) {
    let (tx, rx) = mpsc::unbounded_channel();
    self.receiver = Some(rx);
    self.state = QueryState::Loading;

    let future = (self.fetcher)(&self.params);
    tokio::spawn(async move {
      let result = future.await;
      // Ignore send errors - receiver may have been dropped
      let _ = tx.send(result);
    });
  }
}

impl<T: std::fmt::Debug> std::fmt::Debug for ResilientQuery<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("ResilientQuery")
      .field("state", &self.state)
      .field("params", &self.params)
      .field("fetched_at", &self.fetched_at)
      .finish_non_exhaustive()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::MemoryStorage;
  use std::sync::atomic::{AtomicU32, Ordering};
  use std::sync::Arc;
  use std::time::Duration;

  fn counting_fetcher(
    calls: &Arc<AtomicU32>,
    value: u32,
  ) -> impl Fn(&[String]) -> futures::future::Ready<Result<Envelope<u32>>> + Send + Sync + 'static
  {
    let calls = calls.clone();
    move |_params: &[String]| {
      calls.fetch_add(1, Ordering::SeqCst);
      futures::future::ready(Ok(Envelope::new(value)))
    }
  }

  #[tokio::test]
  async fn test_query_success() {
    let mut query = Query::new(|_params: &[String]| async { Ok(Envelope::new(vec![1, 2, 3])) });

    assert_eq!(query.state(), &QueryState::Idle);

    query.fetch();
    assert!(query.is_loading());

    tokio::time::sleep(Duration::from_millis(10)).await;

    assert!(query.poll());
    assert!(query.state().is_success());
    assert_eq!(query.data(), Some(&vec![1, 2, 3]));
    assert!(query.last_fetched().is_some());
  }

  #[tokio::test]
  async fn test_query_error_keeps_previous_data() {
    let calls = Arc::new(AtomicU32::new(0));
    let calls_inner = calls.clone();

    // First call succeeds, later calls fail
    let mut query = Query::new(move |_params: &[String]| {
      let n = calls_inner.fetch_add(1, Ordering::SeqCst);
      async move {
        if n == 0 {
          Ok(Envelope::new(42))
        } else {
          Err(color_eyre::eyre::eyre!("connection refused"))
        }
      }
    });

    query.fetch();
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(query.poll());
    assert_eq!(query.data(), Some(&42));

    query.refetch();
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(query.poll());

    assert!(query.error().unwrap().contains("connection refused"));
    // The failed fetch did not blank the previously rendered value
    assert_eq!(query.data(), Some(&42));
  }

  #[tokio::test]
  async fn test_fetch_while_loading_is_noop() {
    let calls = Arc::new(AtomicU32::new(0));
    let calls_inner = calls.clone();
    let mut query = Query::new(move |_params: &[String]| {
      calls_inner.fetch_add(1, Ordering::SeqCst);
      async {
        tokio::time::sleep(Duration::from_millis(100)).await;
        Ok(Envelope::new(1))
      }
    });

    query.fetch();
    query.fetch();

    assert!(query.is_loading());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn test_unchanged_params_do_not_refetch() {
    let calls = Arc::new(AtomicU32::new(0));
    let mut query = Query::new(counting_fetcher(&calls, 1));

    query.set_params(vec!["week".into()]);
    tokio::time::sleep(Duration::from_millis(10)).await;
    query.poll();

    query.set_params(vec!["week".into()]);
    tokio::time::sleep(Duration::from_millis(10)).await;
    query.poll();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn test_changed_params_refetch() {
    let calls = Arc::new(AtomicU32::new(0));
    let mut query = Query::new(counting_fetcher(&calls, 1));

    query.set_params(vec!["week".into()]);
    tokio::time::sleep(Duration::from_millis(10)).await;
    query.poll();

    query.set_params(vec!["month".into()]);
    tokio::time::sleep(Duration::from_millis(10)).await;
    query.poll();

    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(query.params().to_vec(), vec!["month".to_string()]);
  }

  #[tokio::test]
  async fn test_superseded_fetch_does_not_clobber() {
    // A slow fetch for old parameters must not overwrite the result of a
    // newer fetch that resolved first.
    let mut query = Query::new(|params: &[String]| {
      let slow = params[0] == "slow";
      async move {
        if slow {
          tokio::time::sleep(Duration::from_millis(80)).await;
          Ok(Envelope::new(1))
        } else {
          tokio::time::sleep(Duration::from_millis(10)).await;
          Ok(Envelope::new(2))
        }
      }
    });

    query.set_params(vec!["slow".into()]);
    query.set_params(vec!["fast".into()]);

    tokio::time::sleep(Duration::from_millis(120)).await;
    assert!(query.poll());
    assert_eq!(query.data(), Some(&2));

    // The slow result has long since resolved; it must not surface
    assert!(!query.poll());
    assert_eq!(query.data(), Some(&2));
  }

  #[tokio::test]
  async fn test_cached_query_fetches_once_within_ttl() {
    let layer = CacheLayer::new(MemoryStorage::new());
    let calls = Arc::new(AtomicU32::new(0));
    let options = QueryOptions {
      fetch_on_create: false,
      ..QueryOptions::default()
    };

    let mut first = Query::cached("revenue", &layer, options.clone(), counting_fetcher(&calls, 7));
    first.fetch();
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(first.poll());
    assert_eq!(first.data(), Some(&7));

    // Same identity + params, fresh cache: served synchronously, no Loading
    let mut second = Query::cached("revenue", &layer, options, counting_fetcher(&calls, 7));
    second.fetch();
    assert!(second.state().is_success());
    assert_eq!(second.data(), Some(&7));

    assert_eq!(calls.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn test_cached_query_refetches_after_ttl() {
    let layer = CacheLayer::new(MemoryStorage::new());
    let calls = Arc::new(AtomicU32::new(0));
    let options = QueryOptions {
      ttl: chrono::Duration::milliseconds(20),
      fetch_on_create: false,
      ..QueryOptions::default()
    };

    let mut query = Query::cached("orders", &layer, options, counting_fetcher(&calls, 3));

    query.fetch();
    tokio::time::sleep(Duration::from_millis(10)).await;
    query.poll();

    tokio::time::sleep(Duration::from_millis(40)).await;

    query.fetch();
    tokio::time::sleep(Duration::from_millis(10)).await;
    query.poll();

    assert_eq!(calls.load(Ordering::SeqCst), 2);
  }

  #[tokio::test]
  async fn test_cached_query_force_refetch_updates_cache() {
    let layer = CacheLayer::new(MemoryStorage::new());
    let calls = Arc::new(AtomicU32::new(0));
    let options = QueryOptions {
      fetch_on_create: false,
      ..QueryOptions::default()
    };

    let mut query = Query::cached("traffic", &layer, options.clone(), counting_fetcher(&calls, 5));
    query.fetch();
    tokio::time::sleep(Duration::from_millis(10)).await;
    query.poll();

    query.refetch();
    tokio::time::sleep(Duration::from_millis(10)).await;
    query.poll();

    // Force bypassed the fresh entry and hit the network again
    assert_eq!(calls.load(Ordering::SeqCst), 2);
  }

  #[tokio::test]
  async fn test_fetch_on_create_starts_loading() {
    let layer = CacheLayer::new(MemoryStorage::new());
    let calls = Arc::new(AtomicU32::new(0));

    let query = Query::cached(
      "customers",
      &layer,
      QueryOptions::default(),
      counting_fetcher(&calls, 1),
    );

    assert!(query.is_loading());
  }

  #[tokio::test]
  async fn test_resilient_initial_data_is_fallback() {
    let query = ResilientQuery::new(vec![1, 2], |_params: &[String]| async {
      Ok(Envelope::new(vec![3, 4]))
    });

    // Renderable before any fetch resolves
    assert_eq!(query.data(), &vec![1, 2]);
    assert_eq!(query.state(), &QueryState::Idle);
    assert!(!query.used_fallback());
  }

  #[tokio::test]
  async fn test_resilient_success_replaces_fallback() {
    let mut query =
      ResilientQuery::new(vec![1], |_params: &[String]| async { Ok(Envelope::new(vec![9])) });

    query.fetch();
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(query.poll());

    assert_eq!(query.data(), &vec![9]);
    assert!(!query.used_fallback());
    assert!(query.error().is_none());
  }

  #[tokio::test]
  async fn test_resilient_failure_serves_fallback() {
    let mut query = ResilientQuery::new(vec![1], |_params: &[String]| async {
      Err::<Envelope<Vec<u32>>, _>(color_eyre::eyre::eyre!("503 service unavailable"))
    });

    query.fetch();
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(query.poll());

    assert_eq!(query.data(), &vec![1]);
    assert!(query.used_fallback());
    assert!(query.error().unwrap().contains("503"));
  }

  #[tokio::test]
  async fn test_resilient_recovers_after_failure() {
    let calls = Arc::new(AtomicU32::new(0));
    let calls_inner = calls.clone();
    let mut query = ResilientQuery::new(0u32, move |_params: &[String]| {
      let n = calls_inner.fetch_add(1, Ordering::SeqCst);
      async move {
        if n == 0 {
          Err(color_eyre::eyre::eyre!("connection reset"))
        } else {
          Ok(Envelope::new(10))
        }
      }
    });

    query.fetch();
    tokio::time::sleep(Duration::from_millis(10)).await;
    query.poll();
    assert!(query.used_fallback());

    query.refetch();
    tokio::time::sleep(Duration::from_millis(10)).await;
    query.poll();

    assert_eq!(query.data(), &10);
    assert!(!query.used_fallback());
  }
}
