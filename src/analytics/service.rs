//! Cached analytics endpoints with sample-data fallbacks.

use color_eyre::Result;
use serde::{de::DeserializeOwned, Serialize};
use std::future::Future;
use tracing::warn;

use crate::cache::{CacheLayer, CacheStorage, Envelope, FetchOptions, QueryKey};

use super::keys::AnalyticsQuery;
use super::samples;
use super::types::{
  CustomerAnalytics, DateRange, OrderAnalytics, ProductAnalytics, RealtimeMetrics,
  RevenueAnalytics, Timeframe, TrafficAnalytics,
};

/// Outcome of a resilient fetch: always renderable data, with provenance.
///
/// When `used_fallback` is true the data is a representative sample and the
/// consumer is expected to render a visible "showing sample data" notice;
/// `error` then carries the real cause.
#[derive(Debug, Clone)]
pub struct ResilientResult<T> {
  pub data: T,
  pub used_fallback: bool,
  pub error: Option<String>,
}

/// Analytics endpoints with transparent caching.
///
/// Wraps a cache layer and exposes the per-endpoint API the dashboard
/// consumes. The transport is supplied per call as a fetcher closure, so
/// this service never owns an HTTP client.
pub struct AnalyticsService<S: CacheStorage> {
  cache: CacheLayer<S>,
  options: FetchOptions,
}

impl<S: CacheStorage> AnalyticsService<S> {
  pub fn new(storage: S) -> Self {
    Self {
      cache: CacheLayer::new(storage),
      options: FetchOptions::default(),
    }
  }

  /// Override the default caching options.
  pub fn with_options(mut self, options: FetchOptions) -> Self {
    self.options = options;
    self
  }

  /// Revenue analytics for a timeframe, cache-first.
  pub async fn revenue<F, Fut>(
    &self,
    timeframe: Timeframe,
    range: Option<DateRange>,
    fetcher: F,
  ) -> Result<RevenueAnalytics>
  where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<Envelope<RevenueAnalytics>>>,
  {
    let key = AnalyticsQuery::Revenue { timeframe, range };
    Ok(self.cache.fetch(&key, &self.options, fetcher).await?.data)
  }

  /// Revenue analytics that always renders: on failure the sample dataset
  /// is substituted and the cause surfaced.
  pub async fn revenue_or_sample<F, Fut>(
    &self,
    timeframe: Timeframe,
    range: Option<DateRange>,
    fetcher: F,
  ) -> ResilientResult<RevenueAnalytics>
  where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<Envelope<RevenueAnalytics>>>,
  {
    let key = AnalyticsQuery::Revenue { timeframe, range };
    self
      .fetch_or_sample(&key, samples::revenue(timeframe), fetcher)
      .await
  }

  /// Customer analytics over a span of days, cache-first.
  pub async fn customers<F, Fut>(
    &self,
    timespan_days: u32,
    range: Option<DateRange>,
    fetcher: F,
  ) -> Result<CustomerAnalytics>
  where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<Envelope<CustomerAnalytics>>>,
  {
    let key = AnalyticsQuery::Customers {
      timespan_days,
      range,
    };
    Ok(self.cache.fetch(&key, &self.options, fetcher).await?.data)
  }

  pub async fn customers_or_sample<F, Fut>(
    &self,
    timespan_days: u32,
    range: Option<DateRange>,
    fetcher: F,
  ) -> ResilientResult<CustomerAnalytics>
  where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<Envelope<CustomerAnalytics>>>,
  {
    let key = AnalyticsQuery::Customers {
      timespan_days,
      range,
    };
    self
      .fetch_or_sample(&key, samples::customers(), fetcher)
      .await
  }

  /// Top selling products and category sales, cache-first.
  pub async fn products<F, Fut>(
    &self,
    limit: u32,
    range: Option<DateRange>,
    fetcher: F,
  ) -> Result<ProductAnalytics>
  where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<Envelope<ProductAnalytics>>>,
  {
    let key = AnalyticsQuery::Products { limit, range };
    Ok(self.cache.fetch(&key, &self.options, fetcher).await?.data)
  }

  pub async fn products_or_sample<F, Fut>(
    &self,
    limit: u32,
    range: Option<DateRange>,
    fetcher: F,
  ) -> ResilientResult<ProductAnalytics>
  where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<Envelope<ProductAnalytics>>>,
  {
    let key = AnalyticsQuery::Products { limit, range };
    self
      .fetch_or_sample(&key, samples::products(), fetcher)
      .await
  }

  /// Order counts and values for a timeframe, cache-first.
  pub async fn orders<F, Fut>(
    &self,
    timeframe: Timeframe,
    range: Option<DateRange>,
    fetcher: F,
  ) -> Result<OrderAnalytics>
  where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<Envelope<OrderAnalytics>>>,
  {
    let key = AnalyticsQuery::Orders { timeframe, range };
    Ok(self.cache.fetch(&key, &self.options, fetcher).await?.data)
  }

  pub async fn orders_or_sample<F, Fut>(
    &self,
    timeframe: Timeframe,
    range: Option<DateRange>,
    fetcher: F,
  ) -> ResilientResult<OrderAnalytics>
  where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<Envelope<OrderAnalytics>>>,
  {
    let key = AnalyticsQuery::Orders { timeframe, range };
    self.fetch_or_sample(&key, samples::orders(), fetcher).await
  }

  /// Site traffic over a span of days, cache-first.
  pub async fn traffic<F, Fut>(
    &self,
    timespan_days: u32,
    range: Option<DateRange>,
    fetcher: F,
  ) -> Result<TrafficAnalytics>
  where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<Envelope<TrafficAnalytics>>>,
  {
    let key = AnalyticsQuery::Traffic {
      timespan_days,
      range,
    };
    Ok(self.cache.fetch(&key, &self.options, fetcher).await?.data)
  }

  pub async fn traffic_or_sample<F, Fut>(
    &self,
    timespan_days: u32,
    range: Option<DateRange>,
    fetcher: F,
  ) -> ResilientResult<TrafficAnalytics>
  where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<Envelope<TrafficAnalytics>>>,
  {
    let key = AnalyticsQuery::Traffic {
      timespan_days,
      range,
    };
    self
      .fetch_or_sample(&key, samples::traffic(), fetcher)
      .await
  }

  /// Live metrics (not cached - they change every few seconds and are
  /// polled on a short interval).
  pub async fn realtime_metrics<F, Fut>(&self, fetcher: F) -> Result<RealtimeMetrics>
  where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<Envelope<RealtimeMetrics>>>,
  {
    Ok(fetcher().await?.data)
  }

  /// Live metrics that always render, substituting the sample metrics when
  /// the backend is down.
  pub async fn realtime_metrics_or_sample<F, Fut>(&self, fetcher: F) -> ResilientResult<RealtimeMetrics>
  where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<Envelope<RealtimeMetrics>>>,
  {
    match self.realtime_metrics(fetcher).await {
      Ok(data) => ResilientResult {
        data,
        used_fallback: false,
        error: None,
      },
      Err(error) => {
        warn!(error = %error, "realtime metrics fetch failed, serving sample data");
        ResilientResult {
          data: samples::realtime(),
          used_fallback: true,
          error: Some(error.to_string()),
        }
      }
    }
  }

  /// Drop the cached entry for one query, forcing the next call to refetch.
  pub fn invalidate(&self, query: &AnalyticsQuery) -> Result<()> {
    self.cache.invalidate(query)
  }

  /// Drop every cached analytics entry.
  pub fn clear_cache(&self) -> Result<()> {
    self.cache.clear()
  }

  async fn fetch_or_sample<T, F, Fut>(
    &self,
    key: &AnalyticsQuery,
    sample: T,
    fetcher: F,
  ) -> ResilientResult<T>
  where
    T: Serialize + DeserializeOwned,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<Envelope<T>>>,
  {
    match self.cache.fetch(key, &self.options, fetcher).await {
      Ok(result) => ResilientResult {
        data: result.data,
        used_fallback: false,
        error: None,
      },
      Err(error) => {
        warn!(query = %key.description(), error = %error, "analytics fetch failed, serving sample data");
        ResilientResult {
          data: sample,
          used_fallback: true,
          error: Some(error.to_string()),
        }
      }
    }
  }
}

impl<S: CacheStorage> Clone for AnalyticsService<S> {
  fn clone(&self) -> Self {
    Self {
      cache: self.cache.clone(),
      options: self.options.clone(),
    }
  }
}
