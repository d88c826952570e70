//! Storefront analytics domain: typed payloads, cache keys, sample
//! fallbacks, and the cached endpoint service the admin dashboard consumes.

mod keys;
pub mod samples;
mod service;
mod types;

pub use keys::AnalyticsQuery;
pub use service::{AnalyticsService, ResilientResult};
pub use types::{
  CategorySales, CustomerAnalytics, CustomerSegment, DateRange, OrderAnalytics, ProductAnalytics,
  RealtimeMetrics, RevenueAnalytics, Timeframe, TopProduct, TrafficAnalytics, TrafficSource,
  TrendPoint,
};
