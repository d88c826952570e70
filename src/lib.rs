//! Data resilience layer for storefront analytics dashboards.
//!
//! Dashboards must keep rendering when the backend is slow, flaky, or down.
//! This crate provides the pieces that make that possible, transport and
//! rendering excluded:
//!
//! - [`cache`]: a TTL-checked request cache keyed by fetcher identity plus
//!   parameters, so one logical query hits the network at most once per
//!   freshness window
//! - [`query`]: an explicit fetch state machine ([`query::Query`]) and a
//!   never-blank variant ([`query::ResilientQuery`]) that substitutes a
//!   caller-supplied fallback on failure while surfacing the real error
//! - [`dataset`]: total transformations for chart data - downsampling that
//!   preserves sums and means, summary statistics, CSV field projection,
//!   and data-driven color scales
//! - [`analytics`]: the storefront dashboard endpoints built from the above,
//!   with deterministic sample datasets as fallbacks
//! - [`config`]: YAML configuration for TTLs, point budgets, and palettes
//!
//! Fetchers are zero-argument closures returning a response envelope; HTTP,
//! routing, and chart rendering live with external collaborators.

pub mod analytics;
pub mod cache;
pub mod config;
pub mod dataset;
pub mod query;

pub use analytics::{AnalyticsService, ResilientResult};
pub use cache::{CacheLayer, Envelope, FetchOptions, MemoryStorage};
pub use config::Config;
pub use dataset::{
  calculate_statistics, optimize_dataset, project_for_export, AggregationMode, ColorScale,
};
pub use query::{Query, QueryOptions, QueryState, ResilientQuery};
