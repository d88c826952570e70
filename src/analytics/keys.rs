//! Cache keys for analytics queries.

use crate::cache::{hash_key, QueryKey};

use super::types::{DateRange, Timeframe};

/// Query key types for the analytics endpoints.
///
/// Equal variants with equal parameters always map to the same cache entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AnalyticsQuery {
  /// Revenue totals and trend
  Revenue {
    timeframe: Timeframe,
    range: Option<DateRange>,
  },
  /// Customer base breakdown over a span of days
  Customers {
    timespan_days: u32,
    range: Option<DateRange>,
  },
  /// Top selling products and category sales
  Products {
    limit: u32,
    range: Option<DateRange>,
  },
  /// Order counts and values
  Orders {
    timeframe: Timeframe,
    range: Option<DateRange>,
  },
  /// Site traffic over a span of days
  Traffic {
    timespan_days: u32,
    range: Option<DateRange>,
  },
}

impl AnalyticsQuery {
  fn key_input(&self) -> String {
    match self {
      Self::Revenue { timeframe, range } => {
        format!("revenue:{}:{}", timeframe, range_part(range))
      }
      Self::Customers {
        timespan_days,
        range,
      } => format!("customers:{}:{}", timespan_days, range_part(range)),
      Self::Products { limit, range } => format!("products:{}:{}", limit, range_part(range)),
      Self::Orders { timeframe, range } => format!("orders:{}:{}", timeframe, range_part(range)),
      Self::Traffic {
        timespan_days,
        range,
      } => format!("traffic:{}:{}", timespan_days, range_part(range)),
    }
  }
}

fn range_part(range: &Option<DateRange>) -> String {
  range
    .map(|r| format!("{}..{}", r.start, r.end))
    .unwrap_or_default()
}

impl QueryKey for AnalyticsQuery {
  fn cache_hash(&self) -> String {
    // SHA256 hash for stable, fixed-length keys
    hash_key(&self.key_input())
  }

  fn description(&self) -> String {
    match self {
      Self::Revenue { timeframe, .. } => format!("revenue analytics ({})", timeframe),
      Self::Customers { timespan_days, .. } => {
        format!("customer analytics ({} days)", timespan_days)
      }
      Self::Products { limit, .. } => format!("top {} products", limit),
      Self::Orders { timeframe, .. } => format!("order analytics ({})", timeframe),
      Self::Traffic { timespan_days, .. } => format!("traffic analytics ({} days)", timespan_days),
    }
  }
}
