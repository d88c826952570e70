//! Typed dashboard payloads exchanged with the analytics backend.
//!
//! Field names are camelCase on the wire, matching the REST endpoints these
//! payloads come from.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Reporting window for trend endpoints.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Timeframe {
  Week,
  #[default]
  Month,
  Year,
}

impl Timeframe {
  /// Length of the reporting window in days.
  pub fn as_days(&self) -> u32 {
    match self {
      Timeframe::Week => 7,
      Timeframe::Month => 30,
      Timeframe::Year => 365,
    }
  }
}

impl fmt::Display for Timeframe {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      Timeframe::Week => "week",
      Timeframe::Month => "month",
      Timeframe::Year => "year",
    };
    write!(f, "{}", name)
  }
}

/// Inclusive date range filter for an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRange {
  pub start: NaiveDate,
  pub end: NaiveDate,
}

/// One point of a dated trend series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
  pub date: NaiveDate,
  pub value: f64,
}

/// Revenue totals and trend for a timeframe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevenueAnalytics {
  pub current: f64,
  pub previous: f64,
  /// Growth over the previous period, percent
  pub growth: f64,
  pub trend: Vec<TrendPoint>,
}

/// A named share of the customer base.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerSegment {
  pub name: String,
  pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerAnalytics {
  pub current: u64,
  pub previous: u64,
  pub new_users: u64,
  pub active_users: u64,
  pub returning: u64,
  /// Retention rate, percent
  pub retention: f64,
  pub growth: f64,
  pub trend: Vec<TrendPoint>,
  pub segments: Vec<CustomerSegment>,
}

/// A product row in the top-selling table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopProduct {
  pub name: String,
  pub units: u64,
  pub sales: f64,
  /// Growth percent; the backend stringifies this field
  pub growth: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorySales {
  pub name: String,
  pub sales: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductAnalytics {
  pub total: u64,
  pub top_selling: Vec<TopProduct>,
  pub categories: Vec<CategorySales>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderAnalytics {
  pub current: u64,
  pub previous: u64,
  pub completed: u64,
  pub pending: u64,
  pub cancelled: u64,
  pub awaiting_payment: u64,
  pub total_value: f64,
  pub average_value: f64,
  pub growth: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrafficSource {
  pub name: String,
  pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrafficAnalytics {
  pub page_views: u64,
  pub unique_visitors: u64,
  /// Bounce rate, percent
  pub bounce_rate: f64,
  /// Average session duration in seconds
  pub avg_session_duration: u64,
  pub new_visitors: u64,
  pub returning_visitors: u64,
  pub sources: Vec<TrafficSource>,
}

/// Live storefront metrics, polled on a short interval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RealtimeMetrics {
  pub today_revenue: f64,
  pub revenue_growth: f64,
  pub new_orders_today: u64,
  pub average_order_value: f64,
  pub active_sessions: u64,
  /// Conversion rate, percent
  pub conversion_rate: f64,
  pub low_stock_alerts: u64,
}
