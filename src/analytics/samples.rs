//! Fixed representative datasets served when the backend is unreachable.
//!
//! Values are deterministic so a fallback render is reproducible between
//! refreshes. Consumers show these under a "sample data" notice, never as
//! real figures.

use chrono::{Duration, Utc};

use super::types::{
  CategorySales, CustomerAnalytics, CustomerSegment, OrderAnalytics, ProductAnalytics,
  RealtimeMetrics, RevenueAnalytics, Timeframe, TopProduct, TrafficAnalytics, TrafficSource,
  TrendPoint,
};

/// Stand-in trend series: `total` spread over the timeframe's days, dated
/// back from today, with a fixed weekly variation pattern instead of the
/// live series' noise.
pub fn trend(timeframe: Timeframe, total: f64) -> Vec<TrendPoint> {
  let days = timeframe.as_days() as i64;
  let daily_average = total / days as f64;
  let today = Utc::now().date_naive();

  (0..days)
    .map(|i| {
      // cycles through 0.7..=1.3 of the daily average
      let variation = 0.7 + 0.6 * ((i % 7) as f64 / 6.0);
      TrendPoint {
        date: today - Duration::days(days - 1 - i),
        value: (daily_average * variation).floor().max(0.0),
      }
    })
    .collect()
}

pub fn revenue(timeframe: Timeframe) -> RevenueAnalytics {
  let current: f64 = match timeframe {
    Timeframe::Week => 5_750_000.0,
    Timeframe::Month => 28_750_000.0,
    Timeframe::Year => 138_000_000.0,
  };
  let previous = (current * 0.85).floor();

  RevenueAnalytics {
    current,
    previous,
    growth: growth_rate(current, previous),
    trend: trend(timeframe, current),
  }
}

pub fn customers() -> CustomerAnalytics {
  let current = 500;
  let previous = 425;

  CustomerAnalytics {
    current,
    previous,
    new_users: 32,
    active_users: 135,
    returning: 97,
    retention: 72.5,
    growth: growth_rate(current as f64, previous as f64),
    trend: trend(Timeframe::Month, current as f64),
    segments: vec![
      segment("New customers", 25.0),
      segment("Returning customers", 50.0),
      segment("VIP customers", 30.0),
      segment("Inactive", 10.0),
    ],
  }
}

pub fn products() -> ProductAnalytics {
  ProductAnalytics {
    total: 175,
    top_selling: vec![
      product("Organic brown rice", 145, 3_000_000.0, "16.0"),
      product("Chilean walnuts", 95, 2_200_000.0, "11.0"),
      product("Mexican chia seeds", 72, 1_500_000.0, "20.0"),
      product("Australian rolled oats", 107, 1_950_000.0, "8.5"),
      product("California almonds", 82, 1_700_000.0, "14.0"),
    ],
    categories: vec![
      category("Rice & grains", 9_000_000.0),
      category("Nutritional nuts", 6_750_000.0),
      category("Superfoods", 4_500_000.0),
      category("Organic foods", 5_600_000.0),
    ],
  }
}

pub fn orders() -> OrderAnalytics {
  let current = 205;
  let previous = 184;
  let completed = 174;
  let pending = 24;

  OrderAnalytics {
    current,
    previous,
    completed,
    pending,
    cancelled: current - completed - pending,
    awaiting_payment: 6,
    total_value: 30_000_000.0,
    average_value: 170_000.0,
    growth: growth_rate(current as f64, previous as f64),
  }
}

pub fn traffic() -> TrafficAnalytics {
  TrafficAnalytics {
    page_views: 6_000,
    unique_visitors: 1_400,
    bounce_rate: 42.5,
    avg_session_duration: 240,
    new_visitors: 475,
    returning_visitors: 925,
    sources: vec![
      source("Direct search", 45.0),
      source("Social media", 30.0),
      source("Email marketing", 19.0),
      source("Paid ads", 15.0),
      source("Other", 10.0),
    ],
  }
}

pub fn realtime() -> RealtimeMetrics {
  RealtimeMetrics {
    today_revenue: 1_250_000.0,
    revenue_growth: 6.1,
    new_orders_today: 23,
    average_order_value: 165_000.0,
    active_sessions: 42,
    conversion_rate: 3.4,
    low_stock_alerts: 5,
  }
}

/// Growth over the previous period, percent, one decimal.
fn growth_rate(current: f64, previous: f64) -> f64 {
  if previous > 0.0 {
    ((current - previous) / previous * 1000.0).round() / 10.0
  } else {
    0.0
  }
}

fn segment(name: &str, value: f64) -> CustomerSegment {
  CustomerSegment {
    name: name.to_string(),
    value,
  }
}

fn product(name: &str, units: u64, sales: f64, growth: &str) -> TopProduct {
  TopProduct {
    name: name.to_string(),
    units,
    sales,
    growth: growth.to_string(),
  }
}

fn category(name: &str, sales: f64) -> CategorySales {
  CategorySales {
    name: name.to_string(),
    sales,
  }
}

fn source(name: &str, value: f64) -> TrafficSource {
  TrafficSource {
    name: name.to_string(),
    value,
  }
}
