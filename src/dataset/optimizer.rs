//! Downsampling/aggregation of ordered datasets to a point budget.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{Dataset, Record};

/// How numeric fields are fused when a window of records collapses into one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregationMode {
  /// Arithmetic sum across the window
  Sum,
  /// Arithmetic mean across the window
  Average,
}

/// Reduce `data` to at most `max_points` records.
///
/// Data that already fits is returned unchanged, same allocation. Otherwise
/// the records are walked in contiguous windows of `ceil(len / max_points)`
/// and each window fuses into one record: numeric fields aggregate per
/// `mode`, non-numeric fields keep the first record's value or take a
/// `"{first} - {last}"` range label when the window spans more than one
/// record with differing values.
///
/// For `AggregationMode::Sum` the aggregate total of every numeric field is
/// preserved exactly; integer fields stay integers.
pub fn optimize_dataset(data: Dataset, max_points: usize, mode: AggregationMode) -> Dataset {
  // A zero budget degrades to one whole-input window
  let max_points = max_points.max(1);

  if data.len() <= max_points {
    return data;
  }

  let window = data.len().div_ceil(max_points);
  data
    .chunks(window)
    .map(|chunk| aggregate_window(chunk, mode))
    .collect()
}

fn aggregate_window(window: &[Record], mode: AggregationMode) -> Record {
  let mut aggregated = Record::new();

  // Field set and numericness follow the window's first record; within one
  // dataset field types are stable across records
  for (field, value) in &window[0] {
    let fused = match value {
      Value::Number(_) => aggregate_numeric(window, field, mode),
      other => range_label(window, field, other),
    };
    aggregated.insert(field.clone(), fused);
  }

  aggregated
}

fn aggregate_numeric(window: &[Record], field: &str, mode: AggregationMode) -> Value {
  if mode == AggregationMode::Sum {
    // Keep integer sums integral
    let ints: Option<Vec<i64>> = window
      .iter()
      .map(|record| record.get(field).and_then(Value::as_i64))
      .collect();
    if let Some(ints) = ints {
      return Value::from(ints.iter().sum::<i64>());
    }
  }

  let total: f64 = window
    .iter()
    .filter_map(|record| record.get(field).and_then(Value::as_f64))
    .sum();
  let result = match mode {
    AggregationMode::Sum => total,
    AggregationMode::Average => total / window.len() as f64,
  };

  serde_json::Number::from_f64(result)
    .map(Value::Number)
    .unwrap_or(Value::Null)
}

fn range_label(window: &[Record], field: &str, first: &Value) -> Value {
  if window.len() > 1 {
    if let Some(last) = window[window.len() - 1].get(field) {
      if last != first {
        return Value::String(format!("{} - {}", scalar_label(first), scalar_label(last)));
      }
    }
  }
  first.clone()
}

/// Render a scalar for a range label without JSON quoting.
fn scalar_label(value: &Value) -> String {
  match value {
    Value::String(s) => s.clone(),
    other => other.to_string(),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  fn record(value: Value) -> Record {
    match value {
      Value::Object(record) => record,
      _ => unreachable!(),
    }
  }

  fn week_data() -> Dataset {
    vec![
      record(json!({"day": "Mon", "v": 10})),
      record(json!({"day": "Tue", "v": 20})),
      record(json!({"day": "Wed", "v": 30})),
      record(json!({"day": "Thu", "v": 40})),
    ]
  }

  #[test]
  fn test_empty_input() {
    assert!(optimize_dataset(Vec::new(), 10, AggregationMode::Sum).is_empty());
  }

  #[test]
  fn test_small_input_passes_through_unchanged() {
    let data = week_data();
    let result = optimize_dataset(data.clone(), 4, AggregationMode::Sum);
    assert_eq!(result, data);

    let result = optimize_dataset(data.clone(), 100, AggregationMode::Average);
    assert_eq!(result, data);
  }

  #[test]
  fn test_sum_aggregation_with_range_labels() {
    let result = optimize_dataset(week_data(), 2, AggregationMode::Sum);

    assert_eq!(result.len(), 2);
    assert_eq!(
      Value::Object(result[0].clone()),
      json!({"day": "Mon - Tue", "v": 30})
    );
    assert_eq!(
      Value::Object(result[1].clone()),
      json!({"day": "Wed - Thu", "v": 70})
    );
  }

  #[test]
  fn test_average_aggregation() {
    let result = optimize_dataset(week_data(), 2, AggregationMode::Average);

    assert_eq!(result[0].get("v").and_then(Value::as_f64), Some(15.0));
    assert_eq!(result[1].get("v").and_then(Value::as_f64), Some(35.0));
  }

  #[test]
  fn test_output_length_bound() {
    let data: Dataset = (0..10)
      .map(|i| record(json!({"label": format!("p{}", i), "v": i})))
      .collect();

    for max_points in 1..=10 {
      let result = optimize_dataset(data.clone(), max_points, AggregationMode::Sum);
      assert!(result.len() <= max_points);
    }
  }

  #[test]
  fn test_sum_is_preserved() {
    let data: Dataset = (1..=10).map(|i| record(json!({"v": i}))).collect();
    let original: i64 = (1..=10).sum();

    for max_points in 1..=10 {
      let result = optimize_dataset(data.clone(), max_points, AggregationMode::Sum);
      let total: i64 = result
        .iter()
        .filter_map(|r| r.get("v").and_then(Value::as_i64))
        .sum();
      assert_eq!(total, original, "max_points = {}", max_points);
    }
  }

  #[test]
  fn test_float_sum_preserved_within_tolerance() {
    let data: Dataset = (1..=9).map(|i| record(json!({"v": i as f64 * 0.1}))).collect();
    let original: f64 = (1..=9).map(|i| i as f64 * 0.1).sum();

    let result = optimize_dataset(data, 4, AggregationMode::Sum);
    let total: f64 = result
      .iter()
      .filter_map(|r| r.get("v").and_then(Value::as_f64))
      .sum();
    assert!((total - original).abs() < 1e-9);
  }

  #[test]
  fn test_trailing_window_of_one() {
    let data: Dataset = vec![
      record(json!({"day": "Mon", "v": 1})),
      record(json!({"day": "Tue", "v": 2})),
      record(json!({"day": "Wed", "v": 3})),
    ];

    // Window size 2: [Mon, Tue] then [Wed] alone
    let result = optimize_dataset(data, 2, AggregationMode::Sum);
    assert_eq!(result.len(), 2);
    assert_eq!(result[1].get("day"), Some(&json!("Wed")));
    assert_eq!(result[1].get("v"), Some(&json!(3)));
  }

  #[test]
  fn test_equal_labels_keep_first_value() {
    let data: Dataset = vec![
      record(json!({"region": "north", "v": 1})),
      record(json!({"region": "north", "v": 2})),
    ];

    let result = optimize_dataset(data, 1, AggregationMode::Sum);
    assert_eq!(result[0].get("region"), Some(&json!("north")));
  }

  #[test]
  fn test_zero_budget_collapses_to_single_record() {
    let result = optimize_dataset(week_data(), 0, AggregationMode::Sum);
    assert_eq!(result.len(), 1);
    assert_eq!(result[0].get("v"), Some(&json!(100)));
    assert_eq!(result[0].get("day"), Some(&json!("Mon - Thu")));
  }

  #[test]
  fn test_single_element_window_averages_to_itself() {
    let data: Dataset = vec![
      record(json!({"v": 10})),
      record(json!({"v": 20})),
      record(json!({"v": 99})),
    ];

    // Window size 2: [10, 20] then [99] alone; a one-element mean is the element
    let result = optimize_dataset(data, 2, AggregationMode::Average);
    assert_eq!(result[1].get("v").and_then(Value::as_f64), Some(99.0));
  }
}
