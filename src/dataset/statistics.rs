//! Summary statistics over a numeric dataset field.

use serde::Serialize;

use super::{field_number, Record};

/// Summary statistics for one field.
///
/// All zeros when the field has no numeric values - degenerate input is a
/// neutral result, never an error.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct FieldStatistics {
  pub min: f64,
  pub max: f64,
  pub sum: f64,
  pub average: f64,
  pub median: f64,
}

/// Compute min/max/sum/average/median of `field` across `data`.
///
/// Values coerce the way chart code reads them (numbers and numeric strings);
/// anything else is dropped before computing. With an even survivor count the
/// median averages the two central elements.
pub fn calculate_statistics(data: &[Record], field: &str) -> FieldStatistics {
  let mut values: Vec<f64> = data
    .iter()
    .filter_map(|record| field_number(record, field))
    .collect();

  if values.is_empty() {
    return FieldStatistics::default();
  }

  values.sort_by(|a, b| a.total_cmp(b));

  let count = values.len();
  let sum: f64 = values.iter().sum();
  let median = if count % 2 == 0 {
    (values[count / 2 - 1] + values[count / 2]) / 2.0
  } else {
    values[count / 2]
  };

  FieldStatistics {
    min: values[0],
    max: values[count - 1],
    sum,
    average: sum / count as f64,
    median,
  }
}
