//! Pure transformations over chart-bound datasets.
//!
//! A dataset is an ordered sequence of records; each record maps field names
//! to JSON values. Within one dataset, field arity and types are stable
//! across records (the transforms assume this). Every transform here is
//! total: degenerate input (empty datasets, all-NaN fields, empty palettes)
//! produces a well-defined neutral result instead of an error, because a
//! chart must render something rather than crash the page.

mod color;
mod export;
mod optimizer;
mod statistics;

pub use color::{ColorScale, Rgb, DEFAULT_PALETTE};
pub use export::project_for_export;
pub use optimizer::{optimize_dataset, AggregationMode};
pub use statistics::{calculate_statistics, FieldStatistics};

use color_eyre::{eyre::eyre, Result};
use serde::Serialize;
use serde_json::Value;

/// One dataset row: field name to value, insertion-ordered.
pub type Record = serde_json::Map<String, Value>;

/// An ordered sequence of records.
pub type Dataset = Vec<Record>;

/// Coerce a JSON value to a number the way chart code reads fields:
/// numbers pass through, numeric strings parse, everything else is dropped.
pub fn numeric_value(value: &Value) -> Option<f64> {
  match value {
    Value::Number(n) => n.as_f64(),
    Value::String(s) => s.trim().parse().ok().filter(|n: &f64| !n.is_nan()),
    _ => None,
  }
}

/// Read a record field as a number, if present and coercible.
pub fn field_number(record: &Record, field: &str) -> Option<f64> {
  record.get(field).and_then(numeric_value)
}

/// Convert typed rows into records, for handing typed API payloads to the
/// dataset transforms.
///
/// Fails if a row does not serialize to a JSON object.
pub fn records_from<T: Serialize>(rows: &[T]) -> Result<Dataset> {
  rows
    .iter()
    .map(|row| match serde_json::to_value(row)? {
      Value::Object(record) => Ok(record),
      other => Err(eyre!("expected an object per row, got {}", other)),
    })
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_numeric_value_coercion() {
    assert_eq!(numeric_value(&json!(42)), Some(42.0));
    assert_eq!(numeric_value(&json!(4.5)), Some(4.5));
    assert_eq!(numeric_value(&json!("12.3")), Some(12.3));
    assert_eq!(numeric_value(&json!(" 7 ")), Some(7.0));
    assert_eq!(numeric_value(&json!("abc")), None);
    assert_eq!(numeric_value(&json!("NaN")), None);
    assert_eq!(numeric_value(&json!(null)), None);
    assert_eq!(numeric_value(&json!([1])), None);
  }

  #[test]
  fn test_records_from_typed_rows() {
    #[derive(Serialize)]
    struct Row {
      day: &'static str,
      v: u32,
    }

    let records = records_from(&[Row { day: "Mon", v: 10 }]).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].get("day"), Some(&json!("Mon")));
    assert_eq!(records[0].get("v"), Some(&json!(10)));
  }

  #[test]
  fn test_records_from_rejects_non_objects() {
    assert!(records_from(&[1, 2, 3]).is_err());
  }
}
