//! Field projection for CSV export.

use super::{Dataset, Record};

/// Project records onto the fields listed in `field_map`, renaming each
/// `(internal, exported)` pair, so published column headers are decoupled
/// from internal field names.
///
/// Fields absent from a source record are skipped. Record order and map
/// order are preserved; the source dataset is not touched. Serializing the
/// result to an actual CSV file is the export collaborator's job.
pub fn project_for_export(data: &[Record], field_map: &[(&str, &str)]) -> Dataset {
  data
    .iter()
    .map(|record| {
      let mut projected = Record::new();
      for (internal, exported) in field_map {
        if let Some(value) = record.get(*internal) {
          projected.insert((*exported).to_string(), value.clone());
        }
      }
      projected
    })
    .collect()
}
