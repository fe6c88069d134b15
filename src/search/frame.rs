//! Tabular search results as an Arrow `RecordBatch`
//!
//! Layout: the attribute columns first, then one nullable column per
//! metric, param and tag key seen in the result set:
//!
//! ```text
//! run_id | experiment_id | status | start_time | end_time | metrics.* | params.* | tags.*
//! ```

use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array, StringArray, TimestampMillisecondArray};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use rustc_hash::FxHashSet;

use super::field::RunRow;
use crate::Result;

/// Names of the leading attribute columns.
pub const ATTRIBUTE_COLUMNS: [&str; 5] =
    ["run_id", "experiment_id", "status", "start_time", "end_time"];

const TIMEZONE: &str = "UTC";

fn timestamp_type() -> DataType {
    DataType::Timestamp(TimeUnit::Millisecond, Some(TIMEZONE.into()))
}

/// Sorted, de-duplicated keys across all rows.
fn collect_keys<'a, F, I>(rows: &[RunRow<'a>], keys_of: F) -> Vec<&'a str>
where
    F: Fn(&RunRow<'a>) -> I,
    I: Iterator<Item = &'a String>,
{
    let seen: FxHashSet<&'a str> = rows
        .iter()
        .flat_map(&keys_of)
        .map(String::as_str)
        .collect();
    let mut keys: Vec<&'a str> = seen.into_iter().collect();
    keys.sort_unstable();
    keys
}

/// Materialise `rows` (already filtered, ordered and truncated).
///
/// # Errors
///
/// Returns `Error::Arrow` if the batch cannot be assembled.
///
/// # Example
///
/// ```rust
/// use trueno_track::search::{build_batch, ATTRIBUTE_COLUMNS};
///
/// let batch = build_batch(&[]).unwrap();
/// assert_eq!(batch.num_rows(), 0);
/// assert_eq!(batch.num_columns(), ATTRIBUTE_COLUMNS.len());
/// ```
pub fn build_batch(rows: &[RunRow<'_>]) -> Result<RecordBatch> {
    let metric_keys = collect_keys(rows, |row| row.metrics.keys());
    let param_keys = collect_keys(rows, |row| row.params.keys());
    let tag_keys = collect_keys(rows, |row| row.tags.keys());

    let mut fields = vec![
        Field::new("run_id", DataType::Utf8, false),
        Field::new("experiment_id", DataType::Utf8, false),
        Field::new("status", DataType::Utf8, false),
        Field::new("start_time", timestamp_type(), true),
        Field::new("end_time", timestamp_type(), true),
    ];
    let mut columns: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from_iter_values(
            rows.iter().map(|row| row.recorder.recorder_id()),
        )),
        Arc::new(StringArray::from_iter_values(
            rows.iter().map(|row| row.recorder.experiment_id()),
        )),
        Arc::new(StringArray::from_iter_values(
            rows.iter().map(|row| row.recorder.status().as_str()),
        )),
        Arc::new(
            TimestampMillisecondArray::from(
                rows.iter()
                    .map(|row| row.recorder.start_time().map(|t| t.timestamp_millis()))
                    .collect::<Vec<_>>(),
            )
            .with_timezone(TIMEZONE),
        ),
        Arc::new(
            TimestampMillisecondArray::from(
                rows.iter()
                    .map(|row| row.recorder.end_time().map(|t| t.timestamp_millis()))
                    .collect::<Vec<_>>(),
            )
            .with_timezone(TIMEZONE),
        ),
    ];

    for key in metric_keys {
        fields.push(Field::new(format!("metrics.{key}"), DataType::Float64, true));
        columns.push(Arc::new(Float64Array::from(
            rows.iter()
                .map(|row| row.metrics.get(key).map(crate::experiment::Metric::value))
                .collect::<Vec<_>>(),
        )));
    }
    for key in param_keys {
        fields.push(Field::new(format!("params.{key}"), DataType::Utf8, true));
        columns.push(Arc::new(StringArray::from(
            rows.iter()
                .map(|row| row.params.get(key).map(String::as_str))
                .collect::<Vec<_>>(),
        )));
    }
    for key in tag_keys {
        fields.push(Field::new(format!("tags.{key}"), DataType::Utf8, true));
        columns.push(Arc::new(StringArray::from(
            rows.iter()
                .map(|row| row.tags.get(key).map(String::as_str))
                .collect::<Vec<_>>(),
        )));
    }

    let schema = Arc::new(Schema::new(fields));
    Ok(RecordBatch::try_new(schema, columns)?)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use arrow::array::Array;

    use super::*;
    use crate::experiment::{Metric, Recorder};

    #[test]
    fn test_build_batch_sparse_columns() {
        let a = Recorder::new("a", "1");
        let b = Recorder::new("b", "1");
        let mut metrics_a = BTreeMap::new();
        metrics_a.insert("loss".to_string(), Metric::new("loss", 0.5, 0));
        let empty_metrics = BTreeMap::new();
        let mut params_b = BTreeMap::new();
        params_b.insert("model".to_string(), "lgbm".to_string());
        let empty = BTreeMap::new();

        let rows = [
            RunRow {
                recorder: &a,
                metrics: &metrics_a,
                params: &empty,
                tags: &empty,
            },
            RunRow {
                recorder: &b,
                metrics: &empty_metrics,
                params: &params_b,
                tags: &empty,
            },
        ];

        let batch = build_batch(&rows).unwrap();
        assert_eq!(batch.num_rows(), 2);
        assert_eq!(batch.num_columns(), 7);

        let loss = batch
            .column_by_name("metrics.loss")
            .unwrap()
            .as_any()
            .downcast_ref::<Float64Array>()
            .unwrap();
        assert!((loss.value(0) - 0.5).abs() < f64::EPSILON);
        assert!(loss.is_null(1));

        let model = batch
            .column_by_name("params.model")
            .unwrap()
            .as_any()
            .downcast_ref::<StringArray>()
            .unwrap();
        assert!(model.is_null(0));
        assert_eq!(model.value(1), "lgbm");
    }
}
