//! Experiment Tracking Example
//!
//! Creates an experiment, runs a small hyper-parameter sweep as recorders,
//! searches the records, and deletes the worst run.
//!
//! Run with: cargo run --example experiment_tracking

use std::sync::Arc;

use arrow::array::{Array, Float64Array, StringArray};
use trueno_track::backend::{MemoryBackend, TrackingBackend};
use trueno_track::config::TrackingConfig;
use trueno_track::experiment::{Experiment, Metric, RecorderStatus, TrackedExperiment};
use trueno_track::search::{SearchOptions, ViewType};
use trueno_track::telemetry;

fn main() -> anyhow::Result<()> {
    telemetry::init_tracing()?;
    println!("=== trueno-track Experiment Tracking ===\n");

    let config = TrackingConfig::default().with_env_overrides()?;
    let backend = Arc::new(MemoryBackend::new());
    let mut experiment = TrackedExperiment::get_or_create_default(Arc::clone(&backend), &config)?;

    // -------------------------------------------------------------------------
    // 1. Sweep learning rates, one recorder per setting
    // -------------------------------------------------------------------------
    println!("1. Running sweep under experiment {:?}...", experiment.name());

    for (i, lr) in [0.1, 0.05, 0.01, 0.005].into_iter().enumerate() {
        let recorder = experiment.create_recorder()?;
        let run_id = recorder.recorder_id();
        backend.log_param(run_id, "learning_rate", &lr.to_string())?;
        backend.set_tag(run_id, "sweep", "lr")?;

        for epoch in 0..5u64 {
            let loss = 1.0 / (epoch as f64 + 1.0) + lr * 2.0;
            backend.log_metric(run_id, Metric::new("loss", loss, epoch))?;
        }
        let status = if i == 0 {
            RecorderStatus::Failed
        } else {
            RecorderStatus::Finished
        };
        backend.set_terminated(run_id, status)?;
        println!("   run {run_id}: lr={lr} -> {status}");
    }

    // -------------------------------------------------------------------------
    // 2. Search: finished runs, best loss first
    // -------------------------------------------------------------------------
    println!("\n2. Searching finished runs ordered by loss...");

    let records = experiment.search_records(
        SearchOptions::new()
            .filter("attributes.status = 'FINISHED' AND tags.sweep = 'lr'")
            .order_by(["metrics.loss ASC"]),
    )?;

    let run_ids = column::<StringArray>(&records, "run_id")?;
    let lrs = column::<StringArray>(&records, "params.learning_rate")?;
    let losses = column::<Float64Array>(&records, "metrics.loss")?;
    for row in 0..records.num_rows() {
        println!(
            "   {} lr={:<6} loss={:.4}",
            run_ids.value(row),
            lrs.value(row),
            losses.value(row)
        );
    }

    // -------------------------------------------------------------------------
    // 3. Delete the worst finished run
    // -------------------------------------------------------------------------
    if let Some(last) = records.num_rows().checked_sub(1) {
        let worst = run_ids.value(last).to_string();
        println!("\n3. Deleting worst run {worst}...");
        experiment.delete_recorder(&worst)?;
    }

    let active = experiment.search_records(SearchOptions::default())?;
    let deleted =
        experiment.search_records(SearchOptions::new().view_type(ViewType::DeletedOnly))?;
    println!("   cached recorders: {}", experiment.recorders().len());
    println!("   active runs:      {}", active.num_rows());
    println!("   deleted runs:     {}", deleted.num_rows());

    Ok(())
}

fn column<'a, T: Array + 'static>(
    batch: &'a arrow::record_batch::RecordBatch,
    name: &str,
) -> anyhow::Result<&'a T> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<T>())
        .ok_or_else(|| anyhow::anyhow!("missing column {name}"))
}
