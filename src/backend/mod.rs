//! Tracking backends: the system of record for experiments and runs
//!
//! Experiments never touch storage directly; every persistent effect goes
//! through a [`TrackingBackend`]. The backend is injected at construction,
//! so tests substitute a fake and production code a remote client.
//!
//! # Example
//!
//! ```rust
//! use trueno_track::backend::{MemoryBackend, TrackingBackend};
//! use trueno_track::search::{SearchOptions, SearchQuery};
//!
//! # fn main() -> trueno_track::Result<()> {
//! let backend = MemoryBackend::new();
//! let experiment = backend.create_experiment("alpha158")?;
//! let run = backend.create_run(experiment.experiment_id())?;
//! backend.log_param(run.recorder_id(), "model", "lgbm")?;
//!
//! let query = SearchQuery::resolve(
//!     vec![experiment.experiment_id().to_string()],
//!     SearchOptions::new().filter("params.model = 'lgbm'"),
//!     &Default::default(),
//! );
//! assert_eq!(backend.search_runs(&query)?.num_rows(), 1);
//! # Ok(())
//! # }
//! ```

mod memory;

pub use memory::MemoryBackend;

use std::sync::Arc;

use arrow::record_batch::RecordBatch;

use crate::experiment::{ExperimentRecord, Metric, Recorder, RecorderStatus};
use crate::search::{SearchQuery, ViewType};
use crate::Result;

/// Capability set of an experiment-tracking service.
///
/// All calls are synchronous and blocking. Implementations own error
/// semantics; the experiment layer propagates whatever they return.
pub trait TrackingBackend: Send + Sync {
    /// Register a new experiment. Names are unique within the backend.
    ///
    /// # Errors
    ///
    /// `InvalidInput` for an empty name, `AlreadyExists` for a taken one.
    fn create_experiment(&self, name: &str) -> Result<ExperimentRecord>;

    /// Look up an experiment by id.
    ///
    /// # Errors
    ///
    /// `ExperimentNotFound` for an unknown id.
    fn get_experiment(&self, experiment_id: &str) -> Result<ExperimentRecord>;

    /// Look up an experiment by name.
    ///
    /// # Errors
    ///
    /// Backend failures only; an unknown name is `Ok(None)`.
    fn get_experiment_by_name(&self, name: &str) -> Result<Option<ExperimentRecord>>;

    /// Create a run bound to `experiment_id` and start it.
    ///
    /// # Errors
    ///
    /// `ExperimentNotFound` for an unknown experiment.
    fn create_run(&self, experiment_id: &str) -> Result<Recorder>;

    /// Fetch the current state of a run.
    ///
    /// # Errors
    ///
    /// `RunNotFound` for an unknown id.
    fn get_run(&self, run_id: &str) -> Result<Recorder>;

    /// Delete a run.
    ///
    /// # Errors
    ///
    /// `RunNotFound` for an unknown id.
    fn delete_run(&self, run_id: &str) -> Result<()>;

    /// Runs of an experiment visible under `view_type`, in creation order.
    ///
    /// # Errors
    ///
    /// `ExperimentNotFound` for an unknown experiment.
    fn list_runs(&self, experiment_id: &str, view_type: ViewType) -> Result<Vec<Recorder>>;

    /// Execute a search and return one row per matching run.
    ///
    /// # Errors
    ///
    /// `InvalidFilter` / `InvalidInput` for a bad query.
    fn search_runs(&self, query: &SearchQuery) -> Result<RecordBatch>;

    /// Append a metric data point.
    ///
    /// # Errors
    ///
    /// `RunNotFound` for an unknown run.
    fn log_metric(&self, run_id: &str, metric: Metric) -> Result<()>;

    /// Record a parameter.
    ///
    /// # Errors
    ///
    /// `RunNotFound` for an unknown run.
    fn log_param(&self, run_id: &str, key: &str, value: &str) -> Result<()>;

    /// Set (or overwrite) a tag.
    ///
    /// # Errors
    ///
    /// `RunNotFound` for an unknown run.
    fn set_tag(&self, run_id: &str, key: &str, value: &str) -> Result<()>;

    /// Move a run to a terminal status and stamp its end time.
    ///
    /// # Errors
    ///
    /// `RunNotFound` for an unknown run, `InvalidInput` for a non-terminal
    /// status.
    fn set_terminated(&self, run_id: &str, status: RecorderStatus) -> Result<Recorder>;

    /// Full history of one metric, ordered by step.
    ///
    /// # Errors
    ///
    /// `RunNotFound` for an unknown run.
    fn get_metric_history(&self, run_id: &str, key: &str) -> Result<Vec<Metric>>;
}

macro_rules! forward_backend {
    ($($wrapper:ty),+ $(,)?) => {$(
        impl<B: TrackingBackend + ?Sized> TrackingBackend for $wrapper {
            fn create_experiment(&self, name: &str) -> Result<ExperimentRecord> {
                (**self).create_experiment(name)
            }

            fn get_experiment(&self, experiment_id: &str) -> Result<ExperimentRecord> {
                (**self).get_experiment(experiment_id)
            }

            fn get_experiment_by_name(&self, name: &str) -> Result<Option<ExperimentRecord>> {
                (**self).get_experiment_by_name(name)
            }

            fn create_run(&self, experiment_id: &str) -> Result<Recorder> {
                (**self).create_run(experiment_id)
            }

            fn get_run(&self, run_id: &str) -> Result<Recorder> {
                (**self).get_run(run_id)
            }

            fn delete_run(&self, run_id: &str) -> Result<()> {
                (**self).delete_run(run_id)
            }

            fn list_runs(&self, experiment_id: &str, view_type: ViewType) -> Result<Vec<Recorder>> {
                (**self).list_runs(experiment_id, view_type)
            }

            fn search_runs(&self, query: &SearchQuery) -> Result<RecordBatch> {
                (**self).search_runs(query)
            }

            fn log_metric(&self, run_id: &str, metric: Metric) -> Result<()> {
                (**self).log_metric(run_id, metric)
            }

            fn log_param(&self, run_id: &str, key: &str, value: &str) -> Result<()> {
                (**self).log_param(run_id, key, value)
            }

            fn set_tag(&self, run_id: &str, key: &str, value: &str) -> Result<()> {
                (**self).set_tag(run_id, key, value)
            }

            fn set_terminated(&self, run_id: &str, status: RecorderStatus) -> Result<Recorder> {
                (**self).set_terminated(run_id, status)
            }

            fn get_metric_history(&self, run_id: &str, key: &str) -> Result<Vec<Metric>> {
                (**self).get_metric_history(run_id, key)
            }
        }
    )+};
}

forward_backend!(&B, Arc<B>, Box<B>);
