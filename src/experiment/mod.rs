//! Experiments and their recorders
//!
//! ## Model
//!
//! ```text
//! ExperimentRecord (1) ──< Recorder (N)
//!                              │
//!                              ├──< Metric (N) [time-series, in backend]
//!                              └──  params / tags  [in backend]
//! ```
//!
//! [`Experiment`] is the contract: create recorders, search run records,
//! delete recorders. Its provided methods fail with
//! [`Error::NotImplemented`](crate::Error::NotImplemented), which is what
//! [`BaseExperiment`] exposes. [`TrackedExperiment`] binds the contract to a
//! [`TrackingBackend`](crate::backend::TrackingBackend).
//!
//! ## Usage
//!
//! ```rust
//! use trueno_track::backend::MemoryBackend;
//! use trueno_track::experiment::{Experiment, TrackedExperiment};
//! use trueno_track::search::SearchOptions;
//!
//! # fn main() -> trueno_track::Result<()> {
//! let backend = MemoryBackend::new();
//! let mut experiment = TrackedExperiment::create(&backend, "workflow")?;
//!
//! let recorder = experiment.create_recorder()?;
//! assert_eq!(experiment.recorders().len(), 1);
//!
//! let records = experiment.search_records(SearchOptions::default())?;
//! assert_eq!(records.num_rows(), 1);
//!
//! experiment.delete_recorder(recorder.recorder_id())?;
//! assert!(experiment.recorders().is_empty());
//! # Ok(())
//! # }
//! ```

mod experiment_record;
mod metric;
mod recorder;
mod tracked;

pub use experiment_record::{ExperimentRecord, ExperimentRecordBuilder, LifecycleStage};
pub use metric::Metric;
pub use recorder::{Recorder, RecorderStatus};
pub use tracked::TrackedExperiment;

use arrow::record_batch::RecordBatch;

use crate::search::SearchOptions;
use crate::{Error, Result};

/// A named grouping of recorders with create / search / delete.
///
/// Implementors supply identity and the local recorder collection; the
/// three operations default to `Error::NotImplemented` so a bare
/// implementation is a valid, inert experiment.
pub trait Experiment {
    /// Experiment name, if bound.
    fn name(&self) -> Option<&str>;

    /// Experiment id, if bound.
    fn id(&self) -> Option<&str>;

    /// Locally known recorders, in creation order.
    fn recorders(&self) -> &[Recorder];

    /// Create a recorder under this experiment and append it to the
    /// local collection.
    ///
    /// # Errors
    ///
    /// `NotImplemented` unless overridden; otherwise backend errors.
    fn create_recorder(&mut self) -> Result<Recorder> {
        Err(Error::NotImplemented("create_recorder"))
    }

    /// Search the run records of this experiment.
    ///
    /// Unset options default to: match-all filter, active runs only,
    /// 100000 rows, backend ordering.
    ///
    /// # Errors
    ///
    /// `NotImplemented` unless overridden; otherwise backend errors.
    fn search_records(&self, _options: SearchOptions) -> Result<RecordBatch> {
        Err(Error::NotImplemented("search_records"))
    }

    /// Delete the recorder `_rid` from the backend and the local collection.
    ///
    /// # Errors
    ///
    /// `NotImplemented` unless overridden; otherwise backend errors.
    fn delete_recorder(&mut self, _rid: &str) -> Result<()> {
        Err(Error::NotImplemented("delete_recorder"))
    }
}

/// The base experiment form: identity and recorder list only.
///
/// Every operation fails with `NotImplemented`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BaseExperiment {
    name: Option<String>,
    id: Option<String>,
    recorders: Vec<Recorder>,
}

impl BaseExperiment {
    /// Base experiment with no identity.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Base experiment carrying an identity.
    #[must_use]
    pub fn with_identity(name: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            id: Some(id.into()),
            recorders: Vec::new(),
        }
    }
}

impl Experiment for BaseExperiment {
    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn recorders(&self) -> &[Recorder] {
        &self.recorders
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_experiment_default_identity() {
        let experiment = BaseExperiment::default();
        assert_eq!(experiment.name(), None);
        assert_eq!(experiment.id(), None);
        assert!(experiment.recorders().is_empty());
    }

    #[test]
    fn test_base_experiment_operations_not_implemented() {
        let mut experiment = BaseExperiment::with_identity("exp", "1");
        assert!(matches!(
            experiment.create_recorder(),
            Err(Error::NotImplemented("create_recorder"))
        ));
        assert!(matches!(
            experiment.search_records(SearchOptions::default()),
            Err(Error::NotImplemented("search_records"))
        ));
        assert!(matches!(
            experiment.delete_recorder("r"),
            Err(Error::NotImplemented("delete_recorder"))
        ));
        assert!(experiment.recorders().is_empty());
    }
}
