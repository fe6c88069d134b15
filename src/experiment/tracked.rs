//! Backend-bound experiment

use arrow::record_batch::RecordBatch;
use tracing::{debug, info, warn};

use super::{Experiment, ExperimentRecord, Recorder};
use crate::backend::TrackingBackend;
use crate::config::{SearchDefaults, TrackingConfig};
use crate::search::{SearchOptions, SearchQuery, ViewType};
use crate::Result;

/// Experiment that forwards every operation to a [`TrackingBackend`].
///
/// The recorder list is a best-effort local cache: it changes on
/// `create_recorder`, `delete_recorder` and `sync_recorders`, never on
/// changes made to the backend by someone else. Mutating operations take
/// `&mut self`; share an experiment across threads only behind a lock.
#[derive(Debug)]
pub struct TrackedExperiment<B> {
    record: ExperimentRecord,
    backend: B,
    recorders: Vec<Recorder>,
    search_defaults: SearchDefaults,
}

impl<B: TrackingBackend> TrackedExperiment<B> {
    /// Bind an existing experiment record to a backend, with an empty cache.
    #[must_use]
    pub fn new(backend: B, record: ExperimentRecord) -> Self {
        Self {
            record,
            backend,
            recorders: Vec::new(),
            search_defaults: SearchDefaults::default(),
        }
    }

    /// Create a new experiment named `name` in the backend.
    ///
    /// # Errors
    ///
    /// Propagates backend errors (e.g. `AlreadyExists`).
    pub fn create(backend: B, name: &str) -> Result<Self> {
        let record = backend.create_experiment(name)?;
        Ok(Self::new(backend, record))
    }

    /// Open an existing experiment by id and load its active recorders.
    ///
    /// # Errors
    ///
    /// Propagates backend errors (e.g. `ExperimentNotFound`).
    pub fn open(backend: B, experiment_id: &str) -> Result<Self> {
        let record = backend.get_experiment(experiment_id)?;
        let mut experiment = Self::new(backend, record);
        experiment.sync_recorders()?;
        Ok(experiment)
    }

    /// Open the experiment named `name`, creating it if absent.
    ///
    /// # Errors
    ///
    /// Propagates backend errors.
    pub fn get_or_create(backend: B, name: &str) -> Result<Self> {
        match backend.get_experiment_by_name(name)? {
            Some(record) => {
                let mut experiment = Self::new(backend, record);
                experiment.sync_recorders()?;
                Ok(experiment)
            }
            None => Self::create(backend, name),
        }
    }

    /// [`get_or_create`](Self::get_or_create) with the configured default
    /// name, adopting the configured search defaults.
    ///
    /// # Errors
    ///
    /// Propagates backend errors.
    pub fn get_or_create_default(backend: B, config: &TrackingConfig) -> Result<Self> {
        Ok(Self::get_or_create(backend, &config.experiment.default_name)?
            .with_search_defaults(config.search))
    }

    /// Replace the defaults applied to unset search options.
    #[must_use]
    pub fn with_search_defaults(mut self, defaults: SearchDefaults) -> Self {
        self.search_defaults = defaults;
        self
    }

    /// The bound experiment record.
    #[must_use]
    pub const fn record(&self) -> &ExperimentRecord {
        &self.record
    }

    /// The backend this experiment forwards to.
    #[must_use]
    pub const fn backend(&self) -> &B {
        &self.backend
    }

    /// Defaults applied to unset search options.
    #[must_use]
    pub const fn search_defaults(&self) -> &SearchDefaults {
        &self.search_defaults
    }

    /// Cached recorder with id `rid`.
    #[must_use]
    pub fn get_recorder(&self, rid: &str) -> Option<&Recorder> {
        self.recorders.iter().find(|r| r.recorder_id() == rid)
    }

    /// Reload the recorder cache from the backend (active runs only).
    ///
    /// Returns the number of cached recorders.
    ///
    /// # Errors
    ///
    /// Propagates backend errors; the cache is unchanged on failure.
    pub fn sync_recorders(&mut self) -> Result<usize> {
        let recorders = self
            .backend
            .list_runs(self.record.experiment_id(), ViewType::ActiveOnly)?;
        debug!(
            experiment_id = self.record.experiment_id(),
            cached = self.recorders.len(),
            synced = recorders.len(),
            "synced recorder cache"
        );
        self.recorders = recorders;
        Ok(self.recorders.len())
    }
}

impl<B: TrackingBackend> Experiment for TrackedExperiment<B> {
    fn name(&self) -> Option<&str> {
        Some(self.record.name())
    }

    fn id(&self) -> Option<&str> {
        Some(self.record.experiment_id())
    }

    fn recorders(&self) -> &[Recorder] {
        &self.recorders
    }

    fn create_recorder(&mut self) -> Result<Recorder> {
        let recorder = self.backend.create_run(self.record.experiment_id())?;
        info!(
            experiment_id = self.record.experiment_id(),
            recorder_id = recorder.recorder_id(),
            "created recorder"
        );
        self.recorders.push(recorder.clone());
        Ok(recorder)
    }

    fn search_records(&self, options: SearchOptions) -> Result<RecordBatch> {
        let query = SearchQuery::resolve(
            vec![self.record.experiment_id().to_string()],
            options,
            &self.search_defaults,
        );
        debug!(
            experiment_id = self.record.experiment_id(),
            filter = %query.filter_string,
            view_type = %query.run_view_type,
            max_results = query.max_results,
            "searching records"
        );
        self.backend.search_runs(&query)
    }

    fn delete_recorder(&mut self, rid: &str) -> Result<()> {
        self.backend.delete_run(rid)?;
        let before = self.recorders.len();
        self.recorders.retain(|r| r.recorder_id() != rid);
        if self.recorders.len() == before {
            warn!(
                experiment_id = self.record.experiment_id(),
                recorder_id = rid,
                "deleted recorder was not in the local cache"
            );
        } else {
            info!(
                experiment_id = self.record.experiment_id(),
                recorder_id = rid,
                "deleted recorder"
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use crate::Error;

    #[test]
    fn test_create_recorder_appends_and_returns_new_recorder() {
        let backend = MemoryBackend::new();
        let mut experiment = TrackedExperiment::create(&backend, "exp").unwrap();

        let first = experiment.create_recorder().unwrap();
        let second = experiment.create_recorder().unwrap();

        assert_ne!(first.recorder_id(), second.recorder_id());
        assert_eq!(experiment.recorders(), &[first, second]);
    }

    #[test]
    fn test_delete_recorder_drops_only_matching() {
        let backend = MemoryBackend::new();
        let mut experiment = TrackedExperiment::create(&backend, "exp").unwrap();
        let keep = experiment.create_recorder().unwrap();
        let dropped = experiment.create_recorder().unwrap();

        experiment.delete_recorder(dropped.recorder_id()).unwrap();

        assert_eq!(experiment.recorders(), &[keep]);
        assert!(experiment.get_recorder(dropped.recorder_id()).is_none());
    }

    #[test]
    fn test_delete_unknown_recorder_propagates_and_keeps_cache() {
        let backend = MemoryBackend::new();
        let mut experiment = TrackedExperiment::create(&backend, "exp").unwrap();
        experiment.create_recorder().unwrap();

        let err = experiment.delete_recorder("missing").unwrap_err();
        assert!(matches!(err, Error::RunNotFound(id) if id == "missing"));
        assert_eq!(experiment.recorders().len(), 1);
    }

    #[test]
    fn test_open_syncs_active_recorders() {
        let backend = MemoryBackend::new();
        let mut writer = TrackedExperiment::create(&backend, "exp").unwrap();
        let a = writer.create_recorder().unwrap();
        let b = writer.create_recorder().unwrap();
        writer.delete_recorder(a.recorder_id()).unwrap();

        let reader = TrackedExperiment::open(&backend, writer.record().experiment_id()).unwrap();
        assert_eq!(reader.recorders().len(), 1);
        assert_eq!(reader.recorders()[0].recorder_id(), b.recorder_id());
    }

    #[test]
    fn test_get_or_create_reuses_by_name() {
        let backend = MemoryBackend::new();
        let first = TrackedExperiment::get_or_create(&backend, "exp").unwrap();
        let second = TrackedExperiment::get_or_create(&backend, "exp").unwrap();
        assert_eq!(first.id(), second.id());
        assert_eq!(backend.experiment_count(), 1);
    }
}
