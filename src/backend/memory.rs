//! In-memory tracking backend using `DashMap`.
//!
//! Data is lost on process restart. Suited to tests, notebooks and
//! single-process pipelines that only need search over the current session.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use arrow::record_batch::RecordBatch;
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::{debug, info};

use super::TrackingBackend;
use crate::experiment::{ExperimentRecord, Metric, Recorder, RecorderStatus};
use crate::search::{build_batch, sort_rows, Filter, OrderKey, RunRow, SearchQuery, ViewType};
use crate::{Error, Result};

/// Backend-side state of one run.
#[derive(Debug, Clone)]
struct RunEntry {
    /// Creation sequence number; orders `list_runs`.
    seq: u64,
    recorder: Recorder,
    latest: BTreeMap<String, Metric>,
    history: BTreeMap<String, Vec<Metric>>,
    params: BTreeMap<String, String>,
    tags: BTreeMap<String, String>,
}

impl RunEntry {
    fn row(&self) -> RunRow<'_> {
        RunRow {
            recorder: &self.recorder,
            metrics: &self.latest,
            params: &self.params,
            tags: &self.tags,
        }
    }

    fn ensure_active(&self) -> Result<()> {
        if self.recorder.is_active() {
            Ok(())
        } else {
            Err(Error::InvalidInput(format!(
                "run {} is deleted; only active runs accept writes",
                self.recorder.recorder_id()
            )))
        }
    }
}

/// In-memory tracking backend.
///
/// Thread-safe: all methods take `&self` and can be called from several
/// threads (wrap it in an `Arc` to share it between experiments).
///
/// - experiment ids are increasing integers rendered as strings
/// - run ids are 32-character UUID v4 hex strings
/// - `delete_run` is a soft delete; deleting twice is accepted
///
/// # Example
///
/// ```rust
/// use trueno_track::backend::{MemoryBackend, TrackingBackend};
/// use trueno_track::search::ViewType;
///
/// # fn main() -> trueno_track::Result<()> {
/// let backend = MemoryBackend::new();
/// let exp = backend.create_experiment("demo")?;
/// let run = backend.create_run(exp.experiment_id())?;
/// backend.delete_run(run.recorder_id())?;
///
/// assert!(backend.list_runs(exp.experiment_id(), ViewType::ActiveOnly)?.is_empty());
/// assert_eq!(backend.list_runs(exp.experiment_id(), ViewType::All)?.len(), 1);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct MemoryBackend {
    experiments: DashMap<String, ExperimentRecord>,
    names: DashMap<String, String>,
    runs: DashMap<String, RunEntry>,
    next_experiment: AtomicU64,
    next_run: AtomicU64,
}

impl MemoryBackend {
    /// Create an empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of experiments.
    #[must_use]
    pub fn experiment_count(&self) -> usize {
        self.experiments.len()
    }

    /// Number of runs, deleted ones included.
    #[must_use]
    pub fn run_count(&self) -> usize {
        self.runs.len()
    }

    /// Whether the backend holds no experiments.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.experiments.is_empty()
    }

    fn with_run_mut<T>(
        &self,
        run_id: &str,
        f: impl FnOnce(&mut RunEntry) -> Result<T>,
    ) -> Result<T> {
        let mut entry = self
            .runs
            .get_mut(run_id)
            .ok_or_else(|| Error::RunNotFound(run_id.to_string()))?;
        f(entry.value_mut())
    }

    /// Copy out the runs visible to `query` so no map shard stays locked
    /// while filtering and sorting.
    fn snapshot(&self, query: &SearchQuery) -> Result<Vec<RunEntry>> {
        for experiment_id in &query.experiment_ids {
            if !self.experiments.contains_key(experiment_id) {
                return Err(Error::ExperimentNotFound(experiment_id.clone()));
            }
        }
        Ok(self
            .runs
            .iter()
            .filter(|entry| {
                let recorder = &entry.value().recorder;
                query
                    .experiment_ids
                    .iter()
                    .any(|id| id == recorder.experiment_id())
                    && query.run_view_type.includes(recorder.lifecycle_stage())
            })
            .map(|entry| entry.value().clone())
            .collect())
    }
}

impl TrackingBackend for MemoryBackend {
    fn create_experiment(&self, name: &str) -> Result<ExperimentRecord> {
        if name.trim().is_empty() {
            return Err(Error::InvalidInput(
                "experiment name must not be empty".to_string(),
            ));
        }
        let Entry::Vacant(slot) = self.names.entry(name.to_string()) else {
            return Err(Error::AlreadyExists(format!("experiment named {name:?}")));
        };
        let experiment_id = self.next_experiment.fetch_add(1, Ordering::Relaxed).to_string();
        slot.insert(experiment_id.clone());

        let record = ExperimentRecord::new(experiment_id.clone(), name);
        self.experiments.insert(experiment_id.clone(), record.clone());
        info!(experiment_id = %experiment_id, name, "created experiment");
        Ok(record)
    }

    fn get_experiment(&self, experiment_id: &str) -> Result<ExperimentRecord> {
        self.experiments
            .get(experiment_id)
            .map(|e| e.value().clone())
            .ok_or_else(|| Error::ExperimentNotFound(experiment_id.to_string()))
    }

    fn get_experiment_by_name(&self, name: &str) -> Result<Option<ExperimentRecord>> {
        let Some(id) = self.names.get(name).map(|id| id.value().clone()) else {
            return Ok(None);
        };
        self.get_experiment(&id).map(Some)
    }

    fn create_run(&self, experiment_id: &str) -> Result<Recorder> {
        if !self.experiments.contains_key(experiment_id) {
            return Err(Error::ExperimentNotFound(experiment_id.to_string()));
        }

        let run_id = uuid::Uuid::new_v4().simple().to_string();
        let mut recorder = Recorder::new(run_id.clone(), experiment_id);
        recorder.start_at(Utc::now());

        let entry = RunEntry {
            seq: self.next_run.fetch_add(1, Ordering::Relaxed),
            recorder: recorder.clone(),
            latest: BTreeMap::new(),
            history: BTreeMap::new(),
            params: BTreeMap::new(),
            tags: BTreeMap::new(),
        };
        self.runs.insert(run_id.clone(), entry);
        info!(experiment_id, run_id = %run_id, "created run");
        Ok(recorder)
    }

    fn get_run(&self, run_id: &str) -> Result<Recorder> {
        self.runs
            .get(run_id)
            .map(|entry| entry.value().recorder.clone())
            .ok_or_else(|| Error::RunNotFound(run_id.to_string()))
    }

    fn delete_run(&self, run_id: &str) -> Result<()> {
        self.with_run_mut(run_id, |entry| {
            if entry.recorder.is_active() {
                entry.recorder.mark_deleted();
                info!(run_id, "deleted run");
            } else {
                debug!(run_id, "run already deleted");
            }
            Ok(())
        })
    }

    fn list_runs(&self, experiment_id: &str, view_type: ViewType) -> Result<Vec<Recorder>> {
        if !self.experiments.contains_key(experiment_id) {
            return Err(Error::ExperimentNotFound(experiment_id.to_string()));
        }
        let mut runs: Vec<(u64, Recorder)> = self
            .runs
            .iter()
            .filter(|entry| {
                let recorder = &entry.value().recorder;
                recorder.experiment_id() == experiment_id
                    && view_type.includes(recorder.lifecycle_stage())
            })
            .map(|entry| (entry.value().seq, entry.value().recorder.clone()))
            .collect();
        runs.sort_by_key(|(seq, _)| *seq);
        Ok(runs.into_iter().map(|(_, recorder)| recorder).collect())
    }

    fn search_runs(&self, query: &SearchQuery) -> Result<RecordBatch> {
        query.validate()?;
        let filter = Filter::parse(&query.filter_string)?;
        let order = match &query.order_by {
            Some(clauses) => OrderKey::parse_all(clauses)?,
            None => OrderKey::default_order(),
        };

        let snapshot = self.snapshot(query)?;
        let mut rows: Vec<RunRow<'_>> = snapshot
            .iter()
            .map(RunEntry::row)
            .filter(|row| filter.matches(row))
            .collect();
        sort_rows(&mut rows, &order);
        rows.truncate(query.max_results);

        debug!(
            experiment_ids = ?query.experiment_ids,
            filter = %query.filter_string,
            view_type = %query.run_view_type,
            scanned = snapshot.len(),
            returned = rows.len(),
            "searched runs"
        );
        build_batch(&rows)
    }

    fn log_metric(&self, run_id: &str, metric: Metric) -> Result<()> {
        self.with_run_mut(run_id, |entry| {
            entry.ensure_active()?;
            debug!(
                run_id,
                key = metric.key(),
                value = metric.value(),
                step = metric.step(),
                "log metric"
            );
            let replace = entry
                .latest
                .get(metric.key())
                .map_or(true, |current| metric.supersedes(current));
            if replace {
                entry.latest.insert(metric.key().to_string(), metric.clone());
            }
            entry
                .history
                .entry(metric.key().to_string())
                .or_default()
                .push(metric);
            Ok(())
        })
    }

    fn log_param(&self, run_id: &str, key: &str, value: &str) -> Result<()> {
        self.with_run_mut(run_id, |entry| {
            entry.ensure_active()?;
            match entry.params.get(key) {
                Some(existing) if existing != value => Err(Error::InvalidInput(format!(
                    "param {key:?} of run {run_id} is already {existing:?}; params are write-once"
                ))),
                Some(_) => Ok(()),
                None => {
                    debug!(run_id, key, value, "log param");
                    entry.params.insert(key.to_string(), value.to_string());
                    Ok(())
                }
            }
        })
    }

    fn set_tag(&self, run_id: &str, key: &str, value: &str) -> Result<()> {
        self.with_run_mut(run_id, |entry| {
            entry.ensure_active()?;
            debug!(run_id, key, value, "set tag");
            entry.tags.insert(key.to_string(), value.to_string());
            Ok(())
        })
    }

    fn set_terminated(&self, run_id: &str, status: RecorderStatus) -> Result<Recorder> {
        if !status.is_terminal() {
            return Err(Error::InvalidInput(format!(
                "{status} is not a terminal run status"
            )));
        }
        self.with_run_mut(run_id, |entry| {
            entry.ensure_active()?;
            entry.recorder.terminate_at(status, Utc::now());
            info!(run_id, status = %status, "terminated run");
            Ok(entry.recorder.clone())
        })
    }

    fn get_metric_history(&self, run_id: &str, key: &str) -> Result<Vec<Metric>> {
        let entry = self
            .runs
            .get(run_id)
            .ok_or_else(|| Error::RunNotFound(run_id.to_string()))?;
        let mut history = entry.value().history.get(key).cloned().unwrap_or_default();
        history.sort_by_key(Metric::step);
        Ok(history)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_backend_default() {
        let backend = MemoryBackend::default();
        assert!(backend.is_empty());
        assert_eq!(backend.run_count(), 0);
    }

    #[test]
    fn test_experiment_ids_increase() {
        let backend = MemoryBackend::new();
        let a = backend.create_experiment("a").unwrap();
        let b = backend.create_experiment("b").unwrap();
        assert_eq!(a.experiment_id(), "0");
        assert_eq!(b.experiment_id(), "1");
        assert_eq!(backend.experiment_count(), 2);
    }

    #[test]
    fn test_duplicate_and_empty_names_rejected() {
        let backend = MemoryBackend::new();
        backend.create_experiment("a").unwrap();
        assert!(matches!(backend.create_experiment("a"), Err(Error::AlreadyExists(_))));
        assert!(matches!(backend.create_experiment(" "), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_run_ids_are_uuid_hex() {
        let backend = MemoryBackend::new();
        let exp = backend.create_experiment("a").unwrap();
        let run = backend.create_run(exp.experiment_id()).unwrap();
        assert_eq!(run.recorder_id().len(), 32);
        assert!(run.recorder_id().chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(run.status(), RecorderStatus::Running);
        assert!(run.start_time().is_some());
    }

    #[test]
    fn test_latest_metric_tracks_highest_step() {
        let backend = MemoryBackend::new();
        let exp = backend.create_experiment("a").unwrap();
        let run = backend.create_run(exp.experiment_id()).unwrap();
        let id = run.recorder_id();

        backend.log_metric(id, Metric::new("loss", 0.3, 2)).unwrap();
        backend.log_metric(id, Metric::new("loss", 0.9, 0)).unwrap();

        let entry = backend.runs.get(id).unwrap();
        assert!((entry.latest["loss"].value() - 0.3).abs() < f64::EPSILON);
        assert_eq!(entry.history["loss"].len(), 2);
    }

    #[test]
    fn test_writes_to_deleted_run_rejected() {
        let backend = MemoryBackend::new();
        let exp = backend.create_experiment("a").unwrap();
        let run = backend.create_run(exp.experiment_id()).unwrap();
        backend.delete_run(run.recorder_id()).unwrap();

        assert!(backend.set_tag(run.recorder_id(), "k", "v").is_err());
        assert!(backend.log_metric(run.recorder_id(), Metric::new("m", 1.0, 0)).is_err());
    }

    #[test]
    fn test_list_runs_in_creation_order() {
        let backend = MemoryBackend::new();
        let exp = backend.create_experiment("a").unwrap();
        let ids: Vec<String> = (0..4)
            .map(|_| backend.create_run(exp.experiment_id()).unwrap())
            .map(|run| run.recorder_id().to_string())
            .collect();
        backend.delete_run(&ids[1]).unwrap();

        let listed = |view| -> Vec<String> {
            backend
                .list_runs(exp.experiment_id(), view)
                .unwrap()
                .iter()
                .map(|run| run.recorder_id().to_string())
                .collect()
        };
        assert_eq!(listed(ViewType::All), ids);
        assert_eq!(
            listed(ViewType::ActiveOnly),
            vec![ids[0].clone(), ids[2].clone(), ids[3].clone()]
        );
        assert_eq!(listed(ViewType::DeletedOnly), vec![ids[1].clone()]);
    }

    #[test]
    fn test_params_are_write_once() {
        let backend = MemoryBackend::new();
        let exp = backend.create_experiment("a").unwrap();
        let run = backend.create_run(exp.experiment_id()).unwrap();
        let id = run.recorder_id();

        backend.log_param(id, "lr", "0.1").unwrap();
        backend.log_param(id, "lr", "0.1").unwrap();
        assert!(matches!(backend.log_param(id, "lr", "0.2"), Err(Error::InvalidInput(_))));
        assert_eq!(backend.runs.get(id).unwrap().params["lr"], "0.1");
    }

    #[test]
    fn test_set_terminated_requires_terminal_status() {
        let backend = MemoryBackend::new();
        let exp = backend.create_experiment("a").unwrap();
        let run = backend.create_run(exp.experiment_id()).unwrap();
        let id = run.recorder_id();

        for status in [RecorderStatus::Scheduled, RecorderStatus::Running] {
            assert!(matches!(backend.set_terminated(id, status), Err(Error::InvalidInput(_))));
        }
        assert_eq!(backend.get_run(id).unwrap().status(), RecorderStatus::Running);
        assert!(backend.get_run(id).unwrap().end_time().is_none());

        let done = backend.set_terminated(id, RecorderStatus::Finished).unwrap();
        assert_eq!(done.status(), RecorderStatus::Finished);
        assert!(done.end_time().is_some());
    }

    #[test]
    fn test_metric_history_sorted_by_step() {
        let backend = MemoryBackend::new();
        let exp = backend.create_experiment("a").unwrap();
        let run = backend.create_run(exp.experiment_id()).unwrap();
        let id = run.recorder_id();

        for step in [3, 0, 2, 1] {
            backend.log_metric(id, Metric::new("loss", step as f64, step)).unwrap();
        }

        let steps: Vec<u64> = backend
            .get_metric_history(id, "loss")
            .unwrap()
            .iter()
            .map(Metric::step)
            .collect();
        assert_eq!(steps, vec![0, 1, 2, 3]);
        assert!(backend.get_metric_history(id, "absent").unwrap().is_empty());
    }
}
