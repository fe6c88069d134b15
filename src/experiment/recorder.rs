//! Recorder - handle to a single tracked run of an experiment

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::LifecycleStage;
use crate::{Error, Result};

/// Status of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecorderStatus {
    /// Run is created but not yet started.
    Scheduled,
    /// Run is currently executing.
    Running,
    /// Run completed successfully.
    Finished,
    /// Run failed with an error.
    Failed,
    /// Run was killed by user or system.
    Killed,
}

impl RecorderStatus {
    /// Upper-case name used in search results and filters.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Scheduled => "SCHEDULED",
            Self::Running => "RUNNING",
            Self::Finished => "FINISHED",
            Self::Failed => "FAILED",
            Self::Killed => "KILLED",
        }
    }

    /// Whether the status ends the run.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Finished | Self::Failed | Self::Killed)
    }
}

impl fmt::Display for RecorderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecorderStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "SCHEDULED" => Ok(Self::Scheduled),
            "RUNNING" => Ok(Self::Running),
            "FINISHED" => Ok(Self::Finished),
            "FAILED" => Ok(Self::Failed),
            "KILLED" => Ok(Self::Killed),
            other => Err(Error::InvalidInput(format!("unknown run status: {other}"))),
        }
    }
}

/// Recorder is the handle for one run inside an experiment.
///
/// Recorders are created by the tracking backend and referenced by
/// `recorder_id`. An experiment only caches them; state changes happen in
/// the backend and reach the cache through a fresh handle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Recorder {
    recorder_id: String,
    experiment_id: String,
    status: RecorderStatus,
    start_time: Option<DateTime<Utc>>,
    end_time: Option<DateTime<Utc>>,
    lifecycle_stage: LifecycleStage,
}

impl Recorder {
    /// Create a recorder handle in `Scheduled` status.
    ///
    /// # Arguments
    ///
    /// * `recorder_id` - Unique identifier for the run
    /// * `experiment_id` - ID of the parent experiment
    #[must_use]
    pub fn new(recorder_id: impl Into<String>, experiment_id: impl Into<String>) -> Self {
        Self {
            recorder_id: recorder_id.into(),
            experiment_id: experiment_id.into(),
            status: RecorderStatus::Scheduled,
            start_time: None,
            end_time: None,
            lifecycle_stage: LifecycleStage::Active,
        }
    }

    /// Get the recorder (run) ID.
    #[must_use]
    pub fn recorder_id(&self) -> &str {
        &self.recorder_id
    }

    /// Get the parent experiment ID.
    #[must_use]
    pub fn experiment_id(&self) -> &str {
        &self.experiment_id
    }

    /// Get the current run status.
    #[must_use]
    pub const fn status(&self) -> RecorderStatus {
        self.status
    }

    /// Get the start timestamp, if the run has started.
    #[must_use]
    pub const fn start_time(&self) -> Option<DateTime<Utc>> {
        self.start_time
    }

    /// Get the end timestamp, if the run has terminated.
    #[must_use]
    pub const fn end_time(&self) -> Option<DateTime<Utc>> {
        self.end_time
    }

    /// Get the lifecycle stage.
    #[must_use]
    pub const fn lifecycle_stage(&self) -> LifecycleStage {
        self.lifecycle_stage
    }

    /// Whether the run is active (not soft-deleted).
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.lifecycle_stage == LifecycleStage::Active
    }

    pub(crate) fn start_at(&mut self, at: DateTime<Utc>) {
        self.status = RecorderStatus::Running;
        self.start_time = Some(at);
    }

    pub(crate) fn terminate_at(&mut self, status: RecorderStatus, at: DateTime<Utc>) {
        self.status = status;
        self.end_time = Some(at);
    }

    pub(crate) fn mark_deleted(&mut self) {
        self.lifecycle_stage = LifecycleStage::Deleted;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recorder_new_is_scheduled() {
        let recorder = Recorder::new("run-1", "exp-1");
        assert_eq!(recorder.status(), RecorderStatus::Scheduled);
        assert!(recorder.start_time().is_none());
        assert!(recorder.is_active());
    }

    #[test]
    fn test_recorder_lifecycle() {
        let mut recorder = Recorder::new("run-1", "exp-1");
        let start = Utc::now();
        recorder.start_at(start);
        assert_eq!(recorder.status(), RecorderStatus::Running);
        recorder.terminate_at(RecorderStatus::Finished, start);
        assert_eq!(recorder.status(), RecorderStatus::Finished);
        assert_eq!(recorder.end_time(), Some(start));
        recorder.mark_deleted();
        assert!(!recorder.is_active());
    }

    #[test]
    fn test_status_parse_case_insensitive() {
        assert_eq!("finished".parse::<RecorderStatus>().unwrap(), RecorderStatus::Finished);
        assert!("DONE".parse::<RecorderStatus>().is_err());
        assert!(RecorderStatus::Killed.is_terminal());
        assert!(!RecorderStatus::Running.is_terminal());
    }
}
