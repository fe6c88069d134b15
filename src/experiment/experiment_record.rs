//! Experiment Record - identity of a tracked experiment

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Soft-delete state shared by experiments and runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleStage {
    /// Visible to default searches.
    #[default]
    Active,
    /// Soft-deleted; only visible to `DeletedOnly` / `All` searches.
    Deleted,
}

impl LifecycleStage {
    /// Stable lowercase name used in search results.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Deleted => "deleted",
        }
    }
}

/// Experiment Record identifies a named grouping of runs.
///
/// The `experiment_id` is assigned by the tracking backend and is unique
/// within it. Names are unique within the backend and are never reused.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExperimentRecord {
    experiment_id: String,
    name: String,
    lifecycle_stage: LifecycleStage,
    created_at: DateTime<Utc>,
    tags: BTreeMap<String, String>,
}

impl ExperimentRecord {
    /// Create a new active experiment record with the given ID and name.
    ///
    /// # Arguments
    ///
    /// * `experiment_id` - Backend-assigned identifier
    /// * `name` - Human-readable name for the experiment
    #[must_use]
    pub fn new(experiment_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self::builder(experiment_id, name).build()
    }

    /// Create a builder for constructing an experiment record with optional fields.
    #[must_use]
    pub fn builder(
        experiment_id: impl Into<String>,
        name: impl Into<String>,
    ) -> ExperimentRecordBuilder {
        ExperimentRecordBuilder::new(experiment_id, name)
    }

    /// Get the experiment ID.
    #[must_use]
    pub fn experiment_id(&self) -> &str {
        &self.experiment_id
    }

    /// Get the experiment name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the lifecycle stage.
    #[must_use]
    pub const fn lifecycle_stage(&self) -> LifecycleStage {
        self.lifecycle_stage
    }

    /// Get the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Get the experiment tags.
    #[must_use]
    pub const fn tags(&self) -> &BTreeMap<String, String> {
        &self.tags
    }
}

/// Builder for `ExperimentRecord`.
#[derive(Debug)]
pub struct ExperimentRecordBuilder {
    experiment_id: String,
    name: String,
    lifecycle_stage: LifecycleStage,
    created_at: DateTime<Utc>,
    tags: BTreeMap<String, String>,
}

impl ExperimentRecordBuilder {
    /// Create a new builder with required fields.
    #[must_use]
    pub fn new(experiment_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            experiment_id: experiment_id.into(),
            name: name.into(),
            lifecycle_stage: LifecycleStage::Active,
            created_at: Utc::now(),
            tags: BTreeMap::new(),
        }
    }

    /// Add a tag.
    #[must_use]
    pub fn tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// Set the lifecycle stage.
    #[must_use]
    pub const fn lifecycle_stage(mut self, stage: LifecycleStage) -> Self {
        self.lifecycle_stage = stage;
        self
    }

    /// Set a custom creation timestamp (useful for deserialization/testing).
    #[must_use]
    pub const fn created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    /// Build the `ExperimentRecord`.
    #[must_use]
    pub fn build(self) -> ExperimentRecord {
        ExperimentRecord {
            experiment_id: self.experiment_id,
            name: self.name,
            lifecycle_stage: self.lifecycle_stage,
            created_at: self.created_at,
            tags: self.tags,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_experiment_record_new_is_active() {
        let record = ExperimentRecord::new("1", "baseline");
        assert_eq!(record.experiment_id(), "1");
        assert_eq!(record.name(), "baseline");
        assert_eq!(record.lifecycle_stage(), LifecycleStage::Active);
        assert!(record.tags().is_empty());
    }

    #[test]
    fn test_experiment_record_builder_tags() {
        let record = ExperimentRecord::builder("2", "lgbm")
            .tag("owner", "quant")
            .tag("market", "csi300")
            .build();

        assert_eq!(record.tags().get("owner").map(String::as_str), Some("quant"));
        assert_eq!(record.tags().len(), 2);
    }

    #[test]
    fn test_lifecycle_stage_serializes_snake_case() {
        let json = serde_json::to_string(&LifecycleStage::Deleted).unwrap();
        assert_eq!(json, "\"deleted\"");
    }
}
