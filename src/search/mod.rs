//! Run search: options, filter grammar, ordering, and tabular results
//!
//! A search is scoped to a list of experiment ids and narrowed by four
//! knobs, each with a default:
//!
//! | knob            | default        |
//! |-----------------|----------------|
//! | `filter_string` | `""` (all)     |
//! | `run_view_type` | `ActiveOnly`   |
//! | `max_results`   | `100000`       |
//! | `order_by`      | backend order  |
//!
//! ## Filter grammar
//!
//! ```text
//! filter  := clause ( AND clause )*
//! clause  := entity "." key op value
//! entity  := metrics | params | tags | attributes   (singular forms accepted)
//! ```
//!
//! Keys containing spaces or dashes are quoted with back-ticks:
//! ``metrics.`val loss` < 0.3``.
//!
//! ## Example
//!
//! ```rust
//! use trueno_track::search::{Filter, SearchOptions, ViewType};
//!
//! let options = SearchOptions::new()
//!     .filter("metrics.ic > 0.03 AND params.model = 'lgbm'")
//!     .view_type(ViewType::All)
//!     .order_by(["metrics.ic DESC"]);
//! assert_eq!(options.max_results, None);
//!
//! let filter = Filter::parse("metrics.ic > 0.03 AND params.model = 'lgbm'").unwrap();
//! assert_eq!(filter.clauses().len(), 2);
//! ```

mod field;
mod filter;
mod frame;
mod order;

pub use field::{Attribute, FieldValue, RunField, RunRow};
pub use filter::{Clause, Comparator, Filter, FilterValue};
pub use frame::{build_batch, ATTRIBUTE_COLUMNS};
pub use order::{sort_rows, OrderKey};

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::SearchDefaults;
use crate::{Error, Result};

/// Maximum number of rows a single search may return.
pub const DEFAULT_MAX_RESULTS: usize = 100_000;

/// Which lifecycle stages a search sees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ViewType {
    /// Only active runs.
    #[default]
    ActiveOnly = 1,
    /// Only soft-deleted runs.
    DeletedOnly = 2,
    /// Active and deleted runs.
    All = 3,
}

impl ViewType {
    /// Whether a run in `stage` is visible under this view.
    #[must_use]
    pub fn includes(self, stage: crate::experiment::LifecycleStage) -> bool {
        use crate::experiment::LifecycleStage;
        match self {
            Self::ActiveOnly => stage == LifecycleStage::Active,
            Self::DeletedOnly => stage == LifecycleStage::Deleted,
            Self::All => true,
        }
    }
}

impl TryFrom<i32> for ViewType {
    type Error = Error;

    fn try_from(value: i32) -> Result<Self> {
        match value {
            1 => Ok(Self::ActiveOnly),
            2 => Ok(Self::DeletedOnly),
            3 => Ok(Self::All),
            other => Err(Error::InvalidInput(format!(
                "run view type must be 1 (active only), 2 (deleted only) or 3 (all), got {other}"
            ))),
        }
    }
}

impl FromStr for ViewType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active_only" | "active" | "1" => Ok(Self::ActiveOnly),
            "deleted_only" | "deleted" | "2" => Ok(Self::DeletedOnly),
            "all" | "3" => Ok(Self::All),
            other => Err(Error::InvalidInput(format!("unknown run view type: {other}"))),
        }
    }
}

impl fmt::Display for ViewType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::ActiveOnly => "active_only",
            Self::DeletedOnly => "deleted_only",
            Self::All => "all",
        })
    }
}

/// Caller-facing search criteria. Unset fields take the defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchOptions {
    /// Filter expression; `None` or empty matches every run.
    pub filter_string: Option<String>,
    /// Lifecycle view.
    pub run_view_type: Option<ViewType>,
    /// Row cap.
    pub max_results: Option<usize>,
    /// Ordering clauses such as `"metrics.rmse DESC"`.
    pub order_by: Option<Vec<String>>,
}

impl SearchOptions {
    /// Options with every knob unset.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the filter expression.
    #[must_use]
    pub fn filter(mut self, filter_string: impl Into<String>) -> Self {
        self.filter_string = Some(filter_string.into());
        self
    }

    /// Set the lifecycle view.
    #[must_use]
    pub const fn view_type(mut self, view_type: ViewType) -> Self {
        self.run_view_type = Some(view_type);
        self
    }

    /// Set the row cap.
    #[must_use]
    pub const fn max_results(mut self, max_results: usize) -> Self {
        self.max_results = Some(max_results);
        self
    }

    /// Set the ordering clauses.
    #[must_use]
    pub fn order_by<I, S>(mut self, order_by: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.order_by = Some(order_by.into_iter().map(Into::into).collect());
        self
    }
}

/// A fully resolved search, as handed to a tracking backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    /// Experiments the search is scoped to.
    pub experiment_ids: Vec<String>,
    /// Filter expression (`""` matches all).
    pub filter_string: String,
    /// Lifecycle view.
    pub run_view_type: ViewType,
    /// Row cap.
    pub max_results: usize,
    /// Ordering clauses; `None` leaves ordering to the backend.
    pub order_by: Option<Vec<String>>,
}

impl SearchQuery {
    /// Resolve `options` against `defaults` for the given experiments.
    #[must_use]
    pub fn resolve(
        experiment_ids: Vec<String>,
        options: SearchOptions,
        defaults: &SearchDefaults,
    ) -> Self {
        Self {
            experiment_ids,
            filter_string: options.filter_string.unwrap_or_default(),
            run_view_type: options.run_view_type.unwrap_or(defaults.run_view_type),
            max_results: options.max_results.unwrap_or(defaults.max_results),
            order_by: options.order_by,
        }
    }

    /// Check the row cap bounds.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if `max_results` is zero or above
    /// [`DEFAULT_MAX_RESULTS`].
    pub fn validate(&self) -> Result<()> {
        if self.max_results == 0 || self.max_results > DEFAULT_MAX_RESULTS {
            return Err(Error::InvalidInput(format!(
                "max_results must be between 1 and {DEFAULT_MAX_RESULTS}, got {}",
                self.max_results
            )));
        }
        Ok(())
    }
}
