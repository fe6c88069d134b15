//! Tracking configuration
//!
//! Loaded from TOML, then overridden by environment variables:
//!
//! ```toml
//! [search]
//! max_results = 5000
//! run_view_type = "all"
//!
//! [experiment]
//! default_name = "Default"
//! ```
//!
//! | variable                    | overrides              |
//! |-----------------------------|------------------------|
//! | `TRUENO_TRACK_MAX_RESULTS`  | `search.max_results`   |
//! | `TRUENO_TRACK_VIEW_TYPE`    | `search.run_view_type` |

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::search::{ViewType, DEFAULT_MAX_RESULTS};
use crate::{Error, Result};

/// Environment variable overriding `search.max_results`.
pub const ENV_MAX_RESULTS: &str = "TRUENO_TRACK_MAX_RESULTS";
/// Environment variable overriding `search.run_view_type`.
pub const ENV_VIEW_TYPE: &str = "TRUENO_TRACK_VIEW_TYPE";

/// Defaults applied to unset search options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchDefaults {
    /// Row cap when the caller gives none.
    pub max_results: usize,
    /// Lifecycle view when the caller gives none.
    pub run_view_type: ViewType,
}

impl Default for SearchDefaults {
    fn default() -> Self {
        Self {
            max_results: DEFAULT_MAX_RESULTS,
            run_view_type: ViewType::ActiveOnly,
        }
    }
}

/// Experiment-level defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentDefaults {
    /// Name used by `TrackedExperiment::get_or_create_default`.
    pub default_name: String,
}

impl Default for ExperimentDefaults {
    fn default() -> Self {
        Self {
            default_name: "Default".to_string(),
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    /// `[search]` section.
    pub search: SearchDefaults,
    /// `[experiment]` section.
    pub experiment: ExperimentDefaults,
}

impl TrackingConfig {
    /// Parse configuration from a TOML string. Missing keys keep defaults.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` on malformed TOML or out-of-range values.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(source).map_err(|e| Error::Config(format!("invalid TOML: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML file.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if the file cannot be read, `Error::Config` if it
    /// cannot be parsed.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let source = std::fs::read_to_string(path.as_ref())?;
        tracing::debug!(path = %path.as_ref().display(), "loading tracking config");
        Self::from_toml_str(&source)
    }

    /// Apply overrides from the process environment.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if an override cannot be parsed.
    pub fn with_env_overrides(self) -> Result<Self> {
        self.with_overrides(|name| std::env::var(name).ok())
    }

    /// Apply overrides from an arbitrary lookup (environment-shaped).
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if an override cannot be parsed.
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(ENV_MAX_RESULTS) {
            self.search.max_results = raw.trim().parse().map_err(|e| {
                Error::Config(format!("{ENV_MAX_RESULTS}={raw:?} is not a count: {e}"))
            })?;
        }
        if let Some(raw) = lookup(ENV_VIEW_TYPE) {
            self.search.run_view_type = raw
                .parse()
                .map_err(|e| Error::Config(format!("{ENV_VIEW_TYPE}: {e}")))?;
        }
        self.validate()?;
        Ok(self)
    }

    fn validate(&self) -> Result<()> {
        if self.search.max_results == 0 || self.search.max_results > DEFAULT_MAX_RESULTS {
            return Err(Error::Config(format!(
                "search.max_results must be between 1 and {DEFAULT_MAX_RESULTS}, got {}",
                self.search.max_results
            )));
        }
        if self.experiment.default_name.trim().is_empty() {
            return Err(Error::Config(
                "experiment.default_name must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
