//! # trueno-track: Experiment Tracking Layer
//!
//! An experiment groups recorder runs. trueno-track gives experiments three
//! operations and leaves the heavy lifting to a tracking backend:
//!
//! - **create** a recorder (run) under the experiment
//! - **search** run records by filter, lifecycle view, row cap and ordering,
//!   returned as an Arrow `RecordBatch`
//! - **delete** a recorder
//!
//! ## Layers
//!
//! - [`experiment`]: the [`Experiment`](experiment::Experiment) contract,
//!   its inert base form and the backend-bound
//!   [`TrackedExperiment`](experiment::TrackedExperiment)
//! - [`backend`]: the [`TrackingBackend`](backend::TrackingBackend)
//!   capability set and an in-memory implementation
//! - [`search`]: search options, filter / order-by grammar, result layout
//! - [`config`] and [`telemetry`]: TOML configuration and `tracing` setup
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use trueno_track::backend::{MemoryBackend, TrackingBackend};
//! use trueno_track::experiment::{Experiment, Metric, TrackedExperiment};
//! use trueno_track::search::SearchOptions;
//!
//! # fn main() -> trueno_track::Result<()> {
//! let backend = Arc::new(MemoryBackend::new());
//! let mut experiment = TrackedExperiment::create(Arc::clone(&backend), "csi300_lgbm")?;
//!
//! for (i, ic) in [0.031, 0.046, 0.012].into_iter().enumerate() {
//!     let recorder = experiment.create_recorder()?;
//!     backend.log_param(recorder.recorder_id(), "seed", &i.to_string())?;
//!     backend.log_metric(recorder.recorder_id(), Metric::new("ic", ic, 0))?;
//! }
//!
//! let best = experiment.search_records(
//!     SearchOptions::new()
//!         .filter("metrics.ic > 0.02")
//!         .order_by(["metrics.ic DESC"]),
//! )?;
//! assert_eq!(best.num_rows(), 2);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod backend;
pub mod config;
pub mod error;
pub mod experiment;
pub mod search;
pub mod telemetry;

pub use error::{Error, Result};
