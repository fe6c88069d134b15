//! Structured logging setup
//!
//! The library only emits `tracing` events; binaries and tests opt in to a
//! subscriber here. `RUST_LOG` wins over the default directive.

use tracing_subscriber::EnvFilter;

use crate::{Error, Result};

/// Default filter when `RUST_LOG` is unset.
pub const DEFAULT_DIRECTIVE: &str = "trueno_track=info";

/// Install a formatting subscriber with [`DEFAULT_DIRECTIVE`].
///
/// # Errors
///
/// Returns `Error::Other` if a global subscriber is already installed.
pub fn init_tracing() -> Result<()> {
    init_tracing_with(DEFAULT_DIRECTIVE)
}

/// Install a formatting subscriber with a custom default directive.
///
/// # Errors
///
/// Returns `Error::Config` for an unparseable directive and `Error::Other`
/// if a global subscriber is already installed.
pub fn init_tracing_with(default_directive: &str) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(default_directive).map_err(|e| {
            Error::Config(format!("invalid log directive {default_directive:?}: {e}"))
        })?,
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .map_err(|e| Error::Other(format!("tracing subscriber already installed: {e}")))
}
