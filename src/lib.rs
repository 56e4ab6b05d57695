//! websift: command-line host for keyless web search.
//!
//! The search itself lives in [`websift_search`]. This crate loads the
//! TOML configuration, sets up logging and renders responses for the
//! `websift-host` binary.

pub mod config;
pub mod error;
pub mod output;

pub use error::{HostError, Result};
pub use output::OutputFormat;

use tracing_subscriber::EnvFilter;

/// Default log filter when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "websift=info,websift_search=info";

/// Initialise tracing to stderr so stdout carries only the response.
///
/// `RUST_LOG` overrides [`DEFAULT_LOG_FILTER`]. Calling this twice is a
/// no-op.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .try_init();
}
