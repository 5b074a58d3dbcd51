//! # CLI Module
//!
//! The `metime` binary:
//!
//! ```bash
//! # Serve the bundled two-page demo
//! metime serve --addr 127.0.0.1:8080
//!
//! # Serve with a configuration file (YAML, or TOML by extension)
//! metime serve --config metime.yaml
//!
//! # Validate a configuration file and exit
//! metime check --config metime.toml
//! ```
//!
//! `METIME_*` environment variables override file values; see
//! [`crate::config`].

mod commands;

#[cfg(test)]
mod tests;

pub use commands::{demo_router, load_config, run_cli, Cli, Commands};
