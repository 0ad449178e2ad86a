//! Parsing and validation of `strata.toml` placer configuration.
//!
//! The file has three optional sections, `[placer]`, `[analytical]` and
//! `[noc]`; every field has a default, so an empty file is a valid
//! configuration for bounding-box or timing-driven annealing.

#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod types;

pub use error::ConfigError;
pub use loader::{load_config, load_config_from_str, validate_config, CONFIG_FILE_NAME};
pub use types::*;
