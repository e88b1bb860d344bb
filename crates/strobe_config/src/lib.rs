//! Parsing and validation of `strobe.toml` harness configuration files.
//!
//! This crate reads the configuration file and produces a strongly-typed
//! [`StrobeConfig`]: the device parameters the harness is built against, the
//! clock domains it drives, and the knobs of the scenario suite. The width
//! ratio precondition is checked here, before any simulation is built.

#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod types;

pub use error::ConfigError;
pub use loader::{
    load_config, load_config_file, load_config_from_str, prepare_config, validate_config,
    validate_widths, CONFIG_FILE_NAME,
};
pub use types::*;
