//! # knit-config
//!
//! Layered configuration for the knit bundler: built-in defaults, a
//! `knit.toml` (or the `knit` field of `package.json`) and `KNIT_*`
//! environment variables, merged with figment.

pub mod config;
pub mod discovery;
pub mod error;
pub mod validation;

pub use config::{BuildSettings, InputOption, KnitConfig};
pub use discovery::{ConfigDiscovery, discover};
pub use error::{ConfigError, Result};
pub use validation::{MAX_ENTRIES, validate_file_pattern, validate_input};
