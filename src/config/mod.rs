//! Configuration module for authtunnel
//!
//! This module provides configuration loading, environment overrides, and
//! startup validation.

mod config;
pub mod environment;
pub mod validator;

// Re-export the main configuration types
pub use config::{AuthStrategy, Config, DownstreamConfig, ServerConfig};
pub use environment::{EnvVars, EnvironmentOverrides};
pub use validator::ConfigValidator;

use crate::error::Result;
use std::path::Path;

/// Load a config file, apply environment overrides, and validate.
///
/// This is the single entry point used by `main`; tests construct `Config`
/// values directly.
pub fn load_config(path: &Path) -> Result<Config> {
    let mut config = Config::from_file(path)?;
    EnvironmentOverrides::load().apply_to_config(&mut config);
    ConfigValidator::validate(&config)?;
    Ok(config)
}
