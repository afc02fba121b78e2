//! Configuration loading errors
//!
//! The simulation itself never fails; only reading upgrade/tuning files can.

use thiserror::Error;

/// Errors that can occur while loading a JSON configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    /// File contents are not valid JSON for the expected shape
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Result type for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;
