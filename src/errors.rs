// SPDX-License-Identifier: GPL-3.0-only

//! Error types for the fusion pipeline

use std::fmt;

/// Result type alias using PipelineError
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Failure conditions raised by pipeline stages
///
/// Every variant is handled locally on the capture path: the offending
/// frame is dropped and the pipeline keeps running. Nothing here is
/// allowed to propagate out of a capture callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    /// A stage was asked to process before its `prepare` call
    Unprepared(&'static str),
    /// A buffer pool has no free capacity; transient backpressure
    Exhausted,
    /// Orientation or format outside the supported table
    Unsupported(String),
    /// The capture source reported a hard error
    Source(String),
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::Unprepared(stage) => {
                write!(f, "Stage '{}' used before prepare", stage)
            }
            PipelineError::Exhausted => write!(f, "Buffer pool exhausted"),
            PipelineError::Unsupported(msg) => write!(f, "Unsupported input: {}", msg),
            PipelineError::Source(msg) => write!(f, "Capture source failure: {}", msg),
        }
    }
}

impl std::error::Error for PipelineError {}

/// Configuration loading errors
#[derive(Debug, Clone)]
pub enum ConfigError {
    /// Could not read the configuration file
    Io(String),
    /// The file contents did not parse
    Parse(String),
    /// A field value is out of range
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(msg) => write!(f, "Failed to read config: {}", msg),
            ConfigError::Parse(msg) => write!(f, "Failed to parse config: {}", msg),
            ConfigError::Invalid(msg) => write!(f, "Invalid config value: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::Parse(err.to_string())
    }
}
