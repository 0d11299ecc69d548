//! Configuration error types.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Port value is outside valid range (1-65535).
    #[error("invalid port '{value}': must be between 1 and 65535")]
    InvalidPort { value: String },

    /// Port string could not be parsed as a number.
    #[error("failed to parse port '{value}': {source}")]
    PortParseError {
        value: String,
        #[source]
        source: std::num::ParseIntError,
    },

    /// Bind address string could not be parsed.
    #[error("failed to parse bind address '{value}': {source}")]
    InvalidBindAddr {
        value: String,
        #[source]
        source: std::net::AddrParseError,
    },

    /// A required environment variable was not set. Surfaced as `FatalConfigError`: the process
    /// does not begin serving.
    #[error("missing required environment variable: {name}")]
    MissingEnvVar { name: &'static str },

    /// Specified path does not exist on the filesystem.
    #[error("path does not exist: {path}")]
    PathNotFound { path: PathBuf },

    /// Path exists but is not a file (when a file was expected).
    #[error("path is not a file: {path}")]
    NotAFile { path: PathBuf },

    /// Path exists but is not a directory (when a directory was expected).
    #[error("path is not a directory: {path}")]
    NotADirectory { path: PathBuf },

    /// A float-valued option fell outside its documented range.
    #[error("'{name}' must be in {range}, got {value}")]
    OutOfRange {
        name: &'static str,
        range: &'static str,
        value: f64,
    },

    /// An enum-valued option (e.g. `web_search_mode`) did not match any recognized variant.
    #[error("unrecognized value '{value}' for '{name}'")]
    InvalidEnumValue { name: &'static str, value: String },

    /// A loaded TOML profile contained a key not recognized by this configuration.
    #[error("unknown configuration key in profile: {key}")]
    UnknownProfileKey { key: String },
}
