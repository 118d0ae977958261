//! Configuration errors.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("unsupported config file extension: {0}")]
    UnsupportedFormat(String),

    #[error("unknown CSV column: {0}")]
    UnknownColumn(String),

    #[error("unknown order-by type: {0}")]
    UnknownOrderBy(String),

    #[error("invalid alarm filter token: {0}")]
    InvalidAlarmFilter(String),

    #[error("invalid module filter regex: {0}")]
    InvalidModuleRegex(#[from] regex::Error),

    #[error("invalid time range: {0}")]
    InvalidTimeRange(String),

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error(transparent)]
    Value(#[from] agf_common::Error),
}
