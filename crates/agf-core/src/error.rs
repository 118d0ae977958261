//! Errors raised by the fetch engine.

use std::path::PathBuf;

use agf_config::ConfigError;
use thiserror::Error;

use crate::format::TemplateError;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("interrupted while waiting for an admission permit")]
    AdmissionInterrupted,

    #[error("worker pool rejected the task: pool is shut down")]
    SubmissionRejected,

    #[error("failed to compress aggregate payload: {0}")]
    Compress(String),

    #[error("failed to decompress aggregate payload: {0}")]
    Decompress(String),

    #[error(transparent)]
    Decode(#[from] agf_common::Error),

    #[error("failed to write {path}: {source}")]
    FileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("template error: {0}")]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to start worker runtime: {0}")]
    Runtime(#[source] std::io::Error),

    #[error("failed to install log subscriber: {0}")]
    Logging(String),
}

impl FetchError {
    /// Wrap an I/O error with the file it concerns.
    pub fn file_write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        FetchError::FileWrite {
            path: path.into(),
            source,
        }
    }

    /// True for errors the producer sees from [`crate::BoundedExecutor::submit_task`].
    pub fn is_admission(&self) -> bool {
        matches!(
            self,
            FetchError::AdmissionInterrupted | FetchError::SubmissionRejected
        )
    }
}

pub type Result<T> = std::result::Result<T, FetchError>;
