use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the scoring core.
///
/// Missing category scores and empty populations are not errors; they are
/// carried in the output as a `missing` flag and a zero count.
#[derive(Debug, Error)]
pub enum ScoreError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("invalid category table: {0}")]
    InvalidCategoryTable(String),

    #[error("failed to load category table from {path}: {message}")]
    Config { path: PathBuf, message: String },
}

pub type ScoreResult<T> = Result<T, ScoreError>;
