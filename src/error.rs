//! Ошибки пайплайна

use std::path::PathBuf;

use thiserror::Error;

use crate::types::Column;

pub type Result<T> = std::result::Result<T, PipelineError>;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("cannot read {}: {source}", path.display())]
    Ingest {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed delimited data: {0}")]
    Csv(#[from] csv::Error),

    #[error("required column '{column}' is missing from the header")]
    MissingColumn { column: String },

    #[error("line {line}: cannot parse timestamp '{value}' (expected day-first date)")]
    Timestamp { line: u64, value: String },

    #[error("column {0} is constant, min-max scaling is undefined")]
    DegenerateColumn(Column),

    #[error("empty dataset: {0}")]
    EmptyDataset(&'static str),

    #[error("shape mismatch: expected {expected}, got {actual}")]
    Shape { expected: String, actual: String },

    #[error("model is not fitted")]
    NotFitted,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    Config(String),
}
