use polars::prelude::PolarsError;
use std::path::PathBuf;
use thiserror::Error;

/// Failure classes of the clean and load stages.
///
/// Callers decide severity per variant: `MissingInput` is a skip, per-file and
/// per-table failures are logged and the batch continues, while schema and
/// connection failures stop the run.
#[derive(Error, Debug)]
pub enum EtlError {
    #[error("input file not found: {}", .0.display())]
    MissingInput(PathBuf),

    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: PolarsError,
    },

    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: PolarsError,
    },

    #[error("{dataset} is missing required column '{column}'")]
    MissingColumn { dataset: String, column: String },

    #[error("schema definition not found: {}", .0.display())]
    SchemaNotFound(PathBuf),

    #[error("schema statement #{index} failed: {source}")]
    SchemaStatement {
        index: usize,
        #[source]
        source: sqlx::Error,
    },

    #[error("cannot reach database: {0}")]
    Connection(#[source] sqlx::Error),

    #[error(transparent)]
    Frame(#[from] PolarsError),

    #[error(transparent)]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl EtlError {
    pub fn missing_column(dataset: &str, column: &str) -> Self {
        EtlError::MissingColumn {
            dataset: dataset.to_string(),
            column: column.to_string(),
        }
    }
}

pub type EtlResult<T> = std::result::Result<T, EtlError>;
