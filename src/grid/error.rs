use chrono::{DateTime, Utc};
use polars::error::PolarsError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GridDataError {
    #[error("Failed to create cache directory '{0}'")]
    CacheDirCreation(PathBuf, #[source] std::io::Error),

    #[error("Failed to read grid metadata file '{0}'")]
    MetadataRead(PathBuf, #[source] std::io::Error),

    #[error("Failed to parse grid metadata file '{0}'")]
    MetadataParse(PathBuf, #[source] serde_json::Error),

    #[error("I/O error writing parquet cache file '{0}'")]
    ParquetWriteIo(PathBuf, #[source] std::io::Error),

    #[error("Encoding error writing parquet cache file '{0}'")]
    ParquetWritePolars(PathBuf, #[source] PolarsError),

    #[error("Failed to scan parquet grid file '{0}'")]
    ParquetScan(PathBuf, #[source] PolarsError),

    #[error("Network request failed for {0}")]
    NetworkRequest(String, #[source] reqwest::Error),

    #[error("HTTP request failed for {url} with status {status}")]
    HttpStatus {
        url: String,
        status: reqwest::StatusCode,
        #[source]
        source: reqwest::Error,
    },

    #[error("Data download or decompression failed")]
    DownloadIo(#[from] std::io::Error),

    #[error("I/O error processing CSV data for variable '{variable}'")]
    CsvReadIo {
        variable: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Parsing error processing CSV data for variable '{variable}'")]
    CsvReadPolars {
        variable: String,
        #[source]
        source: PolarsError,
    },

    #[error("Background task failed to complete")]
    TaskJoin(#[from] tokio::task::JoinError),

    #[error("Failed processing grid table: {0}")]
    FrameProcessing(#[from] PolarsError),

    #[error("Grid table for variable '{variable}' is missing column '{column}'")]
    MissingColumn { variable: String, column: String },

    #[error("No snapshot at {timestamp} for variable '{variable}'")]
    SnapshotNotFound {
        variable: String,
        timestamp: DateTime<Utc>,
    },

    #[error("Grid cell count mismatch: expected {expected} values, found {found}")]
    ShapeMismatch { expected: usize, found: usize },

    #[error("Grid table row references cell ({row}, {col}) outside a {ny}x{nx} grid")]
    CellOutOfRange {
        row: usize,
        col: usize,
        ny: usize,
        nx: usize,
    },

    #[error("Unexpected grid data for variable '{variable}': {message}")]
    UnexpectedData { variable: String, message: String },
}
