use polars::error::PolarsError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TableError {
    #[error("Failed to build table frame")]
    Frame(#[source] PolarsError),

    #[error("Failed to write CSV output")]
    CsvWrite(#[source] PolarsError),

    #[error("Failed to parse CSV data from '{0}'")]
    CsvRead(PathBuf, #[source] PolarsError),

    #[error("I/O error staging CSV data")]
    StagingIo(#[source] std::io::Error),

    #[error("CSV output is not valid UTF-8")]
    Utf8(#[from] std::string::FromUtf8Error),
}
