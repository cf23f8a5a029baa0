use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum RecordError {
    #[error("Row has no date")]
    MissingDate,

    #[error("Unrecognised date '{0}'")]
    InvalidDate(String),

    #[error("Field '{field}' is not a number: '{value}'")]
    InvalidNumber { field: &'static str, value: String },

    #[error("Unknown source '{0}'")]
    UnknownSource(String),
}
