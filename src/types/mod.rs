pub mod error;
pub mod into_timestamp;
pub mod measurement;
pub mod record;
pub mod source;
