use crate::config::error::ConfigError;
use crate::ingest::error::LiveDataError;
use crate::store::error::TableError;
use crate::sync::error::SyncError;
use crate::types::error::RecordError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WetterError {
    #[error(transparent)]
    Record(#[from] RecordError),

    #[error(transparent)]
    Sync(#[from] SyncError),

    #[error(transparent)]
    Table(#[from] TableError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    LiveData(#[from] LiveDataError),

    #[error("Deleting measurements requires developer mode")]
    DeletionNotAllowed,

    #[error("Failed to determine cache directory")]
    CacheDirResolution(#[source] std::io::Error),
}
