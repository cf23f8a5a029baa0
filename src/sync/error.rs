use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Failed to build HTTP client")]
    HttpClient(#[source] reqwest::Error),

    #[error("Network request failed for {0}")]
    NetworkRequest(String, #[source] reqwest::Error),

    #[error("Remote request to {url} failed with status {status}: {message}")]
    HttpStatus {
        url: String,
        status: u16,
        message: String,
    },

    #[error("Remote document content is not valid base64")]
    DecodeBase64(#[source] base64::DecodeError),

    #[error("Remote document content is not valid UTF-8")]
    DecodeUtf8(#[source] std::string::FromUtf8Error),

    #[error("Failed to parse remote JSON")]
    DecodeJson(#[source] serde_json::Error),

    #[error("Failed to serialize measurements")]
    Encode(#[source] serde_json::Error),

    #[error(
        "Remote document changed since it was loaded (expected version {expected:?}, found {found:?})"
    )]
    Conflict {
        expected: Option<String>,
        found: Option<String>,
    },

    #[error("No access token configured for writing to the remote document")]
    MissingCredentials,

    #[error("Failed to create cache directory '{0}'")]
    CacheDirCreation(PathBuf, #[source] std::io::Error),

    #[error("Failed to read cache file '{0}'")]
    CacheRead(PathBuf, #[source] std::io::Error),

    #[error("Failed to write cache file '{0}'")]
    CacheWrite(PathBuf, #[source] std::io::Error),

    #[error("Failed to decode cache data from '{0}'")]
    CacheDecode(PathBuf, #[source] Box<bincode::error::DecodeError>),

    #[error("Failed to encode cache data")]
    CacheEncode(#[source] Box<bincode::error::EncodeError>),

    #[error("Failed to calculate system time difference for snapshot of '{0}'")]
    SystemTimeCalculation(String, #[source] std::time::SystemTimeError),
}
