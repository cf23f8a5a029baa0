use thiserror::Error;

#[derive(Debug, Error)]
pub enum LiveDataError {
    #[error("No API key configured for the live weather provider")]
    MissingApiKey,

    #[error("Failed to build HTTP client")]
    HttpClient(#[source] reqwest::Error),

    #[error("Network request failed for {0}")]
    NetworkRequest(String, #[source] reqwest::Error),

    #[error("Failed to parse live weather response for '{location}'")]
    Decode {
        location: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Weather provider error for '{location}': {message}")]
    Provider { location: String, message: String },
}
