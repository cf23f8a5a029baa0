//! The seam between [`crate::RemoteSync`] and the remote content store.

use crate::sync::error::SyncError;
use crate::sync::wire::PutPayload;
use bon::bon;
use log::debug;
use reqwest::blocking::Client;
use std::time::Duration;

pub const DEFAULT_API_BASE: &str = "https://api.github.com";
pub const DEFAULT_BRANCH: &str = "main";
pub const DEFAULT_DOCUMENT_PATH: &str = "wetterdaten.json";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);
const USER_AGENT: &str = concat!("wetterweiser/", env!("CARGO_PKG_VERSION"));

/// Status and body of a remote answer, whatever the status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    pub status: u16,
    pub body: String,
}

impl HttpReply {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// A versioned remote document, addressed by path and branch.
///
/// Implementations report every HTTP answer as an [`HttpReply`], including 4xx/5xx; only
/// failures to get an answer at all are errors. Status semantics follow the GitHub contents
/// API: 404 for a missing document, 409/422 when a write carries a stale or missing version
/// token.
pub trait ContentTransport {
    /// Reads the current document and its version token.
    fn fetch(&self) -> Result<HttpReply, SyncError>;

    /// Writes a new document version.
    fn store(&self, payload: &PutPayload) -> Result<HttpReply, SyncError>;

    /// Branch the document lives on.
    fn branch(&self) -> &str;

    /// Human-readable address of the document, used in messages.
    fn describe(&self) -> String;
}

/// [`ContentTransport`] over the GitHub REST contents API.
#[derive(Debug, Clone)]
pub struct GithubTransport {
    client: Client,
    api_base: String,
    repository: String,
    branch: String,
    path: String,
    token: Option<String>,
}

#[bon]
impl GithubTransport {
    /// Creates a transport for `repository` (`owner/name`).
    ///
    /// Reads work without a token on public repositories; writes require one.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::HttpClient`] if the HTTP client cannot be constructed.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use wetterweiser::GithubTransport;
    ///
    /// let transport = GithubTransport::builder()
    ///     .repository("octo/weather-data")
    ///     .token("ghp_example")
    ///     .build()?;
    /// # Ok::<(), wetterweiser::SyncError>(())
    /// ```
    #[builder]
    pub fn new(
        #[builder(into)] repository: String,
        #[builder(into, default = DEFAULT_BRANCH.to_string())] branch: String,
        #[builder(into, default = DEFAULT_DOCUMENT_PATH.to_string())] path: String,
        #[builder(into)] token: Option<String>,
        #[builder(into, default = DEFAULT_API_BASE.to_string())] api_base: String,
        #[builder(default = DEFAULT_TIMEOUT)] timeout: Duration,
    ) -> Result<Self, SyncError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(SyncError::HttpClient)?;
        Ok(Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            repository,
            branch,
            path,
            token: token.filter(|t| !t.is_empty()),
        })
    }
}

impl GithubTransport {
    fn contents_url(&self) -> String {
        format!(
            "{}/repos/{}/contents/{}",
            self.api_base, self.repository, self.path
        )
    }

    fn with_auth(
        &self,
        request: reqwest::blocking::RequestBuilder,
    ) -> reqwest::blocking::RequestBuilder {
        let request = request.header("Accept", "application/vnd.github+json");
        match &self.token {
            Some(token) => request.header("Authorization", format!("token {token}")),
            None => request,
        }
    }

    fn into_reply(
        url: String,
        response: reqwest::blocking::Response,
    ) -> Result<HttpReply, SyncError> {
        let status = response.status().as_u16();
        let body = response
            .text()
            .map_err(|e| SyncError::NetworkRequest(url, e))?;
        Ok(HttpReply { status, body })
    }
}

impl ContentTransport for GithubTransport {
    fn fetch(&self) -> Result<HttpReply, SyncError> {
        let url = self.contents_url();
        debug!("GET {}?ref={}", url, self.branch);
        let response = self
            .with_auth(self.client.get(&url))
            .query(&[("ref", self.branch.as_str())])
            .send()
            .map_err(|e| SyncError::NetworkRequest(url.clone(), e))?;
        Self::into_reply(url, response)
    }

    fn store(&self, payload: &PutPayload) -> Result<HttpReply, SyncError> {
        if self.token.is_none() {
            return Err(SyncError::MissingCredentials);
        }
        let url = self.contents_url();
        debug!("PUT {} (update: {})", url, payload.sha.is_some());
        let response = self
            .with_auth(self.client.put(&url))
            .json(payload)
            .send()
            .map_err(|e| SyncError::NetworkRequest(url.clone(), e))?;
        Self::into_reply(url, response)
    }

    fn branch(&self) -> &str {
        &self.branch
    }

    fn describe(&self) -> String {
        format!("{}/{}@{}", self.repository, self.path, self.branch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() -> Result<(), SyncError> {
        let transport = GithubTransport::builder()
            .repository("octo/data")
            .api_base("https://example.invalid/")
            .build()?;
        assert_eq!(transport.branch(), DEFAULT_BRANCH);
        assert_eq!(
            transport.contents_url(),
            "https://example.invalid/repos/octo/data/contents/wetterdaten.json"
        );
        assert_eq!(transport.describe(), "octo/data/wetterdaten.json@main");
        Ok(())
    }

    #[test]
    fn test_store_without_token_is_refused() -> Result<(), SyncError> {
        let transport = GithubTransport::builder()
            .repository("octo/data")
            .token("")
            .build()?;
        let payload = PutPayload {
            message: "m".into(),
            content: String::new(),
            branch: "main".into(),
            sha: None,
        };
        assert!(matches!(
            transport.store(&payload),
            Err(SyncError::MissingCredentials)
        ));
        Ok(())
    }

    #[test]
    fn test_reply_success_range() {
        assert!(HttpReply::new(201, "").is_success());
        assert!(!HttpReply::new(409, "").is_success());
        assert!(!HttpReply::new(302, "").is_success());
    }
}
