//! Pulling the measurement document from the remote store and pushing it back with an
//! optimistic-concurrency check on the document's version token.

use crate::sync::cache::{Snapshot, SnapshotCache};
use crate::sync::error::SyncError;
use crate::sync::transport::{ContentTransport, GithubTransport, HttpReply};
use crate::sync::wire::{
    decode_content, encode_content, error_message, parse_document, render_document,
    ContentResponse, PutPayload,
};
use crate::types::record::{Record, RowResult};
use bon::bon;
use chrono::Local;
use log::{debug, info, warn};
use serde::Deserialize;
use std::time::SystemTime;

/// What the sync layer believes the remote document's version to be.
#[derive(Debug, Clone, PartialEq, Eq)]
enum BaseVersion {
    /// Nothing has been pulled or pushed yet.
    Unknown,
    /// The document did not exist at the last pull.
    Absent,
    Known(String),
}

impl BaseVersion {
    fn token(&self) -> Option<&str> {
        match self {
            BaseVersion::Known(token) => Some(token),
            _ => None,
        }
    }
}

/// Result of a pull.
#[derive(Debug)]
pub enum PullOutcome {
    Fetched {
        rows: Vec<RowResult>,
        /// Version token of the pulled document.
        token: String,
        from_cache: bool,
    },
    /// The document does not exist or is empty. This is a valid initial state.
    Missing { message: String },
}

impl PullOutcome {
    pub fn rows(&self) -> &[RowResult] {
        match self {
            PullOutcome::Fetched { rows, .. } => rows,
            PullOutcome::Missing { .. } => &[],
        }
    }

    pub fn into_rows(self) -> Vec<RowResult> {
        match self {
            PullOutcome::Fetched { rows, .. } => rows,
            PullOutcome::Missing { .. } => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushOutcome {
    /// The document did not exist and was created.
    Created,
    Updated,
    /// The remote changed since the last pull; nothing was written.
    Conflict {
        expected: Option<String>,
        found: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushReport {
    pub outcome: PushOutcome,
    /// Pretty-printed outgoing payload, present in developer mode.
    pub payload_preview: Option<String>,
}

impl PushReport {
    pub fn is_written(&self) -> bool {
        !matches!(self.outcome, PushOutcome::Conflict { .. })
    }

    /// Turns a conflict outcome into [`SyncError::Conflict`].
    pub fn ensure_written(&self) -> Result<(), SyncError> {
        match &self.outcome {
            PushOutcome::Conflict { expected, found } => Err(SyncError::Conflict {
                expected: expected.clone(),
                found: found.clone(),
            }),
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct PutResponse {
    content: Option<PutContent>,
}

#[derive(Debug, Deserialize)]
struct PutContent {
    sha: Option<String>,
}

/// Reads and writes the remote measurement document.
///
/// `RemoteSync` remembers the version token of the last document it pulled or wrote. A push
/// first re-reads the current token; if another writer changed the document in the meantime
/// the push is reported as [`PushOutcome::Conflict`] and nothing is written. The check is
/// detect-only: reloading and re-applying local changes is left to the caller.
///
/// # Examples
///
/// ```
/// use wetterweiser::{MemoryRemote, MeasurementStore, PushOutcome, RemoteSync};
///
/// let mut sync = RemoteSync::builder().transport(MemoryRemote::new()).build();
/// let mut store = MeasurementStore::new();
/// store.import_rows(sync.pull()?.into_rows());
///
/// let report = sync.push(&store.as_table(), false)?;
/// assert_eq!(report.outcome, PushOutcome::Created);
/// # Ok::<(), wetterweiser::SyncError>(())
/// ```
#[derive(Debug)]
pub struct RemoteSync<T: ContentTransport = GithubTransport> {
    transport: T,
    cache: SnapshotCache,
    base: BaseVersion,
}

#[bon]
impl<T: ContentTransport> RemoteSync<T> {
    /// Creates a sync handle over `transport`, with an in-memory cache of the default TTL
    /// unless `cache` is given.
    #[builder]
    pub fn new(transport: T, cache: Option<SnapshotCache>) -> Self {
        Self {
            transport,
            cache: cache.unwrap_or_default(),
            base: BaseVersion::Unknown,
        }
    }
}

impl<T: ContentTransport> RemoteSync<T> {
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Version token of the last pulled or written document, if any.
    pub fn base_token(&self) -> Option<&str> {
        self.base.token()
    }

    /// Fetches the remote document, bypassing and refreshing the snapshot cache.
    ///
    /// # Returns
    ///
    /// [`PullOutcome::Fetched`] with one entry per document element (malformed elements are
    /// `Err` entries), or [`PullOutcome::Missing`] when the document does not exist or is empty.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError`] on transport failure, a non-success status other than 404, or an
    /// undecodable document. The base version token is left unchanged in that case.
    pub fn pull(&mut self) -> Result<PullOutcome, SyncError> {
        let key = self.transport.describe();
        let reply = self.transport.fetch()?;
        if reply.status == 404 {
            let message = error_message(&reply.body);
            info!("Remote document {} not found: {}", key, message);
            self.base = BaseVersion::Absent;
            return Ok(PullOutcome::Missing { message });
        }
        let response = self.parse_content_response(&reply)?;

        let sha = response.sha.unwrap_or_default();
        let content = response.content.unwrap_or_default();
        let document = if content.trim().is_empty() {
            String::new()
        } else {
            decode_content(&content)?
        };
        if document.trim().is_empty() {
            let message = response
                .message
                .unwrap_or_else(|| "Remote document is empty".to_string());
            info!("{}: {}", key, message);
            self.base = if sha.is_empty() {
                BaseVersion::Absent
            } else {
                BaseVersion::Known(sha)
            };
            return Ok(PullOutcome::Missing { message });
        }

        let rows = parse_document(&document)?;
        info!("Pulled {} entries from {}", rows.len(), key);
        self.base = BaseVersion::Known(sha.clone());

        let snapshot = Snapshot {
            key,
            fetched_at: SystemTime::now(),
            token: sha.clone(),
            document,
        };
        if let Err(e) = self.cache.store(snapshot) {
            warn!("Failed to cache remote snapshot: {}", e);
        }
        Ok(PullOutcome::Fetched {
            rows,
            token: sha,
            from_cache: false,
        })
    }

    /// Like [`RemoteSync::pull`], but serves a snapshot younger than the cache TTL when one
    /// exists. Cache failures fall back to a remote pull.
    pub fn pull_cached(&mut self) -> Result<PullOutcome, SyncError> {
        self.pull_cached_at(SystemTime::now())
    }

    fn pull_cached_at(&mut self, now: SystemTime) -> Result<PullOutcome, SyncError> {
        let key = self.transport.describe();
        match self.cache.fresh(&key, now) {
            Ok(Some(snapshot)) => match parse_document(&snapshot.document) {
                Ok(rows) => {
                    self.base = BaseVersion::Known(snapshot.token.clone());
                    return Ok(PullOutcome::Fetched {
                        rows,
                        token: snapshot.token,
                        from_cache: true,
                    });
                }
                Err(e) => warn!("Discarding unreadable cached snapshot: {}", e),
            },
            Ok(None) => {}
            Err(e) => warn!("Snapshot cache unavailable: {}", e),
        }
        self.pull()
    }

    /// Writes `records` as the full remote document.
    ///
    /// The current version token is fetched first. If it differs from the token of the last
    /// pull the write is skipped and [`PushOutcome::Conflict`] is returned; the same outcome is
    /// returned when the remote itself rejects the token (409/422). With `developer_mode` the
    /// report carries the outgoing payload.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError`] on transport failure or any other non-success status, with the
    /// remote's message verbatim. The caller's store is never touched, so after a failure it is
    /// simply ahead of the remote.
    pub fn push(
        &mut self,
        records: &[Record],
        developer_mode: bool,
    ) -> Result<PushReport, SyncError> {
        let document = render_document(records)?;
        let current = self.current_token()?;

        let payload = PutPayload {
            message: format!(
                "Update Wetterdaten {}",
                Local::now().format("%Y-%m-%d %H:%M:%S")
            ),
            content: encode_content(&document),
            branch: self.transport.branch().to_string(),
            sha: current.clone(),
        };
        let payload_preview = if developer_mode {
            let preview = serde_json::to_string_pretty(&payload).map_err(SyncError::Encode)?;
            debug!("Outgoing payload:\n{}", preview);
            Some(preview)
        } else {
            None
        };

        let expected = match &self.base {
            BaseVersion::Unknown => {
                warn!("Pushing without a prior pull; concurrent changes cannot be detected");
                current.clone()
            }
            BaseVersion::Absent => None,
            BaseVersion::Known(token) => Some(token.clone()),
        };
        if expected != current {
            warn!(
                "Remote document changed since last pull (expected {:?}, found {:?})",
                expected, current
            );
            self.cache.invalidate();
            return Ok(PushReport {
                outcome: PushOutcome::Conflict {
                    expected,
                    found: current,
                },
                payload_preview,
            });
        }

        let reply = self.transport.store(&payload)?;
        if reply.status == 409 || reply.status == 422 {
            warn!("Remote rejected write: {}", error_message(&reply.body));
            self.cache.invalidate();
            return Ok(PushReport {
                outcome: PushOutcome::Conflict {
                    expected: current,
                    found: None,
                },
                payload_preview,
            });
        }
        if !reply.is_success() {
            return Err(self.status_error(&reply));
        }

        self.base = serde_json::from_str::<PutResponse>(&reply.body)
            .ok()
            .and_then(|r| r.content)
            .and_then(|c| c.sha)
            .map(BaseVersion::Known)
            .unwrap_or(BaseVersion::Unknown);
        self.cache.invalidate();

        let outcome = if current.is_none() {
            PushOutcome::Created
        } else {
            PushOutcome::Updated
        };
        info!(
            "Pushed {} measurements to {} ({:?})",
            records.len(),
            self.transport.describe(),
            outcome
        );
        Ok(PushReport {
            outcome,
            payload_preview,
        })
    }

    /// Reads the document's current version token; `None` when it does not exist.
    fn current_token(&self) -> Result<Option<String>, SyncError> {
        let reply = self.transport.fetch()?;
        if reply.status == 404 {
            return Ok(None);
        }
        Ok(self.parse_content_response(&reply)?.sha)
    }

    fn parse_content_response(&self, reply: &HttpReply) -> Result<ContentResponse, SyncError> {
        if !reply.is_success() {
            return Err(self.status_error(reply));
        }
        serde_json::from_str(&reply.body).map_err(SyncError::DecodeJson)
    }

    fn status_error(&self, reply: &HttpReply) -> SyncError {
        SyncError::HttpStatus {
            url: self.transport.describe(),
            status: reply.status,
            message: error_message(&reply.body),
        }
    }
}
