//! In-memory remote document for tests and offline demos.

use crate::sync::error::SyncError;
use crate::sync::transport::{ContentTransport, HttpReply};
use crate::sync::wire::{encode_content, PutPayload};
use serde_json::json;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;

#[derive(Debug, Clone)]
struct StoredDocument {
    text: String,
    sha: String,
}

/// A [`ContentTransport`] holding the document in memory, with the GitHub status semantics
/// (404 when absent, 409 on a stale version token, 422 when an update omits the token).
///
/// [`MemoryRemote::external_write`] simulates another session writing in between, and
/// [`MemoryRemote::set_unreachable`] makes every call fail like a dropped connection.
///
/// # Examples
///
/// ```
/// use wetterweiser::{MemoryRemote, RemoteSync};
///
/// let remote = MemoryRemote::with_document(r#"[{"Datum": "2024-06-01", "Standort": "Ulm"}]"#);
/// let mut sync = RemoteSync::builder().transport(remote).build();
/// let pulled = sync.pull()?;
/// assert_eq!(pulled.rows().len(), 1);
/// # Ok::<(), wetterweiser::SyncError>(())
/// ```
#[derive(Debug, Default)]
pub struct MemoryRemote {
    branch: String,
    document: Mutex<Option<StoredDocument>>,
    revision: AtomicU32,
    fetches: AtomicU32,
    stores: AtomicU32,
    unreachable: AtomicBool,
}

impl MemoryRemote {
    /// An empty remote: the document does not exist yet.
    pub fn new() -> Self {
        Self {
            branch: "main".to_string(),
            ..Self::default()
        }
    }

    pub fn with_document(text: &str) -> Self {
        let remote = Self::new();
        remote.external_write(text);
        remote
    }

    /// Replaces the document as another writer would, producing a new version token.
    pub fn external_write(&self, text: &str) -> String {
        let sha = self.next_sha();
        if let Ok(mut document) = self.document.lock() {
            *document = Some(StoredDocument {
                text: text.to_string(),
                sha: sha.clone(),
            });
        }
        sha
    }

    /// Current document text, if any.
    pub fn document(&self) -> Option<String> {
        self.current().map(|d| d.text)
    }

    /// Current version token, if the document exists.
    pub fn version(&self) -> Option<String> {
        self.current().map(|d| d.sha)
    }

    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }

    pub fn fetch_count(&self) -> u32 {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn store_count(&self) -> u32 {
        self.stores.load(Ordering::SeqCst)
    }

    fn current(&self) -> Option<StoredDocument> {
        self.document.lock().ok().and_then(|d| d.clone())
    }

    fn next_sha(&self) -> String {
        let revision = self.revision.fetch_add(1, Ordering::SeqCst) + 1;
        format!("{:040x}", revision)
    }

    fn check_reachable(&self) -> Result<(), SyncError> {
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(SyncError::HttpStatus {
                url: self.describe(),
                status: 503,
                message: "remote unreachable".to_string(),
            });
        }
        Ok(())
    }
}

impl ContentTransport for MemoryRemote {
    fn fetch(&self) -> Result<HttpReply, SyncError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.check_reachable()?;
        let reply = match self.current() {
            None => HttpReply::new(404, json!({"message": "Not Found"}).to_string()),
            Some(doc) => HttpReply::new(
                200,
                json!({"sha": doc.sha, "content": encode_content(&doc.text)}).to_string(),
            ),
        };
        Ok(reply)
    }

    fn store(&self, payload: &PutPayload) -> Result<HttpReply, SyncError> {
        self.stores.fetch_add(1, Ordering::SeqCst);
        self.check_reachable()?;
        let text = match crate::sync::wire::decode_content(&payload.content) {
            Ok(text) => text,
            Err(e) => return Ok(HttpReply::new(400, json!({"message": e.to_string()}).to_string())),
        };

        let current = self.current();
        match (&current, &payload.sha) {
            (Some(_), None) => {
                return Ok(HttpReply::new(
                    422,
                    json!({"message": "Invalid request. \"sha\" wasn't supplied."}).to_string(),
                ))
            }
            (Some(doc), Some(sha)) if *sha != doc.sha => {
                return Ok(HttpReply::new(
                    409,
                    json!({"message": format!("{} does not match {}", self.describe(), sha)})
                        .to_string(),
                ))
            }
            (None, Some(_)) => {
                return Ok(HttpReply::new(
                    409,
                    json!({"message": "Document was deleted"}).to_string(),
                ))
            }
            _ => {}
        }

        let sha = self.external_write(&text);
        let status = if current.is_some() { 200 } else { 201 };
        Ok(HttpReply::new(
            status,
            json!({"content": {"sha": sha}}).to_string(),
        ))
    }

    fn branch(&self) -> &str {
        &self.branch
    }

    fn describe(&self) -> String {
        format!("memory/wetterdaten.json@{}", self.branch)
    }
}
