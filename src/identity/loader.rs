//! Authorization directory loading.
//!
//! A `DirectorySource` produces the raw document; the `DirectoryLoader` normalizes it,
//! absorbs failures into the empty directory (no admin rights), and coalesces
//! concurrent refreshes so every caller awaiting a refresh shares one request.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::directory::{AuthDirectory, DirectoryDocument};
use crate::error::AppError;

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("directory request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("directory endpoint returned HTTP {0}")]
    Status(u16),
    #[error("directory document is not valid JSON: {0}")]
    Decode(String),
    #[error("directory source misconfigured: {0}")]
    Config(String),
    #[error("directory source unavailable: {0}")]
    Unavailable(String),
}

impl From<DirectoryError> for AppError {
    fn from(err: DirectoryError) -> Self {
        match err {
            DirectoryError::Request(e) => AppError::network("directory_request".to_string(), e.to_string()),
            DirectoryError::Status(code) => AppError::network("directory_status".to_string(), format!("HTTP {}", code)),
            DirectoryError::Decode(m) => AppError::parse("directory_decode".to_string(), m),
            DirectoryError::Config(m) => AppError::config("directory_config".to_string(), m),
            DirectoryError::Unavailable(m) => AppError::network("directory_unavailable".to_string(), m),
        }
    }
}

pub trait DirectorySource: Send + Sync {
    fn fetch(&self) -> BoxFuture<'_, Result<DirectoryDocument, DirectoryError>>;

    /// Short description for logs.
    fn describe(&self) -> String;
}

/// Endpoint settings for the remote directory resource.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DirectorySettings {
    /// Base URL of the file-content function.
    pub url: String,
    /// Path of the JSON resource inside the operations file share.
    pub resource_path: String,
    /// Function access code, passed as the `code` query parameter.
    pub access_code: Option<String>,
    pub timeout_ms: u64,
}

impl Default for DirectorySettings {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:7071/api/get_file_content".to_string(),
            resource_path: "/operations-dev/Static Files/admins.json".to_string(),
            access_code: None,
            timeout_ms: 10_000,
        }
    }
}

/// Fetches the directory over HTTP: `GET <url>?path=<resource_path>&code=<access_code>`.
pub struct HttpDirectorySource {
    client: reqwest::Client,
    url: Url,
}

impl HttpDirectorySource {
    pub fn new(settings: &DirectorySettings) -> Result<Self, DirectoryError> {
        let mut url = Url::parse(&settings.url)
            .map_err(|e| DirectoryError::Config(format!("invalid url '{}': {}", settings.url, e)))?;
        {
            let mut q = url.query_pairs_mut();
            if !settings.resource_path.is_empty() { q.append_pair("path", &settings.resource_path); }
            if let Some(code) = settings.access_code.as_deref() { q.append_pair("code", code); }
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(settings.timeout_ms.max(1)))
            .build()?;
        Ok(Self { client, url })
    }

    pub fn url(&self) -> &Url { &self.url }
}

impl DirectorySource for HttpDirectorySource {
    fn fetch(&self) -> BoxFuture<'_, Result<DirectoryDocument, DirectoryError>> {
        async move {
            let resp = self.client.get(self.url.clone()).send().await?;
            let status = resp.status();
            if !status.is_success() { return Err(DirectoryError::Status(status.as_u16())); }
            let bytes = resp.bytes().await?;
            decode_document(&bytes)
        }
        .boxed()
    }

    // The access code never reaches the logs.
    fn describe(&self) -> String {
        let mut u = self.url.clone();
        u.set_query(None);
        format!("http:{}", u)
    }
}

/// Reads the directory document from a local JSON file (offline operation).
pub struct FileDirectorySource {
    path: PathBuf,
}

impl FileDirectorySource {
    pub fn new(path: impl Into<PathBuf>) -> Self { Self { path: path.into() } }
}

impl DirectorySource for FileDirectorySource {
    fn fetch(&self) -> BoxFuture<'_, Result<DirectoryDocument, DirectoryError>> {
        async move {
            let bytes = tokio::fs::read(&self.path)
                .await
                .map_err(|e| DirectoryError::Unavailable(format!("{}: {}", self.path.display(), e)))?;
            decode_document(&bytes)
        }
        .boxed()
    }

    fn describe(&self) -> String { format!("file:{}", self.path.display()) }
}

/// A top-level `null` is an empty document rather than an error.
pub fn decode_document(bytes: &[u8]) -> Result<DirectoryDocument, DirectoryError> {
    serde_json::from_slice::<Option<DirectoryDocument>>(bytes)
        .map(|d| d.unwrap_or_default())
        .map_err(|e| DirectoryError::Decode(e.to_string()))
}

/// Optional policy: under wildcard mode, sign out authenticated non-admins after a grace period.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct WildcardPolicy {
    pub auto_sign_out_non_admin: bool,
    pub grace_period_secs: u64,
}

impl Default for WildcardPolicy {
    fn default() -> Self { Self { auto_sign_out_non_admin: false, grace_period_secs: 10 } }
}

impl WildcardPolicy {
    pub fn grace_period(&self) -> Duration { Duration::from_secs(self.grace_period_secs) }
}

type InflightRefresh = Shared<BoxFuture<'static, AuthDirectory>>;

pub struct DirectoryLoader {
    source: Arc<dyn DirectorySource>,
    inflight: Mutex<Option<InflightRefresh>>,
    fetches: Arc<AtomicU64>,
}

impl DirectoryLoader {
    pub fn new(source: Arc<dyn DirectorySource>) -> Self {
        Self { source, inflight: Mutex::new(None), fetches: Arc::new(AtomicU64::new(0)) }
    }

    /// Number of requests actually issued to the source.
    pub fn fetch_count(&self) -> u64 { self.fetches.load(Ordering::SeqCst) }

    pub fn describe(&self) -> String { self.source.describe() }

    /// Fetch and normalize the directory. Never fails: errors yield the empty directory.
    pub async fn refresh(&self) -> AuthDirectory {
        let fut = {
            let mut slot = self.inflight.lock();
            match slot.as_ref() {
                Some(f) => {
                    debug!(target: "directory", "joining in-flight refresh");
                    f.clone()
                }
                None => {
                    let f = load_once(self.source.clone(), self.fetches.clone()).boxed().shared();
                    *slot = Some(f.clone());
                    f
                }
            }
        };
        let out = fut.clone().await;
        let mut slot = self.inflight.lock();
        if slot.as_ref().map(|s| s.ptr_eq(&fut)).unwrap_or(false) {
            *slot = None;
        }
        out
    }
}

async fn load_once(source: Arc<dyn DirectorySource>, fetches: Arc<AtomicU64>) -> AuthDirectory {
    fetches.fetch_add(1, Ordering::SeqCst);
    match source.fetch().await {
        Ok(doc) => {
            let dir = AuthDirectory::from_document(doc);
            info!(
                target: "directory",
                "directory loaded from {}: admins={} blacklist={}",
                source.describe(),
                dir.admin_count(),
                dir.blacklist_count().map(|n| n.to_string()).unwrap_or_else(|| "*".to_string())
            );
            dir
        }
        Err(e) => {
            warn!(target: "directory", "error loading directory from {}: {}", source.describe(), e);
            AuthDirectory::empty()
        }
    }
}
