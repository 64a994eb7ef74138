//! Shared fakes for integration tests.
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{Duration as ChronoDuration, Utc};
use futures_util::future::{BoxFuture, FutureExt};
use parking_lot::Mutex;

use opsdesk::config::AppConfig;
use opsdesk::context::AppContext;
use opsdesk::error::AppResult;
use opsdesk::identity::{
    DirectoryDocument, DirectoryError, DirectorySource, Identity, IdentityProvider, SessionSettings, SessionStore,
    SystemClock, Clock,
};
use opsdesk::router::Navigator;
use opsdesk::storage::{MemoryStorage, SharedStorage};

/// Directory source returning a programmable document, optionally after a delay.
pub struct StaticSource {
    doc: Mutex<Result<DirectoryDocument, String>>,
    delay: Duration,
    calls: AtomicUsize,
}

impl StaticSource {
    pub fn new(admin: &[&str], blacklist: &[&str]) -> Arc<Self> {
        Arc::new(Self { doc: Mutex::new(Ok(doc(admin, blacklist))), delay: Duration::ZERO, calls: AtomicUsize::new(0) })
    }

    pub fn slow(admin: &[&str], blacklist: &[&str], delay: Duration) -> Arc<Self> {
        Arc::new(Self { doc: Mutex::new(Ok(doc(admin, blacklist))), delay, calls: AtomicUsize::new(0) })
    }

    pub fn set(&self, admin: &[&str], blacklist: &[&str]) { *self.doc.lock() = Ok(doc(admin, blacklist)); }

    pub fn fail(&self, why: &str) { *self.doc.lock() = Err(why.to_string()); }

    pub fn calls(&self) -> usize { self.calls.load(Ordering::SeqCst) }
}

impl DirectorySource for StaticSource {
    fn fetch(&self) -> BoxFuture<'_, Result<DirectoryDocument, DirectoryError>> {
        async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() { tokio::time::sleep(self.delay).await; }
            self.doc.lock().clone().map_err(DirectoryError::Unavailable)
        }
        .boxed()
    }

    fn describe(&self) -> String { "static".to_string() }
}

pub fn doc(admin: &[&str], blacklist: &[&str]) -> DirectoryDocument {
    DirectoryDocument {
        admin: Some(admin.iter().map(|s| s.to_string()).collect()),
        blacklist: Some(blacklist.iter().map(|s| s.to_string()).collect()),
    }
}

#[derive(Default)]
pub struct RecordingProvider {
    pub disabled: AtomicUsize,
    pub fail: bool,
}

impl IdentityProvider for RecordingProvider {
    fn name(&self) -> &str { "recording" }

    fn disable_auto_sign_in(&self) -> AppResult<()> {
        self.disabled.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(opsdesk::error::AppError::provider("sdk_missing", "provider sdk not loaded"));
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingNavigator {
    pub visited: Mutex<Vec<String>>,
}

impl Navigator for RecordingNavigator {
    fn hard_navigate(&self, path: &str) { self.visited.lock().push(path.to_string()); }
}

pub fn fast_settings() -> SessionSettings {
    SessionSettings { signout_transition_ms: 0, ..Default::default() }
}

pub fn store_with(
    storage: SharedStorage,
    source: Arc<StaticSource>,
    provider: Arc<RecordingProvider>,
    clock: Option<Arc<dyn Clock>>,
    settings: SessionSettings,
) -> SessionStore {
    SessionStore::builder(storage, source, provider)
        .clock(clock.unwrap_or_else(|| Arc::new(SystemClock)))
        .settings(settings)
        .build()
}

pub fn memory_store(source: Arc<StaticSource>) -> (SessionStore, MemoryStorage, Arc<RecordingProvider>) {
    let storage = MemoryStorage::new();
    let provider = Arc::new(RecordingProvider::default());
    let store = store_with(Arc::new(storage.clone()), source, provider.clone(), None, fast_settings());
    (store, storage, provider)
}

pub fn identity(email: &str, ttl_minutes: i64) -> Identity {
    Identity::new("tok-1", email, "Operator", Utc::now() + ChronoDuration::minutes(ttl_minutes))
}

/// Context over in-memory storage and a static directory; sign-out is immediate.
pub fn context(source: Arc<StaticSource>) -> (AppContext, MemoryStorage) {
    let mut config = AppConfig::default();
    config.session.signout_transition_ms = 0;
    let storage = MemoryStorage::new();
    let ctx = AppContext::assemble(config, Arc::new(storage.clone()), source, Arc::new(RecordingProvider::default()));
    (ctx, storage)
}

/// Poll `cond` until it holds or two seconds pass.
pub async fn eventually<F: Fn() -> bool>(cond: F) -> bool {
    for _ in 0..200 {
        if cond() { return true; }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    cond()
}
