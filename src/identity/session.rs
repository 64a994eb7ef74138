//! Operator session store: the single owner of "who is signed in".
//!
//! Every mutation of the identity or directory goes through this type. Readers get
//! derived flags computed against the clock at call time. Storage and network failures
//! are logged and absorbed; the store always falls back to signed-out / non-admin.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::authorizer::{evaluate, AccessState, AccessView};
use super::clock::{Clock, SystemClock};
use super::directory::AuthDirectory;
use super::loader::{DirectoryLoader, DirectorySource, WildcardPolicy};
use super::principal::Identity;
use super::provider::IdentityProvider;
use crate::error::{AppError, AppResult};
use crate::router::Navigator;
use crate::storage::{SharedStorage, USER_INFO_KEY};
use crate::tprintln;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SessionSettings {
    /// Time the sign-out overlay stays up before state is cleared.
    pub signout_transition_ms: u64,
    /// Entry point used by the forced inactivity sign-out.
    pub login_path: String,
    pub wildcard_policy: WildcardPolicy,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self { signout_transition_ms: 1_500, login_path: "/login".to_string(), wildcard_policy: WildcardPolicy::default() }
    }
}

impl SessionSettings {
    pub fn signout_transition(&self) -> Duration { Duration::from_millis(self.signout_transition_ms) }
}

#[derive(Debug, Default)]
struct SessionState {
    identity: Option<Identity>,
    directory: AuthDirectory,
    /// Bumped by every sign-in; a sign-out only clears the generation it started in.
    generation: u64,
}

struct Inner {
    storage: SharedStorage,
    loader: DirectoryLoader,
    provider: Arc<dyn IdentityProvider>,
    clock: Arc<dyn Clock>,
    settings: SessionSettings,
    state: RwLock<SessionState>,
    signing_out: AtomicUsize,
    countdown: Mutex<Option<JoinHandle<()>>>,
}

/// Cheap cloneable handle; all clones share one session.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<Inner>,
}

pub struct SessionStoreBuilder {
    storage: SharedStorage,
    source: Arc<dyn DirectorySource>,
    provider: Arc<dyn IdentityProvider>,
    clock: Arc<dyn Clock>,
    settings: SessionSettings,
}

impl SessionStoreBuilder {
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self { self.clock = clock; self }

    pub fn settings(mut self, settings: SessionSettings) -> Self { self.settings = settings; self }

    pub fn build(self) -> SessionStore {
        SessionStore {
            inner: Arc::new(Inner {
                storage: self.storage,
                loader: DirectoryLoader::new(self.source),
                provider: self.provider,
                clock: self.clock,
                settings: self.settings,
                state: RwLock::new(SessionState::default()),
                signing_out: AtomicUsize::new(0),
                countdown: Mutex::new(None),
            }),
        }
    }
}

impl SessionStore {
    pub fn builder(storage: SharedStorage, source: Arc<dyn DirectorySource>, provider: Arc<dyn IdentityProvider>) -> SessionStoreBuilder {
        SessionStoreBuilder { storage, source, provider, clock: Arc::new(SystemClock), settings: SessionSettings::default() }
    }

    // ---- reads -------------------------------------------------------------

    pub fn identity(&self) -> Option<Identity> { self.inner.state.read().identity.clone() }

    pub fn token(&self) -> Option<String> { self.inner.state.read().identity.as_ref().map(|i| i.token.clone()) }

    pub fn directory(&self) -> AuthDirectory { self.inner.state.read().directory.clone() }

    pub fn snapshot(&self) -> AccessView {
        let st = self.inner.state.read();
        evaluate(st.identity.as_ref(), &st.directory, self.inner.clock.now())
    }

    pub fn is_authenticated(&self) -> bool { self.snapshot().authenticated }

    pub fn is_admin(&self) -> bool { self.snapshot().admin }

    pub fn is_blacklisted(&self) -> bool { self.snapshot().blacklisted }

    pub fn access_state(&self) -> AccessState { self.snapshot().state() }

    pub fn is_signing_out(&self) -> bool { self.inner.signing_out.load(Ordering::SeqCst) > 0 }

    pub fn settings(&self) -> &SessionSettings { &self.inner.settings }

    pub fn directory_fetches(&self) -> u64 { self.inner.loader.fetch_count() }

    pub fn directory_source(&self) -> String { self.inner.loader.describe() }

    pub fn auto_sign_out_pending(&self) -> bool {
        self.inner.countdown.lock().as_ref().map(|h| !h.is_finished()).unwrap_or(false)
    }

    // ---- lifecycle ---------------------------------------------------------

    /// Load the persisted identity (if none is in memory yet), sign out an identity that
    /// is no longer valid, and load the directory when it is still empty. Safe to call
    /// repeatedly and concurrently.
    pub async fn hydrate(&self) {
        let needs_read = self.inner.state.read().identity.is_none();
        if needs_read {
            match self.read_persisted() {
                Ok(Some(id)) => {
                    let mut st = self.inner.state.write();
                    if st.identity.is_none() {
                        debug!(target: "session", "restored identity for {}", id.normalized_email());
                        st.identity = Some(id);
                    }
                }
                Ok(None) => return,
                Err(e) => {
                    warn!(target: "session", "error loading persisted identity: {}", e);
                    let st = self.inner.state.write();
                    // A concurrent sign-in may have persisted a fresh identity already.
                    if st.identity.is_none() {
                        if let Err(e) = self.inner.storage.remove(USER_INFO_KEY) {
                            warn!(target: "session", "could not clear persisted identity: {}", e);
                        }
                    }
                    return;
                }
            }
        }

        let (valid, directory_empty) = {
            let st = self.inner.state.read();
            match st.identity.as_ref() {
                None => return,
                Some(id) => (id.is_valid_at(self.inner.clock.now()), st.directory.is_empty()),
            }
        };
        if !valid {
            info!(target: "session", "persisted token expired or incomplete; signing out");
            self.sign_out().await;
        } else if directory_empty {
            self.refresh_directory().await;
        }
    }

    /// Replace the identity, persist it and reload the directory.
    pub async fn sign_in(&self, identity: Identity) {
        self.cancel_countdown();
        info!(target: "session", "signed in {}", identity.normalized_email());
        tprintln!("session.sign_in email={}", identity.email);
        {
            let mut st = self.inner.state.write();
            if let Err(e) = self.persist(&identity) {
                warn!(target: "session", "could not persist identity: {}", e);
            }
            st.generation += 1;
            st.identity = Some(identity);
        }
        self.refresh_directory().await;
    }

    /// Start signing out. The signing-out flag is raised before this returns and the
    /// sequence runs on its own task, so it completes even if the returned future is
    /// dropped. Awaiting the future waits for the transition to finish. Must be called
    /// from within a tokio runtime.
    pub fn sign_out(&self) -> impl Future<Output = ()> + Send + 'static {
        self.inner.signing_out.fetch_add(1, Ordering::SeqCst);
        self.cancel_countdown();
        let generation = self.inner.state.read().generation;
        let store = self.clone();
        let task = tokio::spawn(async move { store.finish_sign_out(generation).await });
        async move {
            if let Err(e) = task.await {
                warn!(target: "session", "sign-out task failed: {}", e);
            }
        }
    }

    async fn finish_sign_out(&self, generation: u64) {
        tokio::time::sleep(self.inner.settings.signout_transition()).await;
        let cleared = {
            let mut st = self.inner.state.write();
            if st.generation == generation {
                if let Err(e) = self.inner.storage.remove(USER_INFO_KEY) {
                    warn!(target: "session", "could not remove persisted identity: {}", e);
                }
                Some(st.identity.take())
            } else {
                None
            }
        };
        match cleared {
            Some(previous) => {
                if let Err(e) = self.inner.provider.disable_auto_sign_in() {
                    debug!(target: "session", "provider {} refused to disable auto sign-in: {}", self.inner.provider.name(), e);
                }
                match previous {
                    Some(id) => info!(target: "session", "signed out {}", id.normalized_email()),
                    None => debug!(target: "session", "sign-out with no active identity"),
                }
            }
            None => debug!(target: "session", "sign-out superseded by a newer sign-in"),
        }
        self.inner.signing_out.fetch_sub(1, Ordering::SeqCst);
    }

    /// Sign out an authenticated operator and send the navigator to the login entry point.
    /// Returns false (and does nothing) when nobody is authenticated.
    pub async fn force_sign_out_due_to_inactivity(&self, navigator: &dyn Navigator) -> bool {
        if !self.is_authenticated() { return false; }
        info!(target: "session", "signing out after inactivity");
        self.sign_out().await;
        navigator.hard_navigate(&self.inner.settings.login_path);
        true
    }

    /// Fetch the directory and install it wholesale. Failures install the empty directory.
    pub async fn refresh_directory(&self) -> AuthDirectory {
        let dir = self.inner.loader.refresh().await;
        self.inner.state.write().directory = dir.clone();
        self.arm_wildcard_policy();
        dir
    }

    // ---- internals ---------------------------------------------------------

    fn read_persisted(&self) -> AppResult<Option<Identity>> {
        let Some(raw) = self.inner.storage.get(USER_INFO_KEY)? else { return Ok(None); };
        let id = serde_json::from_str::<Identity>(&raw)
            .map_err(|e| AppError::parse("user_info_corrupt".to_string(), e.to_string()))?;
        Ok(Some(id))
    }

    fn persist(&self, identity: &Identity) -> AppResult<()> {
        let raw = serde_json::to_string(identity)?;
        self.inner.storage.set(USER_INFO_KEY, &raw)
    }

    fn cancel_countdown(&self) {
        if let Some(h) = self.inner.countdown.lock().take() {
            h.abort();
            debug!(target: "session", "wildcard sign-out countdown cancelled");
        }
    }

    fn arm_wildcard_policy(&self) {
        let policy = self.inner.settings.wildcard_policy;
        if !policy.auto_sign_out_non_admin { return; }
        let view = self.snapshot();
        if !self.directory().is_wildcard() || !view.authenticated || view.admin { return; }

        let mut slot = self.inner.countdown.lock();
        if slot.as_ref().map(|h| !h.is_finished()).unwrap_or(false) { return; }
        let grace = policy.grace_period();
        warn!(target: "session", "{} is not an admin; signing out in {}s", view.email.unwrap_or_default(), grace.as_secs());
        let store = self.clone();
        *slot = Some(tokio::spawn(async move {
            tokio::time::sleep(grace).await;
            // Release the slot first so sign_out does not abort this task.
            store.inner.countdown.lock().take();
            let view = store.snapshot();
            if view.authenticated && !view.admin && store.directory().is_wildcard() {
                store.sign_out().await;
            }
        }));
    }
}
