use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use once_cell::sync::OnceCell;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{AppError, AppResult};
use crate::tprintln;

/// Client-side identity provider. Token issuance is handled entirely by the provider;
/// the session store only asks it to stop silently re-selecting the last account.
pub trait IdentityProvider: Send + Sync {
    fn name(&self) -> &str;
    fn disable_auto_sign_in(&self) -> AppResult<()>;
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum CacheLocation {
    #[default]
    LocalStorage,
    SessionStorage,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ProviderConfig {
    pub client_id: String,
    /// User-flow authority URL.
    pub authority: String,
    pub known_authorities: Vec<String>,
    pub redirect_uri: String,
    pub cache_location: CacheLocation,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            client_id: "opsdesk-console".to_string(),
            authority: "https://login.example.net/tenant/B2C_1_signin".to_string(),
            known_authorities: vec!["login.example.net".to_string()],
            redirect_uri: "http://localhost/auth".to_string(),
            cache_location: CacheLocation::LocalStorage,
        }
    }
}

impl ProviderConfig {
    pub fn validate(&self) -> AppResult<()> {
        if self.client_id.trim().is_empty() {
            return Err(AppError::config("provider_client_id", "client id is empty"));
        }
        let authority = Url::parse(&self.authority)
            .map_err(|e| AppError::config("provider_authority".to_string(), format!("invalid authority '{}': {}", self.authority, e)))?;
        if authority.scheme() != "https" {
            return Err(AppError::config("provider_authority".to_string(), format!("authority must use https: {}", self.authority)));
        }
        let host = authority.host_str().unwrap_or_default();
        if !self.known_authorities.is_empty() && !self.known_authorities.iter().any(|k| k.eq_ignore_ascii_case(host)) {
            return Err(AppError::config("provider_authority".to_string(), format!("authority host '{}' is not a known authority", host)));
        }
        Url::parse(&self.redirect_uri)
            .map_err(|e| AppError::config("provider_redirect_uri".to_string(), format!("invalid redirect uri '{}': {}", self.redirect_uri, e)))?;
        Ok(())
    }
}

/// In-process provider client holding the auto-sign-in preference.
pub struct LocalProvider {
    config: ProviderConfig,
    auto_sign_in: AtomicBool,
}

impl LocalProvider {
    pub fn new(config: ProviderConfig) -> Self { Self { config, auto_sign_in: AtomicBool::new(true) } }

    pub fn config(&self) -> &ProviderConfig { &self.config }

    pub fn auto_sign_in_enabled(&self) -> bool { self.auto_sign_in.load(Ordering::SeqCst) }

    pub fn enable_auto_sign_in(&self) { self.auto_sign_in.store(true, Ordering::SeqCst); }
}

impl IdentityProvider for LocalProvider {
    fn name(&self) -> &str { &self.config.client_id }

    fn disable_auto_sign_in(&self) -> AppResult<()> {
        self.auto_sign_in.store(false, Ordering::SeqCst);
        debug!(target: "provider", "auto sign-in disabled for {}", self.config.client_id);
        Ok(())
    }
}

static INSTANCE: OnceCell<Arc<LocalProvider>> = OnceCell::new();

/// Process-wide provider client, initialized on first use. Later calls return the
/// same instance regardless of the config passed.
pub fn provider_instance(config: &ProviderConfig) -> AppResult<Arc<LocalProvider>> {
    INSTANCE
        .get_or_try_init(|| {
            config.validate()?;
            info!(target: "provider", "identity provider client initialized: client_id={} authority={}", config.client_id, config.authority);
            tprintln!("provider.init client_id={}", config.client_id);
            Ok(Arc::new(LocalProvider::new(config.clone())))
        })
        .cloned()
}
