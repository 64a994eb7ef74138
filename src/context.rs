//! Application bootstrap: builds the process-wide context once from configuration.
//! Nothing here is global; the context is passed explicitly to whoever needs it.

use std::sync::Arc;

use tracing::info;

use crate::companies::CompanyStore;
use crate::config::AppConfig;
use crate::error::{AppError, AppResult};
use crate::identity::{
    provider_instance, DirectorySource, FileDirectorySource, HttpDirectorySource, IdentityProvider, SessionStore,
};
use crate::router::{NavigationGuard, RouteTable, Router};
use crate::storage::{FileStorage, SharedStorage};
use crate::ui_state::TabStateCache;

pub struct AppContext {
    pub config: AppConfig,
    pub session: SessionStore,
    pub router: Arc<Router>,
    pub tabs: TabStateCache,
    pub companies: CompanyStore,
}

impl AppContext {
    pub fn from_config(config: AppConfig) -> AppResult<Self> {
        let storage: SharedStorage = Arc::new(FileStorage::open(&config.data_dir)?);
        let source: Arc<dyn DirectorySource> = match &config.directory_file {
            Some(p) => Arc::new(FileDirectorySource::new(p)),
            None => Arc::new(HttpDirectorySource::new(&config.directory).map_err(AppError::from)?),
        };
        let provider: Arc<dyn IdentityProvider> = provider_instance(&config.provider)?;
        Ok(Self::assemble(config, storage, source, provider))
    }

    /// Wire the pieces together from already-built collaborators.
    pub fn assemble(
        config: AppConfig,
        storage: SharedStorage,
        source: Arc<dyn DirectorySource>,
        provider: Arc<dyn IdentityProvider>,
    ) -> Self {
        let session = SessionStore::builder(storage, source, provider)
            .settings(config.session.clone())
            .build();
        let routes = Arc::new(RouteTable::console(&config.landing));
        let guard = NavigationGuard::new(session.clone(), config.landing.clone());
        let router = Arc::new(Router::new(guard, routes));
        info!(
            target: "startup",
            "opsdesk context ready: data_dir={:?}, directory={}, login={}, admin_landing={}, default_landing={}",
            config.data_dir, session.directory_source(), config.landing.login, config.landing.admin, config.landing.default
        );
        Self { config, session, router, tabs: TabStateCache::new(), companies: CompanyStore::new() }
    }
}
