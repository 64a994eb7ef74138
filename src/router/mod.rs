//! Console navigation: route table, guard, and a router that applies guard decisions.

pub mod routes;
pub mod guard;

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::info;

use crate::error::{AppError, AppResult};
pub use guard::{decide, Decision, LandingPaths, NavigationGuard};
pub use routes::{normalize_path, ResolvedRoute, RouteDef, RouteMeta, RouteTable};

const MAX_GUARD_REDIRECTS: usize = 8;

/// Something that can perform an unguarded, full navigation (a page reload in a browser).
pub trait Navigator: Send + Sync {
    fn hard_navigate(&self, path: &str);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationOutcome {
    /// Path the router settled on.
    pub path: String,
    pub name: String,
    /// Guard redirects taken on the way, in order.
    pub redirects: Vec<String>,
}

#[derive(Debug, Default)]
struct RouterState {
    current: Option<String>,
    history: Vec<String>,
}

pub struct Router {
    guard: NavigationGuard,
    routes: Arc<RouteTable>,
    state: Mutex<RouterState>,
}

impl Router {
    pub fn new(guard: NavigationGuard, routes: Arc<RouteTable>) -> Self {
        Self { guard, routes, state: Mutex::new(RouterState::default()) }
    }

    pub fn routes(&self) -> &RouteTable { &self.routes }

    pub fn guard(&self) -> &NavigationGuard { &self.guard }

    pub fn current(&self) -> Option<String> { self.state.lock().current.clone() }

    pub fn history(&self) -> Vec<String> { self.state.lock().history.clone() }

    /// Navigate to `to`, re-running the guard after every redirect.
    pub async fn push(&self, to: &str) -> AppResult<NavigationOutcome> {
        let mut target = to.to_string();
        let mut redirects = Vec::new();
        for _ in 0..=MAX_GUARD_REDIRECTS {
            let route = self.routes.resolve(&target)?;
            match self.guard.before_each(&route).await {
                Decision::Allow => {
                    self.commit(&route.path);
                    return Ok(NavigationOutcome { path: route.path, name: route.name, redirects });
                }
                Decision::Redirect(next) => {
                    redirects.push(next.clone());
                    target = next;
                }
            }
        }
        Err(AppError::internal("redirect_loop".to_string(), format!("guard redirects do not settle for {} ({:?})", to, redirects)))
    }

    fn commit(&self, path: &str) {
        let mut st = self.state.lock();
        if st.current.as_deref() != Some(path) {
            st.history.push(path.to_string());
        }
        st.current = Some(path.to_string());
    }
}

impl Navigator for Router {
    fn hard_navigate(&self, path: &str) {
        let path = normalize_path(path);
        info!(target: "guard", "hard navigation to {}", path);
        let mut st = self.state.lock();
        st.history.clear();
        st.history.push(path.clone());
        st.current = Some(path);
    }
}
