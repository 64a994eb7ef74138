//! Per-navigation authorization decision.
//!
//! `decide` is a pure function of the target route, the derived access flags and the
//! landing paths. `NavigationGuard` awaits session hydration first so a decision is
//! never taken against a half-loaded session.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::routes::{normalize_path, ResolvedRoute};
use crate::error::{AppError, AppResult};
use crate::identity::{AccessView, SessionStore};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Redirect(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LandingPaths {
    pub login: String,
    /// Where admins land after sign-in.
    pub admin: String,
    /// Where everyone else lands.
    pub default: String,
}

impl Default for LandingPaths {
    fn default() -> Self {
        Self { login: "/login".to_string(), admin: "/home".to_string(), default: "/restricted".to_string() }
    }
}

impl LandingPaths {
    pub fn validate(&self) -> AppResult<()> {
        for (name, p) in [("login", &self.login), ("admin", &self.admin), ("default", &self.default)] {
            if !p.starts_with('/') {
                return Err(AppError::config("landing_path".to_string(), format!("{} path must start with '/': {:?}", name, p)));
            }
        }
        Ok(())
    }

    pub fn is_login(&self, path: &str) -> bool { normalize_path(path).eq_ignore_ascii_case(&normalize_path(&self.login)) }
}

/// First match wins:
/// 1. blacklisted identity: stays on login, anything else goes to login;
/// 2. auth required without a live session: login;
/// 3. login while authenticated: the role's landing page;
/// 4. admin required without admin rights: default landing page;
/// 5. allow.
pub fn decide(route: &ResolvedRoute, view: &AccessView, paths: &LandingPaths) -> Decision {
    let to_login = paths.is_login(&route.path);
    if view.blacklisted {
        return if to_login { Decision::Allow } else { Decision::Redirect(paths.login.clone()) };
    }
    if route.meta.requires_auth && !view.authenticated {
        return Decision::Redirect(paths.login.clone());
    }
    if to_login && view.authenticated {
        let landing = if view.admin { &paths.admin } else { &paths.default };
        return Decision::Redirect(landing.clone());
    }
    if route.meta.requires_admin && !view.admin {
        return Decision::Redirect(paths.default.clone());
    }
    Decision::Allow
}

#[derive(Clone)]
pub struct NavigationGuard {
    session: SessionStore,
    paths: LandingPaths,
}

impl NavigationGuard {
    pub fn new(session: SessionStore, paths: LandingPaths) -> Self { Self { session, paths } }

    pub fn paths(&self) -> &LandingPaths { &self.paths }

    pub fn session(&self) -> &SessionStore { &self.session }

    /// Hydrate the session, then decide. Never mutates session state beyond hydration.
    pub async fn before_each(&self, route: &ResolvedRoute) -> Decision {
        self.session.hydrate().await;
        let view = self.session.snapshot();
        let decision = decide(route, &view, &self.paths);
        debug!(target: "guard", "{} state={:?} -> {:?}", route.path, view.state(), decision);
        decision
    }
}
