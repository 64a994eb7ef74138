//! Route table for the console views.
//! Matching is case-insensitive and ignores a trailing slash, query string and fragment.

use serde::{Deserialize, Serialize};

use super::guard::LandingPaths;
use crate::error::{AppError, AppResult};

const MAX_STATIC_REDIRECTS: usize = 8;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RouteMeta {
    #[serde(default)]
    pub requires_auth: bool,
    #[serde(default)]
    pub requires_admin: bool,
}

impl RouteMeta {
    pub const PUBLIC: RouteMeta = RouteMeta { requires_auth: false, requires_admin: false };
    pub const AUTH: RouteMeta = RouteMeta { requires_auth: true, requires_admin: false };
    pub const ADMIN: RouteMeta = RouteMeta { requires_auth: true, requires_admin: true };
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteDef {
    pub path: String,
    pub name: String,
    pub meta: RouteMeta,
    /// Static redirect; routes with a redirect are never rendered.
    pub redirect: Option<String>,
}

impl RouteDef {
    pub fn view(path: &str, name: &str, meta: RouteMeta) -> Self {
        Self { path: path.to_string(), name: name.to_string(), meta, redirect: None }
    }

    pub fn redirect(path: &str, to: &str) -> Self {
        Self { path: path.to_string(), name: String::new(), meta: RouteMeta::PUBLIC, redirect: Some(to.to_string()) }
    }
}

/// A route after static redirects have been followed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRoute {
    pub path: String,
    pub name: String,
    pub meta: RouteMeta,
}

#[derive(Debug, Clone)]
pub struct RouteTable {
    routes: Vec<RouteDef>,
    /// Target of the catch-all route; `None` makes unknown paths an error.
    fallback: Option<String>,
}

impl RouteTable {
    pub fn new(routes: Vec<RouteDef>, fallback: Option<String>) -> Self { Self { routes, fallback } }

    /// The console's views. Every tool view is admin-only; the default landing page
    /// only needs a live session.
    pub fn console(paths: &LandingPaths) -> Self {
        let mut routes = vec![
            RouteDef::redirect("/", &paths.login),
            RouteDef::view(&paths.login, "login", RouteMeta::PUBLIC),
            RouteDef::view("/home", "home", RouteMeta::ADMIN),
            RouteDef::view("/dev", "dev", RouteMeta::ADMIN),
            RouteDef::view("/fileManagement", "fileManagement", RouteMeta::ADMIN),
            RouteDef::view("/runFiles", "runFiles", RouteMeta::ADMIN),
            RouteDef::view("/runHistory", "runHistory", RouteMeta::ADMIN),
            RouteDef::view("/settings", "settings", RouteMeta::ADMIN),
            RouteDef::view("/searchContact", "searchContact", RouteMeta::ADMIN),
        ];
        if !routes.iter().any(|r| paths_equal(&r.path, &paths.admin)) {
            routes.push(RouteDef::view(&paths.admin, "adminLanding", RouteMeta::ADMIN));
        }
        if !routes.iter().any(|r| paths_equal(&r.path, &paths.default)) {
            routes.push(RouteDef::view(&paths.default, "restricted", RouteMeta::AUTH));
        }
        Self::new(routes, Some(paths.login.clone()))
    }

    pub fn routes(&self) -> &[RouteDef] { &self.routes }

    pub fn find(&self, path: &str) -> Option<&RouteDef> {
        let p = normalize_path(path);
        self.routes.iter().find(|r| paths_equal(&r.path, &p))
    }

    /// Match `path`, following static redirects and the catch-all.
    pub fn resolve(&self, path: &str) -> AppResult<ResolvedRoute> {
        let mut current = normalize_path(path);
        for _ in 0..=MAX_STATIC_REDIRECTS {
            let next = match self.find(&current) {
                Some(RouteDef { redirect: Some(to), .. }) => to.clone(),
                Some(r) => return Ok(ResolvedRoute { path: r.path.clone(), name: r.name.clone(), meta: r.meta }),
                None => match &self.fallback {
                    Some(to) => to.clone(),
                    None => return Err(AppError::not_found("no_route".to_string(), format!("no route matches {}", current))),
                },
            };
            current = normalize_path(&next);
        }
        Err(AppError::internal("redirect_loop".to_string(), format!("static redirects do not settle for {}", path)))
    }
}

pub fn normalize_path(path: &str) -> String {
    let p = path.split(['?', '#']).next().unwrap_or_default().trim();
    let p = p.trim_end_matches('/');
    if p.is_empty() { return "/".to_string(); }
    if p.starts_with('/') { p.to_string() } else { format!("/{}", p) }
}

fn paths_equal(a: &str, b: &str) -> bool { normalize_path(a).eq_ignore_ascii_case(&normalize_path(b)) }
