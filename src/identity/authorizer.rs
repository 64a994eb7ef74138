use chrono::{DateTime, Utc};
use serde::Serialize;

use super::directory::AuthDirectory;
use super::principal::Identity;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessState {
    Unauthenticated,
    AuthenticatedNonAdmin,
    AuthenticatedAdmin,
    Blacklisted,
}

/// Derived flags for one point in time. Never stored; recomputed from identity + directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AccessView {
    pub email: Option<String>,
    pub authenticated: bool,
    pub admin: bool,
    pub blacklisted: bool,
}

impl AccessView {
    pub fn state(&self) -> AccessState {
        if !self.authenticated { return AccessState::Unauthenticated; }
        if self.blacklisted { return AccessState::Blacklisted; }
        if self.admin { AccessState::AuthenticatedAdmin } else { AccessState::AuthenticatedNonAdmin }
    }
}

pub fn evaluate(identity: Option<&Identity>, directory: &AuthDirectory, now: DateTime<Utc>) -> AccessView {
    let Some(id) = identity else { return AccessView::default(); };
    let email = id.normalized_email();
    let authenticated = id.is_valid_at(now);
    // Admin needs a live token; an empty email never matches a directory entry.
    let admin = authenticated && !email.is_empty() && directory.grants_admin(&email);
    let blacklisted = !email.is_empty() && directory.is_blacklisted(&email);
    AccessView { email: Some(email), authenticated, admin, blacklisted }
}
