//! Admin / blacklist directory, normalized from the remote JSON document.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::principal::normalize_email;

/// Raw blacklist entry that collapses the whole list to deny-all-except-admins.
pub const WILDCARD_ENTRY: &str = "*";

/// Document served by the directory endpoint. Either list may be missing.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DirectoryDocument {
    #[serde(default)]
    pub admin: Option<Vec<String>>,
    #[serde(default)]
    pub blacklist: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Blacklist {
    Emails(HashSet<String>),
    /// Only explicit admins pass.
    DenyAllExceptAdmins,
}

impl Default for Blacklist {
    fn default() -> Self { Blacklist::Emails(HashSet::new()) }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthDirectory {
    pub admin_emails: HashSet<String>,
    pub blacklist: Blacklist,
}

impl AuthDirectory {
    pub fn empty() -> Self { Self::default() }

    pub fn from_document(doc: DirectoryDocument) -> Self {
        let admin_emails = normalize_list(doc.admin.unwrap_or_default());
        let raw_black = doc.blacklist.unwrap_or_default();
        let blacklist = if raw_black.iter().any(|e| e.trim() == WILDCARD_ENTRY) {
            Blacklist::DenyAllExceptAdmins
        } else {
            Blacklist::Emails(normalize_list(raw_black))
        };
        Self { admin_emails, blacklist }
    }

    /// Empty means nothing has been loaded yet, or the last fetch failed.
    pub fn is_empty(&self) -> bool {
        self.admin_emails.is_empty()
            && matches!(&self.blacklist, Blacklist::Emails(set) if set.is_empty())
    }

    pub fn is_wildcard(&self) -> bool { matches!(self.blacklist, Blacklist::DenyAllExceptAdmins) }

    pub fn is_admin_listed(&self, email: &str) -> bool { self.admin_emails.contains(&normalize_email(email)) }

    /// Plain blacklist membership; always false in wildcard mode.
    pub fn is_blacklisted(&self, email: &str) -> bool {
        match &self.blacklist {
            Blacklist::Emails(set) => set.contains(&normalize_email(email)),
            Blacklist::DenyAllExceptAdmins => false,
        }
    }

    /// Admin grant for an email, ignoring authentication.
    pub fn grants_admin(&self, email: &str) -> bool {
        if !self.is_admin_listed(email) { return false; }
        match &self.blacklist {
            Blacklist::DenyAllExceptAdmins => true,
            Blacklist::Emails(_) => !self.is_blacklisted(email),
        }
    }

    pub fn admin_count(&self) -> usize { self.admin_emails.len() }

    pub fn blacklist_count(&self) -> Option<usize> {
        match &self.blacklist {
            Blacklist::Emails(set) => Some(set.len()),
            Blacklist::DenyAllExceptAdmins => None,
        }
    }
}

fn normalize_list(raw: Vec<String>) -> HashSet<String> {
    raw.iter()
        .map(|e| normalize_email(e))
        .filter(|e| !e.is_empty())
        .collect()
}
