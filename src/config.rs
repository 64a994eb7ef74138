//! Console configuration.
//!
//! Resolved in layers: built-in defaults, then an optional JSON file, then
//! `OPSDESK_*` environment variables. The result is validated before use.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{AppError, AppResult};
use crate::identity::{DirectorySettings, ProviderConfig, SessionSettings};
use crate::router::LandingPaths;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AppConfig {
    /// Folder holding the durable storage file.
    pub data_dir: PathBuf,
    pub directory: DirectorySettings,
    /// Read the directory from this local JSON file instead of the endpoint.
    pub directory_file: Option<PathBuf>,
    pub landing: LandingPaths,
    pub session: SessionSettings,
    pub provider: ProviderConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("opsdesk_data"),
            directory: DirectorySettings::default(),
            directory_file: None,
            landing: LandingPaths::default(),
            session: SessionSettings::default(),
            provider: ProviderConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn load(path: &Path) -> AppResult<Self> {
        let bytes = std::fs::read(path)
            .map_err(|e| AppError::config("config_read".to_string(), format!("{}: {}", path.display(), e)))?;
        serde_json::from_slice(&bytes)
            .map_err(|e| AppError::config("config_parse".to_string(), format!("{}: {}", path.display(), e)))
    }

    /// Defaults or `file`, overlaid with the process environment, validated.
    pub fn resolve(file: Option<&Path>) -> AppResult<Self> {
        let mut cfg = match file {
            Some(p) => Self::load(p)?,
            None => Self::default(),
        };
        cfg.apply_overrides(|k| std::env::var(k).ok())?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn apply_overrides<F>(&mut self, lookup: F) -> AppResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("OPSDESK_DATA_DIR") { self.data_dir = PathBuf::from(v); }
        if let Some(v) = lookup("OPSDESK_DIRECTORY_URL") { self.directory.url = v; }
        if let Some(v) = lookup("OPSDESK_DIRECTORY_PATH") { self.directory.resource_path = v; }
        if let Some(v) = lookup("OPSDESK_DIRECTORY_FILE") { self.directory_file = Some(PathBuf::from(v)); }
        if let Some(v) = lookup("OPSDESK_FUNCTION_KEY") {
            self.directory.access_code = if v.is_empty() { None } else { Some(v) };
        }
        if let Some(v) = lookup("OPSDESK_DIRECTORY_TIMEOUT_MS") { self.directory.timeout_ms = parse_num("OPSDESK_DIRECTORY_TIMEOUT_MS", &v)?; }
        if let Some(v) = lookup("OPSDESK_SIGNOUT_MS") { self.session.signout_transition_ms = parse_num("OPSDESK_SIGNOUT_MS", &v)?; }
        if let Some(v) = lookup("OPSDESK_LOGIN_PATH") { self.landing.login = v; }
        if let Some(v) = lookup("OPSDESK_ADMIN_LANDING") { self.landing.admin = v; }
        if let Some(v) = lookup("OPSDESK_DEFAULT_LANDING") { self.landing.default = v; }
        if let Some(v) = lookup("OPSDESK_WILDCARD_AUTO_SIGNOUT") {
            self.session.wildcard_policy.auto_sign_out_non_admin = parse_bool("OPSDESK_WILDCARD_AUTO_SIGNOUT", &v)?;
        }
        if let Some(v) = lookup("OPSDESK_WILDCARD_GRACE_SECS") {
            self.session.wildcard_policy.grace_period_secs = parse_num("OPSDESK_WILDCARD_GRACE_SECS", &v)?;
        }
        if let Some(v) = lookup("OPSDESK_PROVIDER_CLIENT_ID") { self.provider.client_id = v; }
        if let Some(v) = lookup("OPSDESK_PROVIDER_AUTHORITY") { self.provider.authority = v; }
        // The forced sign-out always lands on the configured login route.
        self.session.login_path = self.landing.login.clone();
        debug!(target: "startup", "configuration overrides applied");
        Ok(())
    }

    pub fn validate(&self) -> AppResult<()> {
        self.landing.validate()?;
        if self.directory_file.is_none() && self.directory.url.trim().is_empty() {
            return Err(AppError::config("directory_url", "directory url is empty and no directory file is set"));
        }
        self.provider.validate()?;
        Ok(())
    }
}

fn parse_num(name: &str, v: &str) -> AppResult<u64> {
    v.trim()
        .parse::<u64>()
        .map_err(|_| AppError::config("config_env".to_string(), format!("{} must be a non-negative integer, got {:?}", name, v)))
}

fn parse_bool(name: &str, v: &str) -> AppResult<bool> {
    match v.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(AppError::config("config_env".to_string(), format!("{} must be a boolean, got {:?}", name, v))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let m: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |k| m.get(k).cloned()
    }

    #[test]
    fn defaults_validate() {
        AppConfig::default().validate().unwrap();
    }

    #[test]
    fn env_overrides_apply() {
        let mut cfg = AppConfig::default();
        cfg.apply_overrides(env(&[
            ("OPSDESK_FUNCTION_KEY", "secret"),
            ("OPSDESK_SIGNOUT_MS", "0"),
            ("OPSDESK_LOGIN_PATH", "/signin"),
            ("OPSDESK_WILDCARD_AUTO_SIGNOUT", "yes"),
            ("OPSDESK_WILDCARD_GRACE_SECS", "3"),
        ])).unwrap();
        assert_eq!(cfg.directory.access_code.as_deref(), Some("secret"));
        assert_eq!(cfg.session.signout_transition_ms, 0);
        assert_eq!(cfg.landing.login, "/signin");
        assert_eq!(cfg.session.login_path, "/signin");
        assert!(cfg.session.wildcard_policy.auto_sign_out_non_admin);
        assert_eq!(cfg.session.wildcard_policy.grace_period_secs, 3);
    }

    #[test]
    fn bad_numbers_are_config_errors() {
        let mut cfg = AppConfig::default();
        let err = cfg.apply_overrides(env(&[("OPSDESK_SIGNOUT_MS", "soon")])).unwrap_err();
        assert_eq!(err.code_str(), "config_env");
        let err = cfg.apply_overrides(env(&[("OPSDESK_WILDCARD_AUTO_SIGNOUT", "maybe")])).unwrap_err();
        assert_eq!(err.code_str(), "config_env");
    }

    #[test]
    fn file_layer_keeps_defaults_for_missing_fields() {
        let tmp = tempfile::tempdir().unwrap();
        let p = tmp.path().join("opsdesk.json");
        std::fs::write(&p, br#"{"landing":{"admin":"/dev"},"session":{"signout_transition_ms":250}}"#).unwrap();
        let cfg = AppConfig::load(&p).unwrap();
        assert_eq!(cfg.landing.admin, "/dev");
        assert_eq!(cfg.landing.login, "/login");
        assert_eq!(cfg.session.signout_transition_ms, 250);
        assert_eq!(cfg.directory, DirectorySettings::default());
    }

    #[test]
    fn empty_url_without_file_is_rejected() {
        let mut cfg = AppConfig::default();
        cfg.directory.url = String::new();
        assert_eq!(cfg.validate().unwrap_err().code_str(), "directory_url");
        cfg.directory_file = Some(PathBuf::from("admins.json"));
        cfg.validate().unwrap();
    }
}
