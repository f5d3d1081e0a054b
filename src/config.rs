//! Service configuration.
//!
//! Loaded from a JSON file resolved via `LINKGATE_CONFIG`, falling back to
//! `./linkgate.json`, falling back to defaults. Clients are provisioned
//! with pre-hashed secrets (`linkgate hash-secret` produces the digest);
//! the raw secret never appears in configuration.

use std::{env, fs, path::PathBuf};

use serde::Deserialize;

use crate::store::{Client, User};
use crate::types::{ClientId, SecretHash};

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Bind address for the HTTP server.
    #[serde(default = "default_bind")]
    pub bind: String,

    #[serde(default)]
    pub redirects: RedirectConfig,

    #[serde(default)]
    pub session: SessionConfig,

    /// Users seeded into the in-memory principal store.
    #[serde(default)]
    pub users: Vec<User>,

    /// Clients seeded into the in-memory principal store.
    #[serde(default)]
    pub clients: Vec<ClientConfig>,
}

fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            redirects: RedirectConfig::default(),
            session: SessionConfig::default(),
            users: Vec::new(),
            clients: Vec::new(),
        }
    }
}

/// Where the login flow sends the browser afterwards.
#[derive(Debug, Clone, Deserialize)]
pub struct RedirectConfig {
    /// After a successful mail-link login (unless the request recorded a
    /// return target).
    #[serde(default = "default_success")]
    pub success: String,
    /// After an invalid or already-used login link.
    #[serde(default = "default_failure")]
    pub failure: String,
    /// After logout, back to the login entry point.
    #[serde(default = "default_login")]
    pub login: String,
}

fn default_success() -> String {
    "/welcome".to_string()
}

fn default_failure() -> String {
    "/invalid-link".to_string()
}

fn default_login() -> String {
    "/login".to_string()
}

impl Default for RedirectConfig {
    fn default() -> Self {
        Self {
            success: default_success(),
            failure: default_failure(),
            login: default_login(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,
}

fn default_cookie_name() -> String {
    "lg_session".to_string()
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: default_cookie_name(),
        }
    }
}

/// A provisioned OAuth2 client. The secret arrives pre-hashed.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    pub id: ClientId,
    #[serde(default)]
    pub display_name: Option<String>,
    pub secret_hash: SecretHash,
}

impl From<ClientConfig> for Client {
    fn from(cfg: ClientConfig) -> Self {
        Self {
            id: cfg.id,
            display_name: cfg.display_name,
            secret_hash: cfg.secret_hash,
        }
    }
}

/// Resolve the config file path, if any.
pub fn resolve_config_path() -> Option<PathBuf> {
    if let Ok(p) = env::var("LINKGATE_CONFIG") {
        return Some(PathBuf::from(p));
    }

    let candidate = PathBuf::from("linkgate.json");
    if candidate.exists() {
        return Some(candidate);
    }

    None
}

impl AppConfig {
    /// Load configuration from the resolved path, or defaults when no
    /// config file is present.
    pub fn load() -> anyhow::Result<Self> {
        match resolve_config_path() {
            Some(path) => Self::from_file(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn from_file(path: &PathBuf) -> anyhow::Result<Self> {
        let raw = fs::read_to_string(path)?;
        let config: AppConfig = serde_json::from_str(&raw)?;
        Ok(config)
    }
}
