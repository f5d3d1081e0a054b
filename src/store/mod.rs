//! Store contracts for principals and tokens.
//!
//! The auth core never owns users, clients, or tokens. It reads them through
//! the two narrow traits in this module:
//!
//! - [`PrincipalStore`]: user lookup and client credential verification
//! - [`TokenStore`]: access-token lookup and atomic mail-token consumption
//!
//! Any backend can stand behind these traits; the crate ships a
//! [`MemoryStore`] adapter for local mode and tests. Implementations return
//! `Ok(None)` for "not there" and reserve `Err` for genuine infrastructure
//! failures; callers rely on that split to keep rejections and outages
//! distinguishable.

mod memory;

pub use memory::MemoryStore;

use std::collections::HashSet;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::types::{ClientId, Scope, SecretHash, TokenHash, UserId};

/// An end user, as held by the principal store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: Option<String>,
    pub display_name: Option<String>,
    /// Deactivated users fail authentication the same way missing ones do.
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

impl User {
    /// Create an active user.
    pub fn new(id: impl Into<UserId>) -> Self {
        Self {
            id: id.into(),
            email: None,
            display_name: None,
            is_active: true,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }
}

/// An OAuth2 client application.
///
/// Deliberately not `Serialize`: the secret digest must not wander into a
/// response body by accident. Handlers serialize the id and name themselves.
#[derive(Debug, Clone)]
pub struct Client {
    pub id: ClientId,
    pub display_name: Option<String>,
    pub secret_hash: SecretHash,
}

impl Client {
    /// Create a client from its id and pre-hashed secret.
    pub fn new(id: impl Into<ClientId>, secret_hash: SecretHash) -> Self {
        Self {
            id: id.into(),
            display_name: None,
            secret_hash,
        }
    }
}

/// A one-time token mailed to a user as a login link.
///
/// Stored keyed by token digest. Consumed (deleted) on first successful
/// lookup; an expired record is dropped at lookup time and reported as
/// absent, so the caller cannot tell expired from never-issued.
#[derive(Debug, Clone)]
pub struct MailToken {
    pub token_hash: TokenHash,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl MailToken {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// A bearer token authorizing a client to act for a user within a scope set.
///
/// Multi-use: lookup never mutates the record. Scopes are fixed at issuance.
#[derive(Debug, Clone)]
pub struct AccessToken {
    pub token_hash: TokenHash,
    pub user_id: UserId,
    pub client_id: Option<ClientId>,
    pub scopes: HashSet<Scope>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl AccessToken {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(at) => at <= now,
            None => false,
        }
    }
}

/// Lookup of users and verification of client credentials.
#[async_trait]
pub trait PrincipalStore: Send + Sync {
    /// Fetch a user by id. `Ok(None)` when the user does not exist.
    async fn get_user(&self, id: &UserId) -> Result<Option<User>>;

    /// Verify a client credential pair.
    ///
    /// Returns `Ok(None)` for an unknown client *and* for a bad secret;
    /// callers treat both as the same rejection. The raw secret is hashed
    /// and compared inside the store; it is never persisted.
    async fn authenticate_client(&self, client_id: &str, secret: &str) -> Result<Option<Client>>;
}

/// Lookup and consumption of tokens.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Atomically find and delete a mail token by its opaque string.
    ///
    /// Find-and-delete is one indivisible operation: of two concurrent
    /// calls with the same token, exactly one observes the record. Expired
    /// records are removed and reported as `Ok(None)`.
    async fn find_and_delete_mail_token(&self, token: &str) -> Result<Option<MailToken>>;

    /// Find an access token by its opaque string. Read-only; the record
    /// stays in place until revoked or expired by the store.
    async fn find_access_token(&self, token: &str) -> Result<Option<AccessToken>>;
}

/// Hash an opaque token or secret for storage and lookup (raw values are
/// never stored).
pub fn hash_token(token: &str) -> TokenHash {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    let result = hasher.finalize();
    TokenHash::new(format!("{:x}", result))
}

/// Hash a client secret for provisioning.
pub fn hash_secret(secret: &str) -> SecretHash {
    SecretHash::new(hash_token(secret).into_inner())
}

/// Generate a fresh opaque token string and its digest.
///
/// The plaintext is returned exactly once; only the digest is meant to be
/// stored. Used by the issuance helpers and the operator CLI.
pub fn generate_token() -> (String, TokenHash) {
    let token = Uuid::new_v4().to_string().replace("-", "");
    let hash = hash_token(&token);
    (token, hash)
}
