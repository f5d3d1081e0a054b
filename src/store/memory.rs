//! In-memory store adapter.
//!
//! Backs both store traits with `DashMap`s. This is the adapter used in
//! local mode and throughout the test suite; a deployment with durable
//! storage supplies its own implementations of the same traits.
//!
//! Mail-token atomicity falls out of `DashMap::remove`: a single
//! conditional delete that returns the prior value, so two concurrent
//! redemptions of the same token can never both observe the record.

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use dashmap::DashMap;
use tracing::debug;

use super::{
    AccessToken, Client, MailToken, PrincipalStore, TokenStore, User, generate_token, hash_token,
};
use crate::types::{ClientId, Scope, TokenHash, UserId};

#[derive(Clone, Default)]
pub struct MemoryStore {
    users: Arc<DashMap<UserId, User>>,
    clients: Arc<DashMap<ClientId, Client>>,
    mail_tokens: Arc<DashMap<TokenHash, MailToken>>,
    access_tokens: Arc<DashMap<TokenHash, AccessToken>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store seeded with an initial set of users and clients.
    pub fn with_principals(users: Vec<User>, clients: Vec<Client>) -> Self {
        let store = Self::new();
        for user in users {
            store.add_user(user);
        }
        for client in clients {
            store.add_client(client);
        }
        store
    }

    pub fn add_user(&self, user: User) {
        self.users.insert(user.id.clone(), user);
    }

    pub fn add_client(&self, client: Client) {
        self.clients.insert(client.id.clone(), client);
    }

    /// Issue a one-time mail token for a user, valid for `ttl`.
    ///
    /// Returns the plaintext token exactly once; only its digest is kept.
    /// Stands in for the out-of-scope email issuance flow.
    pub fn issue_mail_token(&self, user_id: &UserId, ttl: Duration) -> String {
        let (token, hash) = generate_token();
        let now = Utc::now();
        self.mail_tokens.insert(
            hash.clone(),
            MailToken {
                token_hash: hash,
                user_id: user_id.clone(),
                created_at: now,
                expires_at: now + ttl,
            },
        );
        debug!(user_id = %user_id, "issued mail token");
        token
    }

    /// Issue an access token for a user, optionally bound to a client.
    ///
    /// Stands in for the out-of-scope OAuth2 token-exchange flow.
    pub fn issue_access_token(
        &self,
        user_id: &UserId,
        client_id: Option<&ClientId>,
        scopes: impl IntoIterator<Item = Scope>,
        ttl: Option<Duration>,
    ) -> String {
        let (token, hash) = generate_token();
        self.access_tokens.insert(
            hash.clone(),
            AccessToken {
                token_hash: hash,
                user_id: user_id.clone(),
                client_id: client_id.cloned(),
                scopes: scopes.into_iter().collect::<HashSet<_>>(),
                expires_at: ttl.map(|t| Utc::now() + t),
            },
        );
        debug!(user_id = %user_id, "issued access token");
        token
    }

    /// Revoke an access token by its plaintext value.
    pub fn revoke_access_token(&self, token: &str) -> bool {
        self.access_tokens.remove(&hash_token(token)).is_some()
    }
}

#[async_trait]
impl PrincipalStore for MemoryStore {
    async fn get_user(&self, id: &UserId) -> Result<Option<User>> {
        Ok(self.users.get(id).map(|entry| entry.value().clone()))
    }

    async fn authenticate_client(&self, client_id: &str, secret: &str) -> Result<Option<Client>> {
        let Some(client) = self.clients.get(client_id).map(|e| e.value().clone()) else {
            return Ok(None);
        };
        if hash_token(secret).as_str() != client.secret_hash.as_str() {
            return Ok(None);
        }
        Ok(Some(client))
    }
}

#[async_trait]
impl TokenStore for MemoryStore {
    async fn find_and_delete_mail_token(&self, token: &str) -> Result<Option<MailToken>> {
        // remove() is the whole consumption contract: one atomic
        // conditional delete returning the prior value.
        let removed = self.mail_tokens.remove(&hash_token(token));
        match removed {
            Some((_, record)) if record.is_expired(Utc::now()) => Ok(None),
            Some((_, record)) => Ok(Some(record)),
            None => Ok(None),
        }
    }

    async fn find_access_token(&self, token: &str) -> Result<Option<AccessToken>> {
        let found = self
            .access_tokens
            .get(&hash_token(token))
            .map(|entry| entry.value().clone());
        match found {
            Some(record) if record.is_expired(Utc::now()) => Ok(None),
            other => Ok(other),
        }
    }
}
