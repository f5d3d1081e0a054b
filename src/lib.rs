// Core modules
mod config;
mod types;

pub mod api;
pub mod auth;
pub mod server;
pub mod store;

// Re-export key types and functions
pub use api::{App, AppState, create_router};
pub use auth::{
    AuthInfo, AuthLayer, Authenticator, Credential, Outcome, Principal, RequireScopes, Sessions,
    Strategy,
};
pub use config::{AppConfig, ClientConfig, RedirectConfig, SessionConfig};
pub use store::{
    AccessToken, Client, MailToken, MemoryStore, PrincipalStore, TokenStore, User, generate_token,
    hash_secret, hash_token,
};
pub use types::{ClientId, Scope, SecretHash, SessionId, TokenHash, UserId};

use std::sync::Arc;

/// Convenience function to create a fully wired application state.
///
/// Seeds the in-memory store from the configuration and builds the
/// authenticator and session glue over it. Returns the store handle
/// alongside the state so callers (and tests) can issue tokens into it;
/// token issuance itself belongs to the email and OAuth2 exchange flows,
/// not to this service.
pub fn create_app(config: AppConfig) -> (AppState, MemoryStore) {
    let store = MemoryStore::with_principals(
        config.users.clone(),
        config.clients.iter().cloned().map(Into::into).collect(),
    );

    let tokens: Arc<dyn TokenStore> = Arc::new(store.clone());
    let principals: Arc<dyn PrincipalStore> = Arc::new(store.clone());

    let authenticator = Authenticator::new(tokens.clone(), principals.clone());
    let sessions = Sessions::new(principals, config.session.cookie_name.clone());

    let state = Arc::new(App {
        authenticator,
        sessions,
        tokens,
        config,
    });

    (state, store)
}
