//! Resolved identity and per-request authorization metadata.

use std::collections::HashSet;

use crate::store::{Client, User};
use crate::types::Scope;

/// The authenticated identity resolved from credential material.
///
/// Either an end user or an OAuth2 client application. Immutable once
/// created; it travels through request extensions to handlers.
#[derive(Debug, Clone)]
pub enum Principal {
    User(User),
    Client(Client),
}

impl Principal {
    /// The user, if this principal is one.
    pub fn as_user(&self) -> Option<&User> {
        match self {
            Self::User(user) => Some(user),
            Self::Client(_) => None,
        }
    }

    /// The client, if this principal is one.
    pub fn as_client(&self) -> Option<&Client> {
        match self {
            Self::Client(client) => Some(client),
            Self::User(_) => None,
        }
    }

    /// Get a display-friendly name for this principal.
    pub fn display(&self) -> String {
        match self {
            Self::User(user) => user
                .display_name
                .clone()
                .or_else(|| user.email.clone())
                .unwrap_or_else(|| user.id.to_string()),
            Self::Client(client) => client
                .display_name
                .clone()
                .unwrap_or_else(|| client.id.to_string()),
        }
    }
}

/// Side-channel metadata attached to a resolved principal for one request.
///
/// Strategies construct it, the scope gate and handlers consume it:
///
/// - the mail-link strategy marks the session `direct` (the user proved
///   possession of the emailed link, no delegation involved)
/// - the access-token strategy attaches the token's granted scope set
/// - client-credential strategies attach nothing
#[derive(Debug, Clone, Default)]
pub struct AuthInfo {
    direct: bool,
    scopes: Option<HashSet<Scope>>,
}

impl AuthInfo {
    /// Metadata for a user who authenticated directly via mail link.
    pub fn direct() -> Self {
        Self {
            direct: true,
            scopes: None,
        }
    }

    /// Metadata for a principal acting under a granted scope set.
    pub fn scoped(scopes: HashSet<Scope>) -> Self {
        Self {
            direct: false,
            scopes: Some(scopes),
        }
    }

    pub fn is_direct(&self) -> bool {
        self.direct
    }

    /// Granted scopes, when the credential carried any.
    pub fn scopes(&self) -> Option<&HashSet<Scope>> {
        self.scopes.as_ref()
    }

    /// Whether every scope in `required` has been granted.
    ///
    /// A principal without any scope grant satisfies only an empty
    /// requirement. Extra granted scopes are irrelevant.
    pub fn has_scopes<'a>(&self, required: impl IntoIterator<Item = &'a Scope>) -> bool {
        let mut required = required.into_iter().peekable();
        match &self.scopes {
            Some(granted) => required.all(|scope| granted.contains(scope)),
            None => required.peek().is_none(),
        }
    }
}
