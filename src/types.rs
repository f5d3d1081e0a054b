//! NewType wrappers for strong typing across the auth service.
//!
//! These types prevent accidental mixing of semantically different strings
//! (e.g., passing a client id where a user id is expected).

use serde::{Deserialize, Serialize};
use std::fmt;

/// Macro to generate a NewType wrapper with standard trait implementations.
macro_rules! newtype_string {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new instance.
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Get the inner value as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume and return the inner String.
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::borrow::Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }
    };
}

newtype_string!(
    /// Stable identifier of an end user.
    ///
    /// Users are owned by the principal store; tokens and sessions reference
    /// them through this id and never embed the user record itself.
    UserId
);

newtype_string!(
    /// Identifier of an OAuth2 client application.
    ///
    /// This is the public half of the client credential pair. The secret
    /// half is only ever held as a `SecretHash`.
    ClientId
);

newtype_string!(
    /// A named capability a principal is authorized to exercise.
    ///
    /// Scopes are opaque strings ("profile", "journeys", ...). Access checks
    /// are pure set inclusion; the service attaches no meaning to the names.
    Scope
);

newtype_string!(
    /// Opaque identifier of an established browser session.
    ///
    /// Session ids are random and carry no information; they resolve to a
    /// `UserId` through the session map only.
    SessionId
);

newtype_string!(
    /// SHA-256 digest of an opaque token string.
    ///
    /// Mail and access tokens are never stored in plain text. The digest is
    /// computed once when a token is issued or presented, and all store
    /// lookups go through it.
    TokenHash
);

newtype_string!(
    /// SHA-256 digest of a client secret.
    ///
    /// Client secrets are provisioned pre-hashed; authentication compares
    /// digests and the raw secret never reaches the store.
    SecretHash
);
