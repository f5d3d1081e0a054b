//! Credential-verification strategies and their dispatcher.
//!
//! Four strategies cover the three actors this service authenticates:
//!
//! - `mail_auth`: an end user presenting the one-time token from an
//!   emailed login link
//! - `client_basic` / `client_body`: an OAuth2 client presenting its
//!   id/secret pair (HTTP Basic header vs. request-body fields; the
//!   verification path is shared, only extraction differs)
//! - `client_api`: a client acting on behalf of a user with a bearer
//!   access token carrying granted scopes
//!
//! Every verification normalizes to an [`Outcome`]: expected rejections
//! (bad token, bad secret, vanished user) are `Rejected` with no detail;
//! a replayed mail token and a never-issued one are indistinguishable to
//! the caller. Only infrastructure failures from the stores become
//! `Failed` and propagate as errors.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::auth::context::{AuthInfo, Principal};
use crate::store::{PrincipalStore, TokenStore, User};
use crate::types::UserId;

/// The finite set of authentication strategies, selected per route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    MailAuth,
    ClientBasic,
    ClientBody,
    ClientApi,
}

impl Strategy {
    /// Stable name, used in configuration and logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::MailAuth => "mail_auth",
            Self::ClientBasic => "client_basic",
            Self::ClientBody => "client_body",
            Self::ClientApi => "client_api",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "mail_auth" => Some(Self::MailAuth),
            "client_basic" => Some(Self::ClientBasic),
            "client_body" => Some(Self::ClientBody),
            "client_api" => Some(Self::ClientApi),
            _ => None,
        }
    }
}

/// Raw credential material extracted from a request.
#[derive(Debug, Clone)]
pub enum Credential {
    /// An opaque token presented as proof of authorization.
    Bearer(String),
    /// A client id/secret pair.
    ClientPair { id: String, secret: String },
}

/// The normalized result of one verification attempt.
pub enum Outcome {
    /// Credential verified; here is who it was and what they may do.
    Resolved(Principal, AuthInfo),
    /// Credential invalid, consumed, expired, or referencing a principal
    /// that no longer exists. Carries no detail on purpose.
    Rejected,
    /// A collaborator store failed. Not an authentication verdict.
    Failed(anyhow::Error),
}

impl Outcome {
    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved(..))
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected)
    }
}

impl std::fmt::Debug for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Resolved(principal, _) => write!(f, "Resolved({})", principal.display()),
            Self::Rejected => write!(f, "Rejected"),
            Self::Failed(err) => write!(f, "Failed({})", err),
        }
    }
}

/// The strategy dispatcher.
///
/// Holds the two store contracts and routes a `(strategy, credential)`
/// pair to the matching verification function. Constructed once at
/// startup and shared by reference; there is no global registry.
#[derive(Clone)]
pub struct Authenticator {
    tokens: Arc<dyn TokenStore>,
    principals: Arc<dyn PrincipalStore>,
}

impl Authenticator {
    pub fn new(tokens: Arc<dyn TokenStore>, principals: Arc<dyn PrincipalStore>) -> Self {
        Self { tokens, principals }
    }

    /// Verify a credential under the given strategy.
    ///
    /// A credential of the wrong kind for the strategy is Rejected, not an
    /// error. A route wired for bearer tokens simply does not accept a
    /// client pair.
    pub async fn authenticate(&self, strategy: Strategy, credential: Credential) -> Outcome {
        let outcome = match (strategy, credential) {
            (Strategy::MailAuth, Credential::Bearer(token)) => self.verify_mail_link(&token).await,
            (Strategy::ClientApi, Credential::Bearer(token)) => {
                self.verify_access_token(&token).await
            }
            (
                Strategy::ClientBasic | Strategy::ClientBody,
                Credential::ClientPair { id, secret },
            ) => self.verify_client_pair(&id, &secret).await,
            _ => Outcome::Rejected,
        };
        debug!(strategy = strategy.name(), outcome = ?outcome, "authentication attempt");
        outcome
    }

    /// One-time mail-link redemption.
    ///
    /// The find-and-delete is atomic at the store: of two concurrent
    /// requests presenting the same token, exactly one gets the record.
    /// The token is gone after this call either way; a failed user
    /// lookup afterwards does not resurrect or re-delete it.
    async fn verify_mail_link(&self, token: &str) -> Outcome {
        let record = match self.tokens.find_and_delete_mail_token(token).await {
            Ok(Some(record)) => record,
            Ok(None) => return Outcome::Rejected,
            Err(err) => return Outcome::Failed(err),
        };

        match self.resolve_user(&record.user_id).await {
            Ok(Some(user)) => Outcome::Resolved(Principal::User(user), AuthInfo::direct()),
            Ok(None) => Outcome::Rejected,
            Err(err) => Outcome::Failed(err),
        }
    }

    /// Shared verification for `client_basic` and `client_body`.
    ///
    /// The store performs the secret comparison; unknown client and bad
    /// secret come back identically as `None`.
    async fn verify_client_pair(&self, id: &str, secret: &str) -> Outcome {
        match self.principals.authenticate_client(id, secret).await {
            Ok(Some(client)) => Outcome::Resolved(Principal::Client(client), AuthInfo::default()),
            Ok(None) => Outcome::Rejected,
            Err(err) => Outcome::Failed(err),
        }
    }

    /// Bearer access-token verification. Read-only: the token stays valid
    /// until the store expires or revokes it.
    async fn verify_access_token(&self, token: &str) -> Outcome {
        // A store failure here must short-circuit before any principal
        // lookup happens.
        let record = match self.tokens.find_access_token(token).await {
            Ok(Some(record)) => record,
            Ok(None) => return Outcome::Rejected,
            Err(err) => return Outcome::Failed(err),
        };

        match self.resolve_user(&record.user_id).await {
            Ok(Some(user)) => {
                Outcome::Resolved(Principal::User(user), AuthInfo::scoped(record.scopes))
            }
            Ok(None) => Outcome::Rejected,
            Err(err) => Outcome::Failed(err),
        }
    }

    /// Fetch the user a token references, folding "gone" and "deactivated"
    /// into the same absent answer.
    async fn resolve_user(&self, user_id: &UserId) -> anyhow::Result<Option<User>> {
        match self.principals.get_user(user_id).await? {
            Some(user) if user.is_active => Ok(Some(user)),
            Some(_) => {
                warn!(user_id = %user_id, "token referenced a deactivated user");
                Ok(None)
            }
            None => {
                // The token outlived its user. Rejected like any bad
                // credential, but worth a trace.
                warn!(user_id = %user_id, "token referenced a user that no longer exists");
                Ok(None)
            }
        }
    }
}
