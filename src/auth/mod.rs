//! Authentication and authorization engine.
//!
//! This module resolves the three actors the service knows about from the
//! credential material a request carries:
//!
//! - **End user via mail link**: a one-time bearer token from an emailed
//!   login link (`mail_auth`)
//! - **OAuth2 client**: a static id/secret pair, presented either as an
//!   HTTP Basic header (`client_basic`) or as body fields (`client_body`)
//! - **Client acting for a user**: a bearer access token carrying granted
//!   scopes (`client_api`)
//!
//! ## Error model
//!
//! Expected rejections (unknown or consumed token, bad secret, principal
//! that no longer exists) are normal `Rejected` outcomes with no detail
//! attached, so callers cannot distinguish a replayed mail token from one
//! that never existed. Store failures are the only errors, surfaced as
//! 5xx. Insufficient scope is a third, separate channel: a 403 from the
//! [`RequireScopes`] gate, never conflated with the 401 of a failed
//! authentication.

mod context;
mod middleware;
mod scope;
mod session;
mod strategy;

pub use context::{AuthInfo, Principal};
pub use middleware::AuthLayer;
pub(crate) use middleware::{bearer_token, form_pairs};
pub use scope::RequireScopes;
pub use session::Sessions;
pub use strategy::{Authenticator, Credential, Outcome, Strategy};
