//! Session glue between the login flow and the principal store.
//!
//! A resolved user is serialized down to nothing but a random session id
//! mapped to their `UserId`; rehydration goes back through the principal
//! store on demand. A store error during rehydration is surfaced to the
//! caller; it must not masquerade as "no session". Only users get
//! sessions; clients authenticate on every request.

use std::sync::Arc;

use anyhow::Result;
use dashmap::DashMap;
use http::HeaderMap;
use uuid::Uuid;

use crate::auth::context::Principal;
use crate::store::{PrincipalStore, User};
use crate::types::{SessionId, UserId};

pub struct Sessions {
    principals: Arc<dyn PrincipalStore>,
    active: DashMap<SessionId, UserId>,
    cookie_name: String,
}

impl Sessions {
    pub fn new(principals: Arc<dyn PrincipalStore>, cookie_name: impl Into<String>) -> Self {
        Self {
            principals,
            active: DashMap::new(),
            cookie_name: cookie_name.into(),
        }
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    /// Serialize a user into a fresh session.
    pub fn establish(&self, user: &User) -> SessionId {
        let id = SessionId::new(Uuid::new_v4().to_string());
        self.active.insert(id.clone(), user.id.clone());
        id
    }

    /// Rehydrate the principal behind a session id.
    ///
    /// `Ok(None)` when the session id is unknown or the user has vanished
    /// or been deactivated since; `Err` only when the principal store
    /// itself fails.
    pub async fn resolve(&self, session_id: &str) -> Result<Option<Principal>> {
        let Some(user_id) = self.active.get(session_id).map(|e| e.value().clone()) else {
            return Ok(None);
        };
        match self.principals.get_user(&user_id).await? {
            Some(user) if user.is_active => Ok(Some(Principal::User(user))),
            _ => Ok(None),
        }
    }

    /// Drop a session. Returns whether one existed.
    pub fn destroy(&self, session_id: &str) -> bool {
        self.active.remove(session_id).is_some()
    }

    /// Render the Set-Cookie value establishing a session.
    pub fn session_cookie(&self, session_id: &SessionId) -> String {
        format!(
            "{}={}; Path=/; HttpOnly; SameSite=Lax",
            self.cookie_name, session_id
        )
    }

    /// Render the Set-Cookie value clearing the session cookie.
    pub fn clear_cookie(&self) -> String {
        format!("{}=; Path=/; Max-Age=0; HttpOnly; SameSite=Lax", self.cookie_name)
    }

    /// Pull this service's session id out of a Cookie header, if present.
    pub fn session_from_headers(&self, headers: &HeaderMap) -> Option<String> {
        let cookies = headers.get(http::header::COOKIE)?.to_str().ok()?;
        cookies.split(';').find_map(|pair| {
            let (name, value) = pair.trim().split_once('=')?;
            (name == self.cookie_name && !value.is_empty()).then(|| value.to_string())
        })
    }
}
