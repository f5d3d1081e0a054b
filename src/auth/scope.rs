//! Scope-based access control gate.
//!
//! [`RequireScopes`] guards a route with a required scope set. It reads the
//! [`AuthInfo`] the authentication middleware placed in request extensions
//! and grants access iff every required scope was granted. Extra granted
//! scopes are irrelevant, and a principal whose credential carried no
//! scopes (a direct mail-link session, a bare client) is denied any
//! non-empty requirement.
//!
//! Denial is a 403 (the principal is known, it just lacks permission)
//! and is never conflated with the 401 of a failed authentication. The
//! gate itself never errors.

use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::Json;
use axum::body::Body;
use axum::response::{IntoResponse, Response};
use http::{Request, StatusCode};
use serde_json::json;
use tower::{Layer, Service};

use crate::auth::context::AuthInfo;
use crate::types::Scope;

/// Layer that requires a set of granted scopes.
#[derive(Clone)]
pub struct RequireScopes {
    required: Arc<HashSet<Scope>>,
}

impl RequireScopes {
    pub fn new<I, S>(scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Scope>,
    {
        Self {
            required: Arc::new(scopes.into_iter().map(Into::into).collect()),
        }
    }
}

impl<S> Layer<S> for RequireScopes {
    type Service = RequireScopesService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequireScopesService {
            inner,
            required: self.required.clone(),
        }
    }
}

#[derive(Clone)]
pub struct RequireScopesService<S> {
    inner: S,
    required: Arc<HashSet<Scope>>,
}

impl<S> Service<Request<Body>> for RequireScopesService<S>
where
    S: Service<Request<Body>, Response = Response> + Send + 'static,
    S::Future: Send + 'static,
    S::Error: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Response, S::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let granted = req
            .extensions()
            .get::<AuthInfo>()
            .map(|info| info.has_scopes(self.required.iter()))
            .unwrap_or_else(|| self.required.is_empty());

        if granted {
            Box::pin(self.inner.call(req))
        } else {
            Box::pin(std::future::ready(Ok(forbidden_response())))
        }
    }
}

fn forbidden_response() -> Response {
    (
        StatusCode::FORBIDDEN,
        Json(json!({"status": 403, "message": "No authorization to see this page"})),
    )
        .into_response()
}
