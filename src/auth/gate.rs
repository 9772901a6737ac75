//! The single decision point for protected routes.
//!
//! A request may carry a bearer token, a session cookie, both or neither. The gate
//! tries each present credential in a fixed order (bearer first) and the first one
//! that resolves to a principal wins. A request with no credentials and a request
//! whose credentials all fail are both rejected; they differ only in the log line.

use std::fmt;
use std::sync::Arc;

use actix_web::http::header::AUTHORIZATION;
use actix_web::HttpRequest;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::auth::session::SessionAuthenticator;
use crate::auth::token::TokenAuthenticator;
use crate::auth::SESSION_COOKIE;
use crate::error::AppError;
use crate::models::Principal;

/// Anything that can turn a raw credential string into a principal.
#[async_trait]
pub trait ResolvePrincipal: Send + Sync {
    /// `Ok(None)` means the credential was not accepted.
    async fn resolve_principal(
        &self,
        raw: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Principal>, AppError>;
}

#[async_trait]
impl ResolvePrincipal for TokenAuthenticator {
    async fn resolve_principal(
        &self,
        raw: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Principal>, AppError> {
        match self.verify_at(raw, now) {
            Ok(principal) => Ok(Some(principal)),
            Err(e) => {
                log::debug!("bearer token rejected: {}", e);
                Ok(None)
            }
        }
    }
}

#[async_trait]
impl ResolvePrincipal for SessionAuthenticator {
    async fn resolve_principal(
        &self,
        raw: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Principal>, AppError> {
        self.resolve_at(raw, now).await
    }
}

/// The raw credentials a request carries, before any of them is checked.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestCredentials {
    pub bearer_token: Option<String>,
    pub session_id: Option<String>,
}

impl RequestCredentials {
    pub fn from_request(req: &HttpRequest) -> Self {
        let bearer_token = req
            .headers()
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(str::to_string);
        let session_id = req
            .cookie(SESSION_COOKIE)
            .map(|cookie| cookie.value().to_string())
            .filter(|id| !id.is_empty());
        Self {
            bearer_token,
            session_id,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.bearer_token.is_none() && self.session_id.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    NoCredentials,
    InvalidCredentials,
    Store(AppError),
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Rejection::NoCredentials => write!(f, "no credentials presented"),
            Rejection::InvalidCredentials => write!(f, "no presented credential was accepted"),
            Rejection::Store(e) => write!(f, "{}", e),
        }
    }
}

impl From<Rejection> for AppError {
    fn from(rejection: Rejection) -> AppError {
        match rejection {
            Rejection::NoCredentials | Rejection::InvalidCredentials => {
                AppError::Unauthorized("Unauthorized".into())
            }
            Rejection::Store(e) => e,
        }
    }
}

pub struct AuthorizationGate {
    tokens: Arc<TokenAuthenticator>,
    sessions: Arc<SessionAuthenticator>,
}

impl AuthorizationGate {
    pub fn new(tokens: Arc<TokenAuthenticator>, sessions: Arc<SessionAuthenticator>) -> Self {
        Self { tokens, sessions }
    }

    pub async fn authorize(&self, credentials: &RequestCredentials) -> Result<Principal, Rejection> {
        self.authorize_at(credentials, Utc::now()).await
    }

    pub async fn authorize_at(
        &self,
        credentials: &RequestCredentials,
        now: DateTime<Utc>,
    ) -> Result<Principal, Rejection> {
        if credentials.is_empty() {
            return Err(Rejection::NoCredentials);
        }

        let attempts: [(Option<&String>, &dyn ResolvePrincipal); 2] = [
            (credentials.bearer_token.as_ref(), self.tokens.as_ref()),
            (credentials.session_id.as_ref(), self.sessions.as_ref()),
        ];
        for (raw, authenticator) in attempts {
            let Some(raw) = raw else { continue };
            if let Some(principal) = authenticator
                .resolve_principal(raw, now)
                .await
                .map_err(Rejection::Store)?
            {
                return Ok(principal);
            }
        }
        Err(Rejection::InvalidCredentials)
    }
}
