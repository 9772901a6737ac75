//! Cookie sessions: an opaque random id mapped server-side to a principal.
//!
//! Expiry slides: every successful resolve pushes `expires_at` out by the full TTL.
//! An expired session is removed on first sight and treated as anonymous.

use std::sync::Arc;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use rand::RngCore;

use crate::error::AppError;
use crate::models::{Principal, Session};
use crate::store::SessionStore;

const SESSION_ID_BYTES: usize = 32;

/// 256 random bits, URL-safe base64.
pub fn generate_session_id() -> String {
    let mut bytes = [0u8; SESSION_ID_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

pub struct SessionAuthenticator {
    store: Arc<dyn SessionStore>,
    ttl: Duration,
}

impl SessionAuthenticator {
    pub fn new(store: Arc<dyn SessionStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub async fn login(&self, principal: Principal) -> Result<Session, AppError> {
        self.login_at(principal, Utc::now()).await
    }

    pub async fn login_at(
        &self,
        principal: Principal,
        now: DateTime<Utc>,
    ) -> Result<Session, AppError> {
        let session = Session {
            id: generate_session_id(),
            principal,
            expires_at: now + self.ttl,
        };
        self.store.put(session.clone()).await?;
        log::debug!("opened session for {}", session.principal.username);
        Ok(session)
    }

    /// `None` means anonymous: unknown, expired or logged out.
    pub async fn resolve(&self, session_id: &str) -> Result<Option<Principal>, AppError> {
        self.resolve_at(session_id, Utc::now()).await
    }

    pub async fn resolve_at(
        &self,
        session_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Principal>, AppError> {
        let Some(session) = self.store.get(session_id).await? else {
            return Ok(None);
        };
        if session.is_expired(now) {
            self.store.remove(session_id).await?;
            log::debug!("session for {} expired", session.principal.username);
            return Ok(None);
        }
        if !self.store.touch(session_id, now + self.ttl).await? {
            // Logged out concurrently.
            return Ok(None);
        }
        Ok(Some(session.principal))
    }

    /// Idempotent: logging out an unknown session is not an error.
    pub async fn logout(&self, session_id: &str) -> Result<(), AppError> {
        if self.store.remove(session_id).await? {
            log::debug!("closed session");
        }
        Ok(())
    }

    pub async fn purge_expired(&self) -> Result<usize, AppError> {
        self.store.purge_expired(Utc::now()).await
    }
}
