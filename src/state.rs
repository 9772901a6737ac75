//! Shared application state handed to every handler through `web::Data`.

use std::sync::Arc;

use sqlx::PgPool;

use crate::auth::{AuthorizationGate, CredentialVerifier, SessionAuthenticator, TokenAuthenticator};
use crate::config::Config;
use crate::error::AppError;
use crate::query::FilterCompiler;
use crate::store::memory::{InMemoryCredentialStore, InMemorySessionStore, InMemoryTaskStore};
use crate::store::postgres::{PgCredentialStore, PgTaskStore};
use crate::store::{CredentialStore, SessionStore, TaskStore};
use crate::tasks::TaskService;

pub struct AppState {
    pub credentials: CredentialVerifier,
    pub sessions: Arc<SessionAuthenticator>,
    pub tokens: Arc<TokenAuthenticator>,
    pub gate: Arc<AuthorizationGate>,
    pub tasks: TaskService,
}

impl AppState {
    pub fn new(
        config: &Config,
        credential_store: Arc<dyn CredentialStore>,
        session_store: Arc<dyn SessionStore>,
        task_store: Arc<dyn TaskStore>,
    ) -> Result<Self, AppError> {
        let tokens = Arc::new(TokenAuthenticator::new(
            &config.jwt_secret,
            config.token_ttl,
        ));
        let sessions = Arc::new(SessionAuthenticator::new(session_store, config.session_ttl));
        let gate = Arc::new(AuthorizationGate::new(
            Arc::clone(&tokens),
            Arc::clone(&sessions),
        ));
        Ok(Self {
            credentials: CredentialVerifier::new(credential_store, config.bcrypt_cost)?,
            sessions,
            tokens,
            gate,
            tasks: TaskService::new(
                task_store,
                FilterCompiler::new(config.default_page_size, config.max_page_size),
            ),
        })
    }

    /// Everything in process memory. Nothing survives a restart.
    pub fn in_memory(config: &Config) -> Result<Self, AppError> {
        Self::new(
            config,
            Arc::new(InMemoryCredentialStore::new()),
            Arc::new(InMemorySessionStore::new()),
            Arc::new(InMemoryTaskStore::new()),
        )
    }

    /// Users and tasks in Postgres; sessions stay in memory.
    pub fn postgres(config: &Config, pool: PgPool) -> Result<Self, AppError> {
        Self::new(
            config,
            Arc::new(PgCredentialStore::new(pool.clone())),
            Arc::new(InMemorySessionStore::new()),
            Arc::new(PgTaskStore::new(pool)),
        )
    }
}
