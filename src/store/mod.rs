//! Persistence seams.
//!
//! Each store is an async trait object so the service can run against Postgres in
//! production and against the in-memory implementations in tests or when no
//! `DATABASE_URL` is configured. Every failure of the backing store surfaces as
//! [`AppError::StoreUnavailable`]; callers never retry.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{CredentialRecord, Session, Task, TaskPatch};
use crate::query::{Predicate, Sort};

#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Matching tasks in `sort` order, after skipping `skip` and returning at most `limit`.
    async fn find_many(
        &self,
        predicate: &Predicate,
        sort: Sort,
        skip: u64,
        limit: u64,
    ) -> Result<Vec<Task>, AppError>;

    async fn count(&self, predicate: &Predicate) -> Result<u64, AppError>;

    async fn insert(&self, task: Task) -> Result<Task, AppError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Task>, AppError>;

    /// Applies `patch` atomically. `None` when no task has this id.
    async fn update_by_id(&self, id: Uuid, patch: &TaskPatch) -> Result<Option<Task>, AppError>;

    /// `false` when no task has this id.
    async fn delete_by_id(&self, id: Uuid) -> Result<bool, AppError>;
}

#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Case-sensitive lookup.
    async fn find_by_username(&self, username: &str)
        -> Result<Option<CredentialRecord>, AppError>;

    /// Fails with [`AppError::Conflict`] if the username is already taken.
    async fn insert(&self, record: CredentialRecord) -> Result<(), AppError>;
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn put(&self, session: Session) -> Result<(), AppError>;

    async fn get(&self, id: &str) -> Result<Option<Session>, AppError>;

    /// Moves the expiry of an existing session. `false` if the session is gone.
    async fn touch(&self, id: &str, expires_at: DateTime<Utc>) -> Result<bool, AppError>;

    async fn remove(&self, id: &str) -> Result<bool, AppError>;

    /// Drops every session expired at `now` and returns how many were removed.
    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize, AppError>;
}
