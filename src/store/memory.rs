//! In-memory store implementations.
//!
//! Used when no database is configured and by the test suite. Each store keeps its
//! records in a `HashMap` behind a `tokio::sync::RwLock`; every write holds the lock
//! for the whole check-and-modify, so single-record operations are atomic.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{CredentialStore, SessionStore, TaskStore};
use crate::error::AppError;
use crate::models::{CredentialRecord, Session, Task, TaskPatch};
use crate::query::{Predicate, Sort};

#[derive(Debug, Default)]
pub struct InMemoryTaskStore {
    tasks: RwLock<HashMap<Uuid, Task>>,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn find_many(
        &self,
        predicate: &Predicate,
        sort: Sort,
        skip: u64,
        limit: u64,
    ) -> Result<Vec<Task>, AppError> {
        let tasks = self.tasks.read().await;
        let mut matching: Vec<&Task> = tasks.values().filter(|t| predicate.matches(t)).collect();
        matching.sort_by(|a, b| sort.compare(a, b));

        let skip = usize::try_from(skip).unwrap_or(usize::MAX);
        let limit = usize::try_from(limit).unwrap_or(usize::MAX);
        Ok(matching.into_iter().skip(skip).take(limit).cloned().collect())
    }

    async fn count(&self, predicate: &Predicate) -> Result<u64, AppError> {
        let tasks = self.tasks.read().await;
        Ok(tasks.values().filter(|t| predicate.matches(t)).count() as u64)
    }

    async fn insert(&self, task: Task) -> Result<Task, AppError> {
        let mut tasks = self.tasks.write().await;
        match tasks.entry(task.id) {
            Entry::Occupied(_) => Err(AppError::Conflict("Task already exists".into())),
            Entry::Vacant(slot) => Ok(slot.insert(task).clone()),
        }
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Task>, AppError> {
        Ok(self.tasks.read().await.get(&id).cloned())
    }

    async fn update_by_id(&self, id: Uuid, patch: &TaskPatch) -> Result<Option<Task>, AppError> {
        let mut tasks = self.tasks.write().await;
        Ok(tasks.get_mut(&id).map(|task| {
            task.apply(patch);
            task.clone()
        }))
    }

    async fn delete_by_id(&self, id: Uuid) -> Result<bool, AppError> {
        Ok(self.tasks.write().await.remove(&id).is_some())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryCredentialStore {
    records: RwLock<HashMap<String, CredentialRecord>>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn find_by_username(
        &self,
        username: &str,
    ) -> Result<Option<CredentialRecord>, AppError> {
        Ok(self.records.read().await.get(username).cloned())
    }

    async fn insert(&self, record: CredentialRecord) -> Result<(), AppError> {
        let mut records = self.records.write().await;
        match records.entry(record.username.clone()) {
            Entry::Occupied(_) => Err(AppError::Conflict("Username already taken".into())),
            Entry::Vacant(slot) => {
                slot.insert(record);
                Ok(())
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<String, Session>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn put(&self, session: Session) -> Result<(), AppError> {
        self.sessions
            .write()
            .await
            .insert(session.id.clone(), session);
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<Session>, AppError> {
        Ok(self.sessions.read().await.get(id).cloned())
    }

    async fn touch(&self, id: &str, expires_at: DateTime<Utc>) -> Result<bool, AppError> {
        let mut sessions = self.sessions.write().await;
        Ok(match sessions.get_mut(id) {
            Some(session) => {
                session.expires_at = expires_at;
                true
            }
            None => false,
        })
    }

    async fn remove(&self, id: &str) -> Result<bool, AppError> {
        Ok(self.sessions.write().await.remove(id).is_some())
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize, AppError> {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, session| !session.is_expired(now));
        Ok(before - sessions.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Principal, TaskInput, TaskStatus};
    use crate::query::{Clause, SortDirection, SortField};
    use chrono::Duration;

    fn task(title: &str) -> Task {
        Task::new(
            TaskInput {
                title: title.to_string(),
                ..TaskInput::default()
            },
            Utc::now(),
        )
    }

    #[actix_rt::test]
    async fn test_task_crud() {
        let store = InMemoryTaskStore::new();
        let created = store.insert(task("first")).await.unwrap();

        let found = store.find_by_id(created.id).await.unwrap();
        assert_eq!(found.as_ref(), Some(&created));

        let mut patch = TaskPatch::new(Utc::now());
        patch.title = Some("renamed".into());
        let updated = store.update_by_id(created.id, &patch).await.unwrap().unwrap();
        assert_eq!(updated.title, "renamed");

        assert!(store.delete_by_id(created.id).await.unwrap());
        assert!(!store.delete_by_id(created.id).await.unwrap());
        assert_eq!(store.find_by_id(created.id).await.unwrap(), None);
        assert_eq!(store.update_by_id(created.id, &patch).await.unwrap(), None);
    }

    #[actix_rt::test]
    async fn test_find_many_filters_sorts_and_pages() {
        let store = InMemoryTaskStore::new();
        for title in ["c", "a", "b", "d"] {
            store.insert(task(title)).await.unwrap();
        }
        let mut done = task("done");
        done.status = TaskStatus::Completed;
        done.completed = true;
        store.insert(done).await.unwrap();

        let pending = Predicate::all().and(Clause::Status(TaskStatus::Pending));
        assert_eq!(store.count(&pending).await.unwrap(), 4);

        let by_title = Sort::new(SortField::Title, SortDirection::Asc);
        let page = store.find_many(&pending, by_title, 1, 2).await.unwrap();
        let titles: Vec<_> = page.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["b", "c"]);
    }

    #[actix_rt::test]
    async fn test_duplicate_username_conflicts() {
        let store = InMemoryCredentialStore::new();
        store
            .insert(CredentialRecord::new("alice".into(), "h1".into()))
            .await
            .unwrap();
        let err = store
            .insert(CredentialRecord::new("alice".into(), "h2".into()))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        let found = store.find_by_username("alice").await.unwrap().unwrap();
        assert_eq!(found.password_hash, "h1");
        assert!(store.find_by_username("Alice").await.unwrap().is_none());
    }

    #[actix_rt::test]
    async fn test_session_purge_only_drops_expired() {
        let store = InMemorySessionStore::new();
        let now = Utc::now();
        let principal = Principal {
            id: Uuid::new_v4(),
            username: "alice".into(),
        };
        for (id, offset) in [("old", -1), ("fresh", 60)] {
            store
                .put(Session {
                    id: id.into(),
                    principal: principal.clone(),
                    expires_at: now + Duration::seconds(offset),
                })
                .await
                .unwrap();
        }

        assert_eq!(store.purge_expired(now).await.unwrap(), 1);
        assert!(store.get("old").await.unwrap().is_none());
        assert!(store.get("fresh").await.unwrap().is_some());
    }
}
