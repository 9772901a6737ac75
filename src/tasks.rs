//! Task mutations and lookups.
//!
//! Each operation is a single-record transition: input is validated before anything
//! is written, every mutation stamps `updated_at`, and `completed` always follows
//! `status`.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use crate::error::AppError;
use crate::models::{Task, TaskInput, TaskPatch};
use crate::query::{FilterCompiler, PageResult, QueryExecutor, TaskQueryParams};
use crate::store::TaskStore;

fn not_found() -> AppError {
    AppError::NotFound("Task not found".into())
}

pub struct TaskService {
    store: Arc<dyn TaskStore>,
    compiler: FilterCompiler,
    executor: QueryExecutor,
}

impl TaskService {
    pub fn new(store: Arc<dyn TaskStore>, compiler: FilterCompiler) -> Self {
        Self {
            executor: QueryExecutor::new(Arc::clone(&store)),
            store,
            compiler,
        }
    }

    pub async fn list(&self, params: &TaskQueryParams) -> Result<PageResult, AppError> {
        let criteria = self.compiler.compile(params)?;
        self.executor.execute(&criteria).await
    }

    pub async fn create(&self, input: TaskInput) -> Result<Task, AppError> {
        input.validate()?;
        let task = self.store.insert(Task::new(input, Utc::now())).await?;
        log::info!("created task {}", task.id);
        Ok(task)
    }

    pub async fn get(&self, id: Uuid) -> Result<Task, AppError> {
        self.store.find_by_id(id).await?.ok_or_else(not_found)
    }

    /// Replaces every editable field. Status only changes when the input names one.
    pub async fn update(&self, id: Uuid, input: TaskInput) -> Result<Task, AppError> {
        input.validate()?;
        let current = self.get(id).await?;
        let patch = TaskPatch::replace(&current, &input, Utc::now());
        self.store
            .update_by_id(id, &patch)
            .await?
            .ok_or_else(not_found)
    }

    /// Completes an open task or reopens a completed one.
    pub async fn toggle(&self, id: Uuid) -> Result<Task, AppError> {
        let current = self.get(id).await?;
        let patch = TaskPatch::toggle(&current, Utc::now());
        let task = self
            .store
            .update_by_id(id, &patch)
            .await?
            .ok_or_else(not_found)?;
        log::debug!("toggled task {} to {:?}", task.id, task.status);
        Ok(task)
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        if !self.store.delete_by_id(id).await? {
            return Err(not_found());
        }
        log::info!("deleted task {}", id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TaskStatus;
    use crate::store::memory::InMemoryTaskStore;

    fn service() -> TaskService {
        TaskService::new(Arc::new(InMemoryTaskStore::new()), FilterCompiler::default())
    }

    fn input(title: &str) -> TaskInput {
        TaskInput {
            title: title.to_string(),
            ..TaskInput::default()
        }
    }

    #[actix_rt::test]
    async fn test_create_rejects_blank_title() {
        let tasks = service();
        let err = tasks.create(input("   ")).await.unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));

        let listed = tasks.list(&TaskQueryParams::default()).await.unwrap();
        assert_eq!(listed.total, 0);
    }

    #[actix_rt::test]
    async fn test_toggle_round_trip() {
        let tasks = service();
        let task = tasks.create(input("Water plants")).await.unwrap();

        let done = tasks.toggle(task.id).await.unwrap();
        assert!(done.completed);
        assert_eq!(done.status, TaskStatus::Completed);
        assert!(done.completed_at.is_some());
        assert!(done.updated_at >= task.updated_at);

        let reopened = tasks.toggle(task.id).await.unwrap();
        assert!(!reopened.completed);
        assert_eq!(reopened.status, TaskStatus::Pending);
        assert_eq!(reopened.completed_at, None);
    }

    #[actix_rt::test]
    async fn test_update_keeps_identity_and_created_at() {
        let tasks = service();
        let task = tasks.create(input("Draft")).await.unwrap();
        let updated = tasks
            .update(
                task.id,
                TaskInput {
                    status: Some(TaskStatus::InProgress),
                    ..input("Final")
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.id, task.id);
        assert_eq!(updated.created_at, task.created_at);
        assert_eq!(updated.title, "Final");
        assert_eq!(updated.status, TaskStatus::InProgress);
        assert!(!updated.completed);
    }

    #[actix_rt::test]
    async fn test_missing_task_is_not_found() {
        let tasks = service();
        let id = Uuid::new_v4();
        assert!(matches!(tasks.get(id).await, Err(AppError::NotFound(_))));
        assert!(matches!(tasks.toggle(id).await, Err(AppError::NotFound(_))));
        assert!(matches!(tasks.delete(id).await, Err(AppError::NotFound(_))));
        assert!(matches!(
            tasks.update(id, input("x")).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[actix_rt::test]
    async fn test_delete_removes_task() {
        let tasks = service();
        let task = tasks.create(input("Temporary")).await.unwrap();
        tasks.delete(task.id).await.unwrap();
        assert!(matches!(tasks.get(task.id).await, Err(AppError::NotFound(_))));
    }
}
