//! Postgres-backed stores.
//!
//! Predicates are translated clause by clause into a parameterized `WHERE` with
//! `sqlx::QueryBuilder`; user input only ever reaches the database as bound values.

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::types::Json;
use sqlx::{FromRow, Postgres, QueryBuilder, Row};
use uuid::Uuid;

use super::{CredentialStore, TaskStore};
use crate::error::AppError;
use crate::models::{CredentialRecord, Recurrence, Subtask, Task, TaskPatch};
use crate::query::{Clause, Predicate, Sort};

const TASK_COLUMNS: &str = "id, title, description, status, completed, priority, category, tags, \
     due_date, estimated_minutes, subtasks, recurrence, recurrence_end_date, completed_at, \
     created_at, updated_at";

/// Connects and brings the schema up to date.
pub async fn connect(database_url: &str) -> Result<PgPool, AppError> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await?;
    sqlx::migrate!("./migrations").run(&pool).await?;
    Ok(pool)
}

impl<'r> FromRow<'r, PgRow> for Task {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        let Json(subtasks): Json<Vec<Subtask>> = row.try_get("subtasks")?;
        Ok(Task {
            id: row.try_get("id")?,
            title: row.try_get("title")?,
            description: row.try_get("description")?,
            status: row.try_get("status")?,
            completed: row.try_get("completed")?,
            priority: row.try_get("priority")?,
            category: row.try_get("category")?,
            tags: row.try_get("tags")?,
            due_date: row.try_get("due_date")?,
            estimated_minutes: row.try_get("estimated_minutes")?,
            subtasks,
            recurring: Recurrence {
                frequency: row.try_get("recurrence")?,
                end_date: row.try_get("recurrence_end_date")?,
            },
            completed_at: row.try_get("completed_at")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct PgTaskStore {
    pool: PgPool,
}

impl PgTaskStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Escapes `LIKE` metacharacters so search text is matched literally.
fn escape_like(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn push_predicate(builder: &mut QueryBuilder<'_, Postgres>, predicate: &Predicate) {
    for (i, clause) in predicate.clauses().iter().enumerate() {
        builder.push(if i == 0 { " WHERE " } else { " AND " });
        match clause {
            Clause::Status(status) => {
                builder.push("status = ").push_bind(*status);
            }
            Clause::Priority(priority) => {
                builder.push("priority = ").push_bind(*priority);
            }
            Clause::Category(category) => {
                builder.push("category = ").push_bind(category.clone());
            }
            Clause::Tag(tag) => {
                builder.push_bind(tag.clone()).push(" = ANY(tags)");
            }
            Clause::DueFrom(start) => {
                builder.push("due_date >= ").push_bind(*start);
            }
            Clause::DueTo(end) => {
                builder.push("due_date <= ").push_bind(*end);
            }
            Clause::Search(needle) => {
                let pattern = format!("%{}%", escape_like(needle));
                builder
                    .push("(title ILIKE ")
                    .push_bind(pattern.clone())
                    .push(" OR description ILIKE ")
                    .push_bind(pattern.clone())
                    .push(" OR EXISTS (SELECT 1 FROM unnest(tags) AS tag WHERE tag ILIKE ")
                    .push_bind(pattern)
                    .push("))");
            }
        }
    }
}

#[async_trait]
impl TaskStore for PgTaskStore {
    async fn find_many(
        &self,
        predicate: &Predicate,
        sort: Sort,
        skip: u64,
        limit: u64,
    ) -> Result<Vec<Task>, AppError> {
        let mut builder = QueryBuilder::new(format!("SELECT {} FROM tasks", TASK_COLUMNS));
        push_predicate(&mut builder, predicate);
        builder
            .push(format!(
                " ORDER BY {} {} NULLS LAST, id ASC LIMIT ",
                sort.field.column(),
                sort.direction.keyword()
            ))
            .push_bind(i64::try_from(limit).unwrap_or(i64::MAX))
            .push(" OFFSET ")
            .push_bind(i64::try_from(skip).unwrap_or(i64::MAX));

        let tasks = builder
            .build_query_as::<Task>()
            .fetch_all(&self.pool)
            .await?;
        Ok(tasks)
    }

    async fn count(&self, predicate: &Predicate) -> Result<u64, AppError> {
        let mut builder = QueryBuilder::new("SELECT COUNT(*) FROM tasks");
        push_predicate(&mut builder, predicate);
        let (count,): (i64,) = builder.build_query_as().fetch_one(&self.pool).await?;
        Ok(count.max(0) as u64)
    }

    async fn insert(&self, task: Task) -> Result<Task, AppError> {
        let sql = format!(
            "INSERT INTO tasks ({cols}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16) \
             RETURNING {cols}",
            cols = TASK_COLUMNS
        );
        let task = sqlx::query_as::<_, Task>(&sql)
            .bind(task.id)
            .bind(task.title)
            .bind(task.description)
            .bind(task.status)
            .bind(task.completed)
            .bind(task.priority)
            .bind(task.category)
            .bind(task.tags)
            .bind(task.due_date)
            .bind(task.estimated_minutes)
            .bind(Json(task.subtasks))
            .bind(task.recurring.frequency)
            .bind(task.recurring.end_date)
            .bind(task.completed_at)
            .bind(task.created_at)
            .bind(task.updated_at)
            .fetch_one(&self.pool)
            .await?;
        Ok(task)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Task>, AppError> {
        let sql = format!("SELECT {} FROM tasks WHERE id = $1", TASK_COLUMNS);
        let task = sqlx::query_as::<_, Task>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(task)
    }

    async fn update_by_id(&self, id: Uuid, patch: &TaskPatch) -> Result<Option<Task>, AppError> {
        let mut builder = QueryBuilder::<Postgres>::new("UPDATE tasks SET updated_at = ");
        builder.push_bind(patch.updated_at);
        if let Some(title) = &patch.title {
            builder.push(", title = ").push_bind(title.clone());
        }
        if let Some(description) = &patch.description {
            builder.push(", description = ").push_bind(description.clone());
        }
        if let Some(status) = patch.status {
            builder
                .push(", status = ")
                .push_bind(status)
                .push(", completed = ")
                .push_bind(status.is_completed());
        }
        if let Some(priority) = patch.priority {
            builder.push(", priority = ").push_bind(priority);
        }
        if let Some(category) = &patch.category {
            builder.push(", category = ").push_bind(category.clone());
        }
        if let Some(tags) = &patch.tags {
            builder.push(", tags = ").push_bind(tags.clone());
        }
        if let Some(due_date) = patch.due_date {
            builder.push(", due_date = ").push_bind(due_date);
        }
        if let Some(estimated_minutes) = patch.estimated_minutes {
            builder
                .push(", estimated_minutes = ")
                .push_bind(estimated_minutes);
        }
        if let Some(subtasks) = &patch.subtasks {
            builder.push(", subtasks = ").push_bind(Json(subtasks.clone()));
        }
        if let Some(recurring) = patch.recurring {
            builder
                .push(", recurrence = ")
                .push_bind(recurring.frequency)
                .push(", recurrence_end_date = ")
                .push_bind(recurring.end_date);
        }
        if let Some(completed_at) = patch.completed_at {
            builder.push(", completed_at = ").push_bind(completed_at);
        }
        builder
            .push(" WHERE id = ")
            .push_bind(id)
            .push(format!(" RETURNING {}", TASK_COLUMNS));

        let task = builder
            .build_query_as::<Task>()
            .fetch_optional(&self.pool)
            .await?;
        Ok(task)
    }

    async fn delete_by_id(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[derive(Debug, Clone)]
pub struct PgCredentialStore {
    pool: PgPool,
}

impl PgCredentialStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn find_by_username(
        &self,
        username: &str,
    ) -> Result<Option<CredentialRecord>, AppError> {
        let record = sqlx::query_as::<_, CredentialRecord>(
            "SELECT id, username, password_hash, created_at FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(record)
    }

    async fn insert(&self, record: CredentialRecord) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO users (id, username, password_hash, created_at) VALUES ($1, $2, $3, $4)",
        )
        .bind(record.id)
        .bind(&record.username)
        .bind(&record.password_hash)
        .bind(record.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match AppError::from(e) {
            AppError::Conflict(_) => AppError::Conflict("Username already taken".into()),
            other => other,
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TaskStatus;

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("100%_done\\"), "100\\%\\_done\\\\");
        assert_eq!(escape_like("plain"), "plain");
    }

    #[test]
    fn test_task_columns_cover_nested_fields() {
        let columns: Vec<&str> = TASK_COLUMNS.split(',').map(str::trim).collect();
        assert_eq!(columns.len(), 16);
        for column in ["subtasks", "recurrence", "recurrence_end_date"] {
            assert!(columns.contains(&column), "{} missing", column);
        }
    }

    #[test]
    fn test_predicate_sql_binds_every_value() {
        let predicate = Predicate::all()
            .and(Clause::Status(TaskStatus::Completed))
            .and(Clause::Tag("home".into()))
            .and(Clause::search("rent"));
        let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM tasks");
        push_predicate(&mut builder, &predicate);

        let sql = builder.sql();
        assert!(sql.contains("WHERE status = $1"));
        assert!(sql.contains("AND $2 = ANY(tags)"));
        assert!(sql.contains("title ILIKE $3 OR description ILIKE $4"));
        assert!(!sql.contains("rent"));
    }
}
