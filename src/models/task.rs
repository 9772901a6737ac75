use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

pub const DEFAULT_CATEGORY: &str = "general";
const MAX_TAGS: usize = 20;
const MAX_TAG_LEN: usize = 50;
const MAX_SUBTASKS: usize = 50;
const MAX_TITLE_LEN: usize = 200;

/// Represents the priority of a task.
/// Corresponds to the `task_priority` SQL enum; variants are declared in rank order.
#[derive(
    Debug, Serialize, Deserialize, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash,
    sqlx::Type,
)]
#[sqlx(type_name = "task_priority", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
}

impl TaskPriority {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            _ => None,
        }
    }
}

/// Represents the status of a task.
/// Corresponds to the `task_status` SQL enum; variants are declared in workflow order.
#[derive(
    Debug, Serialize, Deserialize, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash,
    sqlx::Type,
)]
#[sqlx(type_name = "task_status", rename_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    /// Task is yet to be started.
    #[default]
    Pending,
    /// Task is currently being worked on.
    InProgress,
    /// Task is done. The only status with `completed == true`.
    Completed,
}

impl TaskStatus {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "in-progress" | "in_progress" | "inprogress" => Some(Self::InProgress),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }

    pub fn is_completed(self) -> bool {
        self == Self::Completed
    }
}

/// How often a recurring task repeats. `none` means the task does not recur.
#[derive(
    Debug, Serialize, Deserialize, Clone, Copy, Default, PartialEq, Eq, Hash, sqlx::Type,
)]
#[sqlx(type_name = "task_recurrence", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RecurrenceFrequency {
    #[default]
    None,
    Daily,
    Weekly,
    Monthly,
}

/// Recurrence settings. A recurring task must say when it stops recurring.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recurrence {
    #[serde(default)]
    pub frequency: RecurrenceFrequency,
    #[serde(default)]
    pub end_date: Option<DateTime<Utc>>,
}

impl Recurrence {
    pub fn is_recurring(&self) -> bool {
        self.frequency != RecurrenceFrequency::None
    }

    /// Drops a stray end date from a task that does not recur.
    pub fn normalized(self) -> Self {
        if self.is_recurring() {
            self
        } else {
            Self::default()
        }
    }
}

/// A checklist item inside a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subtask {
    pub id: Uuid,
    pub title: String,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
}

/// A subtask as submitted. Supplying the `id` of an existing subtask keeps its identity
/// and creation time across a replace.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubtaskInput {
    #[serde(default)]
    pub id: Option<Uuid>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub completed: bool,
}

/// Input structure for creating or replacing a task.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct TaskInput {
    /// Must contain at least one non-whitespace character; stored trimmed.
    /// A missing title is treated like an empty one.
    #[serde(default)]
    #[validate(length(min = 1, max = 200), custom = "validate_not_blank")]
    pub title: String,

    #[validate(length(max = 1000))]
    pub description: Option<String>,

    /// Defaults to `pending` on creation; left unchanged on update when absent.
    pub status: Option<TaskStatus>,

    /// Defaults to `medium`.
    pub priority: Option<TaskPriority>,

    /// Free text; blank or absent means `general`.
    #[validate(length(max = 50))]
    pub category: Option<String>,

    /// Either a JSON array or a comma-separated string.
    #[serde(default, deserialize_with = "deserialize_tags")]
    #[validate(custom = "validate_tags")]
    pub tags: Vec<String>,

    pub due_date: Option<DateTime<Utc>>,

    #[validate(range(min = 0, max = 525600))]
    pub estimated_minutes: Option<i32>,

    #[serde(default)]
    #[validate(custom = "validate_subtasks")]
    pub subtasks: Vec<SubtaskInput>,

    #[serde(default)]
    #[validate(custom = "validate_recurrence")]
    pub recurring: Recurrence,
}

impl TaskInput {
    pub fn normalized_title(&self) -> String {
        self.title.trim().to_string()
    }

    pub fn normalized_description(&self) -> Option<String> {
        self.description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(str::to_string)
    }

    pub fn normalized_category(&self) -> String {
        self.category
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(DEFAULT_CATEGORY)
            .to_string()
    }

    pub fn normalized_tags(&self) -> Vec<String> {
        normalize_tags(&self.tags)
    }

    /// Builds the stored subtask list. Inputs naming an id in `existing` keep that
    /// subtask's id and `created_at`; everything else is new as of `now`.
    pub fn normalized_subtasks(&self, existing: &[Subtask], now: DateTime<Utc>) -> Vec<Subtask> {
        self.subtasks
            .iter()
            .map(|input| {
                let known = input
                    .id
                    .and_then(|id| existing.iter().find(|subtask| subtask.id == id));
                Subtask {
                    id: known.map_or_else(Uuid::new_v4, |subtask| subtask.id),
                    title: input.title.trim().to_string(),
                    completed: input.completed,
                    created_at: known.map_or(now, |subtask| subtask.created_at),
                }
            })
            .collect()
    }
}

/// Represents a task entity as stored and returned by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    /// Mirrors `status == completed`; never set independently.
    pub completed: bool,
    pub priority: TaskPriority,
    pub category: String,
    /// Trimmed, de-duplicated and sorted.
    pub tags: Vec<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub estimated_minutes: Option<i32>,
    pub subtasks: Vec<Subtask>,
    pub recurring: Recurrence,
    /// Set exactly when the task enters `completed`, cleared when it leaves.
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Builds a new task from validated input. `created_at` and `updated_at` are both `now`.
    pub fn new(input: TaskInput, now: DateTime<Utc>) -> Self {
        let status = input.status.unwrap_or_default();
        Self {
            id: Uuid::new_v4(),
            title: input.normalized_title(),
            description: input.normalized_description(),
            completed: status.is_completed(),
            completed_at: status.is_completed().then_some(now),
            status,
            priority: input.priority.unwrap_or_default(),
            category: input.normalized_category(),
            tags: input.normalized_tags(),
            due_date: input.due_date,
            estimated_minutes: input.estimated_minutes,
            subtasks: input.normalized_subtasks(&[], now),
            recurring: input.recurring.normalized(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Applies a patch in place. Used by stores that hold tasks in memory.
    pub fn apply(&mut self, patch: &TaskPatch) {
        if let Some(title) = &patch.title {
            self.title = title.clone();
        }
        if let Some(description) = &patch.description {
            self.description = description.clone();
        }
        if let Some(status) = patch.status {
            self.status = status;
            self.completed = status.is_completed();
        }
        if let Some(priority) = patch.priority {
            self.priority = priority;
        }
        if let Some(category) = &patch.category {
            self.category = category.clone();
        }
        if let Some(tags) = &patch.tags {
            self.tags = tags.clone();
        }
        if let Some(due_date) = patch.due_date {
            self.due_date = due_date;
        }
        if let Some(estimated_minutes) = patch.estimated_minutes {
            self.estimated_minutes = estimated_minutes;
        }
        if let Some(subtasks) = &patch.subtasks {
            self.subtasks = subtasks.clone();
        }
        if let Some(recurring) = patch.recurring {
            self.recurring = recurring;
        }
        if let Some(completed_at) = patch.completed_at {
            self.completed_at = completed_at;
        }
        self.updated_at = patch.updated_at;
    }
}

/// An explicit set of field changes for `TaskStore::update_by_id`.
///
/// `None` leaves a field untouched; `Some(None)` clears a nullable field.
/// `completed` is not a patch field: it is always derived from `status`.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub category: Option<String>,
    pub tags: Option<Vec<String>>,
    pub due_date: Option<Option<DateTime<Utc>>>,
    pub estimated_minutes: Option<Option<i32>>,
    pub subtasks: Option<Vec<Subtask>>,
    pub recurring: Option<Recurrence>,
    pub completed_at: Option<Option<DateTime<Utc>>>,
    pub updated_at: DateTime<Utc>,
}

impl TaskPatch {
    /// An empty patch that only stamps `updated_at`.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            title: None,
            description: None,
            status: None,
            priority: None,
            category: None,
            tags: None,
            due_date: None,
            estimated_minutes: None,
            subtasks: None,
            recurring: None,
            completed_at: None,
            updated_at: now,
        }
    }

    /// Replaces every editable field from `input`. Status only changes when supplied.
    pub fn replace(current: &Task, input: &TaskInput, now: DateTime<Utc>) -> Self {
        let mut patch = Self::new(now);
        patch.title = Some(input.normalized_title());
        patch.description = Some(input.normalized_description());
        patch.priority = Some(input.priority.unwrap_or_default());
        patch.category = Some(input.normalized_category());
        patch.tags = Some(input.normalized_tags());
        patch.due_date = Some(input.due_date);
        patch.estimated_minutes = Some(input.estimated_minutes);
        patch.subtasks = Some(input.normalized_subtasks(&current.subtasks, now));
        patch.recurring = Some(input.recurring.normalized());
        match input.status {
            Some(status) => patch.with_status(current, status),
            None => patch,
        }
    }

    /// Moves the task to `status`, keeping `completed_at` in step with it.
    pub fn with_status(mut self, current: &Task, status: TaskStatus) -> Self {
        self.status = Some(status);
        if status.is_completed() && !current.status.is_completed() {
            self.completed_at = Some(Some(self.updated_at));
        } else if !status.is_completed() {
            self.completed_at = Some(None);
        }
        self
    }

    /// Flips completion: completed tasks go back to `pending`, anything else completes.
    pub fn toggle(current: &Task, now: DateTime<Utc>) -> Self {
        let next = if current.status.is_completed() {
            TaskStatus::Pending
        } else {
            TaskStatus::Completed
        };
        Self::new(now).with_status(current, next)
    }
}

fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut error = ValidationError::new("blank");
        error.message = Some("must not be blank".into());
        return Err(error);
    }
    Ok(())
}

fn validate_tags(tags: &[String]) -> Result<(), ValidationError> {
    if tags.len() > MAX_TAGS {
        return Err(ValidationError::new("too_many_tags"));
    }
    if tags.iter().any(|tag| tag.trim().chars().count() > MAX_TAG_LEN) {
        return Err(ValidationError::new("tag_too_long"));
    }
    Ok(())
}

fn validate_subtasks(subtasks: &[SubtaskInput]) -> Result<(), ValidationError> {
    if subtasks.len() > MAX_SUBTASKS {
        return Err(ValidationError::new("too_many_subtasks"));
    }
    for subtask in subtasks {
        validate_not_blank(&subtask.title)?;
        if subtask.title.trim().chars().count() > MAX_TITLE_LEN {
            return Err(ValidationError::new("subtask_title_too_long"));
        }
    }
    Ok(())
}

fn validate_recurrence(recurrence: &Recurrence) -> Result<(), ValidationError> {
    if recurrence.is_recurring() && recurrence.end_date.is_none() {
        let mut error = ValidationError::new("end_date_required");
        error.message = Some("a recurring task needs an end date".into());
        return Err(error);
    }
    Ok(())
}

pub fn normalize_tags(tags: &[String]) -> Vec<String> {
    let mut normalized: Vec<String> = tags
        .iter()
        .map(|tag| tag.trim())
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect();
    normalized.sort();
    normalized.dedup();
    normalized
}

fn deserialize_tags<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Tags {
        List(Vec<String>),
        Csv(String),
    }

    Ok(match Option::<Tags>::deserialize(deserializer)? {
        Some(Tags::List(tags)) => tags,
        Some(Tags::Csv(raw)) => raw.split(',').map(str::to_string).collect(),
        None => Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use pretty_assertions::assert_eq;

    fn input(title: &str) -> TaskInput {
        TaskInput {
            title: title.to_string(),
            ..TaskInput::default()
        }
    }

    #[test]
    fn test_task_creation_defaults() {
        let now = Utc::now();
        let task = Task::new(input("  Buy milk  "), now);

        assert_eq!(task.title, "Buy milk");
        assert_eq!(task.status, TaskStatus::Pending);
        assert!(!task.completed);
        assert_eq!(task.priority, TaskPriority::Medium);
        assert_eq!(task.category, DEFAULT_CATEGORY);
        assert!(task.tags.is_empty());
        assert_eq!(task.completed_at, None);
        assert_eq!(task.created_at, now);
        assert_eq!(task.updated_at, now);
    }

    #[test]
    fn test_task_created_completed_is_stamped() {
        let now = Utc::now();
        let task = Task::new(
            TaskInput {
                status: Some(TaskStatus::Completed),
                ..input("Pay rent")
            },
            now,
        );
        assert!(task.completed);
        assert_eq!(task.completed_at, Some(now));
    }

    #[test]
    fn test_task_validation() {
        assert!(input("Valid Task").validate().is_ok());
        assert!(input("").validate().is_err());
        assert!(input("   ").validate().is_err());
        assert!(input(&"a".repeat(201)).validate().is_err());

        let long_description = TaskInput {
            description: Some("b".repeat(1001)),
            ..input("Valid title")
        };
        assert!(long_description.validate().is_err());

        let negative_estimate = TaskInput {
            estimated_minutes: Some(-5),
            ..input("Valid title")
        };
        assert!(negative_estimate.validate().is_err());

        let too_many_tags = TaskInput {
            tags: (0..21).map(|i| format!("tag{}", i)).collect(),
            ..input("Valid title")
        };
        assert!(too_many_tags.validate().is_err());
    }

    #[test]
    fn test_tags_accept_csv_and_list() {
        let from_csv: TaskInput =
            serde_json::from_str(r#"{"title":"t","tags":"home, urgent,,home"}"#).unwrap();
        assert_eq!(from_csv.normalized_tags(), vec!["home", "urgent"]);

        let from_list: TaskInput =
            serde_json::from_str(r#"{"title":"t","tags":["b","a"," a "]}"#).unwrap();
        assert_eq!(from_list.normalized_tags(), vec!["a", "b"]);

        let absent: TaskInput = serde_json::from_str(r#"{"title":"t"}"#).unwrap();
        assert!(absent.tags.is_empty());
    }

    #[test]
    fn test_missing_title_fails_validation() {
        let untitled: TaskInput =
            serde_json::from_str(r#"{"description":"no title at all"}"#).unwrap();
        assert_eq!(untitled.title, "");
        assert!(untitled.validate().is_err());
    }

    #[test]
    fn test_recurring_task_needs_end_date() {
        let weekly = |end_date| TaskInput {
            recurring: Recurrence {
                frequency: RecurrenceFrequency::Weekly,
                end_date,
            },
            ..input("Water plants")
        };
        assert!(weekly(None).validate().is_err());
        assert!(weekly(Some(Utc::now() + Duration::days(30))).validate().is_ok());

        let parsed: TaskInput = serde_json::from_str(
            r#"{"title":"t","recurring":{"frequency":"monthly","end_date":"2031-01-01T00:00:00Z"}}"#,
        )
        .unwrap();
        assert!(parsed.validate().is_ok());
        assert!(parsed.recurring.is_recurring());
    }

    #[test]
    fn test_non_recurring_task_drops_end_date() {
        let task = Task::new(
            TaskInput {
                recurring: Recurrence {
                    frequency: RecurrenceFrequency::None,
                    end_date: Some(Utc::now()),
                },
                ..input("One-off")
            },
            Utc::now(),
        );
        assert_eq!(task.recurring, Recurrence::default());
    }

    #[test]
    fn test_subtask_validation() {
        let blank = TaskInput {
            subtasks: vec![SubtaskInput {
                title: "  ".into(),
                ..SubtaskInput::default()
            }],
            ..input("Parent")
        };
        assert!(blank.validate().is_err());

        let too_many = TaskInput {
            subtasks: (0..51)
                .map(|i| SubtaskInput {
                    title: format!("step {}", i),
                    ..SubtaskInput::default()
                })
                .collect(),
            ..input("Parent")
        };
        assert!(too_many.validate().is_err());
    }

    #[test]
    fn test_replace_keeps_known_subtasks() {
        let created = Utc::now();
        let mut task = Task::new(
            TaskInput {
                subtasks: vec![SubtaskInput {
                    title: " Buy paint ".into(),
                    ..SubtaskInput::default()
                }],
                ..input("Paint fence")
            },
            created,
        );
        let paint = task.subtasks[0].clone();
        assert_eq!(paint.title, "Buy paint");
        assert!(!paint.completed);
        assert_eq!(paint.created_at, created);

        let later = created + Duration::hours(2);
        let replacement = TaskInput {
            subtasks: vec![
                SubtaskInput {
                    id: Some(paint.id),
                    title: "Buy paint".into(),
                    completed: true,
                },
                SubtaskInput {
                    title: "Sand boards".into(),
                    ..SubtaskInput::default()
                },
            ],
            ..input("Paint fence")
        };
        task.apply(&TaskPatch::replace(&task, &replacement, later));

        assert_eq!(task.subtasks.len(), 2);
        assert_eq!(task.subtasks[0].id, paint.id);
        assert!(task.subtasks[0].completed);
        assert_eq!(task.subtasks[0].created_at, created);
        assert_ne!(task.subtasks[1].id, paint.id);
        assert_eq!(task.subtasks[1].created_at, later);
    }

    #[test]
    fn test_status_serializes_kebab_case() {
        assert_eq!(
            serde_json::to_value(TaskStatus::InProgress).unwrap(),
            serde_json::json!("in-progress")
        );
        assert_eq!(TaskStatus::parse("In-Progress"), Some(TaskStatus::InProgress));
        assert_eq!(TaskStatus::parse("all"), None);
        assert_eq!(TaskPriority::parse("HIGH"), Some(TaskPriority::High));
    }

    #[test]
    fn test_toggle_keeps_completed_and_status_in_step() {
        let created = Utc::now();
        let mut task = Task::new(input("Toggle me"), created);

        let first = created + Duration::minutes(1);
        task.apply(&TaskPatch::toggle(&task, first));
        assert_eq!(task.status, TaskStatus::Completed);
        assert!(task.completed);
        assert_eq!(task.completed_at, Some(first));
        assert_eq!(task.updated_at, first);

        let second = first + Duration::minutes(1);
        task.apply(&TaskPatch::toggle(&task, second));
        assert_eq!(task.status, TaskStatus::Pending);
        assert!(!task.completed);
        assert_eq!(task.completed_at, None);
        assert_eq!(task.updated_at, second);
    }

    #[test]
    fn test_replace_without_status_keeps_completion() {
        let created = Utc::now();
        let mut task = Task::new(
            TaskInput {
                status: Some(TaskStatus::Completed),
                ..input("Done already")
            },
            created,
        );
        let later = created + Duration::hours(1);
        task.apply(&TaskPatch::replace(&task, &input("Renamed"), later));

        assert_eq!(task.title, "Renamed");
        assert_eq!(task.status, TaskStatus::Completed);
        assert_eq!(task.completed_at, Some(created));
        assert_eq!(task.created_at, created);
        assert_eq!(task.updated_at, later);
    }

    #[test]
    fn test_replace_moving_out_of_completed_clears_timestamp() {
        let created = Utc::now();
        let mut task = Task::new(
            TaskInput {
                status: Some(TaskStatus::Completed),
                ..input("Reopen me")
            },
            created,
        );
        let reopened = TaskInput {
            status: Some(TaskStatus::InProgress),
            ..input("Reopen me")
        };
        task.apply(&TaskPatch::replace(&task, &reopened, Utc::now()));
        assert_eq!(task.status, TaskStatus::InProgress);
        assert!(!task.completed);
        assert_eq!(task.completed_at, None);
    }
}
