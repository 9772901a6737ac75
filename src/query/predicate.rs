//! The predicate and ordering model shared by the query engine and the stores.
//!
//! A [`Predicate`] is a conjunction of [`Clause`]s. Stores either evaluate it directly
//! ([`Predicate::matches`]) or translate each clause into their own query language.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Task, TaskPriority, TaskStatus};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Clause {
    Status(TaskStatus),
    Priority(TaskPriority),
    Category(String),
    /// Set membership: the task carries this tag.
    Tag(String),
    /// Inclusive lower bound on the due date. Tasks without a due date never match.
    DueFrom(DateTime<Utc>),
    /// Inclusive upper bound on the due date. Tasks without a due date never match.
    DueTo(DateTime<Utc>),
    /// Case-insensitive substring of title, description or any tag. Stored lowercased.
    Search(String),
}

impl Clause {
    pub fn search(text: &str) -> Self {
        Clause::Search(text.to_lowercase())
    }

    pub fn matches(&self, task: &Task) -> bool {
        match self {
            Clause::Status(status) => task.status == *status,
            Clause::Priority(priority) => task.priority == *priority,
            Clause::Category(category) => task.category == *category,
            Clause::Tag(tag) => task.tags.iter().any(|t| t == tag),
            Clause::DueFrom(start) => task.due_date.is_some_and(|due| due >= *start),
            Clause::DueTo(end) => task.due_date.is_some_and(|due| due <= *end),
            Clause::Search(needle) => {
                task.title.to_lowercase().contains(needle.as_str())
                    || task
                        .description
                        .as_deref()
                        .is_some_and(|d| d.to_lowercase().contains(needle.as_str()))
                    || task
                        .tags
                        .iter()
                        .any(|t| t.to_lowercase().contains(needle.as_str()))
            }
        }
    }
}

/// A conjunction of clauses. The empty predicate matches every task.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Predicate {
    clauses: Vec<Clause>,
}

impl Predicate {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn and(mut self, clause: Clause) -> Self {
        self.clauses.push(clause);
        self
    }

    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    pub fn matches(&self, task: &Task) -> bool {
        self.clauses.iter().all(|clause| clause.matches(task))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    #[default]
    CreatedAt,
    UpdatedAt,
    DueDate,
    Priority,
    Status,
    Title,
}

impl SortField {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "created_at" | "createdAt" | "created" => Some(Self::CreatedAt),
            "updated_at" | "updatedAt" | "updated" => Some(Self::UpdatedAt),
            "due_date" | "dueDate" | "due" => Some(Self::DueDate),
            "priority" => Some(Self::Priority),
            "status" => Some(Self::Status),
            "title" => Some(Self::Title),
            _ => None,
        }
    }

    /// SQL ordering expression for the column.
    pub fn column(self) -> &'static str {
        match self {
            Self::CreatedAt => "created_at",
            Self::UpdatedAt => "updated_at",
            Self::DueDate => "due_date",
            Self::Priority => "priority",
            Self::Status => "status",
            Self::Title => "LOWER(title) COLLATE \"C\"",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "asc" | "ascending" | "1" => Some(Self::Asc),
            "desc" | "descending" | "-1" => Some(Self::Desc),
            _ => None,
        }
    }

    pub fn keyword(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Ordering of a result set. Ties are always broken by ascending task id,
/// and tasks without a due date sort last in either direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sort {
    pub field: SortField,
    pub direction: SortDirection,
}

impl Sort {
    pub fn new(field: SortField, direction: SortDirection) -> Self {
        Self { field, direction }
    }

    pub fn compare(&self, a: &Task, b: &Task) -> Ordering {
        let directed = |ordering: Ordering| match self.direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        };
        let primary = match self.field {
            SortField::CreatedAt => directed(a.created_at.cmp(&b.created_at)),
            SortField::UpdatedAt => directed(a.updated_at.cmp(&b.updated_at)),
            SortField::Priority => directed(a.priority.cmp(&b.priority)),
            SortField::Status => directed(a.status.cmp(&b.status)),
            SortField::Title => directed(a.title.to_lowercase().cmp(&b.title.to_lowercase())),
            SortField::DueDate => match (a.due_date, b.due_date) {
                (Some(x), Some(y)) => directed(x.cmp(&y)),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            },
        };
        primary.then_with(|| a.id.cmp(&b.id))
    }
}
