//! Turns raw, user-supplied list parameters into validated [`FilterCriteria`].
//!
//! Every dimension is optional. Blank values and the sentinel `all` mean "no constraint",
//! and values outside a closed vocabulary (status, priority, sort field) are ignored
//! rather than rejected. Only unparsable dates and page numbers are errors.

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::config::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use crate::error::AppError;
use crate::models::{TaskPriority, TaskStatus};
use crate::query::predicate::{Clause, Predicate, Sort, SortDirection, SortField};

const ALL: &str = "all";

/// Untrusted query-string parameters for `GET /api/tasks`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskQueryParams {
    pub search: Option<String>,
    pub status: Option<String>,
    pub priority: Option<String>,
    pub category: Option<String>,
    pub tag: Option<String>,
    #[serde(alias = "start_date", alias = "startDate")]
    pub due_from: Option<String>,
    #[serde(alias = "end_date", alias = "endDate")]
    pub due_to: Option<String>,
    #[serde(alias = "sort_by", alias = "sortBy")]
    pub sort: Option<String>,
    #[serde(alias = "sort_order", alias = "sortOrder")]
    pub order: Option<String>,
    pub page: Option<String>,
    #[serde(alias = "limit", alias = "pageSize")]
    pub page_size: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterError {
    InvalidDateRange(String),
    InvalidPage(String),
}

impl fmt::Display for FilterError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FilterError::InvalidDateRange(msg) => write!(f, "Invalid date range: {}", msg),
            FilterError::InvalidPage(msg) => write!(f, "Invalid page: {}", msg),
        }
    }
}

impl std::error::Error for FilterError {}

impl From<FilterError> for AppError {
    fn from(error: FilterError) -> AppError {
        AppError::ValidationError(error.to_string())
    }
}

/// A compiled list request: what to match, how to order it and which page to return.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterCriteria {
    pub search: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub category: Option<String>,
    pub tag: Option<String>,
    pub due_from: Option<DateTime<Utc>>,
    pub due_to: Option<DateTime<Utc>>,
    pub sort: Sort,
    /// 1-based.
    pub page: u32,
    pub page_size: u32,
}

impl Default for FilterCriteria {
    fn default() -> Self {
        Self {
            search: None,
            status: None,
            priority: None,
            category: None,
            tag: None,
            due_from: None,
            due_to: None,
            sort: Sort::default(),
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl FilterCriteria {
    /// The conjunction of every active dimension.
    pub fn predicate(&self) -> Predicate {
        let mut predicate = Predicate::all();
        if let Some(status) = self.status {
            predicate = predicate.and(Clause::Status(status));
        }
        if let Some(priority) = self.priority {
            predicate = predicate.and(Clause::Priority(priority));
        }
        if let Some(category) = &self.category {
            predicate = predicate.and(Clause::Category(category.clone()));
        }
        if let Some(tag) = &self.tag {
            predicate = predicate.and(Clause::Tag(tag.clone()));
        }
        if let Some(from) = self.due_from {
            predicate = predicate.and(Clause::DueFrom(from));
        }
        if let Some(to) = self.due_to {
            predicate = predicate.and(Clause::DueTo(to));
        }
        if let Some(search) = &self.search {
            predicate = predicate.and(Clause::search(search));
        }
        predicate
    }

    /// Number of matching tasks that precede the requested page.
    pub fn skip(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.page_size)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FilterCompiler {
    default_page_size: u32,
    max_page_size: u32,
}

impl Default for FilterCompiler {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE)
    }
}

impl FilterCompiler {
    pub fn new(default_page_size: u32, max_page_size: u32) -> Self {
        Self {
            default_page_size,
            max_page_size,
        }
    }

    pub fn compile(&self, raw: &TaskQueryParams) -> Result<FilterCriteria, FilterError> {
        let due_from = active(&raw.due_from)
            .map(|value| parse_bound(value, Bound::Start))
            .transpose()?;
        let due_to = active(&raw.due_to)
            .map(|value| parse_bound(value, Bound::End))
            .transpose()?;
        if let (Some(from), Some(to)) = (due_from, due_to) {
            if from > to {
                return Err(FilterError::InvalidDateRange(
                    "start date is after end date".into(),
                ));
            }
        }

        let sort = Sort::new(
            raw.sort
                .as_deref()
                .and_then(SortField::parse)
                .unwrap_or_default(),
            raw.order
                .as_deref()
                .and_then(SortDirection::parse)
                .unwrap_or_default(),
        );

        Ok(FilterCriteria {
            search: active(&raw.search).map(str::to_string),
            status: active(&raw.status).and_then(TaskStatus::parse),
            priority: active(&raw.priority).and_then(TaskPriority::parse),
            category: active(&raw.category).map(str::to_string),
            tag: active(&raw.tag).map(str::to_string),
            due_from,
            due_to,
            sort,
            page: parse_page(raw.page.as_deref())?,
            page_size: self.parse_page_size(raw.page_size.as_deref())?,
        })
    }

    fn parse_page_size(&self, raw: Option<&str>) -> Result<u32, FilterError> {
        let Some(raw) = raw.map(str::trim).filter(|r| !r.is_empty()) else {
            return Ok(self.default_page_size);
        };
        let size: i64 = raw
            .parse()
            .map_err(|_| FilterError::InvalidPage(format!("page size {:?} is not a number", raw)))?;
        if size <= 0 {
            return Err(FilterError::InvalidPage(format!(
                "page size must be positive, got {}",
                size
            )));
        }
        Ok(size.min(i64::from(self.max_page_size)) as u32)
    }
}

/// A trimmed, non-empty value that is not the `all` sentinel.
fn active(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case(ALL))
}

fn parse_page(raw: Option<&str>) -> Result<u32, FilterError> {
    let Some(raw) = raw.map(str::trim).filter(|r| !r.is_empty()) else {
        return Ok(1);
    };
    let page: i64 = raw
        .parse()
        .map_err(|_| FilterError::InvalidPage(format!("page {:?} is not a number", raw)))?;
    Ok(page.clamp(1, i64::from(u32::MAX)) as u32)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Bound {
    Start,
    End,
}

/// Accepts RFC 3339 timestamps, `YYYY-MM-DDTHH:MM[:SS]` (read as UTC) and bare dates.
/// A bare end date covers the whole day.
fn parse_bound(raw: &str, bound: Bound) -> Result<DateTime<Utc>, FilterError> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(Utc.from_utc_datetime(&naive));
        }
    }
    let invalid = || FilterError::InvalidDateRange(format!("{:?} is not a valid date", raw));
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| invalid())?;
    let naive = match bound {
        Bound::Start => date.and_hms_opt(0, 0, 0),
        Bound::End => date.and_hms_nano_opt(23, 59, 59, 999_999_999),
    }
    .ok_or_else(invalid)?;
    Ok(Utc.from_utc_datetime(&naive))
}
