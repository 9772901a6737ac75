use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::Task;
use crate::query::filter::FilterCriteria;
use crate::store::TaskStore;

/// One page of a filtered, ordered task listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageResult {
    pub tasks: Vec<Task>,
    /// Matches across all pages.
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
    pub page_count: u64,
    pub has_next: bool,
    pub has_prev: bool,
}

impl PageResult {
    pub fn new(tasks: Vec<Task>, total: u64, page: u32, page_size: u32) -> Self {
        let page_count = page_count(total, page_size);
        Self {
            tasks,
            total,
            page,
            page_size,
            page_count,
            has_next: u64::from(page) < page_count,
            has_prev: page > 1,
        }
    }
}

/// `ceil(total / page_size)`, never less than 1 so an empty listing is still "page 1 of 1".
pub fn page_count(total: u64, page_size: u32) -> u64 {
    let page_size = u64::from(page_size.max(1));
    total.div_ceil(page_size).max(1)
}

pub struct QueryExecutor {
    store: Arc<dyn TaskStore>,
}

impl QueryExecutor {
    pub fn new(store: Arc<dyn TaskStore>) -> Self {
        Self { store }
    }

    pub async fn execute(&self, criteria: &FilterCriteria) -> Result<PageResult, AppError> {
        let predicate = criteria.predicate();
        let total = self.store.count(&predicate).await?;
        let tasks = self
            .store
            .find_many(
                &predicate,
                criteria.sort,
                criteria.skip(),
                u64::from(criteria.page_size),
            )
            .await?;

        log::debug!(
            "listed page {} ({} of {} matches)",
            criteria.page,
            tasks.len(),
            total
        );
        Ok(PageResult::new(tasks, total, criteria.page, criteria.page_size))
    }
}
