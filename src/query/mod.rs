//! The task query engine: untrusted list parameters are compiled into
//! [`FilterCriteria`] and executed against a [`crate::store::TaskStore`].

pub mod executor;
pub mod filter;
pub mod predicate;

pub use executor::{page_count, PageResult, QueryExecutor};
pub use filter::{FilterCompiler, FilterCriteria, FilterError, TaskQueryParams};
pub use predicate::{Clause, Predicate, Sort, SortDirection, SortField};
