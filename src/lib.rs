#![doc = "The `neotask` library crate."]
#![doc = ""]
#![doc = "A task-tracking service: username/password accounts, bearer-token and cookie-session"]
#![doc = "authentication behind a single authorization gate, and a faceted task query engine"]
#![doc = "(search, filters, sorting, pagination) over in-memory or Postgres stores."]
#![doc = "The binary (`main.rs`) reads the configuration, builds an `AppState` and serves it."]

pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod query;
pub mod routes;
pub mod state;
pub mod store;
pub mod tasks;
