//! Database module for rank-checker
//!
//! Provides PostgreSQL operations for rank check jobs and their result entries.

pub mod connection;
pub mod entries;
pub mod jobs;
pub mod store;

pub use connection::{create_pool, create_pool_from_config, run_migrations, DbPool};
pub use store::{PgJobStore, PgStoreProvider};
