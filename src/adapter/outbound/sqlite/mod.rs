//! SQLite persistence adapters.
//!
//! Provides SQLite-backed implementations of the track and portfolio
//! stores using Diesel ORM.

pub mod database;
pub mod store;

pub use database::connection::{create_pool, run_migrations, DbPool};
pub use store::SqliteStore;
