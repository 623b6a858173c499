//! SQLite database modules.
//!
//! Provides database connection management, schema definitions, and
//! Diesel model types for race persistence.

pub mod connection;
pub mod model;
pub mod schema;
