//! Jobs submitted through the CLI are tracked in a SQLite database

/// Connect to a SQLite database
pub mod open;
pub mod job;
