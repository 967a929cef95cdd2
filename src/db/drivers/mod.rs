// Database Drivers
// Backend implementations usable with or without instrumentation

pub mod sqlite;

// Re-export drivers
pub use sqlite::SqliteDriver;
