//! Capability-preserving instrumentation for pluggable database drivers.
//!
//! [`register`] wraps a driver from a [`DriverRegistry`] and registers the
//! wrapper under a new name. Every connection, statement and transaction the
//! wrapper produces advertises exactly the optional capabilities of the
//! backend object underneath, and every exec/query call reports its query
//! text, arguments and duration to the configured [`Options`].
//!
//! ```rust,ignore
//! use querypulse::{register, Database, DriverRegistry, Options, SqliteDriver};
//! use std::sync::Arc;
//!
//! let registry = DriverRegistry::new();
//! registry.register("sqlite3", Arc::new(SqliteDriver::new())).await?;
//!
//! let options = Options::builder()
//!     .on_success(|query, args, took| println!("{query} {args:?} took {took:?}"))
//!     .build();
//! let name = register(&registry, "sqlite3", options).await?;
//!
//! let db = Database::open(&registry, &name, ":memory:").await?;
//! db.query("select $1", &[1.into()]).await?;
//! ```

// Module declarations
pub mod db;
pub mod proxy;
pub mod register;
pub mod sink;

pub use db::{Database, DatabaseError, DriverRegistry, SqliteDriver, Value};
pub use proxy::{wrap_connection, wrap_connector, wrap_driver, CapabilitySet, Options};
pub use register::{register, register_driver, register_global, RegisterError};
pub use sink::LogSinkConfig;
