// Database Module
// Backend driver contract, driver registry, and a minimal front-end over one connection

pub mod database;
pub mod drivers;
pub mod registry;
pub mod traits;

pub use database::{Database, PreparedStatement, Tx};
pub use drivers::SqliteDriver;
pub use registry::DriverRegistry;
pub use traits::{
    ColumnConverter, ConnBeginTx, ConnPrepareContext, Connection, Connector, Context,
    DatabaseError, Driver, DriverContext, ExecResult, Execer, ExecerContext, IsolationLevel,
    MemoryRows, NamedValue, NamedValueChecker, Pinger, Queryer, QueryerContext, Rows,
    SessionResetter, Statement, StmtExecContext, StmtQueryContext, Transaction, TxOptions, Value,
};
