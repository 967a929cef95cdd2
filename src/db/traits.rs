// Database Driver Traits
// Defines the backend contract: mandatory surfaces plus optional capability accessors

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

/// Scalar argument or cell value exchanged with a backend
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
    Timestamp(DateTime<Utc>),
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::Timestamp(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

/// An argument together with its position and, optionally, its parameter name
#[derive(Debug, Clone, PartialEq)]
pub struct NamedValue {
    pub name: Option<String>,
    /// 1-based position in the argument list
    pub ordinal: usize,
    pub value: Value,
}

impl NamedValue {
    pub fn positional(ordinal: usize, value: impl Into<Value>) -> Self {
        Self {
            name: None,
            ordinal,
            value: value.into(),
        }
    }

    pub fn named(name: impl Into<String>, ordinal: usize, value: impl Into<Value>) -> Self {
        Self {
            name: Some(name.into()),
            ordinal,
            value: value.into(),
        }
    }
}

/// Cancellation and deadline carried by context-aware calls.
///
/// Instrumented handles pass the context through untouched; only backends
/// act on it.
#[derive(Debug, Clone, Default)]
pub struct Context {
    deadline: Option<Instant>,
    cancel: CancellationToken,
}

impl Context {
    /// Context with no deadline that is never cancelled unless its token is
    pub fn background() -> Self {
        Self::default()
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Error describing why the context is done, if it is
    pub fn err(&self) -> Option<DatabaseError> {
        if self.cancel.is_cancelled() {
            return Some(DatabaseError::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(DatabaseError::DeadlineExceeded),
            _ => None,
        }
    }
}

/// Transaction isolation levels a caller may request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum IsolationLevel {
    #[default]
    Default,
    ReadUncommitted,
    ReadCommitted,
    RepeatableRead,
    Serializable,
}

/// Options for beginning a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TxOptions {
    pub isolation: IsolationLevel,
    pub read_only: bool,
}

/// Outcome of an execute call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExecResult {
    pub rows_affected: u64,
    pub last_insert_id: Option<i64>,
}

/// Common database error type
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Driver not found: {0}")]
    DriverNotFound(String),

    #[error("Query execution error: {0}")]
    QueryError(String),

    #[error("Configuration error: {0}")]
    InvalidConfig(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Fast path not available; the caller should fall back to the core contract
    #[error("Operation skipped by driver")]
    Skip,

    #[error("Bad connection")]
    BadConnection,

    #[error("Resource already closed")]
    Closed,

    #[error("Context cancelled")]
    Cancelled,

    #[error("Context deadline exceeded")]
    DeadlineExceeded,

    #[error("Unsupported isolation level: {0:?}")]
    UnsupportedIsolation(IsolationLevel),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result set cursor produced by query calls
#[async_trait::async_trait]
pub trait Rows: Send {
    fn columns(&self) -> &[String];

    /// Next row, or `None` once the set is exhausted
    async fn next(&mut self) -> Result<Option<Vec<Value>>, DatabaseError>;

    async fn close(&mut self) -> Result<(), DatabaseError>;

    /// Drain every remaining row
    async fn collect_all(&mut self) -> Result<Vec<Vec<Value>>, DatabaseError> {
        let mut rows = Vec::new();
        while let Some(row) = self.next().await? {
            rows.push(row);
        }
        Ok(rows)
    }
}

/// Fully materialized result set
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemoryRows {
    columns: Vec<String>,
    rows: std::collections::VecDeque<Vec<Value>>,
}

impl MemoryRows {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self {
            columns,
            rows: rows.into(),
        }
    }
}

#[async_trait::async_trait]
impl Rows for MemoryRows {
    fn columns(&self) -> &[String] {
        &self.columns
    }

    async fn next(&mut self) -> Result<Option<Vec<Value>>, DatabaseError> {
        Ok(self.rows.pop_front())
    }

    async fn close(&mut self) -> Result<(), DatabaseError> {
        self.rows.clear();
        Ok(())
    }
}

// --- Driver layer ---

/// Database driver trait - every backend entry point implements this
#[async_trait::async_trait]
pub trait Driver: Send + Sync {
    /// Open a new connection from a data source name
    async fn open(&self, dsn: &str) -> Result<Box<dyn Connection>, DatabaseError>;

    fn as_driver_context(&self) -> Option<&dyn DriverContext> {
        None
    }
}

/// Connector-based open: parse the data source name once, connect many times
pub trait DriverContext: Send + Sync {
    fn open_connector(&self, dsn: &str) -> Result<Box<dyn Connector>, DatabaseError>;
}

#[async_trait::async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, ctx: &Context) -> Result<Box<dyn Connection>, DatabaseError>;

    /// Driver this connector was produced by
    fn driver(&self) -> Arc<dyn Driver>;
}

// --- Connection layer ---

/// Connection trait - mandatory surface plus optional capability accessors.
///
/// Each `as_*` accessor returns `Some` only when the connection genuinely
/// implements that capability.
#[async_trait::async_trait]
pub trait Connection: Send + Sync {
    async fn prepare(&self, query: &str) -> Result<Box<dyn Statement>, DatabaseError>;

    async fn begin(&self) -> Result<Box<dyn Transaction>, DatabaseError>;

    async fn close(&self) -> Result<(), DatabaseError>;

    fn as_execer(&self) -> Option<&dyn Execer> {
        None
    }

    fn as_execer_context(&self) -> Option<&dyn ExecerContext> {
        None
    }

    fn as_queryer(&self) -> Option<&dyn Queryer> {
        None
    }

    fn as_queryer_context(&self) -> Option<&dyn QueryerContext> {
        None
    }

    fn as_pinger(&self) -> Option<&dyn Pinger> {
        None
    }

    fn as_named_value_checker(&self) -> Option<&dyn NamedValueChecker> {
        None
    }

    fn as_session_resetter(&self) -> Option<&dyn SessionResetter> {
        None
    }

    fn as_prepare_context(&self) -> Option<&dyn ConnPrepareContext> {
        None
    }

    fn as_begin_tx(&self) -> Option<&dyn ConnBeginTx> {
        None
    }
}

#[async_trait::async_trait]
pub trait Execer: Send + Sync {
    async fn exec(&self, query: &str, args: &[Value]) -> Result<ExecResult, DatabaseError>;
}

#[async_trait::async_trait]
pub trait ExecerContext: Send + Sync {
    async fn exec_context(
        &self,
        ctx: &Context,
        query: &str,
        args: &[NamedValue],
    ) -> Result<ExecResult, DatabaseError>;
}

#[async_trait::async_trait]
pub trait Queryer: Send + Sync {
    async fn query(&self, query: &str, args: &[Value]) -> Result<Box<dyn Rows>, DatabaseError>;
}

#[async_trait::async_trait]
pub trait QueryerContext: Send + Sync {
    async fn query_context(
        &self,
        ctx: &Context,
        query: &str,
        args: &[NamedValue],
    ) -> Result<Box<dyn Rows>, DatabaseError>;
}

#[async_trait::async_trait]
pub trait Pinger: Send + Sync {
    async fn ping(&self, ctx: &Context) -> Result<(), DatabaseError>;
}

/// Driver-side validation and conversion of a single argument.
///
/// Returning `DatabaseError::Skip` asks the caller to apply its default
/// handling instead.
pub trait NamedValueChecker: Send + Sync {
    fn check_named_value(&self, value: &mut NamedValue) -> Result<(), DatabaseError>;
}

#[async_trait::async_trait]
pub trait SessionResetter: Send + Sync {
    /// Called before a connection is reused; an error marks it as bad
    async fn reset_session(&self, ctx: &Context) -> Result<(), DatabaseError>;
}

#[async_trait::async_trait]
pub trait ConnPrepareContext: Send + Sync {
    async fn prepare_context(
        &self,
        ctx: &Context,
        query: &str,
    ) -> Result<Box<dyn Statement>, DatabaseError>;
}

#[async_trait::async_trait]
pub trait ConnBeginTx: Send + Sync {
    async fn begin_tx(
        &self,
        ctx: &Context,
        opts: TxOptions,
    ) -> Result<Box<dyn Transaction>, DatabaseError>;
}

// --- Statement layer ---

#[async_trait::async_trait]
pub trait Statement: Send + Sync {
    async fn close(&self) -> Result<(), DatabaseError>;

    /// Number of placeholders, or `None` when the driver cannot tell
    fn num_input(&self) -> Option<usize>;

    async fn exec(&self, args: &[Value]) -> Result<ExecResult, DatabaseError>;

    async fn query(&self, args: &[Value]) -> Result<Box<dyn Rows>, DatabaseError>;

    fn as_exec_context(&self) -> Option<&dyn StmtExecContext> {
        None
    }

    fn as_query_context(&self) -> Option<&dyn StmtQueryContext> {
        None
    }

    fn as_column_converter(&self) -> Option<&dyn ColumnConverter> {
        None
    }

    fn as_named_value_checker(&self) -> Option<&dyn NamedValueChecker> {
        None
    }
}

#[async_trait::async_trait]
pub trait StmtExecContext: Send + Sync {
    async fn exec_context(
        &self,
        ctx: &Context,
        args: &[NamedValue],
    ) -> Result<ExecResult, DatabaseError>;
}

#[async_trait::async_trait]
pub trait StmtQueryContext: Send + Sync {
    async fn query_context(
        &self,
        ctx: &Context,
        args: &[NamedValue],
    ) -> Result<Box<dyn Rows>, DatabaseError>;
}

/// Per-column argument conversion supplied by a statement
pub trait ColumnConverter: Send + Sync {
    fn convert_column(&self, index: usize, value: Value) -> Result<Value, DatabaseError>;
}

// --- Transaction layer ---

#[async_trait::async_trait]
pub trait Transaction: Send + Sync {
    async fn commit(&self) -> Result<(), DatabaseError>;

    async fn rollback(&self) -> Result<(), DatabaseError>;
}
