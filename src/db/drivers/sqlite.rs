// SQLite Driver
// Implements the backend contract for SQLite using rusqlite

use crate::db::traits::{
    ConnBeginTx, ConnPrepareContext, Connection, Connector, Context, DatabaseError, Driver,
    DriverContext, ExecResult, ExecerContext, IsolationLevel, MemoryRows, NamedValue, Pinger,
    QueryerContext, Rows, SessionResetter, Statement, StmtExecContext, StmtQueryContext,
    Transaction, TxOptions, Value,
};
use rusqlite::types::{ToSql, ToSqlOutput, ValueRef};
use rusqlite::{Connection as RusqliteConnection, OpenFlags};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

type SharedConnection = Arc<Mutex<RusqliteConnection>>;

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        use rusqlite::types::Value as SqlValue;
        Ok(match self {
            Value::Null => ToSqlOutput::Owned(SqlValue::Null),
            Value::Bool(v) => ToSqlOutput::Owned(SqlValue::Integer(*v as i64)),
            Value::Int(v) => ToSqlOutput::Owned(SqlValue::Integer(*v)),
            Value::Float(v) => ToSqlOutput::Owned(SqlValue::Real(*v)),
            Value::Text(v) => ToSqlOutput::Borrowed(ValueRef::Text(v.as_bytes())),
            Value::Bytes(v) => ToSqlOutput::Borrowed(ValueRef::Blob(v.as_slice())),
            Value::Timestamp(v) => ToSqlOutput::Owned(SqlValue::Text(v.to_rfc3339())),
        })
    }
}

fn value_from_ref(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(v) => Value::Int(v),
        ValueRef::Real(v) => Value::Float(v),
        ValueRef::Text(v) => Value::Text(String::from_utf8_lossy(v).into_owned()),
        ValueRef::Blob(v) => Value::Bytes(v.to_vec()),
    }
}

fn check_context(ctx: &Context) -> Result<(), DatabaseError> {
    match ctx.err() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

/// Bind arguments: named values by `:name`, `@name` or `$name`, the rest by ordinal
fn bind_args(stmt: &mut rusqlite::Statement<'_>, args: &[NamedValue]) -> Result<(), DatabaseError> {
    for arg in args {
        let index = match &arg.name {
            Some(name) => [":", "@", "$"]
                .iter()
                .find_map(|prefix| {
                    stmt.parameter_index(&format!("{prefix}{name}"))
                        .ok()
                        .flatten()
                })
                .ok_or_else(|| {
                    DatabaseError::InvalidArgument(format!("no parameter named {name}"))
                })?,
            None => arg.ordinal,
        };
        stmt.raw_bind_parameter(index, &arg.value)?;
    }
    Ok(())
}

fn positional(args: &[Value]) -> Vec<NamedValue> {
    args.iter()
        .enumerate()
        .map(|(i, v)| NamedValue::positional(i + 1, v.clone()))
        .collect()
}

/// Run a statement that may or may not produce rows, discarding any rows
fn run_exec(
    conn: &RusqliteConnection,
    query: &str,
    args: &[NamedValue],
) -> Result<ExecResult, DatabaseError> {
    let mut stmt = conn.prepare_cached(query)?;
    bind_args(&mut stmt, args)?;

    if stmt.column_count() > 0 {
        let mut rows = stmt.raw_query();
        while rows.next()?.is_some() {}
        return Ok(ExecResult::default());
    }

    let rows_affected = stmt.raw_execute()? as u64;
    Ok(ExecResult {
        rows_affected,
        last_insert_id: Some(conn.last_insert_rowid()),
    })
}

fn run_query(
    conn: &RusqliteConnection,
    query: &str,
    args: &[NamedValue],
) -> Result<Box<dyn Rows>, DatabaseError> {
    let mut stmt = conn.prepare_cached(query)?;
    bind_args(&mut stmt, args)?;

    let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
    let mut data = Vec::new();
    let mut rows = stmt.raw_query();
    while let Some(row) = rows.next()? {
        let mut values = Vec::with_capacity(columns.len());
        for idx in 0..columns.len() {
            values.push(value_from_ref(row.get_ref(idx)?));
        }
        data.push(values);
    }

    Ok(Box::new(MemoryRows::new(columns, data)))
}

/// SQLite driver implementation
#[derive(Debug, Default, Clone, Copy)]
pub struct SqliteDriver;

impl SqliteDriver {
    /// Create a new SQLite driver
    pub fn new() -> Self {
        Self
    }

    /// Open SQLite connection; `:memory:` and `file:` URIs are accepted
    fn open_connection(dsn: &str) -> Result<SqliteConnection, DatabaseError> {
        if dsn.is_empty() {
            return Err(DatabaseError::InvalidConfig(
                "SQLite database path is required".to_string(),
            ));
        }
        let conn = RusqliteConnection::open_with_flags(
            dsn,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_URI,
        )
        .map_err(|e| {
            DatabaseError::ConnectionFailed(format!("Failed to open SQLite database: {}", e))
        })?;

        Ok(SqliteConnection::new(conn))
    }
}

#[async_trait::async_trait]
impl Driver for SqliteDriver {
    async fn open(&self, dsn: &str) -> Result<Box<dyn Connection>, DatabaseError> {
        Ok(Box::new(Self::open_connection(dsn)?))
    }

    fn as_driver_context(&self) -> Option<&dyn DriverContext> {
        Some(self)
    }
}

impl DriverContext for SqliteDriver {
    fn open_connector(&self, dsn: &str) -> Result<Box<dyn Connector>, DatabaseError> {
        if dsn.is_empty() {
            return Err(DatabaseError::InvalidConfig(
                "SQLite database path is required".to_string(),
            ));
        }
        Ok(Box::new(SqliteConnector {
            dsn: dsn.to_string(),
        }))
    }
}

/// Connector holding a validated data source name
pub struct SqliteConnector {
    dsn: String,
}

#[async_trait::async_trait]
impl Connector for SqliteConnector {
    async fn connect(&self, ctx: &Context) -> Result<Box<dyn Connection>, DatabaseError> {
        check_context(ctx)?;
        Ok(Box::new(SqliteDriver::open_connection(&self.dsn)?))
    }

    fn driver(&self) -> Arc<dyn Driver> {
        Arc::new(SqliteDriver)
    }
}

/// SQLite specific connection wrapper
pub struct SqliteConnection {
    pub id: String,
    conn: SharedConnection,
    closed: AtomicBool,
}

impl SqliteConnection {
    fn new(conn: RusqliteConnection) -> Self {
        let id = uuid::Uuid::new_v4().to_string();
        tracing::debug!(connection_id = %id, "opened sqlite connection");
        Self {
            id,
            conn: Arc::new(Mutex::new(conn)),
            closed: AtomicBool::new(false),
        }
    }

    fn ensure_open(&self) -> Result<(), DatabaseError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(DatabaseError::Closed);
        }
        Ok(())
    }

    async fn prepare_statement(&self, query: &str) -> Result<Box<dyn Statement>, DatabaseError> {
        self.ensure_open()?;
        let guard = self.conn.lock().await;
        let num_input = guard.prepare_cached(query)?.parameter_count();
        Ok(Box::new(SqliteStatement {
            conn: Arc::clone(&self.conn),
            query: query.to_string(),
            num_input,
            closed: AtomicBool::new(false),
        }))
    }

    async fn begin_transaction(&self) -> Result<Box<dyn Transaction>, DatabaseError> {
        self.ensure_open()?;
        self.conn.lock().await.execute_batch("BEGIN")?;
        Ok(Box::new(SqliteTransaction {
            conn: Arc::clone(&self.conn),
            done: AtomicBool::new(false),
        }))
    }
}

#[async_trait::async_trait]
impl Connection for SqliteConnection {
    async fn prepare(&self, query: &str) -> Result<Box<dyn Statement>, DatabaseError> {
        self.prepare_statement(query).await
    }

    async fn begin(&self) -> Result<Box<dyn Transaction>, DatabaseError> {
        self.begin_transaction().await
    }

    async fn close(&self) -> Result<(), DatabaseError> {
        self.closed.store(true, Ordering::Release);
        tracing::debug!(connection_id = %self.id, "closed sqlite connection");
        Ok(())
    }

    fn as_execer_context(&self) -> Option<&dyn ExecerContext> {
        Some(self)
    }

    fn as_queryer_context(&self) -> Option<&dyn QueryerContext> {
        Some(self)
    }

    fn as_pinger(&self) -> Option<&dyn Pinger> {
        Some(self)
    }

    fn as_session_resetter(&self) -> Option<&dyn SessionResetter> {
        Some(self)
    }

    fn as_prepare_context(&self) -> Option<&dyn ConnPrepareContext> {
        Some(self)
    }

    fn as_begin_tx(&self) -> Option<&dyn ConnBeginTx> {
        Some(self)
    }
}

#[async_trait::async_trait]
impl ExecerContext for SqliteConnection {
    async fn exec_context(
        &self,
        ctx: &Context,
        query: &str,
        args: &[NamedValue],
    ) -> Result<ExecResult, DatabaseError> {
        self.ensure_open()?;
        check_context(ctx)?;
        let guard = self.conn.lock().await;
        run_exec(&guard, query, args)
    }
}

#[async_trait::async_trait]
impl QueryerContext for SqliteConnection {
    async fn query_context(
        &self,
        ctx: &Context,
        query: &str,
        args: &[NamedValue],
    ) -> Result<Box<dyn Rows>, DatabaseError> {
        self.ensure_open()?;
        check_context(ctx)?;
        let guard = self.conn.lock().await;
        run_query(&guard, query, args)
    }
}

#[async_trait::async_trait]
impl Pinger for SqliteConnection {
    async fn ping(&self, ctx: &Context) -> Result<(), DatabaseError> {
        self.ensure_open()?;
        check_context(ctx)?;
        let guard = self.conn.lock().await;
        guard.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl SessionResetter for SqliteConnection {
    /// A connection left inside a transaction cannot be reused
    async fn reset_session(&self, _ctx: &Context) -> Result<(), DatabaseError> {
        self.ensure_open()?;
        if !self.conn.lock().await.is_autocommit() {
            return Err(DatabaseError::BadConnection);
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl ConnPrepareContext for SqliteConnection {
    async fn prepare_context(
        &self,
        ctx: &Context,
        query: &str,
    ) -> Result<Box<dyn Statement>, DatabaseError> {
        check_context(ctx)?;
        self.prepare_statement(query).await
    }
}

#[async_trait::async_trait]
impl ConnBeginTx for SqliteConnection {
    async fn begin_tx(
        &self,
        ctx: &Context,
        opts: TxOptions,
    ) -> Result<Box<dyn Transaction>, DatabaseError> {
        check_context(ctx)?;
        match opts.isolation {
            IsolationLevel::Default | IsolationLevel::Serializable => {}
            other => return Err(DatabaseError::UnsupportedIsolation(other)),
        }
        self.begin_transaction().await
    }
}

/// Prepared statement; re-prepared from the connection's statement cache per call
pub struct SqliteStatement {
    conn: SharedConnection,
    query: String,
    num_input: usize,
    closed: AtomicBool,
}

impl SqliteStatement {
    fn ensure_open(&self) -> Result<(), DatabaseError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(DatabaseError::Closed);
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl Statement for SqliteStatement {
    async fn close(&self) -> Result<(), DatabaseError> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }

    fn num_input(&self) -> Option<usize> {
        Some(self.num_input)
    }

    async fn exec(&self, args: &[Value]) -> Result<ExecResult, DatabaseError> {
        self.ensure_open()?;
        let guard = self.conn.lock().await;
        run_exec(&guard, &self.query, &positional(args))
    }

    async fn query(&self, args: &[Value]) -> Result<Box<dyn Rows>, DatabaseError> {
        self.ensure_open()?;
        let guard = self.conn.lock().await;
        run_query(&guard, &self.query, &positional(args))
    }

    fn as_exec_context(&self) -> Option<&dyn StmtExecContext> {
        Some(self)
    }

    fn as_query_context(&self) -> Option<&dyn StmtQueryContext> {
        Some(self)
    }
}

#[async_trait::async_trait]
impl StmtExecContext for SqliteStatement {
    async fn exec_context(
        &self,
        ctx: &Context,
        args: &[NamedValue],
    ) -> Result<ExecResult, DatabaseError> {
        self.ensure_open()?;
        check_context(ctx)?;
        let guard = self.conn.lock().await;
        run_exec(&guard, &self.query, args)
    }
}

#[async_trait::async_trait]
impl StmtQueryContext for SqliteStatement {
    async fn query_context(
        &self,
        ctx: &Context,
        args: &[NamedValue],
    ) -> Result<Box<dyn Rows>, DatabaseError> {
        self.ensure_open()?;
        check_context(ctx)?;
        let guard = self.conn.lock().await;
        run_query(&guard, &self.query, args)
    }
}

pub struct SqliteTransaction {
    conn: SharedConnection,
    done: AtomicBool,
}

impl SqliteTransaction {
    async fn finish(&self, sql: &str) -> Result<(), DatabaseError> {
        if self.done.swap(true, Ordering::AcqRel) {
            return Err(DatabaseError::Closed);
        }
        self.conn.lock().await.execute_batch(sql)?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl Transaction for SqliteTransaction {
    async fn commit(&self) -> Result<(), DatabaseError> {
        self.finish("COMMIT").await
    }

    async fn rollback(&self) -> Result<(), DatabaseError> {
        self.finish("ROLLBACK").await
    }
}

/// An unfinished transaction is rolled back so the connection leaves `BEGIN`.
/// If the connection is busy the rollback is skipped and `reset_session`
/// reports the connection as bad.
impl Drop for SqliteTransaction {
    fn drop(&mut self) {
        if self.done.swap(true, Ordering::AcqRel) {
            return;
        }
        match self.conn.try_lock() {
            Ok(conn) => {
                if conn.is_autocommit() {
                    return;
                }
                match conn.execute_batch("ROLLBACK") {
                    Ok(()) => tracing::debug!("rolled back dropped transaction"),
                    Err(e) => tracing::warn!(error = %e, "rollback of dropped transaction failed"),
                }
            }
            Err(_) => tracing::warn!("connection busy, dropped transaction left open"),
        }
    }
}
