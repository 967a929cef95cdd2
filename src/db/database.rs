// Database Front-end
// Single-connection handle that picks the fastest path each connection advertises

use crate::db::registry::DriverRegistry;
use crate::db::traits::{
    Connection, Context, DatabaseError, Driver, ExecResult, NamedValue, Rows, Statement,
    Transaction, TxOptions, Value,
};
use std::sync::Arc;

/// One open connection plus the caller-side fallback rules.
///
/// Context-aware capabilities are preferred, then the plain fast paths, then
/// prepare + statement call. No pooling: every call runs on the same
/// connection.
pub struct Database {
    conn: Box<dyn Connection>,
}

impl Database {
    /// Resolve `driver_name` in the registry and open one connection to `dsn`
    pub async fn open(
        registry: &DriverRegistry,
        driver_name: &str,
        dsn: &str,
    ) -> Result<Self, DatabaseError> {
        let driver = registry.get_driver(driver_name).await?;
        Self::open_driver(driver, dsn, &Context::background()).await
    }

    /// Connect through a connector when the driver offers one
    pub async fn open_driver(
        driver: Arc<dyn Driver>,
        dsn: &str,
        ctx: &Context,
    ) -> Result<Self, DatabaseError> {
        let conn = match driver.as_driver_context() {
            Some(dc) => dc.open_connector(dsn)?.connect(ctx).await?,
            None => driver.open(dsn).await?,
        };
        Ok(Self { conn })
    }

    pub fn from_connection(conn: Box<dyn Connection>) -> Self {
        Self { conn }
    }

    pub fn connection(&self) -> &dyn Connection {
        self.conn.as_ref()
    }

    // --- Execute ---

    pub async fn exec(&self, query: &str, args: &[Value]) -> Result<ExecResult, DatabaseError> {
        self.exec_context(&Context::background(), query, args).await
    }

    pub async fn exec_context(
        &self,
        ctx: &Context,
        query: &str,
        args: &[Value],
    ) -> Result<ExecResult, DatabaseError> {
        self.run_exec(ctx, query, positional_args(args)).await
    }

    pub async fn exec_named(
        &self,
        ctx: &Context,
        query: &str,
        args: &[(&str, Value)],
    ) -> Result<ExecResult, DatabaseError> {
        self.run_exec(ctx, query, named_args(args)).await
    }

    // --- Query ---

    pub async fn query(&self, query: &str, args: &[Value]) -> Result<Box<dyn Rows>, DatabaseError> {
        self.query_context(&Context::background(), query, args).await
    }

    pub async fn query_context(
        &self,
        ctx: &Context,
        query: &str,
        args: &[Value],
    ) -> Result<Box<dyn Rows>, DatabaseError> {
        self.run_query(ctx, query, positional_args(args)).await
    }

    pub async fn query_named(
        &self,
        ctx: &Context,
        query: &str,
        args: &[(&str, Value)],
    ) -> Result<Box<dyn Rows>, DatabaseError> {
        self.run_query(ctx, query, named_args(args)).await
    }

    // --- Prepared statements ---

    pub async fn prepare(&self, query: &str) -> Result<PreparedStatement<'_>, DatabaseError> {
        self.prepare_context(&Context::background(), query).await
    }

    pub async fn prepare_context(
        &self,
        ctx: &Context,
        query: &str,
    ) -> Result<PreparedStatement<'_>, DatabaseError> {
        let stmt = self.prepare_raw(ctx, query).await?;
        Ok(PreparedStatement { db: self, stmt })
    }

    // --- Transactions ---

    pub async fn begin(&self) -> Result<Tx<'_>, DatabaseError> {
        self.begin_tx(&Context::background(), TxOptions::default()).await
    }

    pub async fn begin_tx(&self, ctx: &Context, opts: TxOptions) -> Result<Tx<'_>, DatabaseError> {
        let tx = match self.conn.as_begin_tx() {
            Some(begin) => begin.begin_tx(ctx, opts).await?,
            None => {
                if opts != TxOptions::default() {
                    return Err(DatabaseError::InvalidArgument(
                        "driver does not support non-default transaction options".to_string(),
                    ));
                }
                check_context(ctx)?;
                self.conn.begin().await?
            }
        };
        Ok(Tx { db: self, tx })
    }

    // --- Connection management ---

    /// Ping when the connection supports it; otherwise assume it is alive
    pub async fn ping(&self, ctx: &Context) -> Result<(), DatabaseError> {
        match self.conn.as_pinger() {
            Some(pinger) => match pinger.ping(ctx).await {
                Err(DatabaseError::Skip) => Ok(()),
                other => other,
            },
            None => Ok(()),
        }
    }

    /// Reset session state before reuse, when the connection supports it
    pub async fn reset_session(&self, ctx: &Context) -> Result<(), DatabaseError> {
        match self.conn.as_session_resetter() {
            Some(resetter) => match resetter.reset_session(ctx).await {
                Err(DatabaseError::Skip) => Ok(()),
                other => other,
            },
            None => Ok(()),
        }
    }

    pub async fn close(self) -> Result<(), DatabaseError> {
        self.conn.close().await
    }

    // --- Dispatch ---

    async fn prepare_raw(
        &self,
        ctx: &Context,
        query: &str,
    ) -> Result<Box<dyn Statement>, DatabaseError> {
        if let Some(prepare) = self.conn.as_prepare_context() {
            return prepare.prepare_context(ctx, query).await;
        }
        check_context(ctx)?;
        self.conn.prepare(query).await
    }

    async fn run_exec(
        &self,
        ctx: &Context,
        query: &str,
        args: Vec<NamedValue>,
    ) -> Result<ExecResult, DatabaseError> {
        if let Some(execer) = self.conn.as_execer_context() {
            let converted = convert_args(self.connection(), None, args.clone())?;
            match execer.exec_context(ctx, query, &converted).await {
                Err(DatabaseError::Skip) => {}
                other => return other,
            }
        } else if let Some(execer) = self.conn.as_execer() {
            let converted = convert_args(self.connection(), None, args.clone())?;
            let values = plain_values(&converted)?;
            check_context(ctx)?;
            match execer.exec(query, &values).await {
                Err(DatabaseError::Skip) => {}
                other => return other,
            }
        }

        let stmt = self.prepare_raw(ctx, query).await?;
        let result = stmt_exec(self.connection(), stmt.as_ref(), ctx, args).await;
        let closed = stmt.close().await;
        let result = result?;
        closed?;
        Ok(result)
    }

    async fn run_query(
        &self,
        ctx: &Context,
        query: &str,
        args: Vec<NamedValue>,
    ) -> Result<Box<dyn Rows>, DatabaseError> {
        if let Some(queryer) = self.conn.as_queryer_context() {
            let converted = convert_args(self.connection(), None, args.clone())?;
            match queryer.query_context(ctx, query, &converted).await {
                Err(DatabaseError::Skip) => {}
                other => return other,
            }
        } else if let Some(queryer) = self.conn.as_queryer() {
            let converted = convert_args(self.connection(), None, args.clone())?;
            let values = plain_values(&converted)?;
            check_context(ctx)?;
            match queryer.query(query, &values).await {
                Err(DatabaseError::Skip) => {}
                other => return other,
            }
        }

        // Rows are read eagerly by the bundled backends, so the statement can
        // be closed before they are consumed.
        let stmt = self.prepare_raw(ctx, query).await?;
        let result = stmt_query(self.connection(), stmt.as_ref(), ctx, args).await;
        let closed = stmt.close().await;
        let rows = result?;
        closed?;
        Ok(rows)
    }
}

/// Prepared statement bound to its database's connection
pub struct PreparedStatement<'a> {
    db: &'a Database,
    stmt: Box<dyn Statement>,
}

impl PreparedStatement<'_> {
    pub fn num_input(&self) -> Option<usize> {
        self.stmt.num_input()
    }

    pub async fn exec(&self, args: &[Value]) -> Result<ExecResult, DatabaseError> {
        self.exec_context(&Context::background(), args).await
    }

    pub async fn exec_context(
        &self,
        ctx: &Context,
        args: &[Value],
    ) -> Result<ExecResult, DatabaseError> {
        stmt_exec(self.db.connection(), self.stmt.as_ref(), ctx, positional_args(args)).await
    }

    pub async fn query(&self, args: &[Value]) -> Result<Box<dyn Rows>, DatabaseError> {
        self.query_context(&Context::background(), args).await
    }

    pub async fn query_context(
        &self,
        ctx: &Context,
        args: &[Value],
    ) -> Result<Box<dyn Rows>, DatabaseError> {
        stmt_query(self.db.connection(), self.stmt.as_ref(), ctx, positional_args(args)).await
    }

    pub async fn close(self) -> Result<(), DatabaseError> {
        self.stmt.close().await
    }
}

/// Transaction running on its database's connection.
///
/// Dropping it without `commit` or `rollback` drops the backend transaction,
/// which the bundled SQLite backend rolls back.
pub struct Tx<'a> {
    db: &'a Database,
    tx: Box<dyn Transaction>,
}

impl<'a> Tx<'a> {
    pub async fn exec(&self, query: &str, args: &[Value]) -> Result<ExecResult, DatabaseError> {
        self.db.exec(query, args).await
    }

    pub async fn exec_context(
        &self,
        ctx: &Context,
        query: &str,
        args: &[Value],
    ) -> Result<ExecResult, DatabaseError> {
        self.db.exec_context(ctx, query, args).await
    }

    pub async fn query(&self, query: &str, args: &[Value]) -> Result<Box<dyn Rows>, DatabaseError> {
        self.db.query(query, args).await
    }

    pub async fn query_context(
        &self,
        ctx: &Context,
        query: &str,
        args: &[Value],
    ) -> Result<Box<dyn Rows>, DatabaseError> {
        self.db.query_context(ctx, query, args).await
    }

    pub async fn prepare(&self, query: &str) -> Result<PreparedStatement<'a>, DatabaseError> {
        self.db.prepare(query).await
    }

    pub async fn commit(self) -> Result<(), DatabaseError> {
        self.tx.commit().await
    }

    pub async fn rollback(self) -> Result<(), DatabaseError> {
        self.tx.rollback().await
    }
}

// --- Argument handling ---

fn positional_args(args: &[Value]) -> Vec<NamedValue> {
    args.iter()
        .enumerate()
        .map(|(i, v)| NamedValue::positional(i + 1, v.clone()))
        .collect()
}

fn named_args(args: &[(&str, Value)]) -> Vec<NamedValue> {
    args.iter()
        .enumerate()
        .map(|(i, (name, v))| NamedValue::named(*name, i + 1, v.clone()))
        .collect()
}

/// Run each argument through the statement's (else the connection's) checker,
/// falling back to the statement's column converter when the checker skips.
fn convert_args(
    conn: &dyn Connection,
    stmt: Option<&dyn Statement>,
    args: Vec<NamedValue>,
) -> Result<Vec<NamedValue>, DatabaseError> {
    let checker = stmt
        .and_then(|s| s.as_named_value_checker())
        .or_else(|| conn.as_named_value_checker());
    let converter = stmt.and_then(|s| s.as_column_converter());

    let mut converted = Vec::with_capacity(args.len());
    for (index, mut arg) in args.into_iter().enumerate() {
        if let Some(checker) = checker {
            match checker.check_named_value(&mut arg) {
                Ok(()) => {
                    converted.push(arg);
                    continue;
                }
                Err(DatabaseError::Skip) => {}
                Err(e) => return Err(e),
            }
        }
        if let Some(converter) = converter {
            match converter.convert_column(index, arg.value.clone()) {
                Ok(value) => arg.value = value,
                Err(DatabaseError::Skip) => {}
                Err(e) => return Err(e),
            }
        }
        converted.push(arg);
    }
    Ok(converted)
}

/// Values for the non context-aware paths, which cannot carry names
fn plain_values(args: &[NamedValue]) -> Result<Vec<Value>, DatabaseError> {
    args.iter()
        .map(|arg| match &arg.name {
            Some(name) => Err(DatabaseError::InvalidArgument(format!(
                "driver does not support named parameters (got {name})"
            ))),
            None => Ok(arg.value.clone()),
        })
        .collect()
}

fn check_arg_count(stmt: &dyn Statement, args: &[NamedValue]) -> Result<(), DatabaseError> {
    match stmt.num_input() {
        Some(expected) if expected != args.len() => Err(DatabaseError::InvalidArgument(format!(
            "expected {expected} arguments, got {}",
            args.len()
        ))),
        _ => Ok(()),
    }
}

fn check_context(ctx: &Context) -> Result<(), DatabaseError> {
    match ctx.err() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

async fn stmt_exec(
    conn: &dyn Connection,
    stmt: &dyn Statement,
    ctx: &Context,
    args: Vec<NamedValue>,
) -> Result<ExecResult, DatabaseError> {
    let args = convert_args(conn, Some(stmt), args)?;
    check_arg_count(stmt, &args)?;
    if let Some(exec) = stmt.as_exec_context() {
        return exec.exec_context(ctx, &args).await;
    }
    let values = plain_values(&args)?;
    check_context(ctx)?;
    stmt.exec(&values).await
}

async fn stmt_query(
    conn: &dyn Connection,
    stmt: &dyn Statement,
    ctx: &Context,
    args: Vec<NamedValue>,
) -> Result<Box<dyn Rows>, DatabaseError> {
    let args = convert_args(conn, Some(stmt), args)?;
    check_arg_count(stmt, &args)?;
    if let Some(query) = stmt.as_query_context() {
        return query.query_context(ctx, &args).await;
    }
    let values = plain_values(&args)?;
    check_context(ctx)?;
    stmt.query(&values).await
}
