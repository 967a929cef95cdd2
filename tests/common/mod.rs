// Test doubles: backend resources advertising an arbitrary capability subset

#![allow(dead_code)]

use querypulse::db::traits::{
    ColumnConverter, ConnBeginTx, ConnPrepareContext, Connection, Connector, Context,
    DatabaseError, Driver, DriverContext, ExecResult, Execer, ExecerContext, MemoryRows,
    NamedValue, NamedValueChecker, Pinger, Queryer, QueryerContext, Rows, SessionResetter,
    Statement, StmtExecContext, StmtQueryContext, Transaction, TxOptions, Value,
};
use querypulse::proxy::CapabilitySet;
use querypulse::Options;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// What the mock backend advertises and how its calls behave
#[derive(Clone, Default)]
pub struct MockConfig {
    pub driver: CapabilitySet,
    pub connection: CapabilitySet,
    pub statement: CapabilitySet,
    pub fail: bool,
    /// Connection-level exec/query answer `Skip` so callers must fall back
    pub skip_fast_paths: bool,
    pub delay: Duration,
    /// Number of delegate exec/query invocations
    pub calls: Arc<AtomicUsize>,
}

impl MockConfig {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn run(&self, args_len: usize) -> Result<ExecResult, DatabaseError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.fail {
            return Err(DatabaseError::QueryError("mock failure".to_string()));
        }
        Ok(ExecResult {
            rows_affected: args_len as u64,
            last_insert_id: None,
        })
    }

    async fn rows(&self, args: Vec<Value>) -> Result<Box<dyn Rows>, DatabaseError> {
        self.run(args.len()).await?;
        Ok(Box::new(MemoryRows::new(vec!["echo".to_string()], vec![args])))
    }

    async fn fast_run(&self, args_len: usize) -> Result<ExecResult, DatabaseError> {
        if self.skip_fast_paths {
            return Err(DatabaseError::Skip);
        }
        self.run(args_len).await
    }

    async fn fast_rows(&self, args: Vec<Value>) -> Result<Box<dyn Rows>, DatabaseError> {
        if self.skip_fast_paths {
            return Err(DatabaseError::Skip);
        }
        self.rows(args).await
    }
}

fn values(args: &[NamedValue]) -> Vec<Value> {
    args.iter().map(|a| a.value.clone()).collect()
}

pub struct MockDriver {
    pub config: MockConfig,
}

#[async_trait::async_trait]
impl Driver for MockDriver {
    async fn open(&self, _dsn: &str) -> Result<Box<dyn Connection>, DatabaseError> {
        Ok(Box::new(MockConnection::new(self.config.clone())))
    }

    fn as_driver_context(&self) -> Option<&dyn DriverContext> {
        self.config
            .driver
            .contains(CapabilitySet::OPEN_CONNECTOR)
            .then_some(self as &dyn DriverContext)
    }
}

impl DriverContext for MockDriver {
    fn open_connector(&self, _dsn: &str) -> Result<Box<dyn Connector>, DatabaseError> {
        Ok(Box::new(MockConnector {
            config: self.config.clone(),
        }))
    }
}

pub struct MockConnector {
    pub config: MockConfig,
}

#[async_trait::async_trait]
impl Connector for MockConnector {
    async fn connect(&self, _ctx: &Context) -> Result<Box<dyn Connection>, DatabaseError> {
        Ok(Box::new(MockConnection::new(self.config.clone())))
    }

    fn driver(&self) -> Arc<dyn Driver> {
        Arc::new(MockDriver {
            config: self.config.clone(),
        })
    }
}

pub struct MockConnection {
    pub config: MockConfig,
    pub resets: AtomicUsize,
}

impl MockConnection {
    pub fn new(config: MockConfig) -> Self {
        Self {
            config,
            resets: AtomicUsize::new(0),
        }
    }

    pub fn with_caps(caps: CapabilitySet) -> Self {
        Self::new(MockConfig {
            connection: caps,
            ..MockConfig::default()
        })
    }

    fn has(&self, cap: CapabilitySet) -> bool {
        self.config.connection.contains(cap)
    }

    fn statement(&self, query: &str) -> Box<dyn Statement> {
        Box::new(MockStatement {
            config: self.config.clone(),
            query: query.to_string(),
        })
    }
}

#[async_trait::async_trait]
impl Connection for MockConnection {
    async fn prepare(&self, query: &str) -> Result<Box<dyn Statement>, DatabaseError> {
        Ok(self.statement(query))
    }

    async fn begin(&self) -> Result<Box<dyn Transaction>, DatabaseError> {
        Ok(Box::new(MockTransaction::default()))
    }

    async fn close(&self) -> Result<(), DatabaseError> {
        Ok(())
    }

    fn as_execer(&self) -> Option<&dyn Execer> {
        self.has(CapabilitySet::EXEC).then_some(self as &dyn Execer)
    }

    fn as_execer_context(&self) -> Option<&dyn ExecerContext> {
        self.has(CapabilitySet::EXEC_CONTEXT)
            .then_some(self as &dyn ExecerContext)
    }

    fn as_queryer(&self) -> Option<&dyn Queryer> {
        self.has(CapabilitySet::QUERY).then_some(self as &dyn Queryer)
    }

    fn as_queryer_context(&self) -> Option<&dyn QueryerContext> {
        self.has(CapabilitySet::QUERY_CONTEXT)
            .then_some(self as &dyn QueryerContext)
    }

    fn as_pinger(&self) -> Option<&dyn Pinger> {
        self.has(CapabilitySet::PING).then_some(self as &dyn Pinger)
    }

    fn as_named_value_checker(&self) -> Option<&dyn NamedValueChecker> {
        self.has(CapabilitySet::NAMED_VALUE_CHECK)
            .then_some(self as &dyn NamedValueChecker)
    }

    fn as_session_resetter(&self) -> Option<&dyn SessionResetter> {
        self.has(CapabilitySet::SESSION_RESET)
            .then_some(self as &dyn SessionResetter)
    }

    fn as_prepare_context(&self) -> Option<&dyn ConnPrepareContext> {
        self.has(CapabilitySet::PREPARE_CONTEXT)
            .then_some(self as &dyn ConnPrepareContext)
    }

    fn as_begin_tx(&self) -> Option<&dyn ConnBeginTx> {
        self.has(CapabilitySet::BEGIN_TX)
            .then_some(self as &dyn ConnBeginTx)
    }
}

#[async_trait::async_trait]
impl Execer for MockConnection {
    async fn exec(&self, _query: &str, args: &[Value]) -> Result<ExecResult, DatabaseError> {
        self.config.fast_run(args.len()).await
    }
}

#[async_trait::async_trait]
impl ExecerContext for MockConnection {
    async fn exec_context(
        &self,
        _ctx: &Context,
        _query: &str,
        args: &[NamedValue],
    ) -> Result<ExecResult, DatabaseError> {
        self.config.fast_run(args.len()).await
    }
}

#[async_trait::async_trait]
impl Queryer for MockConnection {
    async fn query(&self, _query: &str, args: &[Value]) -> Result<Box<dyn Rows>, DatabaseError> {
        self.config.fast_rows(args.to_vec()).await
    }
}

#[async_trait::async_trait]
impl QueryerContext for MockConnection {
    async fn query_context(
        &self,
        _ctx: &Context,
        _query: &str,
        args: &[NamedValue],
    ) -> Result<Box<dyn Rows>, DatabaseError> {
        self.config.fast_rows(values(args)).await
    }
}

#[async_trait::async_trait]
impl Pinger for MockConnection {
    async fn ping(&self, _ctx: &Context) -> Result<(), DatabaseError> {
        if self.config.fail {
            return Err(DatabaseError::BadConnection);
        }
        Ok(())
    }
}

/// Multiplies integers by ten, skips everything else
impl NamedValueChecker for MockConnection {
    fn check_named_value(&self, value: &mut NamedValue) -> Result<(), DatabaseError> {
        match value.value {
            Value::Int(v) => {
                value.value = Value::Int(v * 10);
                Ok(())
            }
            _ => Err(DatabaseError::Skip),
        }
    }
}

#[async_trait::async_trait]
impl SessionResetter for MockConnection {
    async fn reset_session(&self, _ctx: &Context) -> Result<(), DatabaseError> {
        self.resets.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait::async_trait]
impl ConnPrepareContext for MockConnection {
    async fn prepare_context(
        &self,
        _ctx: &Context,
        query: &str,
    ) -> Result<Box<dyn Statement>, DatabaseError> {
        Ok(self.statement(query))
    }
}

#[async_trait::async_trait]
impl ConnBeginTx for MockConnection {
    async fn begin_tx(
        &self,
        _ctx: &Context,
        _opts: TxOptions,
    ) -> Result<Box<dyn Transaction>, DatabaseError> {
        Ok(Box::new(MockTransaction::default()))
    }
}

pub struct MockStatement {
    pub config: MockConfig,
    pub query: String,
}

impl MockStatement {
    fn has(&self, cap: CapabilitySet) -> bool {
        self.config.statement.contains(cap)
    }
}

#[async_trait::async_trait]
impl Statement for MockStatement {
    async fn close(&self) -> Result<(), DatabaseError> {
        Ok(())
    }

    fn num_input(&self) -> Option<usize> {
        None
    }

    async fn exec(&self, args: &[Value]) -> Result<ExecResult, DatabaseError> {
        self.config.run(args.len()).await
    }

    async fn query(&self, args: &[Value]) -> Result<Box<dyn Rows>, DatabaseError> {
        self.config.rows(args.to_vec()).await
    }

    fn as_exec_context(&self) -> Option<&dyn StmtExecContext> {
        self.has(CapabilitySet::EXEC_CONTEXT)
            .then_some(self as &dyn StmtExecContext)
    }

    fn as_query_context(&self) -> Option<&dyn StmtQueryContext> {
        self.has(CapabilitySet::QUERY_CONTEXT)
            .then_some(self as &dyn StmtQueryContext)
    }

    fn as_column_converter(&self) -> Option<&dyn ColumnConverter> {
        self.has(CapabilitySet::COLUMN_CONVERSION)
            .then_some(self as &dyn ColumnConverter)
    }

    fn as_named_value_checker(&self) -> Option<&dyn NamedValueChecker> {
        self.has(CapabilitySet::NAMED_VALUE_CHECK)
            .then_some(self as &dyn NamedValueChecker)
    }
}

#[async_trait::async_trait]
impl StmtExecContext for MockStatement {
    async fn exec_context(
        &self,
        _ctx: &Context,
        args: &[NamedValue],
    ) -> Result<ExecResult, DatabaseError> {
        self.config.run(args.len()).await
    }
}

#[async_trait::async_trait]
impl StmtQueryContext for MockStatement {
    async fn query_context(
        &self,
        _ctx: &Context,
        args: &[NamedValue],
    ) -> Result<Box<dyn Rows>, DatabaseError> {
        self.config.rows(values(args)).await
    }
}

impl ColumnConverter for MockStatement {
    fn convert_column(&self, index: usize, _value: Value) -> Result<Value, DatabaseError> {
        Ok(Value::Text(format!("col{index}")))
    }
}

impl NamedValueChecker for MockStatement {
    fn check_named_value(&self, _value: &mut NamedValue) -> Result<(), DatabaseError> {
        Err(DatabaseError::Skip)
    }
}

#[derive(Default)]
pub struct MockTransaction {
    pub done: AtomicUsize,
}

#[async_trait::async_trait]
impl Transaction for MockTransaction {
    async fn commit(&self) -> Result<(), DatabaseError> {
        self.done.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn rollback(&self) -> Result<(), DatabaseError> {
        self.done.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Every subset of `set`, including the empty set and `set` itself
pub fn subsets(set: CapabilitySet) -> Vec<CapabilitySet> {
    let flags: Vec<CapabilitySet> = set.iter().collect();
    (0..1u32 << flags.len())
        .map(|mask| {
            flags
                .iter()
                .enumerate()
                .filter(|(i, _)| mask & (1 << i) != 0)
                .fold(CapabilitySet::empty(), |acc, (_, flag)| acc | *flag)
        })
        .collect()
}

/// One observed callback invocation
#[derive(Debug, Clone, PartialEq)]
pub struct Observed {
    pub query: String,
    pub args: Vec<Value>,
    pub duration: Duration,
    pub error: Option<String>,
}

pub type Observations = Arc<Mutex<Vec<Observed>>>;

/// Options recording every success and error callback
pub fn recording_options() -> (Options, Observations) {
    let seen: Observations = Arc::default();
    let (ok, err) = (seen.clone(), seen.clone());
    let options = Options::builder()
        .on_success(move |query, args, duration| {
            ok.lock().unwrap().push(Observed {
                query: query.to_string(),
                args: args.to_vec(),
                duration,
                error: None,
            });
        })
        .on_error(move |query, args, duration, error| {
            err.lock().unwrap().push(Observed {
                query: query.to_string(),
                args: args.to_vec(),
                duration,
                error: Some(error.to_string()),
            });
        })
        .build();
    (options, seen)
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
