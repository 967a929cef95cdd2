// Instrumented Connection
// Exposes exactly the parent's capabilities and times every exec/query fast path

use crate::db::traits::{
    ConnBeginTx, ConnPrepareContext, Connection, Context, DatabaseError, ExecResult, Execer,
    ExecerContext, NamedValue, NamedValueChecker, Pinger, Queryer, QueryerContext, Rows,
    SessionResetter, Statement, Transaction, TxOptions, Value,
};
use crate::proxy::args;
use crate::proxy::capability::{connection_capabilities, CapabilitySet};
use crate::proxy::interceptor::intercept;
use crate::proxy::options::Options;
use crate::proxy::statement::InstrumentedStatement;
use crate::proxy::transaction::InstrumentedTransaction;

pub(crate) struct InstrumentedConnection {
    parent: Box<dyn Connection>,
    capabilities: CapabilitySet,
    options: Options,
}

impl InstrumentedConnection {
    pub(crate) fn new(parent: Box<dyn Connection>, options: Options) -> Self {
        let capabilities = connection_capabilities(parent.as_ref());
        tracing::debug!(?capabilities, "wrapped connection");
        Self {
            parent,
            capabilities,
            options,
        }
    }

    fn supports(&self, capability: CapabilitySet) -> bool {
        self.capabilities.contains(capability)
    }

    fn wrap_statement(&self, stmt: Box<dyn Statement>, query: &str) -> Box<dyn Statement> {
        Box::new(InstrumentedStatement::new(stmt, query, self.options.clone()))
    }

    fn wrap_transaction(&self, tx: Box<dyn Transaction>) -> Box<dyn Transaction> {
        Box::new(InstrumentedTransaction::new(tx))
    }
}

#[async_trait::async_trait]
impl Connection for InstrumentedConnection {
    async fn prepare(&self, query: &str) -> Result<Box<dyn Statement>, DatabaseError> {
        let stmt = self.parent.prepare(query).await?;
        Ok(self.wrap_statement(stmt, query))
    }

    async fn begin(&self) -> Result<Box<dyn Transaction>, DatabaseError> {
        let tx = self.parent.begin().await?;
        Ok(self.wrap_transaction(tx))
    }

    async fn close(&self) -> Result<(), DatabaseError> {
        self.parent.close().await
    }

    fn as_execer(&self) -> Option<&dyn Execer> {
        self.supports(CapabilitySet::EXEC).then_some(self as &dyn Execer)
    }

    fn as_execer_context(&self) -> Option<&dyn ExecerContext> {
        self.supports(CapabilitySet::EXEC_CONTEXT)
            .then_some(self as &dyn ExecerContext)
    }

    fn as_queryer(&self) -> Option<&dyn Queryer> {
        self.supports(CapabilitySet::QUERY).then_some(self as &dyn Queryer)
    }

    fn as_queryer_context(&self) -> Option<&dyn QueryerContext> {
        self.supports(CapabilitySet::QUERY_CONTEXT)
            .then_some(self as &dyn QueryerContext)
    }

    fn as_pinger(&self) -> Option<&dyn Pinger> {
        self.supports(CapabilitySet::PING).then_some(self as &dyn Pinger)
    }

    fn as_named_value_checker(&self) -> Option<&dyn NamedValueChecker> {
        self.supports(CapabilitySet::NAMED_VALUE_CHECK)
            .then_some(self as &dyn NamedValueChecker)
    }

    fn as_session_resetter(&self) -> Option<&dyn SessionResetter> {
        self.supports(CapabilitySet::SESSION_RESET)
            .then_some(self as &dyn SessionResetter)
    }

    fn as_prepare_context(&self) -> Option<&dyn ConnPrepareContext> {
        self.supports(CapabilitySet::PREPARE_CONTEXT)
            .then_some(self as &dyn ConnPrepareContext)
    }

    fn as_begin_tx(&self) -> Option<&dyn ConnBeginTx> {
        self.supports(CapabilitySet::BEGIN_TX)
            .then_some(self as &dyn ConnBeginTx)
    }
}

// Capability implementations. The accessors above only hand these out when the
// parent advertised the capability, so a missing parent capability means the
// backend changed its answer; report Skip and let the caller fall back.

#[async_trait::async_trait]
impl Execer for InstrumentedConnection {
    async fn exec(&self, query: &str, args: &[Value]) -> Result<ExecResult, DatabaseError> {
        let inner = self.parent.as_execer().ok_or(DatabaseError::Skip)?;
        let normalized = args::from_values(args);
        intercept(&self.options, query, &normalized, inner.exec(query, args)).await
    }
}

#[async_trait::async_trait]
impl ExecerContext for InstrumentedConnection {
    async fn exec_context(
        &self,
        ctx: &Context,
        query: &str,
        args: &[NamedValue],
    ) -> Result<ExecResult, DatabaseError> {
        let inner = self.parent.as_execer_context().ok_or(DatabaseError::Skip)?;
        let normalized = args::from_named(args);
        intercept(
            &self.options,
            query,
            &normalized,
            inner.exec_context(ctx, query, args),
        )
        .await
    }
}

#[async_trait::async_trait]
impl Queryer for InstrumentedConnection {
    async fn query(&self, query: &str, args: &[Value]) -> Result<Box<dyn Rows>, DatabaseError> {
        let inner = self.parent.as_queryer().ok_or(DatabaseError::Skip)?;
        let normalized = args::from_values(args);
        intercept(&self.options, query, &normalized, inner.query(query, args)).await
    }
}

#[async_trait::async_trait]
impl QueryerContext for InstrumentedConnection {
    async fn query_context(
        &self,
        ctx: &Context,
        query: &str,
        args: &[NamedValue],
    ) -> Result<Box<dyn Rows>, DatabaseError> {
        let inner = self.parent.as_queryer_context().ok_or(DatabaseError::Skip)?;
        let normalized = args::from_named(args);
        intercept(
            &self.options,
            query,
            &normalized,
            inner.query_context(ctx, query, args),
        )
        .await
    }
}

#[async_trait::async_trait]
impl Pinger for InstrumentedConnection {
    async fn ping(&self, ctx: &Context) -> Result<(), DatabaseError> {
        match self.parent.as_pinger() {
            Some(inner) => inner.ping(ctx).await,
            None => Err(DatabaseError::Skip),
        }
    }
}

impl NamedValueChecker for InstrumentedConnection {
    fn check_named_value(&self, value: &mut NamedValue) -> Result<(), DatabaseError> {
        match self.parent.as_named_value_checker() {
            Some(inner) => inner.check_named_value(value),
            None => Err(DatabaseError::Skip),
        }
    }
}

#[async_trait::async_trait]
impl SessionResetter for InstrumentedConnection {
    async fn reset_session(&self, ctx: &Context) -> Result<(), DatabaseError> {
        match self.parent.as_session_resetter() {
            Some(inner) => inner.reset_session(ctx).await,
            None => Err(DatabaseError::Skip),
        }
    }
}

#[async_trait::async_trait]
impl ConnPrepareContext for InstrumentedConnection {
    async fn prepare_context(
        &self,
        ctx: &Context,
        query: &str,
    ) -> Result<Box<dyn Statement>, DatabaseError> {
        let inner = self.parent.as_prepare_context().ok_or(DatabaseError::Skip)?;
        let stmt = inner.prepare_context(ctx, query).await?;
        Ok(self.wrap_statement(stmt, query))
    }
}

#[async_trait::async_trait]
impl ConnBeginTx for InstrumentedConnection {
    async fn begin_tx(
        &self,
        ctx: &Context,
        opts: TxOptions,
    ) -> Result<Box<dyn Transaction>, DatabaseError> {
        let inner = self.parent.as_begin_tx().ok_or(DatabaseError::Skip)?;
        let tx = inner.begin_tx(ctx, opts).await?;
        Ok(self.wrap_transaction(tx))
    }
}
