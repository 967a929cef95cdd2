// Instrumented Statement
// Prepared statement wrapper that remembers its prepare-time query text

use crate::db::traits::{
    ColumnConverter, Context, DatabaseError, ExecResult, NamedValue, NamedValueChecker, Rows,
    Statement, StmtExecContext, StmtQueryContext, Value,
};
use crate::proxy::args;
use crate::proxy::capability::{statement_capabilities, CapabilitySet};
use crate::proxy::interceptor::intercept;
use crate::proxy::options::Options;

pub(crate) struct InstrumentedStatement {
    parent: Box<dyn Statement>,
    query: String,
    capabilities: CapabilitySet,
    options: Options,
}

impl InstrumentedStatement {
    pub(crate) fn new(parent: Box<dyn Statement>, query: &str, options: Options) -> Self {
        let capabilities = statement_capabilities(parent.as_ref());
        tracing::trace!(query, ?capabilities, "wrapped statement");
        Self {
            parent,
            query: query.to_string(),
            capabilities,
            options,
        }
    }

    fn supports(&self, capability: CapabilitySet) -> bool {
        self.capabilities.contains(capability)
    }
}

#[async_trait::async_trait]
impl Statement for InstrumentedStatement {
    async fn close(&self) -> Result<(), DatabaseError> {
        self.parent.close().await
    }

    fn num_input(&self) -> Option<usize> {
        self.parent.num_input()
    }

    async fn exec(&self, args: &[Value]) -> Result<ExecResult, DatabaseError> {
        let normalized = args::from_values(args);
        intercept(&self.options, &self.query, &normalized, self.parent.exec(args)).await
    }

    async fn query(&self, args: &[Value]) -> Result<Box<dyn Rows>, DatabaseError> {
        let normalized = args::from_values(args);
        intercept(&self.options, &self.query, &normalized, self.parent.query(args)).await
    }

    fn as_exec_context(&self) -> Option<&dyn StmtExecContext> {
        self.supports(CapabilitySet::EXEC_CONTEXT)
            .then_some(self as &dyn StmtExecContext)
    }

    fn as_query_context(&self) -> Option<&dyn StmtQueryContext> {
        self.supports(CapabilitySet::QUERY_CONTEXT)
            .then_some(self as &dyn StmtQueryContext)
    }

    fn as_column_converter(&self) -> Option<&dyn ColumnConverter> {
        self.supports(CapabilitySet::COLUMN_CONVERSION)
            .then_some(self as &dyn ColumnConverter)
    }

    fn as_named_value_checker(&self) -> Option<&dyn NamedValueChecker> {
        self.supports(CapabilitySet::NAMED_VALUE_CHECK)
            .then_some(self as &dyn NamedValueChecker)
    }
}

#[async_trait::async_trait]
impl StmtExecContext for InstrumentedStatement {
    async fn exec_context(
        &self,
        ctx: &Context,
        args: &[NamedValue],
    ) -> Result<ExecResult, DatabaseError> {
        let inner = self.parent.as_exec_context().ok_or(DatabaseError::Skip)?;
        let normalized = args::from_named(args);
        intercept(
            &self.options,
            &self.query,
            &normalized,
            inner.exec_context(ctx, args),
        )
        .await
    }
}

#[async_trait::async_trait]
impl StmtQueryContext for InstrumentedStatement {
    async fn query_context(
        &self,
        ctx: &Context,
        args: &[NamedValue],
    ) -> Result<Box<dyn Rows>, DatabaseError> {
        let inner = self.parent.as_query_context().ok_or(DatabaseError::Skip)?;
        let normalized = args::from_named(args);
        intercept(
            &self.options,
            &self.query,
            &normalized,
            inner.query_context(ctx, args),
        )
        .await
    }
}

impl ColumnConverter for InstrumentedStatement {
    fn convert_column(&self, index: usize, value: Value) -> Result<Value, DatabaseError> {
        match self.parent.as_column_converter() {
            Some(inner) => inner.convert_column(index, value),
            None => Err(DatabaseError::Skip),
        }
    }
}

impl NamedValueChecker for InstrumentedStatement {
    fn check_named_value(&self, value: &mut NamedValue) -> Result<(), DatabaseError> {
        match self.parent.as_named_value_checker() {
            Some(inner) => inner.check_named_value(value),
            None => Err(DatabaseError::Skip),
        }
    }
}
