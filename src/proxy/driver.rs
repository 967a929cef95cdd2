// Instrumented Driver and Connector
// Entry points that wrap every connection they produce

use crate::db::traits::{Connection, Connector, Context, DatabaseError, Driver, DriverContext};
use crate::proxy::capability::{driver_capabilities, CapabilitySet};
use crate::proxy::connection::InstrumentedConnection;
use crate::proxy::options::Options;
use std::sync::Arc;

pub(crate) struct InstrumentedDriver {
    parent: Arc<dyn Driver>,
    capabilities: CapabilitySet,
    options: Options,
}

impl InstrumentedDriver {
    pub(crate) fn new(parent: Arc<dyn Driver>, options: Options) -> Self {
        let capabilities = driver_capabilities(parent.as_ref());
        tracing::debug!(?capabilities, ?options, "wrapped driver");
        Self {
            parent,
            capabilities,
            options,
        }
    }
}

#[async_trait::async_trait]
impl Driver for InstrumentedDriver {
    async fn open(&self, dsn: &str) -> Result<Box<dyn Connection>, DatabaseError> {
        let conn = self.parent.open(dsn).await?;
        Ok(Box::new(InstrumentedConnection::new(
            conn,
            self.options.clone(),
        )))
    }

    fn as_driver_context(&self) -> Option<&dyn DriverContext> {
        self.capabilities
            .contains(CapabilitySet::OPEN_CONNECTOR)
            .then_some(self as &dyn DriverContext)
    }
}

impl DriverContext for InstrumentedDriver {
    fn open_connector(&self, dsn: &str) -> Result<Box<dyn Connector>, DatabaseError> {
        let inner = self.parent.as_driver_context().ok_or(DatabaseError::Skip)?;
        let connector = inner.open_connector(dsn)?;
        Ok(Box::new(InstrumentedConnector::new(
            connector,
            self.options.clone(),
        )))
    }
}

pub(crate) struct InstrumentedConnector {
    parent: Box<dyn Connector>,
    options: Options,
}

impl InstrumentedConnector {
    pub(crate) fn new(parent: Box<dyn Connector>, options: Options) -> Self {
        Self { parent, options }
    }
}

#[async_trait::async_trait]
impl Connector for InstrumentedConnector {
    async fn connect(&self, ctx: &Context) -> Result<Box<dyn Connection>, DatabaseError> {
        let conn = self.parent.connect(ctx).await?;
        Ok(Box::new(InstrumentedConnection::new(
            conn,
            self.options.clone(),
        )))
    }

    /// The instrumented view of the parent's driver
    fn driver(&self) -> Arc<dyn Driver> {
        Arc::new(InstrumentedDriver::new(
            self.parent.driver(),
            self.options.clone(),
        ))
    }
}
