// Instrumentation Proxy
// Capability-preserving wrappers for every layer of a backend driver

pub mod args;
pub mod capability;
pub mod interceptor;
pub mod options;

mod connection;
mod driver;
mod statement;
mod transaction;

pub use capability::{
    connection_capabilities, connector_capabilities, driver_capabilities,
    statement_capabilities, transaction_capabilities, CapabilitySet, ResourceKind,
};
pub use options::{CallRecord, ErrorCallback, Options, OptionsBuilder, SuccessCallback};

use crate::db::traits::{Connection, Connector, Driver};
use std::sync::Arc;

/// Wrap a driver so every connection it opens is instrumented
pub fn wrap_driver(driver: Arc<dyn Driver>, options: Options) -> Arc<dyn Driver> {
    Arc::new(driver::InstrumentedDriver::new(driver, options))
}

/// Wrap a connector directly, without going through a registry
pub fn wrap_connector(connector: Box<dyn Connector>, options: Options) -> Box<dyn Connector> {
    Box::new(driver::InstrumentedConnector::new(connector, options))
}

/// Wrap an already opened connection
pub fn wrap_connection(conn: Box<dyn Connection>, options: Options) -> Box<dyn Connection> {
    Box::new(connection::InstrumentedConnection::new(conn, options))
}
