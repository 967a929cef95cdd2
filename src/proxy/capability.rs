// Capability Discovery
// Probes a backend resource for the optional capabilities it implements

use crate::db::traits::{Connection, Connector, Driver, Statement, Transaction};
use bitflags::bitflags;

bitflags! {
    /// Optional behaviors a resource may implement beyond its mandatory contract.
    ///
    /// `EXEC` and `QUERY` are the plain (non context-aware) connection fast
    /// paths; statements always support plain exec/query.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct CapabilitySet: u16 {
        const EXEC = 1 << 0;
        const EXEC_CONTEXT = 1 << 1;
        const QUERY = 1 << 2;
        const QUERY_CONTEXT = 1 << 3;
        const PING = 1 << 4;
        const NAMED_VALUE_CHECK = 1 << 5;
        const SESSION_RESET = 1 << 6;
        const COLUMN_CONVERSION = 1 << 7;
        const PREPARE_CONTEXT = 1 << 8;
        const BEGIN_TX = 1 << 9;
        const OPEN_CONNECTOR = 1 << 10;
    }
}

/// Layer of the backend a resource belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Driver,
    Connector,
    Connection,
    Statement,
    Transaction,
}

impl ResourceKind {
    /// Every capability defined for this kind
    pub fn defined(self) -> CapabilitySet {
        match self {
            ResourceKind::Driver => CapabilitySet::OPEN_CONNECTOR,
            ResourceKind::Connector | ResourceKind::Transaction => CapabilitySet::empty(),
            ResourceKind::Connection => {
                CapabilitySet::EXEC
                    | CapabilitySet::EXEC_CONTEXT
                    | CapabilitySet::QUERY
                    | CapabilitySet::QUERY_CONTEXT
                    | CapabilitySet::PING
                    | CapabilitySet::NAMED_VALUE_CHECK
                    | CapabilitySet::SESSION_RESET
                    | CapabilitySet::PREPARE_CONTEXT
                    | CapabilitySet::BEGIN_TX
            }
            ResourceKind::Statement => {
                CapabilitySet::EXEC_CONTEXT
                    | CapabilitySet::QUERY_CONTEXT
                    | CapabilitySet::COLUMN_CONVERSION
                    | CapabilitySet::NAMED_VALUE_CHECK
            }
        }
    }
}

pub fn driver_capabilities(driver: &dyn Driver) -> CapabilitySet {
    let mut set = CapabilitySet::empty();
    set.set(
        CapabilitySet::OPEN_CONNECTOR,
        driver.as_driver_context().is_some(),
    );
    set
}

/// Connectors define no optional capabilities
pub fn connector_capabilities(_connector: &dyn Connector) -> CapabilitySet {
    CapabilitySet::empty()
}

pub fn connection_capabilities(conn: &dyn Connection) -> CapabilitySet {
    let mut set = CapabilitySet::empty();
    set.set(CapabilitySet::EXEC, conn.as_execer().is_some());
    set.set(CapabilitySet::EXEC_CONTEXT, conn.as_execer_context().is_some());
    set.set(CapabilitySet::QUERY, conn.as_queryer().is_some());
    set.set(CapabilitySet::QUERY_CONTEXT, conn.as_queryer_context().is_some());
    set.set(CapabilitySet::PING, conn.as_pinger().is_some());
    set.set(
        CapabilitySet::NAMED_VALUE_CHECK,
        conn.as_named_value_checker().is_some(),
    );
    set.set(CapabilitySet::SESSION_RESET, conn.as_session_resetter().is_some());
    set.set(CapabilitySet::PREPARE_CONTEXT, conn.as_prepare_context().is_some());
    set.set(CapabilitySet::BEGIN_TX, conn.as_begin_tx().is_some());
    set
}

pub fn statement_capabilities(stmt: &dyn Statement) -> CapabilitySet {
    let mut set = CapabilitySet::empty();
    set.set(CapabilitySet::EXEC_CONTEXT, stmt.as_exec_context().is_some());
    set.set(CapabilitySet::QUERY_CONTEXT, stmt.as_query_context().is_some());
    set.set(
        CapabilitySet::COLUMN_CONVERSION,
        stmt.as_column_converter().is_some(),
    );
    set.set(
        CapabilitySet::NAMED_VALUE_CHECK,
        stmt.as_named_value_checker().is_some(),
    );
    set
}

/// Transactions define no optional capabilities
pub fn transaction_capabilities(_tx: &dyn Transaction) -> CapabilitySet {
    CapabilitySet::empty()
}
