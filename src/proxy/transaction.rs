// Instrumented Transaction
// Pure delegation; statements run inside a transaction go through the connection

use crate::db::traits::{DatabaseError, Transaction};

/// Commit and rollback are not intercepted, so no callback options are held
/// here. Statements run inside the transaction reach the backend through the
/// instrumented connection, which carries the options.
pub(crate) struct InstrumentedTransaction {
    parent: Box<dyn Transaction>,
}

impl InstrumentedTransaction {
    pub(crate) fn new(parent: Box<dyn Transaction>) -> Self {
        Self { parent }
    }
}

#[async_trait::async_trait]
impl Transaction for InstrumentedTransaction {
    async fn commit(&self) -> Result<(), DatabaseError> {
        tracing::trace!("commit");
        self.parent.commit().await
    }

    async fn rollback(&self) -> Result<(), DatabaseError> {
        tracing::trace!("rollback");
        self.parent.rollback().await
    }
}
