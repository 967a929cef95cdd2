// Driver Registry
// Maps driver names to backend implementations

use crate::db::traits::{DatabaseError, Driver};
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use tokio::sync::RwLock;

/// Registry for named database drivers
pub struct DriverRegistry {
    drivers: RwLock<HashMap<String, Arc<dyn Driver>>>,
}

impl DriverRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            drivers: RwLock::new(HashMap::new()),
        }
    }

    /// Process-wide registry shared by every caller that does not inject its own
    pub fn global() -> &'static DriverRegistry {
        static GLOBAL: OnceLock<DriverRegistry> = OnceLock::new();
        GLOBAL.get_or_init(DriverRegistry::new)
    }

    /// Register a driver under a name. Names are never overwritten.
    pub async fn register(
        &self,
        name: impl Into<String>,
        driver: Arc<dyn Driver>,
    ) -> Result<(), DatabaseError> {
        let name = name.into();
        let mut drivers = self.drivers.write().await;
        if drivers.contains_key(&name) {
            return Err(DatabaseError::InvalidConfig(format!(
                "driver already registered: {name}"
            )));
        }
        tracing::debug!(driver = %name, "registered driver");
        drivers.insert(name, driver);
        Ok(())
    }

    /// Get a driver by name
    pub async fn get_driver(&self, name: &str) -> Result<Arc<dyn Driver>, DatabaseError> {
        let drivers = self.drivers.read().await;
        drivers
            .get(name)
            .cloned()
            .ok_or_else(|| DatabaseError::DriverNotFound(name.to_string()))
    }

    /// Check if a driver is registered under a given name
    pub async fn has_driver(&self, name: &str) -> bool {
        let drivers = self.drivers.read().await;
        drivers.contains_key(name)
    }

    /// Sorted list of registered names
    pub async fn drivers(&self) -> Vec<String> {
        let drivers = self.drivers.read().await;
        let mut names: Vec<String> = drivers.keys().cloned().collect();
        names.sort();
        names
    }

    pub async fn len(&self) -> usize {
        self.drivers.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.drivers.read().await.is_empty()
    }
}

impl Default for DriverRegistry {
    fn default() -> Self {
        Self::new()
    }
}
