// Registration Facade
// Wraps a registered backend and re-registers it under a synthesized name

use crate::db::registry::DriverRegistry;
use crate::db::traits::{DatabaseError, Driver};
use crate::proxy::{wrap_driver, Options};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Serializes name generation and registration across all registries
static REGISTER_LOCK: Mutex<()> = Mutex::const_new(());

/// Registration errors
#[derive(Debug, thiserror::Error)]
pub enum RegisterError {
    #[error("Backend unavailable: {name}")]
    BackendUnavailable {
        name: String,
        #[source]
        source: DatabaseError,
    },

    #[error("Registration failed for {name}: {source}")]
    Registry {
        name: String,
        #[source]
        source: DatabaseError,
    },
}

/// Wrap the driver registered as `driver_name` and register the wrapper under
/// a fresh name, which is returned. Nothing is registered when the backend
/// cannot be resolved.
///
/// Several wrappers of the same backend can coexist, each with its own
/// options.
pub async fn register(
    registry: &DriverRegistry,
    driver_name: &str,
    options: Options,
) -> Result<String, RegisterError> {
    let backend = registry
        .get_driver(driver_name)
        .await
        .map_err(|source| RegisterError::BackendUnavailable {
            name: driver_name.to_string(),
            source,
        })?;

    register_driver(registry, driver_name, backend, options).await
}

/// Like [`register`], but for a backend the caller already resolved.
/// `base_name` only seeds the synthesized name.
pub async fn register_driver(
    registry: &DriverRegistry,
    base_name: &str,
    backend: Arc<dyn Driver>,
    options: Options,
) -> Result<String, RegisterError> {
    let wrapped = wrap_driver(backend, options);

    let _guard = REGISTER_LOCK.lock().await;
    let name = next_name(registry, base_name).await;
    registry
        .register(name.clone(), wrapped)
        .await
        .map_err(|source| RegisterError::Registry {
            name: name.clone(),
            source,
        })?;

    tracing::info!(backend = base_name, driver = %name, "registered instrumented driver");
    Ok(name)
}

/// Register against the process-wide registry
pub async fn register_global(driver_name: &str, options: Options) -> Result<String, RegisterError> {
    register(DriverRegistry::global(), driver_name, options).await
}

async fn next_name(registry: &DriverRegistry, base_name: &str) -> String {
    let mut n = registry.len().await;
    loop {
        let candidate = format!("{base_name}-querypulse-{n}");
        if !registry.has_driver(&candidate).await {
            return candidate;
        }
        n += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::traits::Connection;

    struct NullDriver;

    #[async_trait::async_trait]
    impl Driver for NullDriver {
        async fn open(&self, _dsn: &str) -> Result<Box<dyn Connection>, DatabaseError> {
            Err(DatabaseError::ConnectionFailed("null".to_string()))
        }
    }

    #[tokio::test]
    async fn test_unknown_backend_registers_nothing() {
        let registry = DriverRegistry::new();

        let result = register(&registry, "missing", Options::new()).await;

        assert!(matches!(
            result,
            Err(RegisterError::BackendUnavailable { ref name, .. }) if name == "missing"
        ));
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_names_skip_taken_slots() {
        let registry = DriverRegistry::new();
        registry.register("null", Arc::new(NullDriver)).await.unwrap();
        registry
            .register("null-querypulse-1", Arc::new(NullDriver))
            .await
            .unwrap();

        let name = register(&registry, "null", Options::new()).await.unwrap();

        assert_eq!(name, "null-querypulse-2");
        assert!(registry.has_driver(&name).await);
    }

    #[tokio::test]
    async fn test_register_driver_without_lookup() {
        let registry = DriverRegistry::new();

        let name = register_driver(&registry, "direct", Arc::new(NullDriver), Options::new())
            .await
            .unwrap();

        assert_eq!(name, "direct-querypulse-0");
        assert_eq!(registry.drivers().await, vec![name]);
    }
}
