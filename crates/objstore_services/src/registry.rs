//! Adapter registry.
//!
//! Adapters are looked up by service type through a [`Registry`] value the
//! caller owns, so which adapters exist is decided where the registry is
//! built rather than by what happened to be linked in.

use crate::config::StorageConfig;
use crate::error::{ServiceError, ServiceResult};
use crate::traits::{Servicer, Storager};
use crate::{fs, memory};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Builds servicers and storagers of one service type.
pub trait Factory: Send + Sync {
    /// Builds a servicer.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is unusable.
    fn new_servicer(&self, config: &StorageConfig) -> ServiceResult<Arc<dyn Servicer>>;

    /// Builds a storager.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is unusable.
    fn new_storager(&self, config: &StorageConfig) -> ServiceResult<Arc<dyn Storager>>;
}

/// Factory for the [`memory`] adapter.
#[derive(Debug, Clone, Copy, Default)]
pub struct MemoryFactory;

impl Factory for MemoryFactory {
    fn new_servicer(&self, config: &StorageConfig) -> ServiceResult<Arc<dyn Servicer>> {
        Ok(Arc::new(memory::MemoryService::new(config)))
    }

    fn new_storager(&self, config: &StorageConfig) -> ServiceResult<Arc<dyn Storager>> {
        Ok(Arc::new(memory::MemoryStorage::new(config)?))
    }
}

/// Factory for the [`fs`] adapter.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsFactory;

impl Factory for FsFactory {
    fn new_servicer(&self, config: &StorageConfig) -> ServiceResult<Arc<dyn Servicer>> {
        Ok(Arc::new(fs::FsService::new(config)?))
    }

    fn new_storager(&self, config: &StorageConfig) -> ServiceResult<Arc<dyn Storager>> {
        Ok(Arc::new(fs::FsStorage::new(config)?))
    }
}

/// A name-to-factory map.
///
/// # Example
///
/// ```rust
/// use objstore_services::{Registry, StorageConfig};
///
/// let registry = Registry::with_builtin();
/// let store = registry
///     .new_storager("memory", &StorageConfig::new().name("bucket"))
///     .unwrap();
/// store.write("k", b"v").unwrap();
/// ```
#[derive(Clone, Default)]
pub struct Registry {
    factories: BTreeMap<String, Arc<dyn Factory>>,
}

impl Registry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry with the `memory` and `fs` adapters.
    #[must_use]
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register(memory::TYPE, MemoryFactory);
        registry.register(fs::TYPE, FsFactory);
        registry
    }

    /// Registers a factory, returning the one it replaces.
    pub fn register(
        &mut self,
        service_type: impl Into<String>,
        factory: impl Factory + 'static,
    ) -> Option<Arc<dyn Factory>> {
        let service_type = service_type.into();
        debug!(service_type = %service_type, "service registered");
        self.factories.insert(service_type, Arc::new(factory))
    }

    /// Returns true if a factory is registered for `service_type`.
    #[must_use]
    pub fn contains(&self, service_type: &str) -> bool {
        self.factories.contains_key(service_type)
    }

    /// Returns the registered service types in ascending order.
    #[must_use]
    pub fn service_types(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }

    fn factory(&self, service_type: &str) -> ServiceResult<&Arc<dyn Factory>> {
        self.factories
            .get(service_type)
            .ok_or_else(|| ServiceError::NotRegistered(service_type.to_string()))
    }

    /// Builds a servicer of `service_type`.
    ///
    /// # Errors
    ///
    /// Returns `NotRegistered` for an unknown type, or the factory's error,
    /// wrapped with the `new_servicer` operation.
    pub fn new_servicer(
        &self,
        service_type: &str,
        config: &StorageConfig,
    ) -> ServiceResult<Arc<dyn Servicer>> {
        self.factory(service_type)
            .and_then(|factory| factory.new_servicer(config))
            .map_err(|err| err.context("new_servicer", service_type, &[]))
    }

    /// Builds a storager of `service_type`.
    ///
    /// # Errors
    ///
    /// Returns `NotRegistered` for an unknown type, or the factory's error,
    /// wrapped with the `new_storager` operation.
    pub fn new_storager(
        &self,
        service_type: &str,
        config: &StorageConfig,
    ) -> ServiceResult<Arc<dyn Storager>> {
        self.factory(service_type)
            .and_then(|factory| factory.new_storager(config))
            .map_err(|err| err.context("new_storager", service_type, &[]))
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("service_types", &self.service_types())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn builtin_types() {
        let registry = Registry::with_builtin();
        assert_eq!(registry.service_types(), vec!["fs", "memory"]);
        assert!(registry.contains("memory"));
        assert!(!registry.contains("s3"));
    }

    #[test]
    fn unknown_type_is_not_registered() {
        let registry = Registry::new();
        let err = registry
            .new_storager("memory", &StorageConfig::new().name("b"))
            .err()
            .unwrap();
        assert_eq!(err.kind(), ErrorKind::NotRegistered);
        assert_eq!(
            err.to_string(),
            "new_storager: memory: service not registered: memory"
        );
    }

    #[test]
    fn factory_errors_carry_operation() {
        let registry = Registry::with_builtin();
        let err = registry
            .new_storager("memory", &StorageConfig::new())
            .err()
            .unwrap();
        assert_eq!(err.kind(), ErrorKind::PairRequired);
        assert!(matches!(err, ServiceError::Context { op: "new_storager", .. }));
    }

    #[test]
    fn separate_registries_are_independent() {
        let mut custom = Registry::new();
        custom.register("mem", MemoryFactory);

        assert!(custom.contains("mem"));
        assert!(!Registry::with_builtin().contains("mem"));
        assert!(custom
            .new_servicer("mem", &StorageConfig::new())
            .is_ok());
    }

    #[test]
    fn register_replaces_existing() {
        let mut registry = Registry::with_builtin();
        assert!(registry.register("memory", MemoryFactory).is_some());
        assert_eq!(registry.service_types().len(), 2);
    }
}
