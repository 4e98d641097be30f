//! CLI command implementations.

pub mod ls;
pub mod put;
pub mod rm;
pub mod stat;

use objstore_segment::PartPolicy;
use objstore_services::{Registry, ServiceResult, StorageConfig, Storager};
use std::sync::Arc;
use tracing::debug;

/// The storager a command runs against.
#[derive(Debug, Clone)]
pub struct Target {
    /// Registered service type.
    pub service: String,
    /// Working directory of the storager.
    pub work_dir: String,
    /// Storager name, if the service needs one.
    pub name: Option<String>,
    /// Minimum part size passed to the adapter.
    pub min_part_size: u64,
}

impl Target {
    /// Builds the storager from the built-in registry.
    pub fn open(&self) -> ServiceResult<Arc<dyn Storager>> {
        let mut config = StorageConfig::new()
            .work_dir(self.work_dir.as_str())
            .part_policy(PartPolicy::new().min_size(self.min_part_size));
        if let Some(name) = &self.name {
            config = config.name(name.as_str());
        }

        let store = Registry::with_builtin().new_storager(&self.service, &config)?;
        debug!(storager = %store.metadata(), "storager opened");
        Ok(store)
    }
}
