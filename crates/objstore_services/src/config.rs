//! Storager configuration.

use crate::error::{ServiceError, ServiceResult};
use objstore_segment::PartPolicy;
use serde::{Deserialize, Serialize};

/// Configuration handed to an adapter factory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Bucket or storager name.
    pub name: Option<String>,

    /// Prefix applied to every path; the root directory for the fs adapter.
    pub work_dir: String,

    /// Multipart limits of the backend.
    pub part_policy: PartPolicy,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            name: None,
            work_dir: "/".to_string(),
            part_policy: PartPolicy::default(),
        }
    }
}

impl StorageConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a configuration from JSON. Missing fields take defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::InvalidConfig`] if the JSON is malformed.
    pub fn from_json(json: &str) -> ServiceResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Sets the storager name.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the work dir.
    #[must_use]
    pub fn work_dir(mut self, work_dir: impl Into<String>) -> Self {
        self.work_dir = work_dir.into();
        self
    }

    /// Sets the multipart limits.
    #[must_use]
    pub const fn part_policy(mut self, policy: PartPolicy) -> Self {
        self.part_policy = policy;
        self
    }

    /// Returns the name, or [`ServiceError::PairRequired`] if unset.
    ///
    /// # Errors
    ///
    /// Fails when no name was configured.
    pub fn require_name(&self) -> ServiceResult<&str> {
        self.name
            .as_deref()
            .ok_or(ServiceError::PairRequired("name"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn default_config() {
        let config = StorageConfig::default();
        assert!(config.name.is_none());
        assert_eq!(config.work_dir, "/");
        assert_eq!(config.part_policy, PartPolicy::default());
    }

    #[test]
    fn builder_pattern() {
        let config = StorageConfig::new()
            .name("bucket")
            .work_dir("/data/")
            .part_policy(PartPolicy::new().min_size(1));

        assert_eq!(config.require_name().unwrap(), "bucket");
        assert_eq!(config.work_dir, "/data/");
        assert_eq!(config.part_policy.min_size, 1);
    }

    #[test]
    fn require_name_fails_when_missing() {
        let err = StorageConfig::new().require_name().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PairRequired);
    }

    #[test]
    fn from_json_fills_defaults() {
        let config =
            StorageConfig::from_json(r#"{"name": "b", "part_policy": {"max_parts": 100}}"#)
                .unwrap();
        assert_eq!(config.name.as_deref(), Some("b"));
        assert_eq!(config.work_dir, "/");
        assert_eq!(config.part_policy.max_parts, Some(100));
        assert_eq!(config.part_policy.min_size, PartPolicy::default().min_size);
    }

    #[test]
    fn from_json_rejects_garbage() {
        let err = StorageConfig::from_json("{name").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidConfig);
    }
}
