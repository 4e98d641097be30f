//! Error types shared by every adapter.

use objstore_segment::SegmentError;
use std::fmt;
use std::io;
use thiserror::Error;

/// Result type for service and storage operations.
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Backend-independent classification of a [`ServiceError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The backend refused access.
    PermissionDenied,
    /// The object, upload or storager does not exist.
    ObjectNotExist,
    /// Anything the adapter cannot classify.
    Unexpected,
    /// A required configuration value is missing.
    PairRequired,
    /// A configuration value could not be parsed.
    InvalidConfig,
    /// No adapter is registered under the requested type.
    NotRegistered,
    /// The storager does not support the requested capability.
    CapabilityMissing,
    /// The multipart segment rejected an operation.
    Segment,
}

/// Errors returned by servicers, storagers and the registry.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The backend refused access.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// The object, upload or storager does not exist.
    #[error("object not exist: {0}")]
    ObjectNotExist(String),

    /// An error the adapter cannot classify.
    #[error("unexpected: {0}")]
    Unexpected(String),

    /// A required configuration value is missing.
    #[error("pair required: {0}")]
    PairRequired(&'static str),

    /// A configuration value could not be parsed.
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// No adapter is registered under the requested type.
    #[error("service not registered: {0}")]
    NotRegistered(String),

    /// The storager does not support the requested capability.
    #[error("capability missing: {0}")]
    CapabilityMissing(&'static str),

    /// The multipart segment rejected an operation.
    #[error(transparent)]
    Segment(#[from] SegmentError),

    /// An error annotated with the operation and target it occurred on.
    #[error("{op}: {target}: {source}")]
    Context {
        /// The failed operation.
        op: &'static str,
        /// The servicer, storager or service type involved.
        target: String,
        /// The object paths involved, if any.
        path: Vec<String>,
        /// The underlying error.
        #[source]
        source: Box<ServiceError>,
    },
}

impl ServiceError {
    /// Returns the classification of this error, looking through context.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::PermissionDenied(_) => ErrorKind::PermissionDenied,
            Self::ObjectNotExist(_) => ErrorKind::ObjectNotExist,
            Self::Unexpected(_) => ErrorKind::Unexpected,
            Self::PairRequired(_) => ErrorKind::PairRequired,
            Self::InvalidConfig(_) => ErrorKind::InvalidConfig,
            Self::NotRegistered(_) => ErrorKind::NotRegistered,
            Self::CapabilityMissing(_) => ErrorKind::CapabilityMissing,
            Self::Segment(_) => ErrorKind::Segment,
            Self::Context { source, .. } => source.kind(),
        }
    }

    /// Returns the segment error at the root of this error, if any.
    #[must_use]
    pub fn as_segment(&self) -> Option<&SegmentError> {
        match self {
            Self::Segment(err) => Some(err),
            Self::Context { source, .. } => source.as_segment(),
            _ => None,
        }
    }

    /// Builds a backend error of the given kind.
    ///
    /// Only `PermissionDenied` and `ObjectNotExist` have dedicated variants
    /// for backend failures; every other kind becomes `Unexpected`.
    pub fn from_kind(kind: ErrorKind, message: impl Into<String>) -> Self {
        match kind {
            ErrorKind::PermissionDenied => Self::PermissionDenied(message.into()),
            ErrorKind::ObjectNotExist => Self::ObjectNotExist(message.into()),
            _ => Self::Unexpected(message.into()),
        }
    }

    /// Wraps this error with the operation and target it occurred on.
    ///
    /// An error that already carries context is not wrapped twice.
    pub fn context(self, op: &'static str, target: impl fmt::Display, path: &[&str]) -> Self {
        if matches!(self, Self::Context { .. }) {
            return self;
        }
        Self::Context {
            op,
            target: target.to_string(),
            path: path.iter().map(|p| (*p).to_string()).collect(),
            source: Box::new(self),
        }
    }
}

impl From<io::Error> for ServiceError {
    fn from(err: io::Error) -> Self {
        crate::translate::IO_ERRORS.translate(&err.kind(), err)
    }
}

impl From<serde_json::Error> for ServiceError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidConfig(err.to_string())
    }
}
