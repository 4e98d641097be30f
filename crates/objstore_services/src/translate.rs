//! Vendor error translation tables.
//!
//! Each adapter describes how its backend's error codes map onto the shared
//! [`ErrorKind`] taxonomy with a constant [`ErrorTable`]. Codes missing from
//! the table translate to [`ErrorKind::Unexpected`].

use crate::error::{ErrorKind, ServiceError};
use std::fmt;
use std::io;

/// A lookup table from backend error codes to shared error kinds.
///
/// # Example
///
/// ```rust
/// use objstore_services::{ErrorKind, ErrorTable};
///
/// const TABLE: ErrorTable<&str> = ErrorTable::new(&[
///     ("AccessDenied", ErrorKind::PermissionDenied),
///     ("NoSuchKey", ErrorKind::ObjectNotExist),
/// ]);
///
/// assert_eq!(TABLE.kind_of(&"NoSuchKey"), ErrorKind::ObjectNotExist);
/// assert_eq!(TABLE.kind_of(&"SlowDown"), ErrorKind::Unexpected);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct ErrorTable<C: 'static> {
    entries: &'static [(C, ErrorKind)],
}

impl<C: PartialEq> ErrorTable<C> {
    /// Creates a table from `(code, kind)` entries.
    #[must_use]
    pub const fn new(entries: &'static [(C, ErrorKind)]) -> Self {
        Self { entries }
    }

    /// Returns the kind `code` maps to, or `Unexpected` if unmapped.
    #[must_use]
    pub fn kind_of(&self, code: &C) -> ErrorKind {
        self.entries
            .iter()
            .find(|(candidate, _)| candidate == code)
            .map_or(ErrorKind::Unexpected, |(_, kind)| *kind)
    }

    /// Translates a backend error into a [`ServiceError`].
    ///
    /// `detail` is the backend's own error, kept as the message.
    pub fn translate(&self, code: &C, detail: impl fmt::Display) -> ServiceError {
        ServiceError::from_kind(self.kind_of(code), detail.to_string())
    }
}

/// Translation for errors raised by the local file system.
pub const IO_ERRORS: ErrorTable<io::ErrorKind> = ErrorTable::new(&[
    (io::ErrorKind::NotFound, ErrorKind::ObjectNotExist),
    (io::ErrorKind::PermissionDenied, ErrorKind::PermissionDenied),
]);

#[cfg(test)]
mod tests {
    use super::*;

    const OBJECT_STORE_ERRORS: ErrorTable<&str> = ErrorTable::new(&[
        ("AccessDenied", ErrorKind::PermissionDenied),
        ("NoSuchKey", ErrorKind::ObjectNotExist),
    ]);

    #[test]
    fn mapped_codes_translate() {
        let err = OBJECT_STORE_ERRORS.translate(&"AccessDenied", "bucket policy");
        assert_eq!(err.kind(), ErrorKind::PermissionDenied);
        assert_eq!(err.to_string(), "permission denied: bucket policy");

        let err = OBJECT_STORE_ERRORS.translate(&"NoSuchKey", "a/b");
        assert!(matches!(err, ServiceError::ObjectNotExist(ref m) if m == "a/b"));
    }

    #[test]
    fn unmapped_codes_are_unexpected() {
        let err = OBJECT_STORE_ERRORS.translate(&"InternalError", "retry later");
        assert_eq!(err.kind(), ErrorKind::Unexpected);
    }

    #[test]
    fn io_table() {
        assert_eq!(IO_ERRORS.kind_of(&io::ErrorKind::NotFound), ErrorKind::ObjectNotExist);
        assert_eq!(IO_ERRORS.kind_of(&io::ErrorKind::AlreadyExists), ErrorKind::Unexpected);
    }
}
