//! Part descriptors.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One chunk of an object being uploaded.
///
/// The byte range a part covers is not stored: it is derived from the rank
/// of `index` among all parts of the same [`crate::Segment`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Part {
    /// Position of this chunk within the final object.
    pub index: u32,
    /// Length of this chunk in bytes.
    pub size: u64,
    /// Integrity tag returned by the backend for this chunk, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
}

impl Part {
    /// Creates a part without an integrity tag.
    #[must_use]
    pub const fn new(index: u32, size: u64) -> Self {
        Self {
            index,
            size,
            etag: None,
        }
    }

    /// Attaches the backend-issued integrity tag.
    #[must_use]
    pub fn with_etag(mut self, etag: impl Into<String>) -> Self {
        self.etag = Some(etag.into());
        self
    }
}

impl fmt::Display for Part {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Part {{Index: {}, Size: {}}}", self.index, self.size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_omits_etag() {
        let part = Part::new(3, 1024).with_etag("abc");
        assert_eq!(part.to_string(), "Part {Index: 3, Size: 1024}");
    }

    #[test]
    fn serializes_without_missing_etag() {
        let json = serde_json::to_string(&Part::new(1, 10)).unwrap();
        assert_eq!(json, r#"{"index":1,"size":10}"#);

        let tagged: Part = serde_json::from_str(r#"{"index":2,"size":5,"etag":"e"}"#).unwrap();
        assert_eq!(tagged, Part::new(2, 5).with_etag("e"));
    }
}
