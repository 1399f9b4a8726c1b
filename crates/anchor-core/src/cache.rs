//! Anchoring results cached per document version
//!
//! Entries are keyed by `(DocumentVersion, annotation id)`. Editing a document
//! produces a new version, so stale geometry is dropped with a single
//! [`AnchorCache::invalidate`] call.

use crate::anchor::Anchored;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt;
use tracing::debug;

/// SHA-256 hex digest identifying one revision of a document's bytes
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentVersion(String);

impl DocumentVersion {
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        Self(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Cached outcome of anchoring one annotation. `None` records that the
/// annotation text could not be found.
pub type CachedAnchor = Option<Anchored>;

#[derive(Debug, Default, Clone)]
pub struct AnchorCache {
    entries: HashMap<(DocumentVersion, String), CachedAnchor>,
}

impl AnchorCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, version: &DocumentVersion, annotation_id: &str) -> Option<&CachedAnchor> {
        self.entries
            .get(&(version.clone(), annotation_id.to_string()))
    }

    pub fn insert(&mut self, version: DocumentVersion, annotation_id: impl Into<String>, value: CachedAnchor) {
        self.entries.insert((version, annotation_id.into()), value);
    }

    /// Drop every entry for one document version, returning how many were removed
    pub fn invalidate(&mut self, version: &DocumentVersion) -> usize {
        let before = self.entries.len();
        self.entries.retain(|(v, _), _| v != version);
        let removed = before - self.entries.len();
        debug!(version = %version, removed, "Invalidated anchor cache");
        removed
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AnnotationColor, AnnotationCoord, Rect};
    use pretty_assertions::assert_eq;

    fn anchored() -> Anchored {
        Anchored {
            coords: vec![AnnotationCoord {
                page_index: 0,
                bounding_rect: Rect::new(1.0, 2.0, 3.0, 4.0),
            }],
            color: AnnotationColor::from_rgb8([255, 0, 0]),
        }
    }

    #[test]
    fn test_version_is_sha256_hex() {
        let v = DocumentVersion::from_bytes(b"");
        assert_eq!(
            v.as_str(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_ne!(v, DocumentVersion::from_bytes(b"%PDF-1.7"));
    }

    #[test]
    fn test_positive_and_negative_entries() {
        let mut cache = AnchorCache::new();
        let v = DocumentVersion::from_bytes(b"doc");
        cache.insert(v.clone(), "a1", Some(anchored()));
        cache.insert(v.clone(), "a2", None);

        assert_eq!(cache.get(&v, "a1"), Some(&Some(anchored())));
        assert_eq!(cache.get(&v, "a2"), Some(&None));
        assert_eq!(cache.get(&v, "a3"), None);
    }

    #[test]
    fn test_invalidate_only_touches_one_version() {
        let mut cache = AnchorCache::new();
        let old = DocumentVersion::from_bytes(b"v1");
        let new = DocumentVersion::from_bytes(b"v2");
        cache.insert(old.clone(), "a1", Some(anchored()));
        cache.insert(old.clone(), "a2", None);
        cache.insert(new.clone(), "a1", Some(anchored()));

        assert_eq!(cache.invalidate(&old), 2);
        assert_eq!(cache.len(), 1);
        assert!(cache.get(&old, "a1").is_none());
        assert!(cache.get(&new, "a1").is_some());

        cache.clear();
        assert!(cache.is_empty());
    }
}
