//! Resolution of raw tag references into [`TagRecord`]s.

use revkit_api::{is_snapshot_tag, normalize_hash, TagRecord};
use revkit_backend_api::{Cancellation, TagRef, VcsBackend, VcsResult};

/// Resolves tags from whichever backend answers `list_tags`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TagResolver;

impl TagResolver {
    /// Construct a resolver.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// List and resolve every tag, preserving the backend's order.
    ///
    /// # Errors
    ///
    /// Propagates backend failures; zero tags is an empty list.
    pub fn list(&self, backend: &dyn VcsBackend, cancel: &Cancellation) -> VcsResult<Vec<TagRecord>> {
        let refs = backend.list_tags(cancel)?;
        Ok(refs.into_iter().map(|tag| self.resolve(tag)).collect())
    }

    /// Apply the hash, message and timestamp fallbacks to one reference.
    #[must_use]
    pub fn resolve(&self, tag: TagRef) -> TagRecord {
        let hash = tag
            .commit
            .as_ref()
            .map_or_else(|| normalize_hash(&tag.target), |commit| normalize_hash(&commit.hash));
        let message = tag
            .annotation
            .as_ref()
            .map(|annotation| annotation.message.trim().to_owned())
            .filter(|message| !message.is_empty());
        let timestamp = tag
            .commit
            .as_ref()
            .map(|commit| commit.author_time)
            .or_else(|| tag.annotation.as_ref().and_then(|annotation| annotation.tagger_time));

        TagRecord {
            is_snapshot: is_snapshot_tag(&tag.name),
            name: tag.name,
            hash,
            message,
            timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use revkit_backend_api::{PeeledCommit, TagAnnotation};

    const COMMIT: &str = "0123456789abcdef0123456789abcdef01234567";
    const TAG_OBJECT: &str = "fedcba9876543210fedcba9876543210fedcba98";

    #[test]
    fn annotated_tag_resolves_through_to_commit() {
        let record = TagResolver::new().resolve(TagRef {
            name: "snapshot-c1".into(),
            target: TAG_OBJECT.into(),
            annotation: Some(TagAnnotation {
                message: "Snapshot one\n".into(),
                tagger_time: Some(200),
            }),
            commit: Some(PeeledCommit {
                hash: COMMIT.to_uppercase(),
                author_time: 100,
            }),
        });
        assert_eq!(record.hash, COMMIT);
        assert_eq!(record.message.as_deref(), Some("Snapshot one"));
        assert_eq!(record.timestamp, Some(100));
        assert!(record.is_snapshot);
    }

    #[test]
    fn unresolvable_annotated_tag_falls_back_to_tag_data() {
        let record = TagResolver::new().resolve(TagRef {
            name: "v1".into(),
            target: TAG_OBJECT.into(),
            annotation: Some(TagAnnotation {
                message: "Release".into(),
                tagger_time: Some(200),
            }),
            commit: None,
        });
        assert_eq!(record.hash, TAG_OBJECT);
        assert_eq!(record.message.as_deref(), Some("Release"));
        assert_eq!(record.timestamp, Some(200));
        assert!(!record.is_snapshot);
    }

    #[test]
    fn lightweight_tag_has_no_message() {
        let record = TagResolver::new().resolve(TagRef {
            name: "light".into(),
            target: COMMIT.into(),
            annotation: None,
            commit: Some(PeeledCommit {
                hash: COMMIT.into(),
                author_time: 100,
            }),
        });
        assert!(record.message.is_none());
        assert_eq!(record.timestamp, Some(100));
    }

    #[test]
    fn blank_annotation_message_is_absent() {
        let record = TagResolver::new().resolve(TagRef {
            name: "blank".into(),
            target: TAG_OBJECT.into(),
            annotation: Some(TagAnnotation {
                message: " \n".into(),
                tagger_time: None,
            }),
            commit: None,
        });
        assert!(record.message.is_none());
        assert!(record.timestamp.is_none());
    }
}
