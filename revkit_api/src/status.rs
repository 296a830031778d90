use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Classified view of the working tree.
///
/// `clean` is true exactly when all four path sets are empty. A path listed
/// in `conflicted` never appears in `staged` or `modified`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct StatusView {
    /// Checked-out branch; empty on a detached head or before the first commit.
    #[serde(default)]
    pub branch: String,
    /// True when nothing is staged, modified, untracked or conflicted.
    pub clean: bool,
    /// Paths with changes recorded in the index.
    #[serde(default)]
    pub staged: BTreeSet<String>,
    /// Tracked paths whose working copy differs from the index.
    #[serde(default)]
    pub modified: BTreeSet<String>,
    /// Paths unknown to the index.
    #[serde(default)]
    pub untracked: BTreeSet<String>,
    /// Paths with unresolved merge conflicts.
    #[serde(default)]
    pub conflicted: BTreeSet<String>,
}

impl StatusView {
    /// A clean view for the given branch.
    #[must_use]
    pub fn clean(branch: impl Into<String>) -> Self {
        Self {
            branch: branch.into(),
            clean: true,
            ..Self::default()
        }
    }

    /// True when tracked content would be lost or blocked by a checkout.
    ///
    /// Untracked paths alone do not count.
    #[must_use]
    pub fn is_dirty_for_checkout(&self) -> bool {
        !(self.staged.is_empty() && self.modified.is_empty() && self.conflicted.is_empty())
    }

    /// Total number of distinct paths across all classes.
    #[must_use]
    pub fn path_count(&self) -> usize {
        self.staged
            .iter()
            .chain(&self.modified)
            .chain(&self.untracked)
            .chain(&self.conflicted)
            .collect::<BTreeSet<_>>()
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_view_has_empty_sets() {
        let view = StatusView::clean("main");
        assert!(view.clean);
        assert_eq!(view.branch, "main");
        assert_eq!(view.path_count(), 0);
        assert!(!view.is_dirty_for_checkout());
    }

    #[test]
    fn untracked_alone_is_not_dirty_for_checkout() {
        let mut view = StatusView::clean("");
        view.untracked.insert("notes.txt".into());
        view.clean = false;
        assert!(!view.is_dirty_for_checkout());

        view.modified.insert("a.txt".into());
        assert!(view.is_dirty_for_checkout());
        assert_eq!(view.path_count(), 2);
    }

    #[test]
    fn status_defaults_are_applied() {
        let view: StatusView =
            serde_json::from_str(r#"{ "clean": true }"#).expect("deserialize status");
        assert!(view.branch.is_empty());
        assert!(view.staged.is_empty());
    }
}
