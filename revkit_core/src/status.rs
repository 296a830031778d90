//! Classification of a working-tree scan into a [`StatusView`].

use revkit_api::StatusView;
use revkit_backend_api::{Cancellation, VcsBackend, VcsResult, WorkingTreeScan};

use crate::diff::normalize_path;

/// Builds a [`StatusView`] from whichever backend answers `status`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StatusAggregator;

impl StatusAggregator {
    /// Construct an aggregator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Scan through `backend` and classify the result.
    ///
    /// # Errors
    ///
    /// Propagates backend failures.
    pub fn status(&self, backend: &dyn VcsBackend, cancel: &Cancellation) -> VcsResult<StatusView> {
        let scan = backend.status(cancel)?;
        Ok(self.aggregate(scan))
    }

    /// Merge duplicate entries and apply conflict precedence.
    #[must_use]
    pub fn aggregate(&self, scan: WorkingTreeScan) -> StatusView {
        let mut view = StatusView {
            branch: scan.branch,
            ..StatusView::default()
        };

        for entry in scan.entries {
            let path = normalize_path(&entry.path);
            if path.is_empty() {
                continue;
            }
            if entry.conflicted {
                view.conflicted.insert(path.clone());
            }
            if entry.staged {
                view.staged.insert(path.clone());
            }
            if entry.modified {
                view.modified.insert(path.clone());
            }
            if entry.untracked {
                view.untracked.insert(path);
            }
        }

        for path in &view.conflicted {
            view.staged.remove(path);
            view.modified.remove(path);
        }

        view.clean = view.staged.is_empty()
            && view.modified.is_empty()
            && view.untracked.is_empty()
            && view.conflicted.is_empty();
        view
    }
}
