//! Record of what a run actually staged.

use std::path::{Path, PathBuf};

/// Requested inputs that were staged, in staging order.
///
/// Duplicates are kept: staging the same input twice records two entries
/// even though the second copy lands on the first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArtifactTracker {
    staged: Vec<(PathBuf, PathBuf)>,
}

impl ArtifactTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, requested: impl Into<PathBuf>, staged: impl Into<PathBuf>) {
        self.staged.push((requested.into(), staged.into()));
    }

    pub fn len(&self) -> usize {
        self.staged.len()
    }

    pub fn is_empty(&self) -> bool {
        self.staged.is_empty()
    }

    /// Staged location of a requested input (the latest one for duplicates).
    pub fn staged_path(&self, requested: &Path) -> Option<&Path> {
        self.staged
            .iter()
            .rev()
            .find(|(req, _)| req == requested)
            .map(|(_, staged)| staged.as_path())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Path, &Path)> {
        self.staged
            .iter()
            .map(|(req, staged)| (req.as_path(), staged.as_path()))
    }

    pub fn clear(&mut self) {
        self.staged.clear();
    }
}
