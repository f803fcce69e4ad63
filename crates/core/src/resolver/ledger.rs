//! Run-scoped ledger of claimed output paths.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Output paths already handed out during one run.
///
/// Owned by a single run loop. Keys compare case-insensitively so two jobs
/// never collide on a case-insensitive filesystem.
#[derive(Debug, Clone, Default)]
pub struct PathAllocationSet {
    keys: HashSet<String>,
    claimed: Vec<PathBuf>,
}

impl PathAllocationSet {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(path: &Path) -> String {
        path.to_string_lossy().to_lowercase()
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.keys.contains(&Self::key(path))
    }

    /// Records a path. Returns `false` if it was already claimed.
    pub fn claim(&mut self, path: PathBuf) -> bool {
        if !self.keys.insert(Self::key(&path)) {
            return false;
        }
        self.claimed.push(path);
        true
    }

    pub fn len(&self) -> usize {
        self.claimed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.claimed.is_empty()
    }

    /// Claimed paths in claim order.
    pub fn iter(&self) -> impl Iterator<Item = &PathBuf> {
        self.claimed.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claim_once() {
        let mut ledger = PathAllocationSet::new();
        assert!(ledger.claim(PathBuf::from("/out/a.png")));
        assert!(!ledger.claim(PathBuf::from("/out/a.png")));
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_case_insensitive() {
        let mut ledger = PathAllocationSet::new();
        ledger.claim(PathBuf::from("/out/Photo.PNG"));
        assert!(ledger.contains(Path::new("/out/photo.png")));
        assert!(!ledger.claim(PathBuf::from("/OUT/photo.png")));
    }

    #[test]
    fn test_iter_preserves_order() {
        let mut ledger = PathAllocationSet::new();
        ledger.claim(PathBuf::from("/out/b"));
        ledger.claim(PathBuf::from("/out/a"));
        let order: Vec<_> = ledger.iter().cloned().collect();
        assert_eq!(order, vec![PathBuf::from("/out/b"), PathBuf::from("/out/a")]);
    }
}
