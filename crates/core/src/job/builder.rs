//! Expands a user selection into an ordered, de-duplicated job set.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use super::category::ExtensionFilter;

/// Collects explicit files and folders and flattens them into source paths.
///
/// Explicit files come first, then each folder's recursive walk. A file
/// reachable more than once keeps only its first position. Unreadable
/// entries are skipped.
#[derive(Debug, Clone, Default)]
pub struct JobSetBuilder {
    files: Vec<PathBuf>,
    folders: Vec<PathBuf>,
    follow_links: bool,
}

impl JobSetBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.files.push(path.into());
        self
    }

    pub fn add_files<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.files.extend(paths.into_iter().map(Into::into));
        self
    }

    pub fn add_folder(mut self, path: impl Into<PathBuf>) -> Self {
        self.folders.push(path.into());
        self
    }

    pub fn add_folders<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.folders.extend(paths.into_iter().map(Into::into));
        self
    }

    /// Follow symbolic links while walking folders.
    pub fn follow_links(mut self, follow: bool) -> Self {
        self.follow_links = follow;
        self
    }

    /// Whether nothing was selected at all.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.folders.is_empty()
    }

    /// Builds the job set. An empty result is not an error.
    pub fn build(&self, filter: &dyn ExtensionFilter) -> Vec<PathBuf> {
        let mut seen = HashSet::new();
        let mut sources = Vec::new();

        let mut push = |path: &Path| {
            let resolved = resolve_absolute(path);
            if seen.insert(resolved.clone()) {
                sources.push(resolved);
            }
        };

        for file in &self.files {
            if file.is_file() && filter.accepts(file) {
                push(file);
            } else {
                debug!(path = %file.display(), "Dropping explicit selection entry");
            }
        }

        for folder in &self.folders {
            let walker = WalkDir::new(folder)
                .follow_links(self.follow_links)
                .sort_by_file_name();

            for entry in walker {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(e) => {
                        debug!(folder = %folder.display(), error = %e, "Skipping unreadable entry");
                        continue;
                    }
                };

                if entry.file_type().is_file() && filter.accepts(entry.path()) {
                    push(entry.path());
                }
            }
        }

        debug!(
            files = self.files.len(),
            folders = self.folders.len(),
            sources = sources.len(),
            "Built job set"
        );

        sources
    }
}

/// Convenience wrapper over [`JobSetBuilder`].
pub fn build_job_set(
    files: &[PathBuf],
    folders: &[PathBuf],
    filter: &dyn ExtensionFilter,
) -> Vec<PathBuf> {
    JobSetBuilder::new()
        .add_files(files.iter().cloned())
        .add_folders(folders.iter().cloned())
        .build(filter)
}

/// Canonical path when it can be resolved, otherwise an absolute one.
fn resolve_absolute(path: &Path) -> PathBuf {
    std::fs::canonicalize(path)
        .or_else(|_| std::path::absolute(path))
        .unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::{Category, ExtensionSet};
    use std::fs;
    use tempfile::TempDir;

    fn touch(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, b"data").unwrap();
        path
    }

    fn names(paths: &[PathBuf]) -> Vec<String> {
        paths
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect()
    }

    #[test]
    fn test_three_files_and_folder_yield_five_jobs() {
        let temp = TempDir::new().unwrap();
        let a = touch(temp.path(), "picked/a.png");
        let b = touch(temp.path(), "picked/b.jpg");
        let c = touch(temp.path(), "picked/c.gif");
        let folder = temp.path().join("folder");
        touch(&folder, "d.png");
        touch(&folder, "e.webp");
        touch(&folder, "notes.txt");

        let sources = build_job_set(&[a, b, c], &[folder], &Category::Image);

        assert_eq!(sources.len(), 5);
        assert_eq!(names(&sources), vec!["a.png", "b.jpg", "c.gif", "d.png", "e.webp"]);
    }

    #[test]
    fn test_duplicates_keep_first_occurrence() {
        let temp = TempDir::new().unwrap();
        let folder = temp.path().join("album");
        let first = touch(&folder, "01.flac");
        touch(&folder, "02.flac");

        // Same file explicitly, via a non-normalized path, and via the folder.
        let dotted = folder.join(".").join("01.flac");
        let sources = JobSetBuilder::new()
            .add_file(&first)
            .add_file(&dotted)
            .add_folder(&folder)
            .add_folder(&folder)
            .build(&Category::Audio);

        assert_eq!(names(&sources), vec!["01.flac", "02.flac"]);
        let unique: HashSet<_> = sources.iter().collect();
        assert_eq!(unique.len(), sources.len());
    }

    #[test]
    fn test_explicit_files_failing_filter_are_dropped() {
        let temp = TempDir::new().unwrap();
        let keep = touch(temp.path(), "clip.mp4");
        let drop = touch(temp.path(), "cover.jpg");
        let missing = temp.path().join("gone.mp4");

        let sources = build_job_set(&[drop, keep, missing], &[], &Category::Video);
        assert_eq!(names(&sources), vec!["clip.mp4"]);
    }

    #[test]
    fn test_nested_folders_are_walked() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "root/b.png");
        touch(temp.path(), "root/a/deep/c.png");
        touch(temp.path(), "root/a/x.png");

        let sources = build_job_set(&[], &[temp.path().join("root")], &Category::Image);
        assert_eq!(sources.len(), 3);
        assert!(sources.iter().all(|p| p.is_absolute()));
    }

    #[test]
    fn test_missing_folder_yields_nothing() {
        let temp = TempDir::new().unwrap();
        let sources = build_job_set(&[], &[temp.path().join("nope")], &Category::Image);
        assert!(sources.is_empty());
    }

    #[test]
    fn test_custom_extension_set() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "in/report.md");
        touch(temp.path(), "in/report.txt");

        let filter = ExtensionSet::new(["md"]);
        let sources = build_job_set(&[], &[temp.path().join("in")], &filter);
        assert_eq!(names(&sources), vec!["report.md"]);
    }

    #[test]
    fn test_empty_selection() {
        let builder = JobSetBuilder::new();
        assert!(builder.is_empty());
        assert!(builder.build(&Category::Image).is_empty());
    }
}
