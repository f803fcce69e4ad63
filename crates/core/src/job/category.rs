//! Media categories and extension filters.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// A logical grouping of jobs by media kind.
///
/// Each category owns an independent slot in the run coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Image,
    Audio,
    Video,
    Document,
    /// Copy or rename files without converting them.
    Rename,
}

impl Category {
    /// All categories, in display order.
    pub const ALL: [Category; 5] = [
        Category::Image,
        Category::Audio,
        Category::Video,
        Category::Document,
        Category::Rename,
    ];

    /// Returns the category name used in configuration and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Image => "image",
            Category::Audio => "audio",
            Category::Video => "video",
            Category::Document => "document",
            Category::Rename => "rename",
        }
    }

    /// Input extensions (lowercase, no dot) accepted by default.
    ///
    /// An empty table means every regular file is accepted.
    pub fn input_extensions(&self) -> &'static [&'static str] {
        match self {
            Category::Image => &["png", "jpg", "jpeg", "jfif", "webp", "bmp", "tiff", "tif", "gif"],
            Category::Audio => &["mp3", "wav", "flac", "ogg", "m4a", "aac", "wma"],
            Category::Video => &["mp4", "mov", "mkv", "avi", "webm", "m4v", "ts"],
            Category::Document => &[
                "doc", "docx", "odt", "rtf", "txt", "xls", "xlsx", "ppt", "pptx", "html", "htm",
            ],
            Category::Rename => &[],
        }
    }

    /// Output formats this category can produce.
    pub fn output_formats(&self) -> &'static [&'static str] {
        match self {
            Category::Image => &["png", "jpg", "webp", "tiff", "bmp", "gif"],
            Category::Audio => &["mp3", "wav", "flac", "ogg", "m4a", "aac"],
            Category::Video => &["mp4", "mov", "mkv", "avi", "webm"],
            Category::Document => &["pdf", "docx", "odt", "txt"],
            Category::Rename => &[],
        }
    }

    /// Whether a "keep original format" run makes sense for this category.
    pub fn supports_keep_original(&self) -> bool {
        !matches!(self, Category::Document | Category::Audio)
    }

    /// Builds the default extension filter for this category.
    pub fn default_filter(&self) -> ExtensionSet {
        ExtensionSet::new(self.input_extensions().iter().copied())
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "image" | "images" => Ok(Category::Image),
            "audio" | "sound" => Ok(Category::Audio),
            "video" | "videos" => Ok(Category::Video),
            "document" | "documents" | "doc" => Ok(Category::Document),
            "rename" => Ok(Category::Rename),
            other => Err(format!("unknown category: {}", other)),
        }
    }
}

/// Decides whether a discovered file belongs in a job set.
pub trait ExtensionFilter {
    fn accepts(&self, path: &Path) -> bool;
}

impl<F> ExtensionFilter for F
where
    F: Fn(&Path) -> bool,
{
    fn accepts(&self, path: &Path) -> bool {
        self(path)
    }
}

impl ExtensionFilter for Category {
    fn accepts(&self, path: &Path) -> bool {
        self.default_filter().accepts(path)
    }
}

/// A case-insensitive set of accepted extensions.
///
/// An empty set accepts every path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtensionSet {
    extensions: HashSet<String>,
}

impl ExtensionSet {
    /// Creates a set from extensions with or without a leading dot.
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            extensions: extensions
                .into_iter()
                .map(|e| normalize_extension(e.as_ref()))
                .filter(|e| !e.is_empty())
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.extensions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.extensions.is_empty()
    }

    pub fn contains(&self, extension: &str) -> bool {
        self.extensions.contains(&normalize_extension(extension))
    }
}

impl ExtensionFilter for ExtensionSet {
    fn accepts(&self, path: &Path) -> bool {
        if self.extensions.is_empty() {
            return true;
        }
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| self.contains(e))
            .unwrap_or(false)
    }
}

/// Lowercases an extension and strips a leading dot.
pub(crate) fn normalize_extension(extension: &str) -> String {
    extension.trim().trim_start_matches('.').to_ascii_lowercase()
}
