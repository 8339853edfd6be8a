/// Decides which files in a corpus are worth extracting.
///
/// A document is kept when it has an accepted extension, does not match any
/// ignore glob and does not look like a binary format the plain-text
/// extractor cannot read. Glob patterns are compiled once, up front, so a bad
/// pattern is reported as a configuration error instead of silently matching
/// nothing.
use glob::{MatchOptions as GlobOptions, Pattern};
use std::path::Path;

use crate::errors::{SearchError, SearchResult};

/// Formats that need an extractor other than plain text
const BINARY_EXTENSIONS: &[&str] = &[
    "exe", "dll", "so", "dylib", "bin", "obj", "o", "class", "jar", "png", "jpg", "jpeg", "gif",
    "bmp", "ico", "webp", "pdf", "doc", "docx", "odt", "rtf", "xls", "xlsx", "ppt", "pptx", "zip",
    "tar", "gz", "7z", "rar", "mp3", "mp4",
];

/// Directories never searched
const ALWAYS_IGNORED: &[&str] = &["/.git/", "/target/", "/node_modules/"];

/// Checks the extension against an optional allow-list, case-insensitively
pub fn has_valid_extension(path: &Path, extensions: Option<&[String]>) -> bool {
    let Some(exts) = extensions else {
        return true;
    };
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            exts.iter()
                .any(|e| e.trim_start_matches('.').eq_ignore_ascii_case(ext))
        })
        .unwrap_or(false)
}

/// Checks whether the extension names a known binary document format
pub fn is_likely_binary(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            BINARY_EXTENSIONS
                .iter()
                .any(|bin_ext| bin_ext.eq_ignore_ascii_case(ext))
        })
        .unwrap_or(false)
}

/// Compiled extension and ignore rules for a corpus walk
#[derive(Debug, Clone, Default)]
pub struct DocumentFilter {
    extensions: Option<Vec<String>>,
    ignore: Vec<Pattern>,
}

impl DocumentFilter {
    pub fn new(extensions: Option<Vec<String>>, ignore_patterns: &[String]) -> SearchResult<Self> {
        let ignore = ignore_patterns
            .iter()
            .map(|p| {
                Pattern::new(p).map_err(|e| {
                    SearchError::config_error(format!("Invalid ignore pattern '{}': {}", p, e))
                })
            })
            .collect::<SearchResult<Vec<_>>>()?;
        Ok(Self { extensions, ignore })
    }

    /// Whether `path` matches an ignore pattern or sits in an always-ignored directory
    pub fn should_ignore(&self, path: &Path) -> bool {
        let normalized = path.to_string_lossy().replace('\\', "/");
        let rooted = format!("/{}", normalized.trim_start_matches("./"));
        if ALWAYS_IGNORED.iter().any(|dir| rooted.contains(dir)) {
            return true;
        }

        let options = GlobOptions {
            case_sensitive: true,
            require_literal_separator: false,
            require_literal_leading_dot: false,
        };
        self.ignore
            .iter()
            .any(|p| p.matches_with(&normalized, options))
    }

    pub fn should_include(&self, path: &Path) -> bool {
        !is_likely_binary(path)
            && has_valid_extension(path, self.extensions.as_deref())
            && !self.should_ignore(path)
    }
}
