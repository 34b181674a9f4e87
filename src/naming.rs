//! Filename conventions shared by discovery and output.
//!
//! A comic is identified by the stem of its metadata file. The same stem,
//! with any image extension, names its image:
//!
//! ```text
//! comics/meta/001-Intro.md     → slug "001-intro"
//! comics/images/001-Intro.png  → matched by stem "001-Intro"
//! ```
//!
//! Slugs are lowercased; image matching is on the exact (case-sensitive) stem.

use std::path::Path;

/// Extensions recognised as comic images (compared case-insensitively).
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp", "avif", "svg", "bmp"];

/// Derive a slug from a metadata file path: the lowercased stem.
///
/// - `comics/meta/001.md` → `Some("001")`
/// - `comics/meta/Chapter-One.yaml` → `Some("chapter-one")`
/// - `comics/meta/archive.tar.md` → `Some("archive.tar")`
///
/// Returns `None` for paths without a file name.
pub fn slugify(path: &Path) -> Option<String> {
    file_stem(path).map(|stem| stem.to_lowercase())
}

/// The file stem as an owned string, lossily converted.
pub fn file_stem(path: &Path) -> Option<String> {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
}

/// Lowercased extension, if any.
pub fn extension(path: &Path) -> Option<String> {
    path.extension().map(|e| e.to_string_lossy().to_lowercase())
}

/// Whether the path carries one of [`IMAGE_EXTENSIONS`].
pub fn has_image_extension(path: &Path) -> bool {
    extension(path)
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}

/// Dotfiles (`.DS_Store`, editor swap files) are never content.
pub fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .map(|n| n.to_string_lossy().starts_with('.'))
        .unwrap_or(false)
}
