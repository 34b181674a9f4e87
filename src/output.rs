//! CLI output formatting for `check` and `build`.
//!
//! # Information-First Display
//!
//! Every comic is shown by its semantic identity (slug and title), with the
//! files it came from as indented `Source:` / `Image:` context lines.
//!
//! # Output Format
//!
//! ## Check
//!
//! ```text
//! Comics
//! 001 The Beginning
//!     Source: meta/001.md
//!     Image: images/001.png
//! 002 At the Office
//!     Source: meta/002.md
//!     Image: images/002.jpg
//!
//! Unmatched
//!     meta/004.md
//!
//! Errors
//!     meta/005.yaml: missing required field `date`
//! ```
//!
//! ## Build
//!
//! ```text
//! Home → index.html
//! 001 The Beginning → 001.html
//! 002 At the Office → 002.html
//!
//! Generated 2 comic pages, copied 2 images into out
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure.

use crate::generate::BuildReport;
use crate::scan::Discovery;
use std::path::Path;

// ============================================================================
// Shared helpers
// ============================================================================

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// `slug title`, or just the slug when the comic has no title of its own.
fn comic_header(slug: &str, title: &str) -> String {
    if title == slug {
        slug.to_string()
    } else {
        format!("{} {}", slug, title)
    }
}

/// `path` relative to `root` when possible, with forward slashes.
fn display_path(path: &Path, root: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn plural(n: usize, one: &str, many: &str) -> String {
    if n == 1 {
        format!("{} {}", n, one)
    } else {
        format!("{} {}", n, many)
    }
}

// ============================================================================
// check
// ============================================================================

/// Format the discovery inventory. Paths are shown relative to `comics_root`.
pub fn format_discovery_output(discovery: &Discovery, comics_root: &Path) -> Vec<String> {
    let mut lines = vec!["Comics".to_string()];

    if discovery.comics.is_empty() {
        lines.push(format!("{}(none)", indent(1)));
    }
    for comic in discovery.ordered() {
        lines.push(comic_header(&comic.slug, comic.title()));
        lines.push(format!(
            "{}Source: {}",
            indent(1),
            display_path(&comic.meta_path, comics_root)
        ));
        lines.push(format!(
            "{}Image: {}",
            indent(1),
            display_path(&comic.image_path, comics_root)
        ));
    }

    if !discovery.unmatched.is_empty() {
        lines.push(String::new());
        lines.push("Unmatched".to_string());
        for path in &discovery.unmatched {
            lines.push(format!("{}{}", indent(1), display_path(path, comics_root)));
        }
    }

    if !discovery.errors.is_empty() {
        lines.push(String::new());
        lines.push("Errors".to_string());
        for err in &discovery.errors {
            lines.push(format!("{}{}", indent(1), err));
        }
    }

    lines
}

/// Print the discovery inventory to stdout.
pub fn print_discovery_output(discovery: &Discovery, comics_root: &Path) {
    for line in format_discovery_output(discovery, comics_root) {
        println!("{}", line);
    }
}

// ============================================================================
// build
// ============================================================================

/// Format the pages a build wrote, followed by a summary line.
pub fn format_build_output(report: &BuildReport) -> Vec<String> {
    let mut lines = vec!["Home \u{2192} index.html".to_string()];

    for (slug, title) in &report.comics {
        lines.push(format!(
            "{} \u{2192} {}.html",
            comic_header(slug, title),
            slug
        ));
    }

    if !report.unmatched.is_empty() {
        lines.push(String::new());
        lines.push(format!(
            "Skipped {} without an image",
            plural(report.unmatched.len(), "metadata file", "metadata files")
        ));
    }

    lines.push(String::new());
    let mut summary = format!(
        "Generated {}",
        plural(report.comics.len(), "comic page", "comic pages")
    );
    if report.images_copied > 0 {
        summary.push_str(&format!(
            ", copied {}",
            plural(report.images_copied, "image", "images")
        ));
    }
    summary.push_str(&format!(" into {}", report.output_dir.display()));
    lines.push(summary);

    lines
}

/// Print build output to stdout.
pub fn print_build_output(report: &BuildReport) {
    for line in format_build_output(report) {
        println!("{}", line);
    }
}

// ============================================================================
// Tests
// ============================================================================
