//! Shared test utilities for the comic test suite.
//!
//! Provides project builders and lookup helpers that work with discovery
//! results (`Discovery`, `ComicRecord`).
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = TempDir::new().unwrap();
//! write_meta(tmp.path(), "001.md", "title: First\n\n# Hello");
//! write_image(tmp.path(), "001.png");
//!
//! let discovery = discover(&comics_root(tmp.path())).unwrap();
//! assert_eq!(find_comic(&discovery, "001").meta["title"], "First");
//! ```

use std::path::{Path, PathBuf};
use tempfile::TempDir;

use crate::scan::{Discovery, IMAGES_DIR, META_DIR};
use crate::types::ComicRecord;

// =========================================================================
// Fixture setup
// =========================================================================

/// Copy `fixtures/site/` to a temp directory and return it.
///
/// Tests get an isolated copy they can mutate without affecting other tests
/// or the source fixtures.
pub fn setup_fixtures() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let fixtures = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/site");
    copy_dir_recursive(&fixtures, tmp.path()).unwrap();
    tmp
}

fn copy_dir_recursive(src: &Path, dst: &Path) -> std::io::Result<()> {
    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());

        if src_path.is_dir() {
            std::fs::create_dir_all(&dst_path)?;
            copy_dir_recursive(&src_path, &dst_path)?;
        } else {
            std::fs::copy(&src_path, &dst_path)?;
        }
    }
    Ok(())
}

/// `<project>/comics`
pub fn comics_root(project: &Path) -> PathBuf {
    project.join("comics")
}

/// Write a metadata file into `<project>/comics/meta/`.
pub fn write_meta(project: &Path, name: &str, content: &str) -> PathBuf {
    write_into(&comics_root(project).join(META_DIR), name, content)
}

/// Write a placeholder image into `<project>/comics/images/`.
///
/// Discovery only looks at names, so the bytes don't matter.
pub fn write_image(project: &Path, name: &str) -> PathBuf {
    write_into(&comics_root(project).join(IMAGES_DIR), name, "fake image")
}

/// Write a template into `<project>/templates/`.
pub fn write_template(project: &Path, name: &str, content: &str) -> PathBuf {
    write_into(&project.join("templates"), name, content)
}

fn write_into(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, content).unwrap();
    path
}

// =========================================================================
// Discovery lookups (panic with a clear message on miss)
// =========================================================================

/// Find a comic by slug. Panics if not found.
pub fn find_comic<'a>(discovery: &'a Discovery, slug: &str) -> &'a ComicRecord {
    discovery.comics.get(slug).unwrap_or_else(|| {
        let slugs = slugs(discovery);
        panic!("comic '{slug}' not found. Available: {slugs:?}")
    })
}

/// All slugs in discovery order.
pub fn slugs(discovery: &Discovery) -> Vec<&str> {
    discovery.comics.keys().map(String::as_str).collect()
}

/// A record's metadata as sorted `(key, value)` pairs.
pub fn meta_pairs(comic: &ComicRecord) -> Vec<(&str, &str)> {
    comic
        .meta
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect()
}
