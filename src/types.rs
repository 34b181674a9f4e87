//! Shared types produced by discovery and consumed by rendering and output.

use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// A single comic: one metadata file paired with one image.
///
/// Records are rebuilt from disk on every run; nothing is cached between
/// invocations.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComicRecord {
    /// Lowercased stem of the metadata filename (`001-Intro.md` → `001-intro`)
    pub slug: String,
    /// First image in `images/` sharing the metadata file's stem
    pub image_path: PathBuf,
    /// The metadata file this record was parsed from
    pub meta_path: PathBuf,
    /// Body content: converted markdown, or the raw `long` field of a YAML file
    pub html: String,
    /// Normalized metadata fields. Values are always flat strings.
    pub meta: BTreeMap<String, String>,
}

impl ComicRecord {
    /// The record's display title: `meta["title"]` when present, else the slug.
    pub fn title(&self) -> &str {
        self.meta
            .get("title")
            .map(String::as_str)
            .filter(|t| !t.trim().is_empty())
            .unwrap_or(&self.slug)
    }

    /// Output filename of this comic's page, relative to the output directory.
    pub fn page_filename(&self) -> String {
        format!("{}.html", self.slug)
    }
}
