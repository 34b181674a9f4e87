//! Comic discovery.
//!
//! Finds every comic under a comics root, pairs each metadata file with its
//! image, and parses the metadata into [`ComicRecord`]s.
//!
//! ## Directory Structure
//!
//! ```text
//! comics/
//! ├── meta/
//! │   ├── 001.md               # markdown with optional header
//! │   ├── 002.yaml             # structured: `long` + `date`
//! │   └── 003.md               # no 003.* image yet → skipped
//! └── images/
//!     ├── 001.png
//!     └── 002.jpg
//! ```
//!
//! ## Pipeline
//!
//! 1. [`list_meta_files`]: metadata files in lexicographic order
//! 2. [`ImageIndex::build`]: images grouped by stem, read once
//! 3. [`pair_with_images`]: drops metadata without an image. Partially
//!    published comics stay invisible until both files exist; this is not
//!    an error.
//! 4. Parse every pair (in parallel, pure per file)
//! 5. [`collect_records`]: key by slug in path order. A repeated slug is
//!    reported and the first record kept; a [reserved](RESERVED_SLUGS) slug
//!    is reported and dropped.
//!
//! A malformed metadata file fails only its own comic: discovery carries on
//! and returns every error alongside the comics that did parse.

use crate::metadata::{self, MetaFormat, MetadataError};
use crate::naming;
use crate::types::ComicRecord;
use rayon::prelude::*;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

/// Metadata subdirectory of the comics root.
pub const META_DIR: &str = "meta";
/// Image subdirectory of the comics root.
pub const IMAGES_DIR: &str = "images";
/// Slugs whose page would overwrite another generated file.
pub const RESERVED_SLUGS: &[&str] = &["index"];

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Cannot read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Malformed metadata in {}: {source}", .path.display())]
    Malformed {
        path: PathBuf,
        source: MetadataError,
    },
    #[error("Duplicate slug `{slug}`: {} conflicts with {}", .path.display(), .existing.display())]
    DuplicateSlug {
        slug: String,
        path: PathBuf,
        existing: PathBuf,
    },
    #[error("Not a metadata file: {}", .0.display())]
    NotMetadata(PathBuf),
    #[error("Reserved slug `{slug}` in {}: its page would replace the archive page", .path.display())]
    ReservedSlug { slug: String, path: PathBuf },
}

/// Result of a discovery pass.
#[derive(Debug, Default, Serialize)]
pub struct Discovery {
    /// Comics keyed by slug, in slug order.
    pub comics: BTreeMap<String, ComicRecord>,
    /// Metadata files skipped because no image matches them.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub unmatched: Vec<PathBuf>,
    /// Per-comic failures. Never serialized; reported by the caller.
    #[serde(skip)]
    pub errors: Vec<ScanError>,
}

impl Discovery {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    /// Comics in slug order.
    pub fn ordered(&self) -> Vec<&ComicRecord> {
        self.comics.values().collect()
    }
}

/// A metadata file and the image it was matched with.
#[derive(Debug, Clone, PartialEq)]
pub struct Pair {
    pub meta_path: PathBuf,
    pub image_path: PathBuf,
}

/// Output of the image-matching filter.
#[derive(Debug, Default, PartialEq)]
pub struct Pairing {
    pub paired: Vec<Pair>,
    pub unmatched: Vec<PathBuf>,
}

/// Images in a directory grouped by exact file stem.
#[derive(Debug, Default)]
pub struct ImageIndex {
    by_stem: BTreeMap<String, Vec<PathBuf>>,
}

impl ImageIndex {
    /// Index the image files directly inside `images_dir`.
    ///
    /// A missing directory yields an empty index.
    pub fn build(images_dir: &Path) -> Result<Self, ScanError> {
        let mut index = Self::default();
        for path in list_files(images_dir)? {
            if !naming::has_image_extension(&path) {
                continue;
            }
            if let Some(stem) = naming::file_stem(&path) {
                index.by_stem.entry(stem).or_default().push(path);
            }
        }
        // Entries were pushed in sorted order; each list is already sorted.
        Ok(index)
    }

    /// First image (lexicographic) whose stem equals `stem`.
    pub fn lookup(&self, stem: &str) -> Option<&Path> {
        self.by_stem
            .get(stem)
            .and_then(|paths| paths.first())
            .map(PathBuf::as_path)
    }

    pub fn len(&self) -> usize {
        self.by_stem.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_stem.is_empty()
    }
}

/// Discover all comics under `comics_root`.
///
/// Only failing to list the directories is fatal; everything that goes
/// wrong with an individual comic ends up in [`Discovery::errors`].
pub fn discover(comics_root: &Path) -> Result<Discovery, ScanError> {
    let meta_files = list_meta_files(&comics_root.join(META_DIR))?;
    let index = ImageIndex::build(&comics_root.join(IMAGES_DIR))?;
    debug!(
        meta_files = meta_files.len(),
        images = index.len(),
        root = %comics_root.display(),
        "scanning comics"
    );

    let Pairing { paired, unmatched } = pair_with_images(meta_files, &index);
    for path in &unmatched {
        debug!(path = %path.display(), "no matching image, skipping");
    }

    let parsed: Vec<Result<ComicRecord, ScanError>> =
        paired.par_iter().map(build_record).collect();
    let (comics, errors) = collect_records(parsed);

    Ok(Discovery {
        comics,
        unmatched,
        errors,
    })
}

/// Metadata files directly inside `meta_dir`, sorted by path.
///
/// Only files with a metadata extension count. A missing directory yields
/// no files.
pub fn list_meta_files(meta_dir: &Path) -> Result<Vec<PathBuf>, ScanError> {
    Ok(list_files(meta_dir)?
        .into_iter()
        .filter(|p| MetaFormat::from_path(p).is_some())
        .collect())
}

/// Split metadata files into those with a matching image and those without.
pub fn pair_with_images(meta_files: Vec<PathBuf>, index: &ImageIndex) -> Pairing {
    let mut pairing = Pairing::default();
    for meta_path in meta_files {
        let image = naming::file_stem(&meta_path).and_then(|stem| index.lookup(&stem));
        match image {
            Some(image) => pairing.paired.push(Pair {
                image_path: image.to_path_buf(),
                meta_path,
            }),
            None => pairing.unmatched.push(meta_path),
        }
    }
    pairing
}

/// Read and parse one paired metadata file.
pub fn build_record(pair: &Pair) -> Result<ComicRecord, ScanError> {
    let path = &pair.meta_path;
    let format =
        MetaFormat::from_path(path).ok_or_else(|| ScanError::NotMetadata(path.clone()))?;
    let slug = naming::slugify(path).ok_or_else(|| ScanError::NotMetadata(path.clone()))?;
    let raw = fs::read_to_string(path).map_err(|source| ScanError::Read {
        path: path.clone(),
        source,
    })?;
    let parsed = metadata::parse(format, &raw).map_err(|source| ScanError::Malformed {
        path: path.clone(),
        source,
    })?;

    Ok(ComicRecord {
        slug,
        image_path: pair.image_path.clone(),
        meta_path: path.clone(),
        html: parsed.html,
        meta: parsed.meta,
    })
}

/// Key records by slug, keeping the first of any duplicate and rejecting
/// reserved slugs.
///
/// `results` must be in metadata path order so "first" is deterministic.
pub fn collect_records(
    results: Vec<Result<ComicRecord, ScanError>>,
) -> (BTreeMap<String, ComicRecord>, Vec<ScanError>) {
    let mut comics: BTreeMap<String, ComicRecord> = BTreeMap::new();
    let mut errors = Vec::new();

    for result in results {
        match result {
            Ok(record) if RESERVED_SLUGS.contains(&record.slug.as_str()) => {
                warn!(slug = %record.slug, path = %record.meta_path.display(), "reserved slug");
                errors.push(ScanError::ReservedSlug {
                    slug: record.slug,
                    path: record.meta_path,
                });
            }
            Ok(record) => {
                if let Some(existing) = comics.get(&record.slug) {
                    warn!(slug = %record.slug, path = %record.meta_path.display(), "duplicate slug");
                    errors.push(ScanError::DuplicateSlug {
                        slug: record.slug.clone(),
                        path: record.meta_path.clone(),
                        existing: existing.meta_path.clone(),
                    });
                } else {
                    comics.insert(record.slug.clone(), record);
                }
            }
            Err(e) => errors.push(e),
        }
    }
    (comics, errors)
}

/// Regular, non-hidden files directly inside `dir`, sorted.
fn list_files(dir: &Path) -> Result<Vec<PathBuf>, ScanError> {
    if !dir.is_dir() {
        debug!(dir = %dir.display(), "directory missing, nothing to scan");
        return Ok(Vec::new());
    }
    regular_files(fs::read_dir(dir)?.map(|entry| entry.map(|e| e.path())))
}

/// Keep regular, non-hidden files, sorted. The first unreadable entry fails
/// the whole listing.
fn regular_files(
    entries: impl IntoIterator<Item = std::io::Result<PathBuf>>,
) -> Result<Vec<PathBuf>, ScanError> {
    let mut files = Vec::new();
    for entry in entries {
        let path = entry?;
        if path.is_file() && !naming::is_hidden(&path) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;
    use tempfile::TempDir;

    // =========================================================================
    // End-to-end discovery
    // =========================================================================

    #[test]
    fn markdown_comic_discovered() {
        let tmp = TempDir::new().unwrap();
        write_meta(tmp.path(), "001.md", "title: First\n\n# Hello\n");
        write_image(tmp.path(), "001.png");

        let discovery = discover(&comics_root(tmp.path())).unwrap();
        assert!(discovery.is_clean());
        assert_eq!(slugs(&discovery), vec!["001"]);

        let comic = find_comic(&discovery, "001");
        assert!(comic.image_path.ends_with("001.png"));
        assert_eq!(meta_pairs(comic), vec![("title", "First")]);
        assert!(comic.html.contains("<h1>Hello</h1>"));
    }

    #[test]
    fn comic_without_image_is_excluded() {
        let tmp = TempDir::new().unwrap();
        write_meta(tmp.path(), "001.md", "title: First\n");
        write_image(tmp.path(), "001.png");
        write_meta(tmp.path(), "002.md", "title: Pending\n");

        let discovery = discover(&comics_root(tmp.path())).unwrap();
        assert_eq!(slugs(&discovery), vec!["001"]);
        assert_eq!(discovery.unmatched.len(), 1);
        assert!(discovery.unmatched[0].ends_with("002.md"));
        assert!(discovery.is_clean());
    }

    #[test]
    fn image_without_metadata_is_ignored() {
        let tmp = TempDir::new().unwrap();
        write_image(tmp.path(), "005.png");
        let discovery = discover(&comics_root(tmp.path())).unwrap();
        assert!(discovery.comics.is_empty());
        assert!(discovery.unmatched.is_empty());
    }

    #[test]
    fn slug_is_lowercased_stem() {
        let tmp = TempDir::new().unwrap();
        write_meta(tmp.path(), "Chapter-One.md", "title: One\n");
        write_image(tmp.path(), "Chapter-One.jpg");

        let discovery = discover(&comics_root(tmp.path())).unwrap();
        assert_eq!(slugs(&discovery), vec!["chapter-one"]);
    }

    #[test]
    fn yaml_comic_discovered() {
        let tmp = TempDir::new().unwrap();
        write_meta(
            tmp.path(),
            "002.yaml",
            "title: Second\ndate: 2014/02/01\nlong: <p>Body</p>\n",
        );
        write_image(tmp.path(), "002.gif");

        let discovery = discover(&comics_root(tmp.path())).unwrap();
        let comic = find_comic(&discovery, "002");
        assert_eq!(comic.html, "<p>Body</p>");
        assert_eq!(
            meta_pairs(comic),
            vec![("date", "2014-02-01"), ("title", "Second")]
        );
    }

    #[test]
    fn first_matching_image_wins() {
        let tmp = TempDir::new().unwrap();
        write_meta(tmp.path(), "001.md", "title: First\n");
        write_image(tmp.path(), "001.png");
        write_image(tmp.path(), "001.gif");
        write_image(tmp.path(), "001.jpg");

        let discovery = discover(&comics_root(tmp.path())).unwrap();
        assert!(find_comic(&discovery, "001").image_path.ends_with("001.gif"));
    }

    #[test]
    fn image_stem_must_match_exactly() {
        let tmp = TempDir::new().unwrap();
        write_meta(tmp.path(), "001.md", "title: First\n");
        write_image(tmp.path(), "0010.png");
        write_image(tmp.path(), "001-alt.png");

        let discovery = discover(&comics_root(tmp.path())).unwrap();
        assert!(discovery.comics.is_empty());
        assert_eq!(discovery.unmatched.len(), 1);
    }

    #[test]
    fn non_image_files_do_not_match() {
        let tmp = TempDir::new().unwrap();
        write_meta(tmp.path(), "001.md", "title: First\n");
        write_image(tmp.path(), "001.txt");

        let discovery = discover(&comics_root(tmp.path())).unwrap();
        assert!(discovery.comics.is_empty());
    }

    #[test]
    fn unsupported_meta_files_ignored() {
        let tmp = TempDir::new().unwrap();
        write_meta(tmp.path(), "001.txt", "title: First\n");
        write_meta(tmp.path(), ".002.md", "title: Hidden\n");
        write_image(tmp.path(), "001.png");
        write_image(tmp.path(), ".002.png");

        let discovery = discover(&comics_root(tmp.path())).unwrap();
        assert!(discovery.comics.is_empty());
        assert!(discovery.unmatched.is_empty());
    }

    #[test]
    fn missing_directories_yield_nothing() {
        let tmp = TempDir::new().unwrap();
        let discovery = discover(&comics_root(tmp.path())).unwrap();
        assert!(discovery.comics.is_empty());
        assert!(discovery.is_clean());
    }

    // =========================================================================
    // Error isolation
    // =========================================================================

    #[test]
    fn malformed_comic_does_not_abort_others() {
        let tmp = TempDir::new().unwrap();
        write_meta(tmp.path(), "001.md", "title: First\n");
        write_image(tmp.path(), "001.png");
        write_meta(tmp.path(), "002.yaml", "title: No date\nlong: x\n");
        write_image(tmp.path(), "002.png");
        write_meta(tmp.path(), "003.md", "title: Third\n");
        write_image(tmp.path(), "003.png");

        let discovery = discover(&comics_root(tmp.path())).unwrap();
        assert_eq!(slugs(&discovery), vec!["001", "003"]);
        assert_eq!(discovery.errors.len(), 1);
        match &discovery.errors[0] {
            ScanError::Malformed { path, source } => {
                assert!(path.ends_with("002.yaml"));
                assert!(matches!(source, MetadataError::MissingField("date")));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn malformed_error_message_names_file() {
        let tmp = TempDir::new().unwrap();
        write_meta(tmp.path(), "009.yaml", "date: whenever\nlong: x\n");
        write_image(tmp.path(), "009.png");

        let discovery = discover(&comics_root(tmp.path())).unwrap();
        let message = discovery.errors[0].to_string();
        assert!(message.contains("009.yaml"), "{message}");
        assert!(message.contains("whenever"), "{message}");
    }

    #[test]
    fn duplicate_slug_reported_and_first_kept() {
        let tmp = TempDir::new().unwrap();
        write_meta(tmp.path(), "001.md", "title: Markdown\n");
        write_meta(
            tmp.path(),
            "001.yaml",
            "title: Yaml\ndate: 2014-01-01\nlong: x\n",
        );
        write_image(tmp.path(), "001.png");

        let discovery = discover(&comics_root(tmp.path())).unwrap();
        assert_eq!(find_comic(&discovery, "001").meta["title"], "Markdown");
        assert!(matches!(
            &discovery.errors[..],
            [ScanError::DuplicateSlug { slug, .. }] if slug == "001"
        ));
    }

    #[test]
    fn index_slug_is_reserved() {
        let tmp = TempDir::new().unwrap();
        write_meta(tmp.path(), "001.md", "title: First\n");
        write_image(tmp.path(), "001.png");
        write_meta(tmp.path(), "Index.md", "title: Not the archive\n");
        write_image(tmp.path(), "Index.png");

        let discovery = discover(&comics_root(tmp.path())).unwrap();
        assert_eq!(slugs(&discovery), vec!["001"]);
        match &discovery.errors[..] {
            [ScanError::ReservedSlug { slug, path }] => {
                assert_eq!(slug, "index");
                assert!(path.ends_with("Index.md"));
            }
            other => panic!("unexpected errors: {other:?}"),
        }
    }

    // =========================================================================
    // Pipeline steps
    // =========================================================================

    #[test]
    fn unreadable_dir_entry_fails_listing() {
        let tmp = TempDir::new().unwrap();
        let good = write_meta(tmp.path(), "001.md", "x");
        let entries = vec![
            Ok(good),
            Err(std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied")),
        ];
        assert!(matches!(regular_files(entries), Err(ScanError::Io(_))));
    }

    #[test]
    fn regular_files_skips_dirs_and_hidden() {
        let tmp = TempDir::new().unwrap();
        let b = write_meta(tmp.path(), "b.md", "x");
        let a = write_meta(tmp.path(), "a.md", "x");
        let hidden = write_meta(tmp.path(), ".c.md", "x");
        let dir = comics_root(tmp.path());

        let files = regular_files([Ok(b.clone()), Ok(hidden), Ok(dir), Ok(a.clone())]).unwrap();
        assert_eq!(files, vec![a, b]);
    }

    #[test]
    fn pair_with_images_splits_matched_and_unmatched() {
        let tmp = TempDir::new().unwrap();
        write_image(tmp.path(), "001.png");
        let index = ImageIndex::build(&comics_root(tmp.path()).join(IMAGES_DIR)).unwrap();

        let pairing = pair_with_images(
            vec![PathBuf::from("meta/001.md"), PathBuf::from("meta/002.md")],
            &index,
        );
        assert_eq!(pairing.paired.len(), 1);
        assert_eq!(pairing.paired[0].meta_path, PathBuf::from("meta/001.md"));
        assert!(pairing.paired[0].image_path.ends_with("001.png"));
        assert_eq!(pairing.unmatched, vec![PathBuf::from("meta/002.md")]);
    }

    #[test]
    fn list_meta_files_sorted() {
        let tmp = TempDir::new().unwrap();
        write_meta(tmp.path(), "b.md", "");
        write_meta(tmp.path(), "a.yml", "");
        write_meta(tmp.path(), "c.markdown", "");

        let files = list_meta_files(&comics_root(tmp.path()).join(META_DIR)).unwrap();
        let names: Vec<String> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.yml", "b.md", "c.markdown"]);
    }

    #[test]
    fn image_index_lookup() {
        let tmp = TempDir::new().unwrap();
        write_image(tmp.path(), "001.png");
        write_image(tmp.path(), "002.webp");
        let index = ImageIndex::build(&comics_root(tmp.path()).join(IMAGES_DIR)).unwrap();
        assert_eq!(index.len(), 2);
        assert!(index.lookup("002").unwrap().ends_with("002.webp"));
        assert!(index.lookup("003").is_none());
    }

    // =========================================================================
    // Properties
    // =========================================================================

    #[test]
    fn discovery_is_idempotent() {
        let tmp = setup_fixtures();
        let root = comics_root(tmp.path());
        let first = discover(&root).unwrap();
        let second = discover(&root).unwrap();
        assert_eq!(first.comics, second.comics);
        assert_eq!(first.unmatched, second.unmatched);
    }

    #[test]
    fn every_record_has_an_image() {
        let tmp = setup_fixtures();
        let discovery = discover(&comics_root(tmp.path())).unwrap();
        assert!(!discovery.comics.is_empty());
        for comic in discovery.comics.values() {
            assert!(comic.image_path.is_file(), "{}", comic.slug);
        }
    }

    #[test]
    fn fixture_comics() {
        let tmp = setup_fixtures();
        let discovery = discover(&comics_root(tmp.path())).unwrap();
        assert!(discovery.is_clean());
        assert_eq!(slugs(&discovery), vec!["001", "002", "003"]);
        assert_eq!(discovery.unmatched.len(), 1);

        let second = find_comic(&discovery, "002");
        assert_eq!(second.meta["tags"], "dinosaurs office");
        let third = find_comic(&discovery, "003");
        assert!(!third.meta.contains_key("long"));
        assert_eq!(third.meta["date"], "2014-03-09T18:30:00");
    }
}
