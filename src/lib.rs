//! # Comic
//!
//! A static site generator for webcomics. Each comic is a metadata file plus
//! an image with the same name; templates turn them into an archive page and
//! one page per comic.
//!
//! # Architecture: Discover, Render, Write
//!
//! ```text
//! 1. Discover  comics/meta + comics/images  →  Discovery   (slug → ComicRecord)
//! 2. Render    Discovery + templates/       →  pages in memory
//! 3. Write     pages (+ images)             →  out/
//! ```
//!
//! Discovery never aborts on a single bad comic: per-comic failures are
//! collected next to the records, so `comic check` can show all of them at
//! once. `comic build` refuses to write anything while any are present.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`scan`] | Lists metadata files, pairs them with images, builds the slug map |
//! | [`metadata`] | Parses one metadata file: Markdown with a header, or YAML |
//! | [`naming`] | Slugs and file-name classification |
//! | [`types`] | `ComicRecord`, the normalized comic |
//! | [`render`] | Tera templates plus the config globals |
//! | [`generate`] | Renders the index and comic pages and writes the site |
//! | [`config`] | `comic.toml` loading, defaults, validation |
//! | [`scaffold`] | Creates a new project for `comic create` |
//! | [`output`] | CLI output formatting for `check` and `build` |
//!
//! # Metadata Formats
//!
//! The format is picked by extension.
//!
//! **Markdown** (`.md`, `.markdown`): a header of `key: value` lines, then a
//! blank line, then the Markdown body. Indented lines continue the previous
//! value. The header may instead be fenced by `---` lines, in which case it
//! is YAML and lists are allowed:
//!
//! ```text
//! ---
//! title: At the Office
//! tags: [dinosaurs, office]
//! ---
//! Body text.
//! ```
//!
//! **YAML** (`.yaml`, `.yml`): a mapping with a required `long` field (HTML,
//! used as the body) and a required `date`, normalized to ISO 8601.
//!
//! In both formats every value is flattened to a string; lists are joined
//! with spaces.
//!
//! # Slugs and Ordering
//!
//! A comic's slug is its metadata file stem, lowercased. Pages are ordered by
//! slug, so zero-padded numbers (`001`, `002`, ...) give chronological order.
//! A metadata file with no image of the same stem is skipped, not an error.

pub mod config;
pub mod generate;
pub mod metadata;
pub mod naming;
pub mod output;
pub mod render;
pub mod scaffold;
pub mod scan;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
