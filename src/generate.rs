//! Static site generation.
//!
//! Turns a project (config + comics + templates) into a static site.
//!
//! ## Generated Pages
//!
//! - **Index page** (`index.html`): rendered from `templates/index.html`
//!   with the globals plus a `comics` list
//! - **Comic pages** (`<slug>.html`): rendered from `templates/comic.html`,
//!   one per discovered comic
//!
//! ## Output Structure
//!
//! ```text
//! out/
//! ├── index.html
//! ├── 001.html
//! ├── 002.html
//! └── images/            # when build.copy_images is on
//!     ├── 001.png
//!     └── 002.jpg
//! ```
//!
//! ## Template Context
//!
//! Comic pages receive:
//!
//! | Key | Value |
//! |-----|-------|
//! | `slug` | the comic's slug |
//! | `url` | `<slug>.html` |
//! | `image` | image path relative to the project root |
//! | `image_url` | `images/<file>`, relative to the output directory |
//! | `html` | body HTML (emit with `\| safe`) |
//! | `meta` | string fields from the metadata header |
//! | `prev`, `next` | neighbouring slugs in slug order, or null |
//!
//! The index receives `comics`, a list of `{slug, url, image, image_url, meta}`.
//!
//! ## All or Nothing
//!
//! Every page is rendered in memory before anything is written. A comic with
//! bad metadata, a missing template, or a template error aborts the build
//! with the output directory untouched (apart from being created).

use crate::config::SiteConfig;
use crate::render::{RenderError, Renderer};
use crate::scan::{self, ScanError};
use crate::types::ComicRecord;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tera::Context;
use thiserror::Error;
use tracing::info;

pub const INDEX_TEMPLATE: &str = "index.html";
pub const COMIC_TEMPLATE: &str = "comic.html";
/// Subdirectory of the output directory that images are copied to.
pub const OUTPUT_IMAGES_DIR: &str = "images";

#[derive(Error, Debug)]
pub enum GenerateError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Scan error: {0}")]
    Scan(#[from] ScanError),
    #[error("{} comic(s) could not be loaded", .0.len())]
    Discovery(Vec<ScanError>),
    #[error(transparent)]
    Render(#[from] RenderError),
}

/// What a build wrote, for reporting.
#[derive(Debug, Default)]
pub struct BuildReport {
    pub output_dir: PathBuf,
    /// `(slug, title)` of every comic page, in slug order.
    pub comics: Vec<(String, String)>,
    /// Metadata files skipped for lack of an image.
    pub unmatched: Vec<PathBuf>,
    pub images_copied: usize,
}

/// One comic as seen by templates.
#[derive(Debug, Serialize)]
struct ComicEntry<'a> {
    slug: &'a str,
    url: String,
    image: String,
    image_url: String,
    meta: &'a BTreeMap<String, String>,
}

impl<'a> ComicEntry<'a> {
    fn new(comic: &'a ComicRecord, project_root: &Path) -> Self {
        Self {
            slug: &comic.slug,
            url: comic.page_filename(),
            image: web_path(
                comic
                    .image_path
                    .strip_prefix(project_root)
                    .unwrap_or(&comic.image_path),
            ),
            image_url: image_url(&comic.image_path),
            meta: &comic.meta,
        }
    }
}

/// Build the site for the project at `project_root`.
pub fn build(project_root: &Path, config: &SiteConfig) -> Result<BuildReport, GenerateError> {
    let comics_root = project_root.join(&config.build.comics_dir);
    let discovery = scan::discover(&comics_root)?;
    if !discovery.is_clean() {
        return Err(GenerateError::Discovery(discovery.errors));
    }

    let renderer = Renderer::new(&project_root.join(&config.build.templates_dir), config)?;
    let output_dir = project_root.join(&config.build.output_dir);
    ensure_output_dir(&output_dir)?;

    let comics = discovery.ordered();
    let pages = render_site(&renderer, &comics, project_root)?;

    for (filename, html) in &pages {
        fs::write(output_dir.join(filename), html)?;
        info!(file = %filename, "generated");
    }

    let images_copied = if config.build.copy_images {
        copy_images(&comics, &output_dir)?
    } else {
        0
    };

    Ok(BuildReport {
        comics: comics
            .iter()
            .map(|c| (c.slug.clone(), c.title().to_string()))
            .collect(),
        unmatched: discovery.unmatched,
        images_copied,
        output_dir,
    })
}

/// Create the output directory if it doesn't exist.
pub fn ensure_output_dir(output_dir: &Path) -> std::io::Result<()> {
    fs::create_dir_all(output_dir)
}

/// Render the index and every comic page. Returns `(filename, html)` pairs,
/// index first.
pub fn render_site(
    renderer: &Renderer,
    comics: &[&ComicRecord],
    project_root: &Path,
) -> Result<Vec<(String, String)>, RenderError> {
    let mut pages = Vec::with_capacity(comics.len() + 1);

    let entries: Vec<ComicEntry> = comics
        .iter()
        .map(|c| ComicEntry::new(c, project_root))
        .collect();
    let mut index_ctx = Context::new();
    index_ctx.insert("comics", &entries);
    pages.push((
        INDEX_TEMPLATE.to_string(),
        renderer.render(INDEX_TEMPLATE, Some(&index_ctx))?,
    ));

    for (i, comic) in comics.iter().enumerate() {
        let prev = i.checked_sub(1).map(|p| comics[p].slug.as_str());
        let next = comics.get(i + 1).map(|c| c.slug.as_str());
        let ctx = comic_context(comic, project_root, prev, next);
        pages.push((
            comic.page_filename(),
            renderer.render(COMIC_TEMPLATE, Some(&ctx))?,
        ));
    }
    Ok(pages)
}

/// The context a comic page renders with.
pub fn comic_context(
    comic: &ComicRecord,
    project_root: &Path,
    prev: Option<&str>,
    next: Option<&str>,
) -> Context {
    let entry = ComicEntry::new(comic, project_root);
    let mut ctx = Context::new();
    ctx.insert("slug", entry.slug);
    ctx.insert("url", &entry.url);
    ctx.insert("image", &entry.image);
    ctx.insert("image_url", &entry.image_url);
    ctx.insert("html", &comic.html);
    ctx.insert("meta", entry.meta);
    ctx.insert("prev", &prev);
    ctx.insert("next", &next);
    ctx
}

/// Copy each comic's image into `<output_dir>/images/`.
fn copy_images(comics: &[&ComicRecord], output_dir: &Path) -> std::io::Result<usize> {
    let images_dir = output_dir.join(OUTPUT_IMAGES_DIR);
    fs::create_dir_all(&images_dir)?;
    let mut copied = 0;
    for comic in comics {
        if let Some(name) = comic.image_path.file_name() {
            fs::copy(&comic.image_path, images_dir.join(name))?;
            copied += 1;
        }
    }
    Ok(copied)
}

/// `images/<file>` as referenced from a generated page.
fn image_url(image_path: &Path) -> String {
    let name = image_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    format!("{OUTPUT_IMAGES_DIR}/{name}")
}

/// A relative path with forward slashes, for use in HTML.
fn web_path(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
