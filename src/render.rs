//! Template rendering.
//!
//! Pages are rendered with [Tera](https://keats.github.io/tera/) from the
//! project's templates directory. Every file under that directory is loaded
//! once, named by its forward-slash relative path, so templates can
//! `{% extends "base.html" %}` or `{% include "partials/nav.html" %}`.
//!
//! The config globals are the base of every render context. A page context
//! is layered on top, so a page key shadows a global of the same name.
//!
//! Output of `.html` templates is HTML-escaped; mark trusted HTML (a comic's
//! body) with `| safe`. Undefined variables are an error. Use Tera's
//! `default` filter for optional fields: `{{ meta.alt | default(value="") }}`.
//!
//! Rendering never touches the filesystem; creating the output directory is
//! the caller's job (see [`crate::generate::ensure_output_dir`]).

use crate::config::SiteConfig;
use std::path::{Path, PathBuf};
use tera::{Context, Tera};
use thiserror::Error;
use tracing::debug;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("templates directory not found: {}", .0.display())]
    TemplatesDirMissing(PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] walkdir::Error),
    #[error("failed to load templates: {0}")]
    Load(#[source] tera::Error),
    #[error("template not found: {0}")]
    TemplateNotFound(String),
    #[error("failed to render {name}: {source}")]
    Render {
        name: String,
        #[source]
        source: tera::Error,
    },
}

/// Loaded templates plus the global context they render against.
#[derive(Debug)]
pub struct Renderer {
    tera: Tera,
    globals: Context,
}

impl Renderer {
    /// Load every template under `templates_dir` and capture the globals.
    pub fn new(templates_dir: &Path, config: &SiteConfig) -> Result<Self, RenderError> {
        if !templates_dir.is_dir() {
            return Err(RenderError::TemplatesDirMissing(templates_dir.to_path_buf()));
        }

        let files = template_files(templates_dir)?;
        debug!(count = files.len(), dir = %templates_dir.display(), "loading templates");

        let mut tera = Tera::default();
        tera.set_escape_fn(escape_html);
        tera.add_template_files(files.iter().map(|(path, name)| (path, Some(name))))
            .map_err(RenderError::Load)?;

        let mut globals = Context::new();
        for (key, value) in config.globals_json() {
            globals.insert(key, &value);
        }

        Ok(Self { tera, globals })
    }

    /// Whether a template with this name was loaded.
    pub fn has_template(&self, name: &str) -> bool {
        self.tera.get_template_names().any(|n| n == name)
    }

    /// Render `name` with the globals, overlaid by `context` if given.
    pub fn render(&self, name: &str, context: Option<&Context>) -> Result<String, RenderError> {
        if !self.has_template(name) {
            return Err(RenderError::TemplateNotFound(name.to_string()));
        }

        let mut ctx = self.globals.clone();
        if let Some(page) = context {
            ctx.extend(page.clone());
        }

        self.tera
            .render(name, &ctx)
            .map_err(|source| RenderError::Render {
                name: name.to_string(),
                source,
            })
    }
}

/// HTML escaping for autoescaped templates. Unlike Tera's default, `/` is
/// left alone so paths and URLs stay readable in the output.
fn escape_html(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// `(path, template name)` for every file under `dir`, sorted by name.
fn template_files(dir: &Path) -> Result<Vec<(PathBuf, String)>, RenderError> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).follow_links(true) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(rel) = entry.path().strip_prefix(dir) else {
            continue;
        };
        if rel
            .components()
            .any(|c| c.as_os_str().to_string_lossy().starts_with('.'))
        {
            continue;
        }
        let name = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        files.push((entry.path().to_path_buf(), name));
    }
    files.sort_by(|a, b| a.1.cmp(&b.1));
    Ok(files)
}
