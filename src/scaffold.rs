//! Project scaffolding for `comic create`.
//!
//! Lays out a new project that `comic build` can render straight away:
//!
//! ```text
//! <name>/
//! ├── comic.toml
//! ├── comics/
//! │   ├── meta/
//! │   └── images/
//! └── templates/
//!     ├── base.html
//!     ├── index.html
//!     └── comic.html
//! ```
//!
//! The directory name is the lowercased project name. An existing directory
//! is never touched.

use crate::config::{CONFIG_FILENAME, stock_config_toml};
use crate::scan::{IMAGES_DIR, META_DIR};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum ScaffoldError {
    #[error("invalid project name {0:?}: must be non-empty and contain no path separators or `..`")]
    InvalidName(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Outcome of [`create`].
#[derive(Debug, Clone, PartialEq)]
pub struct Scaffold {
    pub root: PathBuf,
    /// False when the directory already existed and was left alone.
    pub created: bool,
}

const BASE_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <title>{% block title %}{{ SITE_NAME }}{% endblock title %}</title>
</head>
<body>
  <header><a href="index.html">{{ SITE_NAME }}</a></header>
  <main>
{% block content %}{% endblock content %}
  </main>
</body>
</html>
"#;

const INDEX_TEMPLATE: &str = r#"{% extends "base.html" %}
{% block content %}
{% if comics %}
<ul class="archive">
{% for comic in comics %}
  <li><a href="{{ comic.url }}">{{ comic.meta.title | default(value=comic.slug) }}</a></li>
{% endfor %}
</ul>
{% else %}
<p>No comics yet.</p>
{% endif %}
{% endblock content %}
"#;

const COMIC_TEMPLATE: &str = r#"{% extends "base.html" %}
{% block title %}{{ meta.title | default(value=slug) }} - {{ SITE_NAME }}{% endblock title %}
{% block content %}
<article>
  <h1>{{ meta.title | default(value=slug) }}</h1>
  <img src="{{ image_url }}" alt="{{ meta.alt | default(value='') }}">
  {{ html | safe }}
  <nav>
    {% if prev %}<a rel="prev" href="{{ prev }}.html">Previous</a>{% endif %}
    {% if next %}<a rel="next" href="{{ next }}.html">Next</a>{% endif %}
  </nav>
</article>
{% endblock content %}
"#;

/// Starter templates written by [`create`], as `(file name, content)`.
pub const STARTER_TEMPLATES: &[(&str, &str)] = &[
    ("base.html", BASE_TEMPLATE),
    ("index.html", INDEX_TEMPLATE),
    ("comic.html", COMIC_TEMPLATE),
];

/// Create a project named `name` under `parent`.
pub fn create(parent: &Path, name: &str) -> Result<Scaffold, ScaffoldError> {
    validate_name(name)?;
    let root = parent.join(name.trim().to_lowercase());

    if root.exists() {
        debug!(dir = %root.display(), "project directory exists, leaving it alone");
        return Ok(Scaffold {
            root,
            created: false,
        });
    }

    let comics = root.join("comics");
    fs::create_dir_all(comics.join(META_DIR))?;
    fs::create_dir_all(comics.join(IMAGES_DIR))?;

    let templates = root.join("templates");
    fs::create_dir_all(&templates)?;
    for (file, content) in STARTER_TEMPLATES {
        fs::write(templates.join(file), content)?;
    }

    fs::write(root.join(CONFIG_FILENAME), project_config(name.trim()))?;

    info!(dir = %root.display(), "created project");
    Ok(Scaffold {
        root,
        created: true,
    })
}

fn validate_name(name: &str) -> Result<(), ScaffoldError> {
    let trimmed = name.trim();
    let invalid = trimmed.is_empty()
        || trimmed == "."
        || trimmed.contains("..")
        || trimmed.contains(['/', '\\']);
    if invalid {
        return Err(ScaffoldError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// The stock config with `SITE_NAME` set to `name`.
fn project_config(name: &str) -> String {
    let quoted = toml::Value::String(name.to_string()).to_string();
    stock_config_toml().replacen(
        "SITE_NAME = \"My Webcomic\"",
        &format!("SITE_NAME = {quoted}"),
        1,
    )
}
