//! Project configuration (`comic.toml`).
//!
//! A comic project is configured by a single TOML file at its root. The
//! reserved `[build]` table controls where things are read from and written
//! to; every other top-level key is a template global, available by name in
//! every template:
//!
//! ```toml
//! SITE_NAME = "Dinosaur Comics"
//! AUTHOR = "Ryan"
//! NAV = ["archive", "about"]
//!
//! [build]
//! comics_dir = "comics"       # contains meta/ and images/
//! templates_dir = "templates"
//! output_dir = "out"
//! copy_images = true          # copy matched images to <output_dir>/images/
//! ```
//!
//! All `[build]` keys are optional and relative to the config file's
//! directory. Unknown keys inside `[build]` are rejected to catch typos
//! early; globals are schema-less.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Default config filename looked up in the working directory.
pub const CONFIG_FILENAME: &str = "comic.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("no configuration file found at {}", .0.display())]
    Missing(PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Everything loaded from `comic.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Directory layout and output options.
    #[serde(default)]
    pub build: BuildConfig,
    /// Every other top-level key: template globals.
    #[serde(flatten)]
    pub globals: BTreeMap<String, toml::Value>,
}

/// The `[build]` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BuildConfig {
    /// Directory holding `meta/` and `images/`.
    pub comics_dir: String,
    /// Directory holding the Tera templates.
    pub templates_dir: String,
    /// Directory rendered pages are written to.
    pub output_dir: String,
    /// Copy each comic's image into `<output_dir>/images/`.
    pub copy_images: bool,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            comics_dir: "comics".to_string(),
            templates_dir: "templates".to_string(),
            output_dir: "out".to_string(),
            copy_images: true,
        }
    }
}

impl SiteConfig {
    /// Validate directory settings.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let dirs = [
            ("build.comics_dir", &self.build.comics_dir),
            ("build.templates_dir", &self.build.templates_dir),
            ("build.output_dir", &self.build.output_dir),
        ];
        for (key, value) in dirs {
            if value.trim().is_empty() {
                return Err(ConfigError::Validation(format!("{key} must not be empty")));
            }
        }
        let output = Path::new(&self.build.output_dir);
        if output == Path::new(&self.build.comics_dir)
            || output == Path::new(&self.build.templates_dir)
        {
            return Err(ConfigError::Validation(
                "build.output_dir must differ from build.comics_dir and build.templates_dir"
                    .into(),
            ));
        }
        Ok(())
    }

    /// Globals as JSON values, ready for the template context.
    ///
    /// TOML datetimes have no JSON counterpart and are passed as their
    /// RFC 3339 text.
    pub fn globals_json(&self) -> serde_json::Map<String, serde_json::Value> {
        self.globals
            .iter()
            .map(|(k, v)| (k.clone(), toml_to_json(v)))
            .collect()
    }
}

fn toml_to_json(value: &toml::Value) -> serde_json::Value {
    use serde_json::Value as Json;
    match value {
        toml::Value::String(s) => Json::String(s.clone()),
        toml::Value::Integer(i) => Json::from(*i),
        toml::Value::Float(f) => Json::from(*f),
        toml::Value::Boolean(b) => Json::Bool(*b),
        toml::Value::Datetime(dt) => Json::String(dt.to_string()),
        toml::Value::Array(items) => Json::Array(items.iter().map(toml_to_json).collect()),
        toml::Value::Table(table) => Json::Object(
            table
                .iter()
                .map(|(k, v)| (k.clone(), toml_to_json(v)))
                .collect(),
        ),
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(SiteConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Parse config text, merging it over the stock defaults and validating.
pub fn parse_config(content: &str) -> Result<SiteConfig, ConfigError> {
    let overlay: toml::Value = toml::from_str(content)?;
    let merged = merge_toml(stock_defaults_value(), overlay);
    let config: SiteConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load the config file at `path`.
///
/// Unlike optional per-directory configs, the project config is required:
/// a missing file is [`ConfigError::Missing`].
pub fn load_config(path: &Path) -> Result<SiteConfig, ConfigError> {
    if !path.is_file() {
        return Err(ConfigError::Missing(path.to_path_buf()));
    }
    let content = fs::read_to_string(path)?;
    let config = parse_config(&content)?;
    debug!(path = %path.display(), globals = config.globals.len(), "loaded config");
    Ok(config)
}

/// The directory paths in the config are relative to.
///
/// `comic.toml` (no parent component) resolves to `.`.
pub fn project_root(config_path: &Path) -> PathBuf {
    config_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns a fully-commented stock `comic.toml`.
///
/// Used by the `gen-config` command and by `create`.
pub fn stock_config_toml() -> &'static str {
    r##"# Comic Configuration
# ===================
# Every top-level key below is a template global: `SITE_NAME` is available
# as {{ SITE_NAME }} in every template. Add as many as you like; strings,
# numbers, booleans, arrays and tables are all allowed.

SITE_NAME = "My Webcomic"

# ---------------------------------------------------------------------------
# Build settings
# ---------------------------------------------------------------------------
# All optional. Paths are relative to this file's directory.
# Unknown keys in this table will cause an error.
[build]
# Holds meta/ (one .md or .yaml file per comic) and images/ (one image per
# comic, named like its metadata file).
comics_dir = "comics"

# Tera templates: index.html, comic.html, and anything they extend/include.
templates_dir = "templates"

# Rendered site: index.html plus one <slug>.html per comic.
output_dir = "out"

# Copy each comic's image into <output_dir>/images/.
copy_images = true
"##
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_build_config() {
        let config = SiteConfig::default();
        assert_eq!(config.build.comics_dir, "comics");
        assert_eq!(config.build.templates_dir, "templates");
        assert_eq!(config.build.output_dir, "out");
        assert!(config.build.copy_images);
        assert!(config.globals.is_empty());
    }

    #[test]
    fn top_level_keys_are_globals() {
        let config = parse_config("SITE_NAME = \"Foo\"\nYEAR = 2014\n").unwrap();
        assert_eq!(config.globals["SITE_NAME"].as_str(), Some("Foo"));
        assert_eq!(config.globals["YEAR"].as_integer(), Some(2014));
        assert!(!config.globals.contains_key("build"));
    }

    #[test]
    fn partial_build_table_keeps_defaults() {
        let config = parse_config("[build]\noutput_dir = \"public\"\n").unwrap();
        assert_eq!(config.build.output_dir, "public");
        assert_eq!(config.build.comics_dir, "comics");
        assert!(config.build.copy_images);
    }

    #[test]
    fn unknown_build_key_rejected() {
        let result = parse_config("[build]\noutput_dri = \"public\"\n");
        assert!(matches!(result, Err(ConfigError::Toml(_))));
    }

    #[test]
    fn empty_config_is_valid() {
        let config = parse_config("").unwrap();
        assert_eq!(config.build, BuildConfig::default());
    }

    #[test]
    fn invalid_toml_is_error() {
        assert!(matches!(
            parse_config("SITE_NAME = "),
            Err(ConfigError::Toml(_))
        ));
    }

    #[test]
    fn validate_empty_dir_rejected() {
        let result = parse_config("[build]\ntemplates_dir = \"\"\n");
        assert!(matches!(result, Err(ConfigError::Validation(msg)) if msg.contains("templates_dir")));
    }

    #[test]
    fn validate_output_overlapping_input_rejected() {
        let result = parse_config("[build]\noutput_dir = \"comics\"\n");
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn load_config_missing_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(CONFIG_FILENAME);
        let result = load_config(&path);
        assert!(matches!(result, Err(ConfigError::Missing(p)) if p == path));
    }

    #[test]
    fn load_config_reads_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(CONFIG_FILENAME);
        fs::write(&path, "SITE_NAME = \"Foo\"\n").unwrap();
        let config = load_config(&path).unwrap();
        assert_eq!(config.globals["SITE_NAME"].as_str(), Some("Foo"));
    }

    #[test]
    fn globals_convert_to_json() {
        let config = parse_config(
            "NAME = \"x\"\nN = 3\nF = 1.5\nOK = true\nLIST = [\"a\", \"b\"]\n[SOCIAL]\ntwitter = \"@x\"\n",
        )
        .unwrap();
        let json = config.globals_json();
        assert_eq!(json["NAME"], serde_json::json!("x"));
        assert_eq!(json["N"], serde_json::json!(3));
        assert_eq!(json["F"], serde_json::json!(1.5));
        assert_eq!(json["OK"], serde_json::json!(true));
        assert_eq!(json["LIST"], serde_json::json!(["a", "b"]));
        assert_eq!(json["SOCIAL"], serde_json::json!({"twitter": "@x"}));
    }

    #[test]
    fn project_root_of_bare_filename_is_cwd() {
        assert_eq!(project_root(Path::new("comic.toml")), PathBuf::from("."));
        assert_eq!(
            project_root(Path::new("site/comic.toml")),
            PathBuf::from("site")
        );
    }

    #[test]
    fn merge_toml_scalar_override() {
        let base: toml::Value = toml::from_str("a = 1\nb = 2").unwrap();
        let overlay: toml::Value = toml::from_str("b = 3").unwrap();
        let merged = merge_toml(base, overlay);
        assert_eq!(merged["a"].as_integer(), Some(1));
        assert_eq!(merged["b"].as_integer(), Some(3));
    }

    #[test]
    fn merge_toml_table_merge() {
        let base: toml::Value = toml::from_str("[build]\nx = 1\ny = 2").unwrap();
        let overlay: toml::Value = toml::from_str("[build]\ny = 5").unwrap();
        let merged = merge_toml(base, overlay);
        assert_eq!(merged["build"]["x"].as_integer(), Some(1));
        assert_eq!(merged["build"]["y"].as_integer(), Some(5));
    }

    #[test]
    fn stock_config_toml_roundtrips_to_defaults() {
        let config = parse_config(stock_config_toml()).unwrap();
        assert_eq!(config.build, BuildConfig::default());
        assert_eq!(config.globals["SITE_NAME"].as_str(), Some("My Webcomic"));
    }
}
