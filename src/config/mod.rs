//! Configuration management for `jsasset.toml`.
//!
//! # Module Structure
//!
//! ```text
//! config/
//! ├── error.rs    # ConfigError, ConfigDiagnostics, FieldPath
//! ├── section.rs  # [js] and [webassets]
//! └── mod.rs      # Config (this file)
//! ```
//!
//! # Sections
//!
//! | Section       | Purpose                                          |
//! |---------------|--------------------------------------------------|
//! | `[js]`        | Script root, cache, minifier, bundling, urls     |
//! | `[webassets]` | Settings shared by all asset kinds (cache root)  |

mod error;
mod section;

pub use error::{ConfigDiagnostic, ConfigDiagnostics, ConfigError, FieldPath};
pub use section::{JsConfig, MinifierKind, MinifierSection, MinifierTable, WebassetsConfig};

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::{debug, log};

/// Default config file name, searched upward from the working directory.
pub const CONFIG_FILE: &str = "jsasset.toml";

/// Root configuration structure representing `jsasset.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Absolute path to the config file, empty when running on defaults
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Directory relative paths are resolved against
    #[serde(skip)]
    pub root: PathBuf,

    #[serde(default)]
    pub js: JsConfig,

    #[serde(default)]
    pub webassets: WebassetsConfig,
}

impl Config {
    /// Load, normalize and validate the configuration.
    ///
    /// With an explicit `path` the file must exist. Otherwise
    /// [`CONFIG_FILE`] is searched upward from the working directory, and
    /// defaults rooted at the working directory are used if none is found.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to get current working directory")?;

        let (mut config, config_path) = match path {
            Some(path) => (Self::from_path(path)?, path.to_path_buf()),
            None => match find_config_file(&cwd, Path::new(CONFIG_FILE)) {
                Some(found) => (Self::from_path(&found)?, found),
                None => {
                    debug!("config"; "no {} found, using defaults", CONFIG_FILE);
                    (Self::default(), PathBuf::new())
                }
            },
        };

        let root = config_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map_or(cwd, Path::to_path_buf);
        if !config_path.as_os_str().is_empty() {
            config.config_path = normalize_path(&config_path);
        }
        config.normalize(&root);
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from TOML string
    pub fn from_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(ConfigError::Toml)?;
        Ok(config)
    }

    /// Load configuration from file path with unknown field detection.
    fn from_path(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;

        let (config, ignored) = Self::parse_with_ignored(&content)?;
        if !ignored.is_empty() {
            Self::print_unknown_fields_warning(&ignored, path);
        }
        Ok(config)
    }

    /// Parse TOML content, collecting any unknown fields.
    fn parse_with_ignored(content: &str) -> Result<(Self, Vec<String>)> {
        let mut ignored = Vec::new();
        let deserializer = toml::Deserializer::new(content);
        let config = serde_ignored::deserialize(deserializer, |path: serde_ignored::Path| {
            ignored.push(path.to_string());
        })
        .map_err(ConfigError::Toml)?;
        Ok((config, ignored))
    }

    fn print_unknown_fields_warning(fields: &[String], path: &Path) {
        let display_path = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_else(|| path.to_string_lossy());
        log!("warning"; "unknown fields in {}, ignoring:", display_path);
        for field in fields {
            eprintln!("- {}", field);
        }
    }

    // ========================================================================
    // path normalization
    // ========================================================================

    /// Resolve all paths against `root`, expanding `~`.
    fn normalize(&mut self, root: &Path) {
        self.root = normalize_path(root);
        let root = self.root.clone();

        self.js.rootdir = resolve(&root, &self.js.rootdir);
        self.webassets.cachedir = self.webassets.cachedir.take().map(|p| resolve(&root, &p));
        self.js.cachedir = match self.js.cachedir.take() {
            Some(dir) => Some(resolve(&root, &dir)),
            None => self.webassets.cachedir.as_ref().map(|dir| dir.join("js")),
        };
        if let Some(MinifierSection::Table(table)) = &mut self.js.minifier
            && let Some(jar) = table.jar.take()
        {
            table.jar = Some(resolve(&root, &jar));
        }
    }

    // ========================================================================
    // validation
    // ========================================================================

    /// Validate configuration, collecting all errors and returning them at once.
    pub fn validate(&self) -> Result<()> {
        let mut diag = ConfigDiagnostics::new();
        self.js.validate(&mut diag);
        diag.print_warnings();
        diag.into_result()
            .map_err(|e| ConfigError::Diagnostics(e).into())
    }
}

/// Find config file by searching upward from `start`.
fn find_config_file(start: &Path, config_name: &Path) -> Option<PathBuf> {
    if config_name.is_absolute() {
        return config_name.exists().then(|| config_name.to_path_buf());
    }
    start
        .ancestors()
        .map(|dir| dir.join(config_name))
        .find(|candidate| candidate.exists())
}

/// Expand `~` and make `path` absolute relative to `root`.
fn resolve(root: &Path, path: &Path) -> PathBuf {
    let expanded = shellexpand::tilde(&path.to_string_lossy()).into_owned();
    let path = PathBuf::from(expanded);
    let full_path = if path.is_relative() { root.join(&path) } else { path };
    normalize_path(&full_path)
}

/// Canonicalize when the path exists, otherwise make it absolute.
fn normalize_path(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir().map_or_else(|_| path.to_path_buf(), |cwd| cwd.join(path))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_from_str_invalid_toml() {
        assert!(Config::from_str("[js\nrootdir = \"js\"").is_err());
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.config_path, PathBuf::new());
        assert_eq!(config.js.url_prefix, "/js/");
        assert!(config.webassets.cachedir.is_none());
    }

    #[test]
    fn test_parse_with_ignored() {
        let (config, ignored) =
            Config::parse_with_ignored("[js]\ncombine = true\ncombined = true\n[other]\nx = 1").unwrap();
        assert!(config.js.combine);
        assert_eq!(ignored, vec!["js.combined", "other"]);
    }

    #[test]
    fn test_normalize_paths() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("scripts")).unwrap();
        let mut config = Config::from_str(
            "[js]\nrootdir = \"scripts\"\n[webassets]\ncachedir = \"cache\"",
        )
        .unwrap();
        config.normalize(dir.path());

        let root = normalize_path(dir.path());
        assert_eq!(config.js.rootdir, root.join("scripts"));
        assert_eq!(config.js.cachedir, Some(root.join("cache").join("js")));
    }

    #[test]
    fn test_explicit_cachedir_wins() {
        let dir = TempDir::new().unwrap();
        let mut config = Config::from_str(
            "[js]\ncachedir = \"mine\"\n[webassets]\ncachedir = \"shared\"",
        )
        .unwrap();
        config.normalize(dir.path());
        assert_eq!(config.js.cachedir, Some(normalize_path(dir.path()).join("mine")));
    }

    #[test]
    fn test_no_cachedir_by_default() {
        let dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.normalize(dir.path());
        assert_eq!(config.js.cachedir, None);
    }

    #[test]
    fn test_jar_resolved_against_root() {
        let dir = TempDir::new().unwrap();
        let mut config =
            Config::from_str("[js]\nminifier = { backend = \"yui\", jar = \"lib/yui.jar\" }").unwrap();
        config.normalize(dir.path());
        let jar = config.js.minifier.as_ref().and_then(MinifierSection::jar).unwrap();
        assert_eq!(jar, normalize_path(dir.path()).join("lib/yui.jar"));
    }

    #[test]
    fn test_load_explicit_file() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("js")).unwrap();
        let path = dir.path().join("site.toml");
        fs::write(&path, "[js]\ncombine = true\nminifier = \"fast\"").unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert!(config.js.combine);
        assert_eq!(config.root, normalize_path(dir.path()));
        assert_eq!(config.js.rootdir, normalize_path(&dir.path().join("js")));
    }

    #[test]
    fn test_load_reports_diagnostics() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("jsasset.toml");
        fs::write(&path, "[js]\nrootdir = \"missing\"\nextensions = []").unwrap();

        let err = Config::load(Some(&path)).unwrap_err();
        let err = err.downcast::<ConfigError>().unwrap();
        match err {
            ConfigError::Diagnostics(diag) => assert_eq!(diag.len(), 2),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_find_config_file_upward() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("a/b");
        fs::create_dir_all(&nested).unwrap();
        fs::write(dir.path().join(CONFIG_FILE), "").unwrap();
        assert_eq!(
            find_config_file(&nested, Path::new(CONFIG_FILE)),
            Some(dir.path().join(CONFIG_FILE))
        );
        assert_eq!(find_config_file(&nested, Path::new("absent.toml")), None);
    }
}
