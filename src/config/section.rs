//! `[js]` and `[webassets]` sections.
//!
//! # Example
//!
//! ```toml
//! [js]
//! rootdir = "js"
//! combine = true
//! templates = ["tmpl"]
//! minifier = { backend = "uglifyjs", program = "npx uglifyjs" }
//!
//! [webassets]
//! cachedir = "~/.cache/myapp"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::error::{ConfigDiagnostics, ConfigError, FieldPath};
use crate::minify::{Minifier, OxcFast, OxcThorough, Uglifyjs, YuiCompressor};

/// Available minifier backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MinifierKind {
    None,
    /// oxc, whitespace only.
    Fast,
    /// oxc, compress and mangle.
    Thorough,
    Uglifyjs,
    Yui,
}

/// Backend options in table form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinifierTable {
    pub backend: MinifierKind,
    /// YUI compressor jar file.
    #[serde(default)]
    pub jar: Option<PathBuf>,
    /// Command line of an external backend, split on whitespace.
    #[serde(default)]
    pub program: Option<String>,
    /// Java executable for the YUI compressor.
    #[serde(default)]
    pub java: Option<String>,
}

/// `minifier = "fast"` or `minifier = { backend = "yui", jar = "..." }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MinifierSection {
    Name(MinifierKind),
    Table(MinifierTable),
}

impl MinifierSection {
    pub fn kind(&self) -> MinifierKind {
        match self {
            Self::Name(kind) => *kind,
            Self::Table(table) => table.backend,
        }
    }

    fn table(&self) -> Option<&MinifierTable> {
        match self {
            Self::Name(_) => None,
            Self::Table(table) => Some(table),
        }
    }

    pub fn jar(&self) -> Option<&Path> {
        self.table().and_then(|t| t.jar.as_deref())
    }

    /// Program and leading arguments of an external backend.
    pub fn command(&self) -> Vec<String> {
        match self.table().and_then(|t| t.program.as_deref()) {
            Some(program) => program.split_whitespace().map(str::to_string).collect(),
            None => match self.kind() {
                MinifierKind::Yui => vec!["java".to_string()],
                _ => vec!["uglifyjs".to_string()],
            },
        }
    }

    fn java(&self) -> &str {
        self.table().and_then(|t| t.java.as_deref()).unwrap_or("java")
    }
}

/// `[js]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JsConfig {
    /// Directory containing the scripts.
    pub rootdir: PathBuf,
    /// Minification cache; defaults to `<webassets.cachedir>/js`.
    pub cachedir: Option<PathBuf>,
    /// Remove the cache directory on startup.
    pub purge_cache: bool,
    /// Serve all scripts as one bundle.
    pub combine: bool,
    /// Extensions collected by discovery, without dots: `js` and template
    /// extensions.
    pub extensions: Vec<String>,
    /// Template extensions in priority order, without dots.
    pub templates: Vec<String>,
    pub minifier: Option<MinifierSection>,
    /// External minifier timeout, `0` disables it.
    pub timeout_secs: u64,
    pub url_prefix: String,
    pub combined_url: String,
}

impl Default for JsConfig {
    fn default() -> Self {
        Self {
            rootdir: PathBuf::from("js"),
            cachedir: None,
            purge_cache: true,
            combine: false,
            extensions: vec!["js".to_string()],
            templates: Vec::new(),
            minifier: None,
            timeout_secs: 30,
            url_prefix: "/js/".to_string(),
            combined_url: "/combined.js".to_string(),
        }
    }
}

impl JsConfig {
    pub const ROOTDIR: FieldPath = FieldPath::new("js.rootdir");
    pub const EXTENSIONS: FieldPath = FieldPath::new("js.extensions");
    pub const TEMPLATES: FieldPath = FieldPath::new("js.templates");
    pub const MINIFIER: FieldPath = FieldPath::new("js.minifier");
    pub const URL_PREFIX: FieldPath = FieldPath::new("js.url_prefix");
    pub const COMBINED_URL: FieldPath = FieldPath::new("js.combined_url");

    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }

    pub fn minifier_kind(&self) -> MinifierKind {
        self.minifier.as_ref().map_or(MinifierKind::None, MinifierSection::kind)
    }

    /// Construct the configured backend.
    pub fn build_minifier(&self) -> Result<Minifier, ConfigError> {
        let Some(section) = &self.minifier else {
            return Ok(Minifier::none());
        };
        let minifier = match section.kind() {
            MinifierKind::None => Minifier::none(),
            MinifierKind::Fast => Minifier::new(OxcFast),
            MinifierKind::Thorough => Minifier::new(OxcThorough),
            MinifierKind::Uglifyjs => {
                Minifier::new(Uglifyjs::new(section.command()).with_timeout(self.timeout()))
            }
            MinifierKind::Yui => {
                let jar = section.jar().ok_or_else(|| {
                    ConfigError::Validation("the yui minifier needs a `jar` path".to_string())
                })?;
                Minifier::new(
                    YuiCompressor::new(jar)
                        .with_java(section.java())
                        .with_timeout(self.timeout()),
                )
            }
        };
        Ok(minifier)
    }

    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        if !self.rootdir.is_dir() {
            diag.error_with_hint(
                Self::ROOTDIR,
                format!("directory `{}` does not exist", self.rootdir.display()),
                "create it or point `rootdir` at your scripts",
            );
        }

        if self.extensions.is_empty() {
            diag.error_with_hint(Self::EXTENSIONS, "no extensions configured", "use [\"js\"]");
        }
        for ext in self.extensions.iter().filter(|e| e.is_empty() || e.contains('.')) {
            diag.error(Self::EXTENSIONS, format!("invalid extension `{ext}`, omit the dot"));
        }
        for ext in self.templates.iter().filter(|e| e.is_empty() || e.contains('.')) {
            diag.error(Self::TEMPLATES, format!("invalid extension `{ext}`, omit the dot"));
        }
        // anything else enumerates files that have no url
        for ext in self
            .extensions
            .iter()
            .filter(|e| *e != "js" && !e.contains('.') && !self.templates.contains(e))
        {
            diag.error_with_hint(
                Self::EXTENSIONS,
                format!("`{ext}` files cannot be served as javascript"),
                "list only `js` and template extensions",
            );
        }
        if let Some(ext) = self.templates.iter().find(|t| *t == "js") {
            diag.warn(Self::TEMPLATES, format!("`{ext}` is not a template extension"));
        }

        if !self.url_prefix.starts_with('/') || !self.url_prefix.ends_with('/') {
            diag.error(Self::URL_PREFIX, "must start and end with `/`");
        }
        if !self.combined_url.starts_with('/') {
            diag.error(Self::COMBINED_URL, "must start with `/`");
        }

        if let Some(section) = &self.minifier {
            Self::validate_minifier(section, diag);
        }
    }

    fn validate_minifier(section: &MinifierSection, diag: &mut ConfigDiagnostics) {
        match section.kind() {
            MinifierKind::None | MinifierKind::Fast | MinifierKind::Thorough => {}
            MinifierKind::Uglifyjs => {
                let command = section.command();
                match command.first() {
                    None => diag.error(Self::MINIFIER, "empty `program`"),
                    Some(cmd) if which::which(cmd).is_err() => diag.error_with_hint(
                        Self::MINIFIER,
                        format!("`{cmd}` not found"),
                        "install it with `npm install -g uglify-js`",
                    ),
                    Some(_) => {}
                }
            }
            MinifierKind::Yui => {
                match section.jar() {
                    None => diag.error(Self::MINIFIER, "the yui minifier needs a `jar` path"),
                    Some(jar) if !jar.is_file() => diag.error(
                        Self::MINIFIER,
                        format!("jar file `{}` does not exist", jar.display()),
                    ),
                    Some(_) => {}
                }
                if which::which(section.java()).is_err() {
                    diag.error(Self::MINIFIER, format!("`{}` not found", section.java()));
                }
            }
        }
    }
}

/// `[webassets]` section: settings shared by all asset kinds.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WebassetsConfig {
    /// Shared asset cache directory.
    pub cachedir: Option<PathBuf>,
}
