//! Javascript minification backends.
//!
//! Every strategy implements [`MinifierBackend`]. The configured backend is
//! wrapped in a [`Minifier`], which is built once at startup and shared
//! read-only by the cache and the bundler; neither of them ever inspects
//! which backend is active.
//!
//! | backend        | speed    | output   | license comments |
//! |----------------|----------|----------|------------------|
//! | `Passthrough`  | -        | verbatim | kept             |
//! | `OxcFast`      | fast     | moderate | dropped          |
//! | `OxcThorough`  | slower   | smallest | kept             |
//! | `Uglifyjs`     | moderate | good     | kept (node.js)   |
//! | `YuiCompressor`| fast     | moderate | kept (java)      |

mod embedded;
mod external;

pub use embedded::{OxcFast, OxcThorough};
pub use external::{LICENSE_COMMENTS, Uglifyjs, YuiCompressor};

use std::fs;
use std::path::Path;
use std::sync::Arc;

use crate::asset::AssetPath;
use crate::error::AssetError;

/// A minification strategy.
pub trait MinifierBackend: Send + Sync {
    /// Short name for log lines and error messages.
    fn name(&self) -> &str;

    /// Minify `content`. `path` identifies the asset for diagnostics only.
    fn minify_string(&self, content: &str, path: Option<&AssetPath>)
    -> Result<String, AssetError>;

    /// Minify the file at `file`.
    ///
    /// Returns the minified content, or `None` when it was written to
    /// `outfile` instead.
    fn minify_file(&self, file: &Path, outfile: Option<&Path>) -> Result<Option<String>, AssetError> {
        let content = fs::read_to_string(file).map_err(|e| AssetError::io(file, e))?;
        let minified = self.minify_string(&content, None)?;
        write_or_return(minified, outfile)
    }
}

/// Write `content` to `outfile` if given, otherwise hand it back.
pub(crate) fn write_or_return(
    content: String,
    outfile: Option<&Path>,
) -> Result<Option<String>, AssetError> {
    match outfile {
        Some(out) => {
            fs::write(out, content).map_err(|e| AssetError::io(out, e))?;
            Ok(None)
        }
        None => Ok(Some(content)),
    }
}

/// No-op backend: content passes through unmodified.
#[derive(Debug, Default, Clone, Copy)]
pub struct Passthrough;

impl MinifierBackend for Passthrough {
    fn name(&self) -> &str {
        "passthrough"
    }

    fn minify_string(&self, content: &str, _: Option<&AssetPath>) -> Result<String, AssetError> {
        Ok(content.to_string())
    }
}

/// The configured minifier: zero or one backend.
///
/// Cheap to clone; all clones share the same backend.
#[derive(Clone, Default)]
pub struct Minifier {
    backend: Option<Arc<dyn MinifierBackend>>,
}

impl Minifier {
    /// No minification.
    pub fn none() -> Self {
        Self { backend: None }
    }

    pub fn new(backend: impl MinifierBackend + 'static) -> Self {
        Self {
            backend: Some(Arc::new(backend)),
        }
    }

    pub fn from_arc(backend: Arc<dyn MinifierBackend>) -> Self {
        Self {
            backend: Some(backend),
        }
    }

    /// Whether content is minified at all.
    pub fn is_enabled(&self) -> bool {
        self.backend.is_some()
    }

    pub fn name(&self) -> &str {
        self.backend.as_deref().map_or("none", |b| b.name())
    }

    /// Apply the backend, or return `content` unchanged when none is set.
    pub fn apply(&self, content: &str, path: Option<&AssetPath>) -> Result<String, AssetError> {
        match &self.backend {
            Some(backend) => backend.minify_string(content, path),
            None => Ok(content.to_string()),
        }
    }

    /// File variant of [`Minifier::apply`].
    pub fn apply_file(&self, file: &Path, outfile: Option<&Path>) -> Result<Option<String>, AssetError> {
        match &self.backend {
            Some(backend) => backend.minify_file(file, outfile),
            None => {
                let content = fs::read_to_string(file).map_err(|e| AssetError::io(file, e))?;
                write_or_return(content, outfile)
            }
        }
    }
}

impl std::fmt::Debug for Minifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Minifier").field("backend", &self.name()).finish()
    }
}
