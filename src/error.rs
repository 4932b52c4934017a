//! Asset pipeline error types.

use std::path::PathBuf;
use std::process::ExitStatus;
use std::time::Duration;

use thiserror::Error;

/// Errors raised while resolving, minifying or caching script assets.
#[derive(Debug, Error)]
pub enum AssetError {
    /// Neither a virtual asset nor a real file exists for the path.
    #[error("asset not found: js/{path}")]
    AssetNotFound { path: String },

    /// The url path is malformed or no template source matches it.
    #[error("could not determine path for url `{urlpath}`: {reason}")]
    UnresolvedPath { urlpath: String, reason: String },

    /// The minifier rejected the input (non-zero exit or parse error).
    #[error("minifier `{program}` failed with {status}\n{stderr}")]
    BackendFailure {
        program: String,
        status: String,
        stderr: String,
    },

    /// The external minifier did not finish in time and was killed.
    #[error("minifier `{program}` timed out after {}s", .after.as_secs())]
    Timeout { program: String, after: Duration },

    #[error("IO error on `{}`", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A template engine or virtual asset failed to produce content.
    #[error("failed to render `{path}`: {message}")]
    Render { path: String, message: String },
}

impl AssetError {
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::AssetNotFound { path: path.into() }
    }

    pub fn unresolved(urlpath: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::UnresolvedPath {
            urlpath: urlpath.into(),
            reason: reason.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn backend(program: &str, status: ExitStatus, stderr: &[u8]) -> Self {
        Self::BackendFailure {
            program: program.to_string(),
            status: status.to_string(),
            stderr: String::from_utf8_lossy(stderr).trim().to_string(),
        }
    }

    /// Short variant name, used as the `type` field of serialized errors.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::AssetNotFound { .. } => "AssetNotFound",
            Self::UnresolvedPath { .. } => "UnresolvedPath",
            Self::BackendFailure { .. } => "BackendFailure",
            Self::Timeout { .. } => "Timeout",
            Self::Io { .. } => "Io",
            Self::Render { .. } => "Render",
        }
    }

    /// Whether the boundary should answer with "not found".
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::AssetNotFound { .. })
    }
}
