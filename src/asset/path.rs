//! Logical asset paths and their storage form.

use std::borrow::Borrow;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::AssetError;

/// Suffix of pre-minified sidecar files; never an asset of its own.
pub const MINIFIED_SUFFIX: &str = ".min.js";

/// A root-relative, slash-separated, case-sensitive script identifier.
///
/// Construction rejects absolute paths, `.`/`..`/empty segments and
/// pre-minified `.min.js` names, so every `AssetPath` is a valid lookup key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AssetPath(String);

impl AssetPath {
    pub fn new(path: impl Into<String>) -> Result<Self, AssetError> {
        let path = path.into();
        if path.is_empty() {
            return Err(AssetError::unresolved(path, "empty path"));
        }
        if path.starts_with('/') || path.contains('\\') || Path::new(&path).is_absolute() {
            return Err(AssetError::unresolved(path, "asset paths are root-relative"));
        }
        if path
            .split('/')
            .any(|seg| seg.is_empty() || seg == "." || seg == "..")
        {
            return Err(AssetError::unresolved(path, "invalid path segment"));
        }
        if path.ends_with(MINIFIED_SUFFIX) {
            return Err(AssetError::unresolved(
                path,
                "pre-minified files are not addressable",
            ));
        }
        Ok(Self(path))
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Last path segment.
    pub fn file_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// Hidden assets have a basename starting with `_`.
    pub fn is_hidden(&self) -> bool {
        self.file_name().starts_with('_')
    }

    /// Extension after the last `.` of the basename.
    pub fn extension(&self) -> Option<&str> {
        let name = self.file_name();
        name.rfind('.').map(|i| &name[i + 1..]).filter(|e| !e.is_empty())
    }

    /// Whether this path names a plain javascript file (no template extension).
    pub fn is_js(&self) -> bool {
        self.0.ends_with(".js")
    }

    /// Location of the path under `root`.
    pub fn to_file(&self, root: &Path) -> PathBuf {
        root.join(&self.0)
    }
}

impl fmt::Display for AssetPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for AssetPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for AssetPath {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for AssetPath {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for AssetPath {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Where the content of an asset comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetSource {
    /// Generated by the virtual asset registry at render time.
    Virtual,
    /// A file under the root directory.
    Real {
        file: PathBuf,
        /// Template engine extension, `None` for plain javascript.
        engine: Option<String>,
    },
}

impl AssetSource {
    pub fn is_virtual(&self) -> bool {
        matches!(self, Self::Virtual)
    }

    /// Plain on-disk javascript: eligible for the sidecar shortcut.
    pub fn is_plain_file(&self) -> bool {
        matches!(self, Self::Real { engine: None, .. })
    }
}
