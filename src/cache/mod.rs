//! On-disk cache of minified script contents.
//!
//! Layout mirrors the root directory: the minified form of `<root>/lib/a.js`
//! lives at `<cachedir>/lib/a.js`. An entry is valid while it is strictly
//! newer than its source (see [`crate::freshness::is_newer_than`]).

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::asset::{AssetPath, read_source};
use crate::error::AssetError;
use crate::freshness::is_newer_than;
use crate::minify::Minifier;
use crate::{debug, log};

/// Minify-and-cache layer shared by single-file and bundle rendering.
#[derive(Debug, Clone)]
pub struct MinificationCache {
    rootdir: PathBuf,
    cachedir: Option<PathBuf>,
    minifier: Minifier,
}

impl MinificationCache {
    pub fn new(rootdir: impl Into<PathBuf>, cachedir: Option<PathBuf>, minifier: Minifier) -> Self {
        Self {
            rootdir: rootdir.into(),
            cachedir,
            minifier,
        }
    }

    pub fn minifier(&self) -> &Minifier {
        &self.minifier
    }

    pub fn cachedir(&self) -> Option<&Path> {
        self.cachedir.as_deref()
    }

    /// Cache location of `path`, when caching is enabled.
    pub fn cache_file(&self, path: &AssetPath) -> Option<PathBuf> {
        self.cachedir.as_ref().map(|dir| path.to_file(dir))
    }

    /// The cached content of `path`, if a valid entry exists.
    pub fn lookup(&self, path: &AssetPath) -> Option<String> {
        let cachefile = self.cache_file(path)?;
        if !is_newer_than(&cachefile, &path.to_file(&self.rootdir)) {
            return None;
        }
        match fs::read_to_string(&cachefile) {
            Ok(content) => {
                debug!("cache"; "hit {}", path);
                Some(content)
            }
            Err(e) => {
                debug!("cache"; "unreadable entry {}: {}", cachefile.display(), e);
                None
            }
        }
    }

    /// Minify `raw`, consulting and updating the cache when `path` is given.
    pub fn convert(&self, path: Option<&AssetPath>, raw: &str) -> Result<String, AssetError> {
        if let Some(hit) = path.and_then(|p| self.lookup(p)) {
            return Ok(hit);
        }
        self.refresh(path, raw)
    }

    /// Minify `raw` unconditionally and store the result for `path`.
    pub(crate) fn refresh(&self, path: Option<&AssetPath>, raw: &str) -> Result<String, AssetError> {
        let content = self.minifier.apply(raw, path)?;
        if let Some(cachefile) = path.and_then(|p| self.cache_file(p)) {
            if let Err(e) = write_atomic(&cachefile, &content) {
                log!("warning"; "could not write cache entry: {}", e);
            }
        }
        Ok(content)
    }

    /// Content of the pre-minified sidecar (`name.min.js`) of a plain
    /// javascript asset. Only consulted when minification is enabled.
    pub fn sidecar(&self, path: &AssetPath) -> Option<String> {
        if !self.minifier.is_enabled() {
            return None;
        }
        let file = sidecar_path(&path.to_file(&self.rootdir))?;
        if !file.is_file() {
            return None;
        }
        match read_source(&file) {
            Ok(content) => {
                debug!("cache"; "using {}", file.display());
                Some(content)
            }
            Err(e) => {
                log!("warning"; "{}", e);
                None
            }
        }
    }

    /// Remove all cache entries.
    pub fn purge(&self) -> Result<(), AssetError> {
        let Some(dir) = &self.cachedir else {
            return Ok(());
        };
        if dir.exists() {
            fs::remove_dir_all(dir).map_err(|e| AssetError::io(dir, e))?;
            log!("cache"; "purged {}", dir.display());
        }
        Ok(())
    }
}

/// `<dir>/name.js` -> `<dir>/name.min.js`. `None` for non-`.js` files.
pub fn sidecar_path(file: &Path) -> Option<PathBuf> {
    let name = file.file_name()?.to_str()?;
    let stem = name.strip_suffix(".js")?;
    Some(file.with_file_name(format!("{stem}.min.js")))
}

/// Write via a temp file in the target directory, then rename into place.
/// Readers never observe a partially written entry.
fn write_atomic(target: &Path, content: &str) -> Result<(), AssetError> {
    let dir = target
        .parent()
        .ok_or_else(|| AssetError::io(target, std::io::ErrorKind::InvalidInput.into()))?;
    fs::create_dir_all(dir).map_err(|e| AssetError::io(dir, e))?;

    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| AssetError::io(dir, e))?;
    tmp.write_all(content.as_bytes())
        .map_err(|e| AssetError::io(tmp.path(), e))?;
    tmp.persist(target)
        .map_err(|e| AssetError::io(target, e.error))?;
    Ok(())
}
