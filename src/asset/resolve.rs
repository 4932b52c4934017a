//! Mapping between url paths, asset paths and content sources.
//!
//! ```text
//! url path   "app.js"         what the browser requests
//! asset path "app.js.tmpl"    what exists (virtual or on disk)
//! source     Real { file: <root>/app.js.tmpl, engine: Some("tmpl") }
//! ```

use std::path::Path;

use super::scan::{ScanOptions, scan_paths};
use super::{AssetPath, AssetSource, Templates, VirtualAssets};
use crate::debug;
use crate::error::AssetError;

/// Borrowed view over everything needed to resolve paths.
#[derive(Debug, Clone, Copy)]
pub struct PathResolver<'a> {
    root: &'a Path,
    extensions: &'a [String],
    templates: &'a Templates,
    virtuals: &'a VirtualAssets,
}

impl<'a> PathResolver<'a> {
    pub fn new(
        root: &'a Path,
        extensions: &'a [String],
        templates: &'a Templates,
        virtuals: &'a VirtualAssets,
    ) -> Self {
        Self {
            root,
            extensions,
            templates,
            virtuals,
        }
    }

    pub fn root(&self) -> &'a Path {
        self.root
    }

    pub fn virtuals(&self) -> &'a VirtualAssets {
        self.virtuals
    }

    /// Find the asset serving `urlpath`.
    ///
    /// Lookup order: virtual registry, plain file, then `<urlpath>.<ext>`
    /// for each template extension in priority order.
    pub fn urlpath_to_path(&self, urlpath: &str) -> Result<AssetPath, AssetError> {
        if !urlpath.ends_with(".js") {
            return Err(AssetError::unresolved(urlpath, "not a javascript url"));
        }
        let path = AssetPath::new(urlpath)?;
        if self.virtuals.contains(path.as_str()) || path.to_file(self.root).is_file() {
            return Ok(path);
        }

        let mut found = self
            .templates
            .extensions()
            .map(|ext| format!("{urlpath}.{ext}"))
            .filter(|candidate| self.root.join(candidate).is_file());
        let Some(first) = found.next() else {
            return Err(AssetError::unresolved(urlpath, "no matching file"));
        };
        if let Some(other) = found.next() {
            debug!("resolve"; "{} matches several templates, using {} over {}", urlpath, first, other);
        }
        AssetPath::new(first)
    }

    /// The url path an asset is served under: the path minus its template
    /// extension. Pure string transformation, identity for `.js` paths.
    pub fn path_to_urlpath(&self, path: &AssetPath) -> Result<String, AssetError> {
        if path.is_js() {
            return Ok(path.as_str().to_string());
        }
        match path.as_str().rsplit_once('.') {
            Some((urlpath, _)) if urlpath.ends_with(".js") => Ok(urlpath.to_string()),
            _ => Err(AssetError::unresolved(
                path.as_str(),
                "template does not produce javascript",
            )),
        }
    }

    /// Where the content of `path` comes from.
    pub fn source(&self, path: &AssetPath) -> Result<AssetSource, AssetError> {
        if self.virtuals.contains(path.as_str()) {
            return Ok(AssetSource::Virtual);
        }
        let file = path.to_file(self.root);
        if !file.is_file() {
            return Err(AssetError::not_found(path.as_str()));
        }
        let engine = match path.extension() {
            Some(ext) if !path.is_js() && self.templates.is_registered(ext) => Some(ext.to_string()),
            _ => None,
        };
        Ok(AssetSource::Real { file, engine })
    }

    /// All asset paths, see [`scan_paths`] for ordering.
    pub fn enumerate_paths(&self, include_hidden: bool) -> Vec<AssetPath> {
        let options = ScanOptions {
            extensions: self.extensions,
            templates: self.templates,
            include_hidden,
        };
        scan_paths(self.root, self.virtuals, &options)
    }
}
