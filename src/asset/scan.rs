//! Asset discovery: virtual paths plus a walk of the root directory.

use std::fs;
use std::path::{Component, Path};

use jwalk::WalkDir;

use super::{AssetPath, Templates, VirtualAssets};
use crate::log;

/// Loaded before anything else when present.
const EARLY_ASSETS: [&str; 2] = ["require.js", "globals.js"];

/// Inputs that decide which files are assets.
#[derive(Debug, Clone, Copy)]
pub struct ScanOptions<'a> {
    pub extensions: &'a [String],
    pub templates: &'a Templates,
    pub include_hidden: bool,
}

/// The url-facing name of `file_name`, if the file is an asset.
///
/// Only files whose extension is in `extensions` are assets. When that
/// extension is also a registered template extension, the url-facing name
/// is the stem (`app.js.tmpl` -> `app.js`). Pre-minified `*.min.*`
/// sidecars never are assets.
pub(crate) fn served_name<'n>(file_name: &'n str, options: &ScanOptions<'_>) -> Option<&'n str> {
    let (stem, ext) = file_name.rsplit_once('.')?;
    if !options.extensions.iter().any(|e| e == ext) {
        return None;
    }
    let served = if options.templates.is_registered(ext) {
        stem
    } else {
        file_name
    };
    let (served_stem, _) = served.rsplit_once('.')?;
    if served_stem.ends_with(".min") || served_stem.is_empty() {
        return None;
    }
    Some(served)
}

fn relative_path(file: &Path, root: &Path) -> Option<String> {
    let rel = file.strip_prefix(root).ok()?;
    let mut parts = Vec::new();
    for component in rel.components() {
        match component {
            Component::Normal(part) => parts.push(part.to_str()?),
            _ => return None,
        }
    }
    Some(parts.join("/"))
}

/// Enumerate all asset paths.
///
/// Order: virtual paths in registration order, then real files in a
/// deterministic depth-first walk (entries sorted by name), with
/// `require.js` and then `globals.js` moved to the very front. Unreadable
/// entries are logged and skipped.
pub fn scan_paths(root: &Path, virtuals: &VirtualAssets, options: &ScanOptions<'_>) -> Vec<AssetPath> {
    let mut early: [Vec<AssetPath>; 2] = [Vec::new(), Vec::new()];
    let mut paths: Vec<AssetPath> = virtuals
        .paths()
        .filter(|p| options.include_hidden || !p.is_hidden())
        .cloned()
        .collect();

    if !root.is_dir() {
        return paths;
    }

    let walker = WalkDir::new(root)
        .follow_links(true)
        .skip_hidden(false)
        .sort(true);

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                log!("warning"; "skipping unreadable path: {}", e);
                continue;
            }
        };
        let file_type = entry.file_type();
        // links are followed, so a remaining symlink is dangling
        if file_type.is_symlink() {
            log!("warning"; "skipping unreadable file {}", entry.path().display());
            continue;
        }
        if !file_type.is_file() {
            continue;
        }

        let file_name = entry.file_name().to_string_lossy();
        let Some(served) = served_name(&file_name, options) else {
            continue;
        };
        if !options.include_hidden && served.starts_with('_') {
            continue;
        }

        let file = entry.path();
        if let Err(e) = fs::metadata(&file) {
            log!("warning"; "skipping unreadable file {}: {}", file.display(), e);
            continue;
        }
        let Some(rel) = relative_path(&file, root) else {
            log!("warning"; "skipping non UTF-8 path {}", file.display());
            continue;
        };
        if virtuals.contains(&rel) {
            continue;
        }
        let Ok(path) = AssetPath::new(rel) else {
            continue;
        };

        match EARLY_ASSETS.iter().position(|name| *name == served) {
            Some(slot) => early[slot].push(path),
            None => paths.push(path),
        }
    }

    let [mut front, globals] = early;
    front.extend(globals);
    front.extend(paths);
    front
}
