//! Combined bundle assembly.
//!
//! All non-hidden assets are concatenated in enumeration order, separated
//! by a blank line. Without a minifier each part is preceded by a banner
//! naming its path:
//!
//! ```text
//! /****************************************************************************/
//! /*                                 lib/a.js                                 */
//! /****************************************************************************/
//! ```

use anyhow::{Context, Result};

use crate::asset::{AssetPath, PathResolver};
use crate::debug;
use crate::minify::Minifier;

/// Inner width of a banner line.
pub const BANNER_WIDTH: usize = 76;

/// The three-line banner for `path`, centered in [`BANNER_WIDTH`] columns.
pub fn banner(path: &AssetPath) -> String {
    let stars = "*".repeat(BANNER_WIDTH);
    format!("/*{stars}*/\n/*{:^width$}*/\n/*{stars}*/", path.as_str(), width = BANNER_WIDTH)
}

/// Concatenates the outputs of a caller-supplied render function.
#[derive(Debug, Clone, Copy)]
pub struct BundleAssembler<'a> {
    resolver: PathResolver<'a>,
    minifier: &'a Minifier,
}

impl<'a> BundleAssembler<'a> {
    pub fn new(resolver: PathResolver<'a>, minifier: &'a Minifier) -> Self {
        Self { resolver, minifier }
    }

    /// Paths that make up the bundle.
    pub fn paths(&self) -> Vec<AssetPath> {
        self.resolver.enumerate_paths(false)
    }

    /// Render every bundle path and join the parts.
    ///
    /// Banners are emitted only when no minifier is configured. The first
    /// render failure aborts the whole bundle.
    pub fn render_combined<F>(&self, mut render: F) -> Result<String>
    where
        F: FnMut(&AssetPath) -> Result<String>,
    {
        let banners = !self.minifier.is_enabled();
        let paths = self.paths();
        debug!("bundle"; "combining {} scripts", paths.len());

        let mut parts = Vec::with_capacity(paths.len() * 2);
        for path in &paths {
            if banners {
                parts.push(banner(path));
            }
            let content = render(path).with_context(|| format!("while bundling {path}"))?;
            parts.push(content);
        }
        Ok(parts.join("\n\n"))
    }
}
