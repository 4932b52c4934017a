//! Hashers for single assets and the combined bundle.

use super::{Hasher, VersionManager};
use crate::asset::{AssetPath, PathResolver, RenderContext};

/// Builds the lazily evaluated hashers a [`VersionManager`] consumes.
///
/// Real files hash their contents through the manager; virtual assets use
/// the registry's own hash hook with the request context.
#[derive(Clone, Copy)]
pub struct VersionHasher<'a> {
    resolver: PathResolver<'a>,
    versions: &'a dyn VersionManager,
    ctx: &'a RenderContext,
}

impl<'a> VersionHasher<'a> {
    pub fn new(resolver: PathResolver<'a>, versions: &'a dyn VersionManager, ctx: &'a RenderContext) -> Self {
        Self {
            resolver,
            versions,
            ctx,
        }
    }

    fn virtual_hasher(&self, path: &AssetPath) -> Hasher<'a> {
        let virtuals = self.resolver.virtuals();
        let ctx = self.ctx;
        let path = path.clone();
        Box::new(move || virtuals.hash(path.as_str(), ctx))
    }

    /// Hashers for one asset.
    pub fn hashers(&self, path: &AssetPath) -> Vec<Hasher<'a>> {
        if self.resolver.virtuals().contains(path.as_str()) {
            vec![self.virtual_hasher(path)]
        } else {
            vec![self.versions.create_file_hasher(vec![path.to_file(self.resolver.root())])]
        }
    }

    /// Hashers for a bundle of `paths`: one over all real files, in order,
    /// followed by one per virtual path.
    pub fn combined_hashers(&self, paths: &[AssetPath]) -> Vec<Hasher<'a>> {
        let virtuals = self.resolver.virtuals();
        let (virtual_paths, real_paths): (Vec<&AssetPath>, Vec<&AssetPath>) =
            paths.iter().partition(|p| virtuals.contains(p.as_str()));

        let mut hashers = Vec::with_capacity(virtual_paths.len() + 1);
        if !real_paths.is_empty() {
            let files = real_paths
                .iter()
                .map(|p| p.to_file(self.resolver.root()))
                .collect();
            hashers.push(self.versions.create_file_hasher(files));
        }
        hashers.extend(virtual_paths.into_iter().map(|p| self.virtual_hasher(p)));
        hashers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::{Templates, VirtualAssets};
    use crate::version::AssetVersions;
    use anyhow::Result;
    use std::fs;
    use tempfile::TempDir;

    fn run(hashers: &[Hasher<'_>]) -> Vec<String> {
        hashers.iter().map(|h| h().unwrap()).collect()
    }

    #[test]
    fn test_single_and_combined_hashers() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.js"), "A").unwrap();
        fs::write(dir.path().join("b.js"), "B").unwrap();

        let mut virtuals = VirtualAssets::new();
        virtuals
            .register("user.js", |ctx: &RenderContext| -> Result<String> {
                Ok(ctx.user().unwrap_or_default().to_string())
            })
            .unwrap();
        virtuals
            .register_hashed("static.js", |_: &RenderContext| Ok("S".into()), |_: &RenderContext| {
                Ok("fixed".into())
            })
            .unwrap();

        let extensions = vec!["js".to_string()];
        let templates = Templates::new();
        let resolver = PathResolver::new(dir.path(), &extensions, &templates, &virtuals);
        let versions = AssetVersions::new();
        let ctx = RenderContext::new().with_user("dave");
        let hasher = VersionHasher::new(resolver, &versions, &ctx);

        let a = AssetPath::new("a.js").unwrap();
        assert_eq!(run(&hasher.hashers(&a)).len(), 1);

        let paths = resolver.enumerate_paths(false);
        let combined = run(&hasher.combined_hashers(&paths));
        // one file hasher plus one per virtual path, each with its own hash
        assert_eq!(combined.len(), 3);
        assert_eq!(combined[1], virtuals.hash("user.js", &ctx).unwrap());
        assert_eq!(combined[2], "fixed");
    }

    #[test]
    fn test_combined_hash_changes_with_any_file() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.js"), "A").unwrap();
        fs::write(dir.path().join("b.js"), "B").unwrap();

        let virtuals = VirtualAssets::new();
        let extensions = vec!["js".to_string()];
        let templates = Templates::new();
        let resolver = PathResolver::new(dir.path(), &extensions, &templates, &virtuals);
        let versions = AssetVersions::new();
        let ctx = RenderContext::default();
        let hasher = VersionHasher::new(resolver, &versions, &ctx);
        let paths = resolver.enumerate_paths(false);

        let before = run(&hasher.combined_hashers(&paths));
        fs::write(dir.path().join("b.js"), "B2").unwrap();
        crate::freshness::clear_cache();
        let after = run(&hasher.combined_hashers(&paths));
        assert_ne!(before, after);
    }
}
