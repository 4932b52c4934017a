//! Virtual assets: scripts generated at request time.
//!
//! A virtual asset has no file on disk. It is registered under a logical
//! path, shadows any real file with the same path, and is listed before all
//! real files in registration order.

use std::sync::Arc;

use anyhow::Result;
use rustc_hash::FxHashMap;

use super::{AssetPath, RenderContext};
use crate::error::AssetError;
use crate::freshness::ContentHash;

/// A generated script.
pub trait VirtualAsset: Send + Sync {
    fn render(&self, ctx: &RenderContext) -> Result<String>;

    /// Version identity of the current content. Defaults to a hash of the
    /// rendered output; override when a cheaper identity exists.
    fn hash(&self, ctx: &RenderContext) -> Result<String> {
        let content = self.render(ctx)?;
        Ok(ContentHash::of(content.as_bytes()).to_hex())
    }
}

impl<F> VirtualAsset for F
where
    F: Fn(&RenderContext) -> Result<String> + Send + Sync,
{
    fn render(&self, ctx: &RenderContext) -> Result<String> {
        self(ctx)
    }
}

/// A virtual asset with a separately supplied hash function.
pub struct HashedAsset<R, H> {
    render: R,
    hash: H,
}

impl<R, H> HashedAsset<R, H>
where
    R: Fn(&RenderContext) -> Result<String> + Send + Sync,
    H: Fn(&RenderContext) -> Result<String> + Send + Sync,
{
    pub fn new(render: R, hash: H) -> Self {
        Self { render, hash }
    }
}

impl<R, H> VirtualAsset for HashedAsset<R, H>
where
    R: Fn(&RenderContext) -> Result<String> + Send + Sync,
    H: Fn(&RenderContext) -> Result<String> + Send + Sync,
{
    fn render(&self, ctx: &RenderContext) -> Result<String> {
        (self.render)(ctx)
    }

    fn hash(&self, ctx: &RenderContext) -> Result<String> {
        (self.hash)(ctx)
    }
}

/// Registry of virtual assets, in registration order.
#[derive(Clone, Default)]
pub struct VirtualAssets {
    entries: Vec<(AssetPath, Arc<dyn VirtualAsset>)>,
    index: FxHashMap<AssetPath, usize>,
}

impl VirtualAssets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `asset` under `path`.
    ///
    /// The path must be a valid `.js` asset path. Registering an existing
    /// path replaces the asset and keeps its position.
    pub fn register(&mut self, path: &str, asset: impl VirtualAsset + 'static) -> Result<(), AssetError> {
        let path = AssetPath::new(path)?;
        if !path.is_js() {
            return Err(AssetError::unresolved(
                path.as_str(),
                "virtual assets must end in `.js`",
            ));
        }
        let asset: Arc<dyn VirtualAsset> = Arc::new(asset);
        match self.index.get(&path) {
            Some(&i) => self.entries[i].1 = asset,
            None => {
                self.index.insert(path.clone(), self.entries.len());
                self.entries.push((path, asset));
            }
        }
        Ok(())
    }

    /// Register a render function with its own hash function.
    pub fn register_hashed<R, H>(&mut self, path: &str, render: R, hash: H) -> Result<(), AssetError>
    where
        R: Fn(&RenderContext) -> Result<String> + Send + Sync + 'static,
        H: Fn(&RenderContext) -> Result<String> + Send + Sync + 'static,
    {
        self.register(path, HashedAsset::new(render, hash))
    }

    pub fn contains(&self, path: &str) -> bool {
        self.index.contains_key(path)
    }

    /// Registered paths in registration order.
    pub fn paths(&self) -> impl Iterator<Item = &AssetPath> {
        self.entries.iter().map(|(path, _)| path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn get(&self, path: &str) -> Result<&dyn VirtualAsset, AssetError> {
        self.index
            .get(path)
            .map(|&i| self.entries[i].1.as_ref())
            .ok_or_else(|| AssetError::not_found(path))
    }

    pub fn render(&self, path: &str, ctx: &RenderContext) -> Result<String> {
        self.get(path)?.render(ctx)
    }

    pub fn hash(&self, path: &str, ctx: &RenderContext) -> Result<String> {
        self.get(path)?.hash(ctx)
    }
}

impl std::fmt::Debug for VirtualAssets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.paths()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn constant(text: &'static str) -> impl Fn(&RenderContext) -> Result<String> + Send + Sync {
        move |_| Ok(text.to_string())
    }

    #[test]
    fn test_registration_order() {
        let mut virtuals = VirtualAssets::new();
        virtuals.register("z.js", constant("z")).unwrap();
        virtuals.register("a.js", constant("a")).unwrap();
        virtuals.register("z.js", constant("z2")).unwrap();

        let paths: Vec<_> = virtuals.paths().map(AssetPath::as_str).collect();
        assert_eq!(paths, vec!["z.js", "a.js"]);
        assert_eq!(virtuals.render("z.js", &RenderContext::default()).unwrap(), "z2");
        assert_eq!(virtuals.len(), 2);
    }

    #[test]
    fn test_rejects_non_js_paths() {
        let mut virtuals = VirtualAssets::new();
        assert!(virtuals.register("styles.css", constant("")).is_err());
        assert!(virtuals.register("lib.min.js", constant("")).is_err());
        assert!(virtuals.is_empty());
    }

    #[test]
    fn test_render_uses_context() {
        let mut virtuals = VirtualAssets::new();
        virtuals
            .register("user.js", |ctx: &RenderContext| -> Result<String> {
                Ok(format!("var user = '{}';", ctx.user().unwrap_or("")))
            })
            .unwrap();
        let ctx = RenderContext::new().with_user("carol");
        assert_eq!(virtuals.render("user.js", &ctx).unwrap(), "var user = 'carol';");
    }

    #[test]
    fn test_default_hash_tracks_content() {
        let mut virtuals = VirtualAssets::new();
        virtuals
            .register("user.js", |ctx: &RenderContext| -> Result<String> {
                Ok(ctx.user().unwrap_or("").to_string())
            })
            .unwrap();
        let a = virtuals.hash("user.js", &RenderContext::new().with_user("a")).unwrap();
        let b = virtuals.hash("user.js", &RenderContext::new().with_user("b")).unwrap();
        assert_ne!(a, b);
        assert_eq!(a, virtuals.hash("user.js", &RenderContext::new().with_user("a")).unwrap());
    }

    #[test]
    fn test_custom_hash_skips_render() {
        static RENDERS: AtomicUsize = AtomicUsize::new(0);
        let mut virtuals = VirtualAssets::new();
        virtuals
            .register_hashed(
                "big.js",
                |_: &RenderContext| {
                    RENDERS.fetch_add(1, Ordering::SeqCst);
                    Ok("...".to_string())
                },
                |_: &RenderContext| Ok("v42".to_string()),
            )
            .unwrap();
        assert_eq!(virtuals.hash("big.js", &RenderContext::default()).unwrap(), "v42");
        assert_eq!(RENDERS.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_missing_virtual_is_not_found() {
        let virtuals = VirtualAssets::new();
        let err = virtuals.render("nope.js", &RenderContext::default()).unwrap_err();
        let err = err.downcast::<AssetError>().unwrap();
        assert!(err.is_not_found());
    }
}
