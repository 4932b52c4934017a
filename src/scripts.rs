//! The script pipeline facade.
//!
//! [`Scripts`] ties resolution, templating, minification caching, bundling
//! and versioning together behind the operations an HTTP layer or a
//! template engine needs:
//!
//! ```text
//! GET /js/<urlpath>    serve_single    -> Response
//! GET /combined.js     serve_combined  -> Response
//! {{ js() }}           tags            -> <script src="..."></script>
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

use crate::asset::{
    AssetPath, AssetSource, PathResolver, RenderContext, Templates, VirtualAsset, VirtualAssets,
};
use crate::bundle::BundleAssembler;
use crate::cache::MinificationCache;
use crate::config::Config;
use crate::{debug, log};
use crate::error::AssetError;
use crate::minify::Minifier;
use crate::version::{AssetVersions, VersionHasher, VersionManager, VersionRequest};

/// Content type of every script response.
pub const CONTENT_TYPE: &str = "application/javascript; charset=UTF-8";

/// Version manager namespace for scripts.
pub const NAMESPACE: &str = "js";

/// Version manager key of the combined bundle.
pub const COMBINED_KEY: &str = "__combined__";

/// Characters kept verbatim in urls: alphanumerics, `/` and `-_.~`.
const URL_PATH: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'/')
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Outcome of serving a script request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// The client's copy is current.
    NotModified,
    Content {
        body: String,
        /// Version of `body`, usable as an `ETag`.
        version: Option<String>,
    },
}

impl Response {
    pub fn content_type(&self) -> &'static str {
        CONTENT_TYPE
    }

    pub fn body(&self) -> Option<&str> {
        match self {
            Self::NotModified => None,
            Self::Content { body, .. } => Some(body),
        }
    }
}

pub struct Scripts {
    rootdir: PathBuf,
    extensions: Vec<String>,
    combine: bool,
    url_prefix: String,
    combined_url: String,
    templates: Templates,
    virtuals: VirtualAssets,
    cache: MinificationCache,
    versions: Arc<dyn VersionManager>,
}

impl Scripts {
    /// Scripts under `rootdir` with default settings: `.js` files, no
    /// templates, no minifier, no cache.
    pub fn new(rootdir: impl Into<PathBuf>) -> Self {
        let rootdir = rootdir.into();
        Self {
            cache: MinificationCache::new(rootdir.clone(), None, Minifier::none()),
            rootdir,
            extensions: vec!["js".to_string()],
            combine: false,
            url_prefix: "/js/".to_string(),
            combined_url: "/combined.js".to_string(),
            templates: Templates::new(),
            virtuals: VirtualAssets::new(),
            versions: Arc::new(AssetVersions::new()),
        }
    }

    /// Build from a loaded configuration. Template extensions are served
    /// verbatim by [`crate::asset::RawEngine`] until real engines are
    /// registered with [`Scripts::with_templates`].
    pub fn from_config(config: &Config) -> Result<Self> {
        let js = &config.js;
        let scripts = Self::new(&js.rootdir)
            .with_extensions(js.extensions.clone())
            .with_templates(Templates::raw(&js.templates))
            .with_minifier(js.build_minifier()?)
            .with_cachedir(js.cachedir.clone())
            .with_combine(js.combine)
            .with_urls(&js.url_prefix, &js.combined_url);

        debug!("config"; "minifier: {}", scripts.minifier().name());
        if js.purge_cache {
            scripts.purge_cache()?;
        }
        Ok(scripts)
    }

    pub fn with_extensions(mut self, extensions: Vec<String>) -> Self {
        self.extensions = extensions;
        self
    }

    pub fn with_templates(mut self, templates: Templates) -> Self {
        self.templates = templates;
        self
    }

    pub fn with_virtuals(mut self, virtuals: VirtualAssets) -> Self {
        self.virtuals = virtuals;
        self
    }

    pub fn with_minifier(mut self, minifier: Minifier) -> Self {
        let cachedir = self.cache.cachedir().map(Path::to_path_buf);
        self.cache = MinificationCache::new(self.rootdir.clone(), cachedir, minifier);
        self
    }

    pub fn with_cachedir(mut self, cachedir: Option<PathBuf>) -> Self {
        let minifier = self.cache.minifier().clone();
        self.cache = MinificationCache::new(self.rootdir.clone(), cachedir, minifier);
        self
    }

    pub fn with_combine(mut self, combine: bool) -> Self {
        self.combine = combine;
        self
    }

    pub fn with_urls(mut self, prefix: &str, combined: &str) -> Self {
        self.url_prefix = prefix.to_string();
        self.combined_url = combined.to_string();
        self
    }

    pub fn with_version_manager(mut self, versions: Arc<dyn VersionManager>) -> Self {
        self.versions = versions;
        self
    }

    /// Register a virtual asset at setup time.
    pub fn register_virtual(&mut self, path: &str, asset: impl VirtualAsset + 'static) -> Result<(), AssetError> {
        self.virtuals.register(path, asset)
    }

    pub fn rootdir(&self) -> &Path {
        &self.rootdir
    }

    pub fn minifier(&self) -> &Minifier {
        self.cache.minifier()
    }

    pub fn cache(&self) -> &MinificationCache {
        &self.cache
    }

    pub fn virtuals(&self) -> &VirtualAssets {
        &self.virtuals
    }

    pub fn virtuals_mut(&mut self) -> &mut VirtualAssets {
        &mut self.virtuals
    }

    pub fn combine(&self) -> bool {
        self.combine
    }

    pub fn resolver(&self) -> PathResolver<'_> {
        PathResolver::new(&self.rootdir, &self.extensions, &self.templates, &self.virtuals)
    }

    fn version_hasher<'a>(&'a self, ctx: &'a RenderContext) -> VersionHasher<'a> {
        VersionHasher::new(self.resolver(), self.versions.as_ref(), ctx)
    }

    // ========================================================================
    // resolution
    // ========================================================================

    pub fn paths(&self, include_hidden: bool) -> Vec<AssetPath> {
        self.resolver().enumerate_paths(include_hidden)
    }

    pub fn urlpath_to_path(&self, urlpath: &str) -> Result<AssetPath, AssetError> {
        self.resolver().urlpath_to_path(urlpath)
    }

    pub fn path_to_urlpath(&self, path: &AssetPath) -> Result<String, AssetError> {
        self.resolver().path_to_urlpath(path)
    }

    // ========================================================================
    // conversion
    // ========================================================================

    /// Minify `content`, cached under `path` when given.
    pub fn convert_string(&self, content: &str, path: Option<&AssetPath>) -> Result<String, AssetError> {
        self.cache.convert(path, content)
    }

    /// Final content of one asset.
    ///
    /// Virtual assets are rendered and minified on every call. Plain `.js`
    /// files with a `.min.js` sidecar use the sidecar when minifying.
    /// Everything else goes through the cache.
    pub fn convert_file(&self, path: &AssetPath, ctx: &RenderContext) -> Result<String> {
        match self.resolver().source(path)? {
            AssetSource::Virtual => {
                let raw = self.virtuals.render(path.as_str(), ctx)?;
                Ok(self.cache.convert(None, &raw)?)
            }
            AssetSource::Real { file, engine } => {
                if engine.is_none()
                    && path.is_js()
                    && let Some(minified) = self.cache.sidecar(path)
                {
                    return Ok(minified);
                }
                if let Some(hit) = self.cache.lookup(path) {
                    return Ok(hit);
                }
                let raw = self.templates.render_file(&file, engine.as_deref(), ctx)?;
                Ok(self.cache.refresh(Some(path), &raw)?)
            }
        }
    }

    /// Final content of the asset served at `urlpath`.
    pub fn render_single(&self, urlpath: &str, ctx: &RenderContext) -> Result<String> {
        let path = self.urlpath_to_path(urlpath)?;
        self.convert_file(&path, ctx)
    }

    /// The combined bundle. Minified as a whole when a minifier is set.
    pub fn render_combined(&self, ctx: &RenderContext) -> Result<String> {
        let minifier = self.cache.minifier();
        let bundle = BundleAssembler::new(self.resolver(), minifier)
            .render_combined(|path| self.convert_file(path, ctx))?;
        Ok(minifier.apply(&bundle, None)?)
    }

    // ========================================================================
    // serving
    // ========================================================================

    pub fn serve_single(&self, urlpath: &str, request: &VersionRequest, ctx: &RenderContext) -> Result<Response> {
        let path = self.urlpath_to_path(urlpath)?;
        let hashers = self.version_hasher(ctx).hashers(&path);
        let version = self.versions.store(
            NAMESPACE,
            urlpath,
            hashers,
            Box::new(|| self.convert_file(&path, ctx)),
        )?;
        if self.versions.handle_request(NAMESPACE, urlpath, request) {
            debug!("serve"; "not modified: {}", urlpath);
            return Ok(Response::NotModified);
        }
        let body = self.convert_file(&path, ctx)?;
        Ok(Response::Content { body, version })
    }

    pub fn serve_combined(&self, request: &VersionRequest, ctx: &RenderContext) -> Result<Response> {
        let version = self.combined_version(ctx)?;
        if self.versions.handle_request(NAMESPACE, COMBINED_KEY, request) {
            debug!("serve"; "not modified: {}", self.combined_url);
            return Ok(Response::NotModified);
        }
        let body = self.render_combined(ctx)?;
        Ok(Response::Content { body, version })
    }

    fn combined_version(&self, ctx: &RenderContext) -> Result<Option<String>> {
        let paths = self.paths(false);
        let hashers = self.version_hasher(ctx).combined_hashers(&paths);
        self.versions.store(
            NAMESPACE,
            COMBINED_KEY,
            hashers,
            Box::new(|| self.render_combined(ctx)),
        )
    }

    // ========================================================================
    // urls and tags
    // ========================================================================

    /// Versioned url of one asset, e.g. `/js/lib/app.js?_v=1a2b3c4d`.
    pub fn url_single(&self, path: &AssetPath, ctx: &RenderContext) -> Result<String> {
        let urlpath = self.path_to_urlpath(path)?;
        let hashers = self.version_hasher(ctx).hashers(path);
        let version = self.versions.store(
            NAMESPACE,
            &urlpath,
            hashers,
            Box::new(|| self.convert_file(path, ctx)),
        )?;
        let url = format!("{}{}", self.url_prefix, utf8_percent_encode(&urlpath, URL_PATH));
        Ok(with_version(url, version))
    }

    /// Versioned url of the combined bundle.
    pub fn url_combined(&self, ctx: &RenderContext) -> Result<String> {
        let version = self.combined_version(ctx)?;
        Ok(with_version(self.combined_url.clone(), version))
    }

    /// `<script>` tags for `paths`.
    ///
    /// Without explicit paths: one tag for the bundle in combine mode,
    /// otherwise one tag per discovered asset that has a url (empty if
    /// there are none).
    pub fn tags(&self, paths: &[AssetPath], ctx: &RenderContext) -> Result<String> {
        if !paths.is_empty() {
            let tags = paths
                .iter()
                .map(|path| self.url_single(path, ctx).map(|url| script_tag(&url)))
                .collect::<Result<Vec<_>>>()?;
            return Ok(tags.join("\n"));
        }
        if self.combine {
            return Ok(script_tag(&self.url_combined(ctx)?));
        }
        let resolver = self.resolver();
        let servable: Vec<AssetPath> = self
            .paths(false)
            .into_iter()
            .filter(|path| match resolver.path_to_urlpath(path) {
                Ok(_) => true,
                Err(e) => {
                    log!("warning"; "no script tag for {}: {}", path, e);
                    false
                }
            })
            .collect();
        if servable.is_empty() {
            return Ok(String::new());
        }
        self.tags(&servable, ctx)
    }

    /// Remove all minification cache entries.
    pub fn purge_cache(&self) -> Result<(), AssetError> {
        self.cache.purge()
    }
}

fn with_version(url: String, version: Option<String>) -> String {
    match version {
        Some(v) if !v.is_empty() => format!("{url}?_v={v}"),
        _ => url,
    }
}

fn script_tag(url: &str) -> String {
    format!("<script src=\"{url}\"></script>")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::{RawEngine, TemplateEngine, read_source};
    use crate::minify::MinifierBackend;
    use crate::version::NoVersions;
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    /// Strips spaces and counts invocations.
    #[derive(Default)]
    struct Squeeze(AtomicUsize);

    impl MinifierBackend for Squeeze {
        fn name(&self) -> &str {
            "squeeze"
        }

        fn minify_string(&self, content: &str, _: Option<&AssetPath>) -> Result<String, AssetError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(content.replace(' ', ""))
        }
    }

    /// Replaces `{{user}}` with the context user.
    struct UserEngine;

    impl TemplateEngine for UserEngine {
        fn render_file(&self, file: &Path, ctx: &RenderContext) -> Result<String> {
            let text = read_source(file)?;
            self.render_string(&text, ctx)
        }

        fn render_string(&self, text: &str, ctx: &RenderContext) -> Result<String> {
            Ok(text.replace("{{user}}", ctx.user().unwrap_or("anonymous")))
        }
    }

    fn js_root(files: &[(&str, &str)]) -> TempDir {
        let dir = TempDir::new().unwrap();
        for (name, content) in files {
            let path = dir.path().join(name);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(&path, content).unwrap();
        }
        dir
    }

    fn path(p: &str) -> AssetPath {
        AssetPath::new(p).unwrap()
    }

    fn ctx() -> RenderContext {
        RenderContext::default()
    }

    #[test]
    fn test_combined_without_minifier() {
        let root = js_root(&[("a.js", "var a=1;"), ("b.js", "var b=2;")]);
        let scripts = Scripts::new(root.path());
        let bundle = scripts.render_combined(&ctx()).unwrap();

        let a = bundle.find("a.js").unwrap();
        let b = bundle.find("b.js").unwrap();
        assert!(a < b);
        assert!(bundle.contains("*/\n\nvar a=1;\n\n/*"));
        assert!(bundle.ends_with("*/\n\nvar b=2;"));
        // deterministic
        assert_eq!(bundle, scripts.render_combined(&ctx()).unwrap());
    }

    #[test]
    fn test_combined_with_minifier() {
        let root = js_root(&[("a.js", "var a = 1;"), ("b.js", "var b = 2;")]);
        let scripts = Scripts::new(root.path()).with_minifier(Minifier::new(Squeeze::default()));
        assert_eq!(scripts.render_combined(&ctx()).unwrap(), "vara=1;\n\nvarb=2;");
    }

    #[test]
    fn test_convert_file_uses_cache() {
        let root = js_root(&[("x.js", "var x=1 ;")]);
        let cache = TempDir::new().unwrap();
        let backend = Arc::new(Squeeze::default());
        let scripts = Scripts::new(root.path())
            .with_minifier(Minifier::from_arc(backend.clone()))
            .with_cachedir(Some(cache.path().to_path_buf()));

        // make the source clearly older than the entry written below
        fs::File::options()
            .write(true)
            .open(root.path().join("x.js"))
            .unwrap()
            .set_modified(std::time::SystemTime::now() - std::time::Duration::from_secs(10))
            .unwrap();

        let x = path("x.js");
        let first = scripts.convert_file(&x, &ctx()).unwrap();
        let second = scripts.convert_file(&x, &ctx()).unwrap();
        assert_eq!(first, "varx=1;");
        assert_eq!(first, second);
        assert_eq!(backend.0.load(Ordering::SeqCst), 1);
        assert!(cache.path().join("x.js").is_file());
    }

    #[test]
    fn test_sidecar_bypasses_minifier() {
        let root = js_root(&[("lib.js", "var lib = 1;"), ("lib.min.js", "LIBMIN")]);
        let backend = Arc::new(Squeeze::default());
        let scripts = Scripts::new(root.path()).with_minifier(Minifier::from_arc(backend.clone()));
        assert_eq!(scripts.convert_file(&path("lib.js"), &ctx()).unwrap(), "LIBMIN");
        assert_eq!(backend.0.load(Ordering::SeqCst), 0);

        // without a minifier the full source is served
        let plain = Scripts::new(root.path());
        assert_eq!(plain.convert_file(&path("lib.js"), &ctx()).unwrap(), "var lib = 1;");
        assert_eq!(plain.paths(false), vec![path("lib.js")]);
    }

    #[test]
    fn test_missing_asset() {
        let root = js_root(&[]);
        let scripts = Scripts::new(root.path());
        let err = scripts.convert_file(&path("gone.js"), &ctx()).unwrap_err();
        assert!(err.downcast_ref::<AssetError>().unwrap().is_not_found());
    }

    #[test]
    fn test_templates_and_context() {
        let root = js_root(&[("hello.js.hbs", "hello('{{user}}');")]);
        let scripts = Scripts::new(root.path()).with_templates(Templates::new().with("hbs", UserEngine));
        let ctx = RenderContext::new().with_user("erin");
        assert_eq!(scripts.urlpath_to_path("hello.js").unwrap(), path("hello.js.hbs"));
        assert_eq!(scripts.render_single("hello.js", &ctx).unwrap(), "hello('erin');");
    }

    #[test]
    fn test_virtual_assets_are_not_cached() {
        let root = js_root(&[]);
        let cache = TempDir::new().unwrap();
        let mut scripts = Scripts::new(root.path()).with_cachedir(Some(cache.path().to_path_buf()));
        scripts
            .register_virtual("user.js", |ctx: &RenderContext| -> Result<String> {
                Ok(format!("var user = '{}';", ctx.user().unwrap_or("")))
            })
            .unwrap();

        let alice = RenderContext::new().with_user("alice");
        let bob = RenderContext::new().with_user("bob");
        assert_eq!(scripts.render_single("user.js", &alice).unwrap(), "var user = 'alice';");
        assert_eq!(scripts.render_single("user.js", &bob).unwrap(), "var user = 'bob';");
        assert!(!cache.path().join("user.js").exists());
    }

    #[test]
    fn test_url_single_is_encoded_and_versioned() {
        let root = js_root(&[("my lib/a b.js", "var a;"), ("page.js.tmpl", "var p;")]);
        let scripts = Scripts::new(root.path()).with_templates(Templates::raw(&["tmpl"]));

        let url = scripts.url_single(&path("my lib/a b.js"), &ctx()).unwrap();
        assert!(url.starts_with("/js/my%20lib/a%20b.js?_v="), "{url}");
        assert_eq!(url.len(), "/js/my%20lib/a%20b.js?_v=".len() + crate::version::VERSION_LEN);

        let url = scripts.url_single(&path("page.js.tmpl"), &ctx()).unwrap();
        assert!(url.starts_with("/js/page.js?_v="), "{url}");
    }

    #[test]
    fn test_url_without_versions() {
        let root = js_root(&[("a.js", "")]);
        let scripts = Scripts::new(root.path()).with_version_manager(Arc::new(NoVersions));
        assert_eq!(scripts.url_single(&path("a.js"), &ctx()).unwrap(), "/js/a.js");
        assert_eq!(scripts.url_combined(&ctx()).unwrap(), "/combined.js");
    }

    #[test]
    fn test_combined_version_tracks_content() {
        let root = js_root(&[("a.js", "A"), ("b.js", "B")]);
        let scripts = Scripts::new(root.path());
        let before = scripts.url_combined(&ctx()).unwrap();
        assert!(before.starts_with("/combined.js?_v="));

        fs::write(root.path().join("b.js"), "B changed").unwrap();
        fs::File::options()
            .write(true)
            .open(root.path().join("b.js"))
            .unwrap()
            .set_modified(std::time::SystemTime::now() + std::time::Duration::from_secs(5))
            .unwrap();
        assert_ne!(before, scripts.url_combined(&ctx()).unwrap());
    }

    #[test]
    fn test_tags() {
        let root = js_root(&[("a.js", ""), ("b.js", ""), ("_hidden.js", "")]);
        let scripts = Scripts::new(root.path()).with_version_manager(Arc::new(NoVersions));

        assert_eq!(
            scripts.tags(&[], &ctx()).unwrap(),
            "<script src=\"/js/a.js\"></script>\n<script src=\"/js/b.js\"></script>"
        );
        assert_eq!(
            scripts.tags(&[path("_hidden.js")], &ctx()).unwrap(),
            "<script src=\"/js/_hidden.js\"></script>"
        );

        let combined = Scripts::new(root.path())
            .with_version_manager(Arc::new(NoVersions))
            .with_combine(true);
        assert_eq!(
            combined.tags(&[], &ctx()).unwrap(),
            "<script src=\"/combined.js\"></script>"
        );

        let empty_root = js_root(&[]);
        assert_eq!(Scripts::new(empty_root.path()).tags(&[], &ctx()).unwrap(), "");
    }

    #[test]
    fn test_tags_skip_assets_without_url() {
        let root = js_root(&[("a.js", ""), ("b.mjs", "")]);
        let scripts = Scripts::new(root.path())
            .with_extensions(vec!["js".into(), "mjs".into()])
            .with_version_manager(Arc::new(NoVersions));
        assert_eq!(scripts.paths(false).len(), 2);
        assert_eq!(
            scripts.tags(&[], &ctx()).unwrap(),
            "<script src=\"/js/a.js\"></script>"
        );
        // explicit paths still fail loudly
        assert!(scripts.tags(&[path("b.mjs")], &ctx()).is_err());
    }

    #[test]
    fn test_serve_single_conditional() {
        let root = js_root(&[("a.js", "var a;")]);
        let scripts = Scripts::new(root.path());

        let response = scripts.serve_single("a.js", &VersionRequest::new(), &ctx()).unwrap();
        assert_eq!(response.content_type(), CONTENT_TYPE);
        assert_eq!(response.body(), Some("var a;"));
        let Response::Content { version: Some(version), .. } = response else {
            panic!("expected versioned content");
        };

        let cached = VersionRequest::new().with_if_none_match(version);
        assert_eq!(
            scripts.serve_single("a.js", &cached, &ctx()).unwrap(),
            Response::NotModified
        );
    }

    #[test]
    fn test_serve_combined_conditional() {
        let root = js_root(&[("a.js", "A")]);
        let scripts = Scripts::new(root.path()).with_templates(Templates::new().with("tmpl", RawEngine));
        let Response::Content { version: Some(version), body } = scripts
            .serve_combined(&VersionRequest::new(), &ctx())
            .unwrap()
        else {
            panic!("expected versioned content");
        };
        assert!(body.ends_with("A"));
        let cached = VersionRequest::new().with_if_none_match(version);
        assert_eq!(
            scripts.serve_combined(&cached, &ctx()).unwrap(),
            Response::NotModified
        );
    }

    #[test]
    fn test_serve_unresolved() {
        let root = js_root(&[]);
        let scripts = Scripts::new(root.path());
        let err = scripts
            .serve_single("style.css", &VersionRequest::new(), &ctx())
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<AssetError>(),
            Some(AssetError::UnresolvedPath { .. })
        ));
    }

    #[test]
    fn test_from_config_purges_cache() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("js");
        let cachedir = dir.path().join("cache/js");
        fs::create_dir_all(&root).unwrap();
        fs::create_dir_all(&cachedir).unwrap();
        fs::write(cachedir.join("stale.js"), "old").unwrap();

        let mut config = Config::default();
        config.js.rootdir = root;
        config.js.cachedir = Some(cachedir.clone());
        config.js.minifier = Some(crate::config::MinifierSection::Name(
            crate::config::MinifierKind::Fast,
        ));

        let scripts = Scripts::from_config(&config).unwrap();
        assert!(!cachedir.exists());
        assert_eq!(scripts.minifier().name(), "oxc-fast");
    }
}
