//! Template engine registry.
//!
//! A real asset whose last extension names a registered engine (e.g.
//! `app.js.hbs`) is rendered through that engine before minification.
//! Engines are tried in registration order when more than one template
//! could produce the same url path.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::Result;

use super::RenderContext;
use crate::error::AssetError;

/// A template renderer.
pub trait TemplateEngine: Send + Sync {
    fn render_file(&self, file: &Path, ctx: &RenderContext) -> Result<String>;

    fn render_string(&self, text: &str, ctx: &RenderContext) -> Result<String>;
}

/// Engine that emits sources unchanged.
///
/// Useful for extensions that only mark files as templates, e.g. `.tmpl`
/// sources pre-rendered by another tool.
#[derive(Debug, Default, Clone, Copy)]
pub struct RawEngine;

impl TemplateEngine for RawEngine {
    fn render_file(&self, file: &Path, _: &RenderContext) -> Result<String> {
        Ok(read_source(file)?)
    }

    fn render_string(&self, text: &str, _: &RenderContext) -> Result<String> {
        Ok(text.to_string())
    }
}

/// Read a UTF-8 source file, dropping a leading byte order mark.
pub fn read_source(file: &Path) -> Result<String, AssetError> {
    let content = fs::read_to_string(file).map_err(|e| AssetError::io(file, e))?;
    Ok(match content.strip_prefix('\u{feff}') {
        Some(rest) => rest.to_string(),
        None => content,
    })
}

/// Ordered mapping from file extension to engine.
#[derive(Clone, Default)]
pub struct Templates {
    engines: Vec<(String, Arc<dyn TemplateEngine>)>,
}

impl Templates {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry mapping every extension in `extensions` to [`RawEngine`].
    pub fn raw<S: AsRef<str>>(extensions: &[S]) -> Self {
        let mut templates = Self::new();
        for ext in extensions {
            templates.register(ext.as_ref(), RawEngine);
        }
        templates
    }

    /// Register `engine` for `extension`. Re-registering keeps the original
    /// priority and replaces the engine.
    pub fn register(&mut self, extension: &str, engine: impl TemplateEngine + 'static) {
        let extension = extension.trim_start_matches('.');
        let engine: Arc<dyn TemplateEngine> = Arc::new(engine);
        match self.engines.iter_mut().find(|(ext, _)| ext == extension) {
            Some(slot) => slot.1 = engine,
            None => self.engines.push((extension.to_string(), engine)),
        }
    }

    pub fn with(mut self, extension: &str, engine: impl TemplateEngine + 'static) -> Self {
        self.register(extension, engine);
        self
    }

    /// Registered extensions in priority order.
    pub fn extensions(&self) -> impl Iterator<Item = &str> {
        self.engines.iter().map(|(ext, _)| ext.as_str())
    }

    pub fn is_registered(&self, extension: &str) -> bool {
        self.engines.iter().any(|(ext, _)| ext == extension)
    }

    pub fn get(&self, extension: &str) -> Option<&dyn TemplateEngine> {
        self.engines
            .iter()
            .find(|(ext, _)| ext == extension)
            .map(|(_, engine)| engine.as_ref())
    }

    pub fn is_empty(&self) -> bool {
        self.engines.is_empty()
    }

    /// Render `file` with the engine for `engine`, or read it verbatim when
    /// `engine` is `None`.
    pub fn render_file(&self, file: &Path, engine: Option<&str>, ctx: &RenderContext) -> Result<String> {
        let Some(ext) = engine else {
            return Ok(read_source(file)?);
        };
        let engine = self.get(ext).ok_or_else(|| AssetError::Render {
            path: file.display().to_string(),
            message: format!("no template engine registered for `.{ext}`"),
        })?;
        engine.render_file(file, ctx)
    }
}

impl std::fmt::Debug for Templates {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.extensions()).finish()
    }
}
