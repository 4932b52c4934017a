//! Request-scoped rendering context.

use rustc_hash::FxHashMap;

/// Explicit per-request state handed to template engines and virtual assets.
///
/// Content that varies per request (e.g. per logged-in user) reads it from
/// here, never from thread-local or global state.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RenderContext {
    user: Option<String>,
    vars: FxHashMap<String, String>,
}

impl RenderContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    pub fn with_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(key.into(), value.into());
        self
    }

    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    pub fn var(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }
}
