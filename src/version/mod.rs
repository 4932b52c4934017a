//! Asset version management for cache busting.
//!
//! A version manager turns lazily evaluated hash functions into short
//! version strings, which are appended to script urls. When content
//! changes, the version changes and browsers re-fetch.

mod adapter;

pub use adapter::VersionHasher;

use std::path::PathBuf;

use anyhow::Result;
use dashmap::DashMap;

use crate::freshness::{ContentHash, compute_files_hash};

/// Length of version strings produced by [`AssetVersions`].
pub const VERSION_LEN: usize = 8;

/// Lazily evaluated content identity.
pub type Hasher<'a> = Box<dyn Fn() -> Result<String> + 'a>;

/// Lazily evaluated full content, for managers that hash the output itself.
pub type ContentFn<'a> = Box<dyn FnOnce() -> Result<String> + 'a>;

/// The parts of an HTTP request a version manager looks at.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VersionRequest {
    /// Value of the `If-None-Match` header.
    pub if_none_match: Option<String>,
}

impl VersionRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_if_none_match(mut self, tag: impl Into<String>) -> Self {
        self.if_none_match = Some(tag.into());
        self
    }
}

/// Computes, stores and checks asset versions.
pub trait VersionManager: Send + Sync {
    /// A hasher over the contents of `files`, in order.
    fn create_file_hasher(&self, files: Vec<PathBuf>) -> Hasher<'static>;

    /// Record the version of `key` in `namespace`.
    ///
    /// `hashers` identify the content; `content` is only invoked when the
    /// manager needs the full output. Returns `None` when versioning is
    /// disabled.
    fn store(
        &self,
        namespace: &str,
        key: &str,
        hashers: Vec<Hasher<'_>>,
        content: ContentFn<'_>,
    ) -> Result<Option<String>>;

    /// Whether `request` can be answered with "not modified".
    fn handle_request(&self, namespace: &str, key: &str, request: &VersionRequest) -> bool;
}

/// In-memory version store: blake3 over all hasher outputs, truncated to
/// [`VERSION_LEN`] hex chars.
#[derive(Debug, Default)]
pub struct AssetVersions {
    versions: DashMap<(String, String), String>,
}

impl AssetVersions {
    pub fn new() -> Self {
        Self::default()
    }

    /// The last stored version of `key`.
    pub fn get(&self, namespace: &str, key: &str) -> Option<String> {
        self.versions
            .get(&(namespace.to_string(), key.to_string()))
            .map(|v| v.clone())
    }

    pub fn clear(&self) {
        self.versions.clear();
    }
}

impl VersionManager for AssetVersions {
    fn create_file_hasher(&self, files: Vec<PathBuf>) -> Hasher<'static> {
        Box::new(move || Ok(compute_files_hash(&files).to_hex()))
    }

    fn store(
        &self,
        namespace: &str,
        key: &str,
        hashers: Vec<Hasher<'_>>,
        content: ContentFn<'_>,
    ) -> Result<Option<String>> {
        let digest = if hashers.is_empty() {
            ContentHash::of(content()?.as_bytes())
        } else {
            let mut hasher = blake3::Hasher::new();
            for hash in &hashers {
                hasher.update(hash()?.as_bytes());
                hasher.update(b"\0");
            }
            ContentHash::new(*hasher.finalize().as_bytes())
        };
        let version = digest.to_hex()[..VERSION_LEN].to_string();
        self.versions
            .insert((namespace.to_string(), key.to_string()), version.clone());
        Ok(Some(version))
    }

    fn handle_request(&self, namespace: &str, key: &str, request: &VersionRequest) -> bool {
        let Some(tag) = request.if_none_match.as_deref() else {
            return false;
        };
        self.get(namespace, key)
            .is_some_and(|version| tag.trim().trim_start_matches("W/").trim_matches('"') == version)
    }
}

/// A manager that never versions anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoVersions;

impl VersionManager for NoVersions {
    fn create_file_hasher(&self, _: Vec<PathBuf>) -> Hasher<'static> {
        Box::new(|| Ok(String::new()))
    }

    fn store(&self, _: &str, _: &str, _: Vec<Hasher<'_>>, _: ContentFn<'_>) -> Result<Option<String>> {
        Ok(None)
    }

    fn handle_request(&self, _: &str, _: &str, _: &VersionRequest) -> bool {
        false
    }
}
