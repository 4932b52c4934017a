//! Global memo of file content hashes, keyed by canonical path.

use dashmap::DashMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::SystemTime;

use super::ContentHash;

/// Thread-safe hash memo. An entry is only returned while the file's mtime
/// still equals the mtime it was computed at.
pub struct FreshnessCache {
    hashes: DashMap<PathBuf, (SystemTime, ContentHash)>,
}

impl FreshnessCache {
    pub fn new() -> Self {
        Self {
            hashes: DashMap::new(),
        }
    }

    pub fn get(&self, path: &Path, mtime: SystemTime) -> Option<ContentHash> {
        let canonical = path.canonicalize().ok()?;
        self.hashes
            .get(&canonical)
            .filter(|entry| entry.0 == mtime)
            .map(|entry| entry.1)
    }

    pub fn set(&self, path: &Path, mtime: SystemTime, hash: ContentHash) {
        if let Ok(canonical) = path.canonicalize() {
            self.hashes.insert(canonical, (mtime, hash));
        }
    }

    pub fn clear(&self) {
        self.hashes.clear();
    }

    pub fn len(&self) -> usize {
        self.hashes.len()
    }
}

impl Default for FreshnessCache {
    fn default() -> Self {
        Self::new()
    }
}

pub static FRESHNESS_CACHE: LazyLock<FreshnessCache> = LazyLock::new(FreshnessCache::new);

#[inline]
pub fn get_cached_hash(path: &Path, mtime: SystemTime) -> Option<ContentHash> {
    FRESHNESS_CACHE.get(path, mtime)
}

#[inline]
pub fn set_cached_hash(path: &Path, mtime: SystemTime, hash: ContentHash) {
    FRESHNESS_CACHE.set(path, mtime, hash);
}

/// Clear the global freshness cache.
#[inline]
pub fn clear_cache() {
    FRESHNESS_CACHE.clear();
}
