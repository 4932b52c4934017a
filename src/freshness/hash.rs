//! Content hashing using blake3.
//!
//! File hashes back the version identifiers of real assets. They are
//! memoized per file and recomputed when the mtime changes.

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

use super::cache::{get_cached_hash, set_cached_hash};
use super::mtime::get_mtime;

/// A 256-bit content hash (blake3 output).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentHash([u8; 32]);

impl ContentHash {
    #[inline]
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Hash an in-memory buffer.
    pub fn of(bytes: &[u8]) -> Self {
        Self(*blake3::hash(bytes).as_bytes())
    }

    #[inline]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Create a hash representing "no content" (all zeros).
    #[inline]
    pub const fn empty() -> Self {
        Self([0; 32])
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0 == [0; 32]
    }

    pub fn to_hex(self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(s: &str) -> Option<Self> {
        let bytes = hex::decode(s).ok()?;
        let arr: [u8; 32] = bytes.try_into().ok()?;
        Some(Self(arr))
    }
}

impl std::fmt::Display for ContentHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // first 16 hex chars
        write!(f, "{}", &self.to_hex()[..16])
    }
}

/// Compute blake3 hash of file contents (cached per mtime).
///
/// Missing or unreadable files hash to [`ContentHash::empty`].
pub fn compute_file_hash(path: &Path) -> ContentHash {
    let Some(mtime) = get_mtime(path) else {
        return ContentHash::empty();
    };
    if let Some(cached) = get_cached_hash(path, mtime) {
        return cached;
    }

    let hash = compute_file_hash_uncached(path);
    if !hash.is_empty() {
        set_cached_hash(path, mtime, hash);
    }
    hash
}

fn compute_file_hash_uncached(path: &Path) -> ContentHash {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(_) => return ContentHash::empty(),
    };

    let mut reader = BufReader::with_capacity(64 * 1024, file);
    let mut hasher = blake3::Hasher::new();
    let mut buffer = [0u8; 64 * 1024];

    loop {
        match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => {
                hasher.update(&buffer[..n]);
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(_) => return ContentHash::empty(),
        }
    }

    ContentHash::new(*hasher.finalize().as_bytes())
}

/// Combined hash over several files, in the given order.
///
/// Each file contributes its path and content hash, so renaming or
/// reordering changes the result.
pub fn compute_files_hash<P: AsRef<Path>>(files: &[P]) -> ContentHash {
    let mut hasher = blake3::Hasher::new();
    for file in files {
        let file = file.as_ref();
        hasher.update(file.as_os_str().as_encoded_bytes());
        hasher.update(compute_file_hash(file).as_bytes());
    }
    ContentHash::new(*hasher.finalize().as_bytes())
}
