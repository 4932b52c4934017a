//! Freshness detection: mtime for cache entries, content hash (blake3) for versions.

mod cache;
mod hash;
pub mod mtime;

pub use cache::clear_cache;
pub use hash::{ContentHash, compute_file_hash, compute_files_hash};
pub use mtime::{get_mtime, is_newer_than};
