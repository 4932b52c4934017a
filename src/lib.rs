//! jsasset - resolve, minify, cache and bundle javascript assets.
//!
//! The entry point is [`Scripts`]: it discovers scripts under a root
//! directory, renders templates and virtual assets, minifies through a
//! pluggable [`minify::MinifierBackend`] with an on-disk cache, assembles
//! the combined bundle and produces cache-busting urls.

pub mod asset;
pub mod bundle;
pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod escape;
pub mod exc;
pub mod exec;
pub mod freshness;
pub mod logger;
pub mod minify;
pub mod scripts;
pub mod version;

pub use error::AssetError;
pub use scripts::{Response, Scripts};
