//! Script assets: paths, sources and discovery.

mod context;
mod generated;
mod path;
mod resolve;
mod scan;
mod template;

pub use context::RenderContext;
pub use generated::{HashedAsset, VirtualAsset, VirtualAssets};
pub use path::{AssetPath, AssetSource, MINIFIED_SUFFIX};
pub use resolve::PathResolver;
pub use scan::{ScanOptions, scan_paths};
pub use template::{RawEngine, TemplateEngine, Templates, read_source};
