//! Errors as JSON, for scripts that display server-side failures.
//!
//! [`error_to_json`] produces `{type, message, trace}` objects; the
//! `lib/excformat.js` virtual asset turns them back into readable text in
//! the browser.

use anyhow::Result;
use serde_json::{Value, json};

use crate::asset::{RenderContext, VirtualAssets};
use crate::error::AssetError;

/// Path of the formatter module in the virtual registry.
pub const EXCFORMAT_PATH: &str = "lib/excformat.js";

/// AMD module formatting the output of [`error_to_json`].
pub const EXCFORMAT_JS: &str = r#"define('lib/excformat', function() {
    return function excformat(exc) {
        var msg = exc.type + ': ' + exc.message;
        if (typeof exc.trace === 'undefined' || !exc.trace.length) {
            return msg;
        }
        msg += '\n\nCaused by:';
        for (var i = 0; i < exc.trace.length; i++) {
            msg += '\n    ' + i + ': ' + exc.trace[i];
        }
        return msg;
    };
});"#;

/// Serialize `err` as `{"type", "message", "trace"}`.
///
/// `type` is the [`AssetError`] variant if one is in the chain, `"Error"`
/// otherwise; `trace` lists the underlying causes, outermost first.
pub fn error_to_json(err: &anyhow::Error) -> Value {
    let kind = err
        .chain()
        .find_map(|e| e.downcast_ref::<AssetError>())
        .map_or("Error", AssetError::kind);
    let trace: Vec<String> = err.chain().skip(1).map(ToString::to_string).collect();
    json!({
        "type": kind,
        "message": err.to_string(),
        "trace": trace,
    })
}

/// Register the formatter module under [`EXCFORMAT_PATH`].
pub fn register_excformat(virtuals: &mut VirtualAssets) -> Result<(), AssetError> {
    virtuals.register(EXCFORMAT_PATH, |_: &RenderContext| -> Result<String> {
        Ok(EXCFORMAT_JS.to_string())
    })
}
