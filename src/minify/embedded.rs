//! In-process minification with oxc.
//!
//! Two presets share one parse/codegen path:
//! - [`OxcFast`] only reprints the program compactly (whitespace and
//!   comments removed), no compression or mangling.
//! - [`OxcThorough`] additionally compresses and mangles local names, and
//!   re-attaches license comments (`/*! ... */`, `@license`, `@preserve`)
//!   in front of the output.
//!
//! Sources are parsed as classic scripts: top-level declarations are
//! globals shared with other files and survive both presets unrenamed.

use oxc::allocator::Allocator;
use oxc::ast::{Comment, CommentKind};
use oxc::codegen::{Codegen, CodegenOptions, CommentOptions};
use oxc::mangler::MangleOptions;
use oxc::minifier::{CompressOptions, Minifier, MinifierOptions};
use oxc::parser::Parser;
use oxc::span::SourceType;

use super::MinifierBackend;
use crate::asset::AssetPath;
use crate::error::AssetError;

/// Fast whitespace-level minifier.
#[derive(Debug, Default, Clone, Copy)]
pub struct OxcFast;

/// Slower, high-quality minifier (compress + mangle).
#[derive(Debug, Default, Clone, Copy)]
pub struct OxcThorough;

impl MinifierBackend for OxcFast {
    fn name(&self) -> &str {
        "oxc-fast"
    }

    fn minify_string(&self, content: &str, path: Option<&AssetPath>) -> Result<String, AssetError> {
        minify_js(content, false)
            .map(|minified| minified.code)
            .map_err(|errors| parse_failure(self.name(), path, errors))
    }
}

impl MinifierBackend for OxcThorough {
    fn name(&self) -> &str {
        "oxc"
    }

    fn minify_string(&self, content: &str, path: Option<&AssetPath>) -> Result<String, AssetError> {
        let Minified { code, notices } =
            minify_js(content, true).map_err(|errors| parse_failure(self.name(), path, errors))?;
        if notices.is_empty() {
            return Ok(code);
        }
        Ok(format!("{}\n{code}", notices.join("\n")))
    }
}

#[derive(Debug, Default)]
struct Minified {
    code: String,
    /// License comments of the source, in source order. Only collected
    /// when compressing.
    notices: Vec<String>,
}

/// Parse and reprint `source`. Returns the parser's messages on failure.
fn minify_js(source: &str, compress: bool) -> Result<Minified, Vec<String>> {
    if source.trim().is_empty() {
        return Ok(Minified::default());
    }

    let allocator = Allocator::default();
    let ret = Parser::new(&allocator, source, SourceType::script()).parse();
    if !ret.errors.is_empty() {
        return Err(ret.errors.iter().map(ToString::to_string).collect());
    }
    let mut program = ret.program;

    let codegen = Codegen::new().with_options(CodegenOptions {
        minify: true,
        comments: CommentOptions::disabled(),
        ..CodegenOptions::default()
    });

    if !compress {
        return Ok(Minified {
            code: codegen.build(&program).code,
            notices: Vec::new(),
        });
    }

    let notices = license_comments(source, &program.comments);
    let options = MinifierOptions {
        mangle: Some(MangleOptions::default()),
        compress: Some(CompressOptions::smallest()),
    };
    let ret = Minifier::new(options).minify(&allocator, &mut program);
    Ok(Minified {
        code: codegen.with_scoping(ret.scoping).build(&program).code,
        notices,
    })
}

fn parse_failure(name: &str, path: Option<&AssetPath>, errors: Vec<String>) -> AssetError {
    let origin = path.map_or_else(|| "<string>".to_string(), |p| p.to_string());
    AssetError::BackendFailure {
        program: name.to_string(),
        status: format!("parse errors in {origin}"),
        stderr: errors.join("\n"),
    }
}

/// Block comments the parser found that must survive minification.
fn license_comments(source: &str, comments: &[Comment]) -> Vec<String> {
    comments
        .iter()
        .filter(|c| !matches!(c.kind, CommentKind::Line))
        .filter_map(|c| block_text(source, c.span.start as usize, c.span.end as usize))
        .filter(|text| is_license(text))
        .map(str::to_string)
        .collect()
}

/// The full `/* ... */` text of a block comment. Spans may exclude the
/// delimiters.
fn block_text(source: &str, start: usize, end: usize) -> Option<&str> {
    let text = source.get(start..end)?;
    if text.starts_with("/*") {
        return Some(text);
    }
    source
        .get(start.checked_sub(2)?..end + 2)
        .filter(|t| t.starts_with("/*") && t.ends_with("*/"))
}

fn is_license(comment: &str) -> bool {
    comment.starts_with("/*!") || comment.contains("@license") || comment.contains("@preserve")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fast_removes_whitespace() {
        let out = OxcFast.minify_string("var x = 1 ;\n\n// note\nvar y = x + 2;", None).unwrap();
        assert!(!out.contains("note"));
        assert!(out.contains("x"));
        assert!(out.len() < "var x = 1 ;\n\n// note\nvar y = x + 2;".len());
    }

    #[test]
    fn test_thorough_shrinks_locals() {
        let source = "window.f = function () { var longLocalName = 40; return longLocalName * window.g; };";
        let out = OxcThorough.minify_string(source, None).unwrap();
        assert!(!out.is_empty());
        assert!(!out.contains("longLocalName"));
    }

    #[test]
    fn test_thorough_keeps_license_comment() {
        let source = "/*! mylib v1.0 | MIT */\nvar answer = 42;\n/* plain comment */";
        let out = OxcThorough.minify_string(source, None).unwrap();
        assert!(out.starts_with("/*! mylib v1.0 | MIT */"));
        assert!(!out.contains("plain comment"));
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(OxcFast.minify_string("", None).unwrap(), "");
        assert_eq!(OxcThorough.minify_string("  \n", None).unwrap(), "");
    }

    #[test]
    fn test_syntax_error_is_backend_failure() {
        let path = AssetPath::new("broken.js").unwrap();
        let err = OxcFast.minify_string("var = ;", Some(&path)).unwrap_err();
        match err {
            AssetError::BackendFailure { program, status, .. } => {
                assert_eq!(program, "oxc-fast");
                assert!(status.contains("broken.js"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_license_comments_in_source_order() {
        let source = "/* a */ /*! keep */ x(); /* @license MIT */ /** @preserve */ /* b */";
        let out = OxcThorough.minify_string(source, None).unwrap();
        assert!(
            out.starts_with("/*! keep */\n/* @license MIT */\n/** @preserve */\n"),
            "{out}"
        );
        assert!(!out.contains("/* a */"));
    }

    #[test]
    fn test_comment_markers_inside_strings_are_not_licenses() {
        let source = "var banner = \"/*! not a comment */\";";
        let out = OxcThorough.minify_string(source, None).unwrap();
        assert!(!out.starts_with("/*!"), "{out}");
        assert!(out.contains("not a comment"));
    }

    #[test]
    fn test_thorough_keeps_top_level_globals() {
        let source =
            "var myGlobalName = 1;\nfunction helperFn(a) { var inner = a + myGlobalName; return inner; }";
        let out = OxcThorough.minify_string(source, None).unwrap();
        assert!(out.contains("myGlobalName"), "{out}");
        assert!(out.contains("helperFn"), "{out}");
        assert!(!out.contains("inner"), "{out}");

        let out = OxcThorough.minify_string("var unused = 1; window.x = 2;", None).unwrap();
        assert!(out.contains("unused"), "{out}");
    }

    #[test]
    fn test_fast_keeps_top_level_globals() {
        let out = OxcFast.minify_string("var shared = 1;\nfunction api() { return shared; }", None).unwrap();
        assert!(out.contains("var shared=1"), "{out}");
        assert!(out.contains("function api()"), "{out}");
    }
}
