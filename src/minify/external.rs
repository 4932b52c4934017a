//! Minifiers running as external processes.
//!
//! Content is piped through stdin and read back from stdout. A non-zero exit
//! fails the call; warnings printed on stderr by a successful run are only
//! logged.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::MinifierBackend;
use crate::asset::AssetPath;
use crate::debug;
use crate::error::AssetError;
use crate::exec::{Cmd, EMPTY_FILTER};

/// Comment pattern forwarded to uglifyjs: license and preservation notices.
pub const LICENSE_COMMENTS: &str = "/^!|@license|@preserve/";

fn decode(program: &str, stdout: Vec<u8>) -> Result<String, AssetError> {
    String::from_utf8(stdout).map_err(|e| AssetError::BackendFailure {
        program: program.to_string(),
        status: "invalid UTF-8 output".to_string(),
        stderr: e.to_string(),
    })
}

// ============================================================================
// uglifyjs
// ============================================================================

/// [uglifyjs](https://github.com/mishoo/UglifyJS): good minification,
/// preserves license comments, needs node.js.
#[derive(Debug, Clone)]
pub struct Uglifyjs {
    /// Program and leading arguments, e.g. `["uglifyjs"]` or `["npx", "uglifyjs"]`.
    command: Vec<String>,
    timeout: Option<Duration>,
}

impl Default for Uglifyjs {
    fn default() -> Self {
        Self::new(vec!["uglifyjs".to_string()])
    }
}

impl Uglifyjs {
    pub fn new(command: Vec<String>) -> Self {
        Self {
            command,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    fn cmd(&self) -> Cmd {
        Cmd::from_slice(&self.command)
            .args(["--mangle", "--compress", "--comments", LICENSE_COMMENTS])
            .timeout(self.timeout)
            .filter(&EMPTY_FILTER)
    }

    fn program(&self) -> &str {
        self.command.first().map_or("uglifyjs", String::as_str)
    }
}

impl MinifierBackend for Uglifyjs {
    fn name(&self) -> &str {
        self.program()
    }

    fn minify_string(&self, content: &str, path: Option<&AssetPath>) -> Result<String, AssetError> {
        if let Some(path) = path {
            debug!("minify"; "{} <- {}", self.program(), path);
        }
        let output = self.cmd().stdin(content).run()?;
        decode(self.program(), output.stdout)
    }

    fn minify_file(&self, file: &Path, outfile: Option<&Path>) -> Result<Option<String>, AssetError> {
        let mut cmd = self.cmd();
        if let Some(out) = outfile {
            cmd = cmd.arg("--output").arg(out);
        }
        let output = cmd.arg(file).run()?;
        match outfile {
            Some(_) => Ok(None),
            None => decode(self.program(), output.stdout).map(Some),
        }
    }
}

// ============================================================================
// YUI compressor
// ============================================================================

/// [YUI compressor](http://yui.github.io/yuicompressor/): fast, moderate
/// compression, preserves license comments, needs java and the jar file.
#[derive(Debug, Clone)]
pub struct YuiCompressor {
    java: OsString,
    jar: PathBuf,
    timeout: Option<Duration>,
}

impl YuiCompressor {
    pub fn new(jar: impl Into<PathBuf>) -> Self {
        Self {
            java: OsString::from("java"),
            jar: jar.into(),
            timeout: None,
        }
    }

    /// Use a specific java executable instead of `java` from `PATH`.
    pub fn with_java(mut self, java: impl Into<OsString>) -> Self {
        self.java = java.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn jar(&self) -> &Path {
        &self.jar
    }

    fn cmd(&self) -> Cmd {
        Cmd::new(&self.java)
            .arg("-jar")
            .arg(&self.jar)
            .args(["--type", "js", "--charset", "UTF-8", "-v"])
            .timeout(self.timeout)
            .filter(&EMPTY_FILTER)
    }
}

impl MinifierBackend for YuiCompressor {
    fn name(&self) -> &str {
        "yui"
    }

    fn minify_string(&self, content: &str, _: Option<&AssetPath>) -> Result<String, AssetError> {
        // yui crashes on empty input
        if content.is_empty() {
            return Ok(String::new());
        }
        let output = self.cmd().stdin(content).run()?;
        decode(self.name(), output.stdout)
    }

    fn minify_file(&self, file: &Path, outfile: Option<&Path>) -> Result<Option<String>, AssetError> {
        let mut cmd = self.cmd();
        if let Some(out) = outfile {
            cmd = cmd.arg("-o").arg(out);
        }
        let output = cmd.arg(file).run()?;
        match outfile {
            Some(_) => Ok(None),
            None => decode(self.name(), output.stdout).map(Some),
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    /// A fake `uglifyjs` that runs `body` as a shell script.
    fn fake_uglify(dir: &Path, body: &str) -> Uglifyjs {
        let script = dir.join("fake-uglify.sh");
        fs::write(&script, body).unwrap();
        Uglifyjs::new(vec!["sh".into(), script.to_string_lossy().into_owned()])
    }

    #[test]
    fn test_uglify_string_roundtrip_through_stdin() {
        let dir = TempDir::new().unwrap();
        let uglify = fake_uglify(dir.path(), "tr 'a-z' 'A-Z'\n");
        assert_eq!(uglify.minify_string("var a;", None).unwrap(), "VAR A;");
    }

    #[test]
    fn test_uglify_receives_mangle_and_comment_flags() {
        let dir = TempDir::new().unwrap();
        let uglify = fake_uglify(dir.path(), "echo \"$@\"\n");
        let out = uglify.minify_string("", None).unwrap();
        assert!(out.contains("--mangle"));
        assert!(out.contains("--compress"));
        assert!(out.contains(LICENSE_COMMENTS));
    }

    #[test]
    fn test_uglify_failure_surfaces_stderr() {
        let dir = TempDir::new().unwrap();
        let uglify = fake_uglify(dir.path(), "echo 'Parse error at 1,4' >&2\nexit 1\n");
        let err = uglify.minify_string("var = ;", None).unwrap_err();
        match err {
            AssetError::BackendFailure { stderr, .. } => assert!(stderr.contains("Parse error")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_uglify_warnings_do_not_fail() {
        let dir = TempDir::new().unwrap();
        let uglify = fake_uglify(dir.path(), "cat\necho 'WARN: dropping unused' >&2\n");
        assert_eq!(uglify.minify_string("x()", None).unwrap(), "x()");
    }

    #[test]
    fn test_uglify_file_with_outfile() {
        let dir = TempDir::new().unwrap();
        // Last argument is the input file; `--output <file>` precedes it
        let uglify = fake_uglify(
            dir.path(),
            "for a; do last=\"$a\"; done\nif [ \"$5\" = \"--output\" ]; then cp \"$last\" \"$6\"; else cat \"$last\"; fi\n",
        );
        let input = dir.path().join("in.js");
        let output = dir.path().join("out.js");
        fs::write(&input, "var c = 3;").unwrap();

        assert_eq!(
            uglify.minify_file(&input, None).unwrap().as_deref(),
            Some("var c = 3;")
        );
        assert_eq!(uglify.minify_file(&input, Some(&output)).unwrap(), None);
        assert_eq!(fs::read_to_string(&output).unwrap(), "var c = 3;");
    }

    #[test]
    fn test_yui_empty_input_skips_process() {
        // java is never invoked, so a bogus executable is fine
        let yui = YuiCompressor::new("missing.jar").with_java("/nonexistent/java");
        assert_eq!(yui.minify_string("", None).unwrap(), "");
        assert!(yui.minify_string("var a;", None).is_err());
    }
}
