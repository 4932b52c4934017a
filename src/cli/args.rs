//! Command-line interface definitions.

use clap::{ColorChoice, Parser, Subcommand};
use std::path::PathBuf;

/// Resolve, minify, cache and bundle javascript assets
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Config file path (default: jsasset.toml, searched upward)
    #[arg(short = 'C', long, global = true, value_hint = clap::ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    /// Print cache and resolution details
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// List asset paths in serving order
    #[command(visible_alias = "ls")]
    List {
        /// Include assets whose name starts with `_`
        #[arg(long)]
        hidden: bool,
    },

    /// Print the asset path a url path resolves to
    Resolve {
        /// Url path below the script prefix, e.g. `lib/app.js`
        urlpath: String,
    },

    /// Print the final content of one asset
    #[command(visible_alias = "r")]
    Render {
        urlpath: String,
    },

    /// Print or write the combined bundle
    #[command(visible_alias = "b")]
    Bundle {
        /// Output file (default: stdout)
        #[arg(short, long, value_hint = clap::ValueHint::FilePath)]
        output: Option<PathBuf>,
    },

    /// Print `<script>` tags with versioned urls
    Tags {
        /// Asset paths (default: all, or the bundle when combining)
        paths: Vec<String>,
    },

    /// Escape text for a javascript string literal
    Escape {
        /// Text to escape (default: stdin)
        text: Option<String>,
    },

    /// Minify every asset ahead of time, filling the cache
    Warm,

    /// Remove the minification cache
    Clean,
}
