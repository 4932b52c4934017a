//! jsasset command-line entry point.

use anyhow::Result;
use clap::{ColorChoice, Parser};
use jsasset::cli::{self, Cli};
use jsasset::logger;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }
    logger::set_verbose(cli.verbose);

    cli::run(&cli)
}
