//! Command-line interface module.

mod args;

pub use args::{Cli, Commands};

use std::fs;
use std::io::{self, Read, Write};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::{Context, Result};
use rayon::prelude::*;

use crate::asset::{AssetPath, AssetSource, RenderContext};
use crate::config::Config;
use crate::escape::escape;
use crate::exc::register_excformat;
use crate::logger::ProgressLine;
use crate::scripts::Scripts;
use crate::log;

/// Run the parsed command. Everything except `escape` needs a valid
/// configuration.
pub fn run(cli: &Cli) -> Result<()> {
    if let Commands::Escape { text } = &cli.command {
        return escape_text(text.as_deref());
    }

    let mut config = Config::load(cli.config.as_deref())?;
    // One-shot commands keep the cache; `warm` honors `purge_cache`.
    if !matches!(cli.command, Commands::Warm) {
        config.js.purge_cache = false;
    }
    let mut scripts = Scripts::from_config(&config)?;
    register_excformat(scripts.virtuals_mut())?;
    let ctx = RenderContext::default();

    match &cli.command {
        Commands::List { hidden } => {
            let mut out = io::stdout().lock();
            for path in scripts.paths(*hidden) {
                writeln!(out, "{path}")?;
            }
            Ok(())
        }
        Commands::Resolve { urlpath } => {
            println!("{}", scripts.urlpath_to_path(urlpath)?);
            Ok(())
        }
        Commands::Render { urlpath } => {
            print_content(&scripts.render_single(urlpath, &ctx)?)
        }
        Commands::Bundle { output } => {
            let bundle = scripts.render_combined(&ctx)?;
            match output {
                Some(file) => write_output(file, &bundle),
                None => print_content(&bundle),
            }
        }
        Commands::Tags { paths } => {
            let paths = paths
                .iter()
                .map(AssetPath::new)
                .collect::<Result<Vec<_>, _>>()?;
            let tags = scripts.tags(&paths, &ctx)?;
            if !tags.is_empty() {
                println!("{tags}");
            }
            Ok(())
        }
        Commands::Escape { text } => escape_text(text.as_deref()),
        Commands::Warm => warm(&scripts, &ctx),
        Commands::Clean => {
            scripts.purge_cache()?;
            Ok(())
        }
    }
}

fn escape_text(text: Option<&str>) -> Result<()> {
    let escaped = match text {
        Some(text) => escape(text),
        None => {
            let mut input = String::new();
            io::stdin()
                .read_to_string(&mut input)
                .context("Failed to read stdin")?;
            escape(&input)
        }
    };
    println!("{escaped}");
    Ok(())
}

fn print_content(content: &str) -> Result<()> {
    let mut out = io::stdout().lock();
    out.write_all(content.as_bytes())?;
    if !content.ends_with('\n') {
        out.write_all(b"\n")?;
    }
    Ok(())
}

fn write_output(file: &Path, content: &str) -> Result<()> {
    if let Some(parent) = file.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    fs::write(file, content).with_context(|| format!("Failed to write {}", file.display()))?;
    log!("bundle"; "wrote {}", file.display());
    Ok(())
}

/// Convert every file-backed asset in parallel.
fn warm(scripts: &Scripts, ctx: &RenderContext) -> Result<()> {
    if scripts.cache().cachedir().is_none() {
        log!("warm"; "nothing to do: no cachedir configured");
        return Ok(());
    }

    let resolver = scripts.resolver();
    let jobs: Vec<(AssetPath, &'static str)> = scripts
        .paths(true)
        .into_iter()
        .filter_map(|path| match resolver.source(&path) {
            Ok(AssetSource::Real { engine: None, .. }) => Some((path, "js")),
            Ok(AssetSource::Real { engine: Some(_), .. }) => Some((path, "templates")),
            _ => None,
        })
        .collect();

    let count = |kind: &str| jobs.iter().filter(|(_, k)| *k == kind).count();
    let progress = ProgressLine::new(&[("js", count("js")), ("templates", count("templates"))]);
    let failed = AtomicUsize::new(0);

    jobs.par_iter().for_each(|(path, kind)| {
        if let Err(e) = scripts.convert_file(path, ctx) {
            failed.fetch_add(1, Ordering::Relaxed);
            log!("error"; "{}: {:#}", path, e);
        }
        progress.inc(kind);
    });
    progress.finish();

    match failed.into_inner() {
        0 => Ok(()),
        n => anyhow::bail!("{n} of {} assets failed to convert", jobs.len()),
    }
}
