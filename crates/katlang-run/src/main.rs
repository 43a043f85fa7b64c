//! KatLang Run - evaluates a program and prints its value
//!
//! The program comes from a file, from `--expr`, or from standard input.
//! Diagnostics go to stderr and make the process exit with status 1.
//!
//! Usage: katlang-run [FILE] [--expr SOURCE] [--library DIR] [--json]

#![cfg_attr(test, allow(clippy::unwrap_used))]

use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process;

use anyhow::{bail, Context, Result};
use clap::Parser;
use katlang::{Diagnostic, EngineOptions, FileLoader};
use serde::Serialize;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "katlang-run")]
#[command(about = "Evaluate a KatLang program")]
struct Cli {
    /// Program file; standard input when neither this nor --expr is given
    file: Option<PathBuf>,

    /// Evaluate SOURCE instead of reading a file
    #[arg(short, long, value_name = "SOURCE", conflicts_with = "file")]
    expr: Option<String>,

    /// Directory serving `load` and `join` addresses
    #[arg(long, value_name = "DIR")]
    library: Option<PathBuf>,

    /// Directory `open` paths are resolved against
    #[arg(long, value_name = "DIR")]
    root: Option<PathBuf>,

    /// Print the value and diagnostics as JSON
    #[arg(long)]
    json: bool,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, default_value = "warn")]
    log_level: String,
}

/// Machine-readable result.
#[derive(Serialize)]
struct Report<'a> {
    value: String,
    diagnostics: &'a [Diagnostic],
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("warn,katlang={level},katlang_run={level}")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn read_program(cli: &Cli) -> Result<(String, String)> {
    if let Some(source) = &cli.expr {
        return Ok((source.clone(), "<expr>".to_string()));
    }
    match &cli.file {
        Some(path) => {
            let source = fs::read_to_string(path)
                .with_context(|| format!("failed to read '{}'", path.display()))?;
            Ok((source, path.display().to_string()))
        }
        None => {
            let mut source = String::new();
            io::stdin()
                .read_to_string(&mut source)
                .context("failed to read standard input")?;
            Ok((source, "<stdin>".to_string()))
        }
    }
}

fn run(cli: &Cli) -> Result<bool> {
    let (source, name) = read_program(cli)?;
    info!("Evaluating: {} ({} bytes)", name, source.len());

    let mut options = EngineOptions::new();
    if let Some(library) = &cli.library {
        if !library.is_dir() {
            bail!("library '{}' is not a directory", library.display());
        }
        options = options.with_loader(FileLoader::new(library));
    }
    if let Some(root) = &cli.root {
        options = options.with_open_root(root);
    } else if let Some(parent) = cli.file.as_ref().and_then(|file| file.parent()) {
        options = options.with_open_root(parent);
    }
    debug!(?options, "engine options");

    let outcome = katlang::parse_with(&source, &options);

    if cli.json {
        let report = Report {
            value: outcome.render(),
            diagnostics: &outcome.diagnostics,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if outcome.is_ok() {
        println!("{}", outcome.render());
    } else {
        eprintln!("{}", outcome.report(&source, &name));
    }

    info!("{} diagnostic(s)", outcome.diagnostics.len());
    Ok(outcome.is_ok())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    if !run(&cli)? {
        process::exit(1);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_expr_conflicts_with_file() {
        assert!(Cli::try_parse_from(["katlang-run", "a.kat", "--expr", "1+1"]).is_err());
        let cli = Cli::try_parse_from(["katlang-run", "--expr", "1+1", "--json"]).unwrap();
        assert_eq!(cli.expr.as_deref(), Some("1+1"));
        assert!(cli.json);
        assert_eq!(cli.log_level, "warn");
    }

    #[test]
    fn test_report_shape() {
        let outcome = katlang::parse("(2+3");
        let report = Report {
            value: outcome.render(),
            diagnostics: &outcome.diagnostics,
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["value"], "");
        assert_eq!(json["diagnostics"].as_array().map(Vec::len), Some(1));
    }
}
