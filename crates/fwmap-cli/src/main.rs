//! fwmap - extract firmware configuration headers through a mapping
//!
//! Prints the parse result as JSON on stdout. Diagnostics go to stderr
//! through `tracing` (`RUST_LOG` overrides `-v`).

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fwmap_core::prelude::*;

#[derive(Parser, Debug)]
#[command(name = "fwmap", version)]
#[command(about = "Parse firmware configuration headers into structured JSON")]
struct Cli {
    /// Configuration headers to parse, in order
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Mapping document (path, http(s) URL or inline JSON); repeatable, later wins
    #[arg(short, long = "mapping", value_name = "LOCATION")]
    mappings: Vec<String>,

    /// Named mapping set (th3d, marlin, ...)
    #[arg(short, long, value_name = "NAME", conflicts_with = "mappings")]
    set: Option<String>,

    /// JSON file with extra mapping sets
    #[arg(long, value_name = "FILE", requires = "set")]
    sets: Option<PathBuf>,

    /// JSON file with parser options
    #[arg(long, value_name = "FILE")]
    options: Option<PathBuf>,

    /// Keep one define registry across all files
    #[arg(long)]
    share_defines: bool,

    /// Identifier seeded before parsing (NAME or NAME=VALUE); repeatable
    #[arg(short = 'D', long = "define", value_name = "NAME[=VALUE]")]
    defines: Vec<String>,

    /// Pretty-print the JSON output
    #[arg(long)]
    pretty: bool,

    /// Log debug output to stderr
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let options = parser_options(&cli)?;
    let parser = build_parser(&cli, options).await?;
    info!(
        "Mapping ready: {} field(s), {} identifier(s), {} wildcard(s)",
        parser.mapping().field_count(),
        parser.index().identifier_count(),
        parser.index().wildcard_count()
    );

    let result = parser
        .parse_paths(&cli.files)
        .await
        .context("Failed to read configuration files")?;

    let json = if cli.pretty {
        serde_json::to_string_pretty(&result)
    } else {
        serde_json::to_string(&result)
    }
    .context("Failed to serialize parse result")?;
    println!("{}", json);

    Ok(())
}

fn parser_options(cli: &Cli) -> Result<ParserOptions> {
    let mut options = match &cli.options {
        Some(path) => ParserOptions::from_file(path)
            .with_context(|| format!("Failed to load options from {}", path.display()))?,
        None => ParserOptions::default(),
    };
    if cli.share_defines {
        options.share_defines_across_files = true;
    }
    options.predefined.extend(cli.defines.iter().cloned());
    Ok(options)
}

async fn build_parser(cli: &Cli, options: ParserOptions) -> Result<ConfigParser> {
    if let Some(set) = &cli.set {
        let sets = match &cli.sets {
            Some(path) => MappingSets::from_file(path)
                .with_context(|| format!("Failed to load mapping sets from {}", path.display()))?,
            None => MappingSets::default(),
        };
        return ConfigParser::for_mapping_set(set, &sets, options)
            .await
            .with_context(|| format!("Failed to load mapping set '{}'", set));
    }

    if cli.mappings.is_empty() {
        bail!("No mapping given: pass --mapping <LOCATION> or --set <NAME>");
    }
    let sources: Vec<MappingSource> = cli.mappings.iter().map(|m| MappingSource::parse(m)).collect();
    ConfigParser::load(&sources, options)
        .await
        .context("Failed to load mapping documents")
}
