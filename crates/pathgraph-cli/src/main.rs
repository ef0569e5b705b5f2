//! Pathgraph CLI
//!
//! - `get`: resolve paths against a graph document and print the envelope
//! - `parse`: show how a path or route string parses
//! - `match`: match a path against a route file and show the bindings

use std::path::PathBuf;

use anyhow::{anyhow, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use pathgraph_resolver::{DataSource, Resolver};
use pathgraph_syntax::{format_path_set, parse_path, parse_route};
use serde_json::json;
use tracing_subscriber::EnvFilter;

mod load;

#[derive(Parser)]
#[command(name = "pathgraph")]
#[command(author, version, about = "Resolve path queries over reference-linked, query-backed graphs")]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace). `RUST_LOG` takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve one or more paths and print the envelope as JSON.
    Get(GetArgs),

    /// Parse a path (or, with `--route`, a route) and print it as JSON.
    Parse {
        text: String,
        #[arg(long)]
        route: bool,
    },

    /// Match a path against a routes file.
    Match {
        /// Routes (JSON array of `{"route", "table", "fields"}`)
        #[arg(long)]
        routes: PathBuf,
        path: String,
    },
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "pathgraph_resolver=debug,pathgraph_index=debug,info",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Get(args) => cmd_get(args),
        Commands::Parse { text, route } => cmd_parse(&text, route),
        Commands::Match { routes, path } => cmd_match(&routes, &path),
    }
}

#[derive(Args)]
struct GetArgs {
    /// Graph document (JSON)
    #[arg(long)]
    graph: PathBuf,
    /// Tables for query-backed subtrees, as `{"table": [rows...]}`
    #[arg(long, conflicts_with = "sqlite")]
    tables: Option<PathBuf>,
    /// SQLite database for query-backed subtrees
    #[arg(long)]
    sqlite: Option<PathBuf>,
    /// Resolve options (JSON)
    #[arg(long)]
    options: Option<PathBuf>,
    /// Override `max_reference_depth`
    #[arg(long)]
    max_reference_depth: Option<usize>,
    /// Resolve keys one at a time
    #[arg(long)]
    sequential: bool,
    /// Print the client view of the requested paths instead of the envelope
    #[arg(long)]
    project: bool,
    /// Paths such as `bar.someValues[2...4].value`, or JSON path-sets
    #[arg(required = true)]
    paths: Vec<String>,
}

fn cmd_get(args: GetArgs) -> Result<()> {
    let graph = load::graph(&args.graph)?;
    let executor = load::executor(args.tables.as_deref(), args.sqlite.as_deref())?;
    let mut options = load::options(args.options.as_deref())?;
    if let Some(depth) = args.max_reference_depth {
        options.max_reference_depth = depth;
    }
    if args.sequential {
        options.concurrent = false;
    }
    let path_sets = args
        .paths
        .iter()
        .map(|text| load::path_set(text))
        .collect::<Result<Vec<_>>>()?;

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| anyhow!("failed to initialize tokio runtime: {e}"))?;

    let resolver = Resolver::new(graph, executor).with_options(options);
    let envelope = rt.block_on(resolver.get(&path_sets))?;

    eprintln!(
        "{} resolved {} path(s) from {} request(s)",
        "ok".green().bold(),
        envelope.paths.len(),
        path_sets.len()
    );
    let output = if args.project {
        envelope.project(&path_sets)
    } else {
        serde_json::to_value(&envelope)?
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn cmd_parse(text: &str, route: bool) -> Result<()> {
    let output = if route {
        serde_json::to_value(parse_route(text)?)?
    } else {
        serde_json::to_value(parse_path(text)?)?
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn cmd_match(routes: &std::path::Path, path: &str) -> Result<()> {
    let table = load::routes(routes)?;
    let path_set = load::path_set(path)?;
    let Some(found) = table.trie().find(&path_set)? else {
        eprintln!("{} no route matches {}", "miss".yellow().bold(), format_path_set(&path_set));
        std::process::exit(1);
    };
    let def = found.data();
    eprintln!("{} {}", "matched".green().bold(), def.route.bold());
    let output = json!({
        "route": def.route,
        "table": def.table,
        "path": found.path,
        "bindings": found.bindings,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
