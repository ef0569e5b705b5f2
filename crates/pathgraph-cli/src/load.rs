//! Loading graphs, tables, routes and options from disk.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use pathgraph_resolver::{
    route_table_from_json, Graph, MemoryExecutor, QueryExecutor, ResolveOptions, RouteTable,
    SqliteExecutor,
};
use pathgraph_syntax::{parse_path, PathSet};
use serde_json::Value;

fn read_json(path: &Path) -> Result<Value> {
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

pub fn graph(path: &Path) -> Result<Graph> {
    let value = read_json(path)?;
    Graph::from_json(&value).with_context(|| format!("loading graph {}", path.display()))
}

pub fn routes(path: &Path) -> Result<RouteTable> {
    let value = read_json(path)?;
    route_table_from_json(&value).with_context(|| format!("loading routes {}", path.display()))
}

pub fn options(path: Option<&Path>) -> Result<ResolveOptions> {
    match path {
        Some(path) => Ok(serde_json::from_value(read_json(path)?)
            .with_context(|| format!("loading options {}", path.display()))?),
        None => Ok(ResolveOptions::default()),
    }
}

/// JSON tables, a SQLite database, or no tables at all.
pub fn executor(tables: Option<&Path>, sqlite: Option<&Path>) -> Result<Arc<dyn QueryExecutor>> {
    match (tables, sqlite) {
        (Some(_), Some(_)) => Err(anyhow!("--tables and --sqlite are mutually exclusive")),
        (Some(path), None) => {
            let executor = MemoryExecutor::from_json(read_json(path)?)
                .with_context(|| format!("loading tables {}", path.display()))?;
            Ok(Arc::new(executor))
        }
        (None, Some(path)) => {
            if !path.exists() {
                return Err(anyhow!("no such database: {}", path.display()));
            }
            Ok(Arc::new(SqliteExecutor::open(path)?))
        }
        (None, None) => Ok(Arc::new(MemoryExecutor::new())),
    }
}

/// A request path, either in dot/bracket syntax or as a JSON path-set.
pub fn path_set(text: &str) -> Result<PathSet> {
    if text.trim_start().starts_with('[') && serde_json::from_str::<Value>(text).is_ok() {
        return serde_json::from_str(text).with_context(|| format!("invalid path-set {text}"));
    }
    Ok(parse_path(text)?)
}
