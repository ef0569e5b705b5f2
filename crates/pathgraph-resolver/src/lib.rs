//! Pathgraph resolver
//!
//! Resolves path-set requests against a graph whose leaves may be plain
//! values, references to other locations, or query-backed subtrees:
//!
//! ```text
//!   path-sets ──► Resolver ──► graph walk ──► (path, leaf) pairs ──► Envelope
//!                                  │
//!                     ┌────────────┴────────────┐
//!                     ▼                         ▼
//!               QueryBinding               RouteTable
//!            (filters + fields)      (route trie + field models)
//!                     └────────────┬────────────┘
//!                                  ▼
//!                            QueryExecutor
//!                     (MemoryExecutor / SqliteExecutor)
//! ```
//!
//! ```no_run
//! use std::sync::Arc;
//! use pathgraph_resolver::{DataSource, Graph, MemoryExecutor, Resolver};
//! use pathgraph_syntax::parse_path;
//!
//! # async fn demo() -> anyhow::Result<()> {
//! let graph = Graph::from_json(&serde_json::json!({"foo": 12}))?;
//! let resolver = Resolver::new(graph, Arc::new(MemoryExecutor::new()));
//! let envelope = resolver.get(&[parse_path("foo")?]).await?;
//! assert_eq!(envelope.paths, vec!["foo"]);
//! # Ok(())
//! # }
//! ```

pub mod envelope;
pub mod error;
pub mod graph;
pub mod model;
pub mod options;
pub mod query;
pub mod resolve;
pub mod routes;
pub mod source;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use envelope::{Envelope, Leaf, PathValue};
pub use error::{ConfigError, Error, ResolveError, Result};
pub use graph::{route_table_from_json, Graph, Node, Reference};
pub use model::{codec_by_name, BoolInt, Field, FieldCodec, FieldModel, Identity, NumericText, QueryBinding};
pub use options::ResolveOptions;
pub use query::{MemoryExecutor, Predicate, Query, QueryExecutor, Row};
pub use resolve::Resolver;
pub use routes::{RouteDef, RoutePlan, RouteTable};
pub use source::DataSource;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteExecutor;
