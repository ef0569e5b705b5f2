//! Path-set resolution.
//!
//! Each path-set is walked depth first from the graph root. At every depth
//! the key-set is expanded to concrete keys and each key is resolved against
//! the current node:
//!
//! - atoms end the walk and produce a pair
//! - containers recurse one depth further
//! - references produce a link pair, then resolve the remaining suffix from
//!   the reference target
//! - query bindings and route mounts hand the remaining segments to the
//!   executor and synthesize pairs from the returned rows
//!
//! Sibling keys and separate path-sets fan out concurrently; results are
//! merged in request order, so the first pair for a path is deterministic.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::{try_join_all, BoxFuture, FutureExt};
use pathgraph_syntax::{format_path_set, join_path, Key, KeySet, Path, PathSet};
use serde_json::Value;

use crate::envelope::{Envelope, Leaf, PathValue};
use crate::error::{Error, ResolveError, Result};
use crate::graph::{Graph, Node};
use crate::model::QueryBinding;
use crate::options::ResolveOptions;
use crate::query::{Predicate, Query, QueryExecutor, Row};
use crate::routes::{row_key, row_value, RouteTable};
use crate::source::DataSource;

pub struct Resolver {
    graph: Arc<Graph>,
    executor: Arc<dyn QueryExecutor>,
    options: ResolveOptions,
}

impl Resolver {
    pub fn new(graph: Graph, executor: Arc<dyn QueryExecutor>) -> Self {
        Self {
            graph: Arc::new(graph),
            executor,
            options: ResolveOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ResolveOptions) -> Self {
        self.options = options;
        self
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn options(&self) -> &ResolveOptions {
        &self.options
    }

    /// Resolve every path-set to its (path, leaf) pairs, in request order.
    /// The first error fails the whole call.
    pub async fn resolve(&self, path_sets: &[PathSet]) -> Result<Vec<PathValue>> {
        let walks: Vec<_> = path_sets
            .iter()
            .map(|path_set| {
                tracing::debug!(path = %format_path_set(path_set), "resolving path-set");
                self.walk(Arc::new(path_set.clone()), self.graph.root(), Vec::new(), 0, 0)
            })
            .collect();
        let results = gather(self.options.concurrent, walks).await?;
        Ok(results.into_iter().flatten().collect())
    }

    fn walk<'a>(
        &'a self,
        path_set: Arc<PathSet>,
        node: &'a Node,
        prefix: Path,
        index: usize,
        redirects: usize,
    ) -> BoxFuture<'a, Result<Vec<PathValue>>> {
        async move {
            let Some(segment) = path_set.get(index) else {
                return Err(ResolveError::NonAtomic(join_path(&prefix)).into());
            };
            let steps: Vec<_> = segment
                .keys()
                .into_iter()
                .map(|key| {
                    self.step(Arc::clone(&path_set), node, prefix.clone(), key, index, redirects)
                })
                .collect();
            let results = gather(self.options.concurrent, steps).await?;
            Ok(results.into_iter().flatten().collect())
        }
        .boxed()
    }

    fn step<'a>(
        &'a self,
        path_set: Arc<PathSet>,
        node: &'a Node,
        mut path: Path,
        key: Key,
        index: usize,
        redirects: usize,
    ) -> BoxFuture<'a, Result<Vec<PathValue>>> {
        async move {
            let child = node.child(&key);
            path.push(key);
            let Some(child) = child else {
                return Err(ResolveError::GraphUndefined(join_path(&path)).into());
            };
            let rest = &path_set[index + 1..];

            match child {
                Node::Atom(value) => {
                    if !rest.is_empty() {
                        return Err(ResolveError::AtomBeforeEnd(join_path(&path)).into());
                    }
                    Ok(vec![PathValue::atom(path, value.clone())])
                }
                Node::Ref(reference) => {
                    let link = PathValue {
                        path: path.clone(),
                        value: Leaf::Ref(reference.path.clone()),
                    };
                    if redirects >= self.options.max_reference_depth {
                        return Err(ResolveError::ReferenceDepthExceeded {
                            path: join_path(&path),
                            depth: self.options.max_reference_depth,
                        }
                        .into());
                    }
                    let target: PathSet = reference
                        .path
                        .iter()
                        .cloned()
                        .map(KeySet::Key)
                        .chain(rest.iter().cloned())
                        .collect();
                    tracing::debug!(
                        from = %join_path(&path),
                        to = %format_path_set(&target),
                        "following reference"
                    );
                    let mut out = vec![link];
                    out.extend(
                        self.walk(Arc::new(target), self.graph.root(), Vec::new(), 0, redirects + 1)
                            .await?,
                    );
                    Ok(out)
                }
                Node::Branch(_) | Node::List(_) => {
                    self.walk(Arc::clone(&path_set), child, path, index + 1, redirects)
                        .await
                }
                Node::Query(binding) => self.fetch_binding(binding, rest, path).await,
                Node::Routes(table) => self.fetch_routes(table, rest, path).await,
            }
        }
        .boxed()
    }

    /// `rest` holds one key-set per filter field, then the output field names.
    async fn fetch_binding(
        &self,
        binding: &QueryBinding,
        rest: &[KeySet],
        prefix: Path,
    ) -> Result<Vec<PathValue>> {
        let filters = binding.filters();
        if rest.len() <= filters.len() {
            return Err(ResolveError::MissingQueryKeys(describe(&prefix, rest)).into());
        }
        if rest.len() > filters.len() + 1 {
            let through_field = &rest[..=filters.len()];
            return Err(ResolveError::AtomBeforeEnd(describe(&prefix, through_field)).into());
        }
        let unknown = |name: &str| ResolveError::UnknownField {
            table: binding.table().to_string(),
            field: name.to_string(),
        };

        let mut fields = Vec::new();
        for key in rest[filters.len()].keys() {
            let name = key.to_string();
            let field = binding.field(&name).ok_or_else(|| unknown(&name))?;
            fields.push((key, field));
        }

        let mut query = Query::new(binding.table()).ordered_by(binding.key_column());
        let mut filter_fields = Vec::with_capacity(filters.len());
        for (name, segment) in filters.iter().zip(rest) {
            let field = binding.field(name).ok_or_else(|| unknown(name))?;
            let values: Vec<Value> = segment
                .keys()
                .iter()
                .map(|key| field.codec.serialize(&key.to_json()))
                .collect();
            if values.is_empty() {
                return Ok(Vec::new());
            }
            query = query.with_predicate(Predicate::any_of(field.column.clone(), values));
            filter_fields.push(field);
        }

        let rows = self.fetch(&query).await?;
        let mut out = Vec::with_capacity(rows.len() * fields.len());
        for row in &rows {
            let mut base = prefix.clone();
            for field in &filter_fields {
                base.push(row_key(row, field)?);
            }
            for (name, field) in &fields {
                let mut path = base.clone();
                path.push(name.clone());
                out.push(PathValue::atom(path, row_value(row, field)));
            }
        }
        Ok(out)
    }

    async fn fetch_routes(
        &self,
        table: &RouteTable,
        rest: &[KeySet],
        prefix: Path,
    ) -> Result<Vec<PathValue>> {
        if rest.is_empty() {
            return Err(ResolveError::NonAtomic(join_path(&prefix)).into());
        }
        let plan = table.plan(rest)?;
        let fetches: Vec<_> = plan.queries.iter().map(|query| self.fetch(query)).collect();
        let rows: Vec<Row> = gather(self.options.concurrent, fetches)
            .await?
            .into_iter()
            .flatten()
            .collect();

        Ok(plan
            .pairs(&rows)?
            .into_iter()
            .map(|(suffix, value)| {
                let mut path = prefix.clone();
                path.extend(suffix);
                PathValue::atom(path, value)
            })
            .collect())
    }

    async fn fetch(&self, query: &Query) -> Result<Vec<Row>> {
        tracing::debug!(
            table = %query.table,
            predicates = query.predicates.len(),
            "executing query"
        );
        self.executor.fetch(query).await.map_err(Error::Executor)
    }
}

#[async_trait]
impl DataSource for Resolver {
    async fn get(&self, path_sets: &[PathSet]) -> Result<Envelope> {
        let pairs = self.resolve(path_sets).await?;
        let envelope = Envelope::fold(pairs);
        tracing::debug!(paths = envelope.paths.len(), "folded envelope");
        Ok(envelope)
    }

    async fn set(&self, _envelope: Envelope) -> Result<Envelope> {
        Ok(Envelope::default())
    }

    async fn call(
        &self,
        _function_path: &Path,
        _args: Vec<Value>,
        _ref_suffixes: Vec<PathSet>,
        _this_paths: Vec<PathSet>,
    ) -> Result<Envelope> {
        Ok(Envelope::default())
    }
}

/// Await every future, concurrently or one at a time, stopping at the first error.
async fn gather<F, T>(concurrent: bool, futures: Vec<F>) -> Result<Vec<T>>
where
    F: Future<Output = Result<T>>,
{
    if concurrent {
        return try_join_all(futures).await;
    }
    let mut out = Vec::with_capacity(futures.len());
    for future in futures {
        out.push(future.await?);
    }
    Ok(out)
}

fn describe(prefix: &[Key], rest: &[KeySet]) -> String {
    match (prefix.is_empty(), rest.is_empty()) {
        (_, true) => join_path(prefix),
        (true, false) => format_path_set(rest),
        (false, false) => format!("{}.{}", join_path(prefix), format_path_set(rest)),
    }
}
