//! Error types for graph construction and path resolution.

use pathgraph_index::RouteError;
use pathgraph_syntax::ExpandError;
use thiserror::Error;

/// Raised while building a graph, a query binding or a route table.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("query on `{table}` needs at least one filter field")]
    EmptyFilters { table: String },

    #[error("field `{field}` is not in the field model of `{table}`")]
    UnknownField { table: String, field: String },

    #[error(transparent)]
    Route(#[from] RouteError),

    #[error("route `{route}`: {message}")]
    InvalidRoute { route: String, message: String },

    #[error("unknown field codec `{0}`")]
    UnknownCodec(String),

    #[error("invalid graph document at `{path}`: {message}")]
    InvalidDocument { path: String, message: String },
}

/// Raised while resolving a request.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("graph undefined at `{0}`")]
    GraphUndefined(String),

    #[error("path `{0}` unexpectedly ended in atom")]
    AtomBeforeEnd(String),

    #[error("cannot resolve to non-atomic value at `{0}`")]
    NonAtomic(String),

    #[error("path `{0}` should have keys for all filter values and a field")]
    MissingQueryKeys(String),

    #[error("field `{field}` not found in model of `{table}`")]
    UnknownField { table: String, field: String },

    #[error("column `{column}` holds a non-scalar key")]
    NonScalarKey { column: String },

    #[error(transparent)]
    Expand(#[from] ExpandError),

    #[error("reference depth {depth} exceeded at `{path}`")]
    ReferenceDepthExceeded { path: String, depth: usize },

    #[error("no route matches `{0}`")]
    NoRoute(String),
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// Executor failure, passed through unchanged.
    #[error(transparent)]
    Executor(anyhow::Error),
}

impl Error {
    /// True for errors raised by this crate, false for executor pass-through.
    pub fn is_domain(&self) -> bool {
        !matches!(self, Error::Executor(_))
    }
}

impl From<ExpandError> for Error {
    fn from(err: ExpandError) -> Self {
        Error::Resolve(ResolveError::Expand(err))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
