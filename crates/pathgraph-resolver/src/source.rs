use async_trait::async_trait;
use pathgraph_syntax::{Path, PathSet};
use serde_json::Value;

use crate::envelope::Envelope;
use crate::error::Result;

/// The three entry points a client drives.
#[async_trait]
pub trait DataSource: Send + Sync {
    async fn get(&self, path_sets: &[PathSet]) -> Result<Envelope>;

    /// Writes are not supported; always returns an empty envelope.
    async fn set(&self, envelope: Envelope) -> Result<Envelope>;

    /// Function calls are not supported; always returns an empty envelope.
    async fn call(
        &self,
        function_path: &Path,
        args: Vec<Value>,
        ref_suffixes: Vec<PathSet>,
        this_paths: Vec<PathSet>,
    ) -> Result<Envelope>;
}
