//! Pathgraph path vocabulary
//!
//! This crate defines the keys, ranges and key-sets that make up a request
//! path-set, and the dot/bracket syntax used both for request paths and for
//! route declarations (`users[{integers:ids}].name`).

pub mod keyset;
pub mod path_syntax;

pub use keyset::{format_path_set, join_path, ExpandError, Key, KeySet, Path, PathSet, Range};
pub use path_syntax::{
    parse_path, parse_route, RouteElement, RoutePattern, SyntaxError, Wildcard, WildcardKind,
};
