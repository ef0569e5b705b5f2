//! Pathgraph index structures
//!
//! - [`IntervalSet`]: sorted non-overlapping `[from, to] -> data` records with
//!   binary-search point lookup and contiguous range intersection.
//! - [`RouteTrie`]: route declarations compiled into a trie keyed by literal
//!   keys and wildcard kinds, matched against request path-sets with
//!   backtracking.
//!
//! Both are built once and read-only afterwards; lookups take `&self`.

pub mod interval;
pub mod trie;

pub use interval::{Interval, IntervalError, IntervalSet};
pub use trie::{format_route, Discriminator, RouteError, RouteLeaf, RouteMatch, RouteTrie};
