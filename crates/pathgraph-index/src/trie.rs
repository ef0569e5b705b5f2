//! RouteTrie: compiled route declarations, matched against request path-sets.
//!
//! Each trie edge is a [`Discriminator`]: a literal key, or one of the three
//! wildcard kinds. Literal numeric ranges declared in routes
//! (`never[1..4].you`) live in a per-node [`IntervalSet`] instead of the edge
//! map, so a request segment like `2` or `[2, 3]` can find the declared range
//! containing it.
//!
//! Matching tries, at every depth and in order:
//!
//! 1. the literal child for a scalar key
//! 2. for number-shaped segments: the literal range child, then `{integers}`,
//!    then `{ranges}`
//! 3. `{keys}`
//!
//! A dead end deeper in the trie falls back to the next alternative at the
//! shallower depth.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use pathgraph_syntax::{
    parse_route, ExpandError, Key, KeySet, RouteElement, RoutePattern, SyntaxError, WildcardKind,
};
use thiserror::Error;

use crate::interval::{IntervalError, IntervalSet};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Discriminator {
    Literal(String),
    Integers,
    Ranges,
    Keys,
}

impl From<WildcardKind> for Discriminator {
    fn from(kind: WildcardKind) -> Self {
        match kind {
            WildcardKind::Integers => Discriminator::Integers,
            WildcardKind::Ranges => Discriminator::Ranges,
            WildcardKind::Keys => Discriminator::Keys,
        }
    }
}

#[derive(Debug, Error)]
pub enum RouteError {
    #[error("a route already exists at `{0}`")]
    Duplicate(String),
    #[error("invalid literal range in route `{route}`: {source}")]
    Range {
        route: String,
        #[source]
        source: IntervalError,
    },
    #[error("empty literal range in route `{0}`")]
    EmptyRange(String),
    #[error(transparent)]
    Syntax(#[from] SyntaxError),
}

/// A registered route: the declared pattern and its payload.
#[derive(Debug)]
pub struct RouteLeaf<T> {
    pub pattern: RoutePattern,
    pub data: T,
}

/// Result of a successful match.
#[derive(Debug)]
pub struct RouteMatch<'a, T> {
    /// One key-set per request segment, expanded according to the edge taken:
    /// literal segments are kept as requested, `{integers}` and `{keys}` become
    /// lists of keys, `{ranges}` becomes a list of coalesced ranges.
    pub path: Vec<KeySet>,
    /// Named wildcard → the key-set bound at its position.
    pub bindings: BTreeMap<String, KeySet>,
    pub leaf: &'a RouteLeaf<T>,
}

impl<'a, T> RouteMatch<'a, T> {
    pub fn data(&self) -> &'a T {
        &self.leaf.data
    }
}

struct TrieNode<T> {
    children: HashMap<Discriminator, TrieNode<T>>,
    range_index: IntervalSet<usize>,
    range_children: Vec<TrieNode<T>>,
    leaf: Option<Arc<RouteLeaf<T>>>,
}

impl<T> Default for TrieNode<T> {
    fn default() -> Self {
        Self {
            children: HashMap::new(),
            range_index: IntervalSet::new(),
            range_children: Vec::new(),
            leaf: None,
        }
    }
}

impl<T> Clone for TrieNode<T> {
    fn clone(&self) -> Self {
        Self {
            children: self.children.clone(),
            range_index: self.range_index.clone(),
            range_children: self.range_children.clone(),
            leaf: self.leaf.clone(),
        }
    }
}

/// Reversed segments (deepest first) plus the leaf reached.
type Descent<'a, T> = Option<(Vec<KeySet>, &'a RouteLeaf<T>)>;

pub struct RouteTrie<T> {
    root: TrieNode<T>,
    routes: usize,
}

impl<T> Default for RouteTrie<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> RouteTrie<T> {
    pub fn new() -> Self {
        Self {
            root: TrieNode::default(),
            routes: 0,
        }
    }

    /// Number of registered routes.
    pub fn len(&self) -> usize {
        self.routes
    }

    pub fn is_empty(&self) -> bool {
        self.routes == 0
    }

    /// Parse and register a route string.
    pub fn insert(&mut self, route: &str, data: T) -> Result<(), RouteError> {
        let pattern = parse_route(route)?;
        self.insert_pattern(pattern, data)
    }

    pub fn insert_pattern(&mut self, pattern: RoutePattern, data: T) -> Result<(), RouteError> {
        let leaf = Arc::new(RouteLeaf { pattern, data });
        // Staged so a failing list member leaves no partial branches behind.
        let mut staged = self.root.clone();
        insert_at(&mut staged, &leaf, 0)?;
        self.root = staged;
        self.routes += 1;
        tracing::debug!(route = %format_route(&leaf.pattern), "registered route");
        Ok(())
    }

    /// Match a full request path-set. `Ok(None)` means no route covers it.
    pub fn find(&self, path: &[KeySet]) -> Result<Option<RouteMatch<'_, T>>, ExpandError> {
        let Some((mut segments, leaf)) = match_at(&self.root, path, 0)? else {
            return Ok(None);
        };
        segments.reverse();

        let bindings: BTreeMap<String, KeySet> = leaf
            .pattern
            .iter()
            .zip(&segments)
            .filter_map(|(element, segment)| match element {
                RouteElement::Wildcard(wildcard) => wildcard
                    .name
                    .as_ref()
                    .map(|name| (name.clone(), segment.clone())),
                RouteElement::Literal { .. } => None,
            })
            .collect();

        Ok(Some(RouteMatch {
            path: segments,
            bindings,
            leaf,
        }))
    }
}

enum Literal<'a> {
    Key(&'a Key),
    Range(pathgraph_syntax::Range),
}

fn literal_members<'a>(keys: &'a KeySet, out: &mut Vec<Literal<'a>>) {
    match keys {
        KeySet::Key(key) => out.push(Literal::Key(key)),
        KeySet::Range(range) => out.push(Literal::Range(*range)),
        KeySet::List(items) => {
            for item in items {
                literal_members(item, out);
            }
        }
    }
}

fn insert_at<T>(
    node: &mut TrieNode<T>,
    leaf: &Arc<RouteLeaf<T>>,
    index: usize,
) -> Result<(), RouteError> {
    let Some(element) = leaf.pattern.get(index) else {
        if node.leaf.is_some() {
            return Err(RouteError::Duplicate(format_route(&leaf.pattern)));
        }
        node.leaf = Some(Arc::clone(leaf));
        return Ok(());
    };

    match element {
        RouteElement::Wildcard(wildcard) => {
            let child = node
                .children
                .entry(Discriminator::from(wildcard.kind))
                .or_default();
            insert_at(child, leaf, index + 1)
        }
        RouteElement::Literal { keys } => {
            let mut members = Vec::new();
            literal_members(keys, &mut members);
            for member in members {
                match member {
                    Literal::Key(key) => {
                        let child = node
                            .children
                            .entry(Discriminator::Literal(key.to_string()))
                            .or_default();
                        insert_at(child, leaf, index + 1)?;
                    }
                    Literal::Range(range) => {
                        let slot = range_slot(node, range, &leaf.pattern)?;
                        insert_at(&mut node.range_children[slot], leaf, index + 1)?;
                    }
                }
            }
            Ok(())
        }
    }
}

/// Child slot for a literal range; the identical range reuses its slot.
fn range_slot<T>(
    node: &mut TrieNode<T>,
    range: pathgraph_syntax::Range,
    pattern: &RoutePattern,
) -> Result<usize, RouteError> {
    if range.is_empty() {
        return Err(RouteError::EmptyRange(format_route(pattern)));
    }
    if let Some(existing) = node.range_index.find(range.from()) {
        if existing.from == range.from() && existing.to == range.to() {
            return Ok(existing.data);
        }
    }
    let slot = node.range_children.len();
    node.range_index
        .add(range.from(), range.to(), slot)
        .map_err(|source| RouteError::Range {
            route: format_route(pattern),
            source,
        })?;
    node.range_children.push(TrieNode::default());
    Ok(slot)
}

fn match_at<'a, T>(
    node: &'a TrieNode<T>,
    path: &[KeySet],
    index: usize,
) -> Result<Descent<'a, T>, ExpandError> {
    let Some(segment) = path.get(index) else {
        return Ok(node.leaf.as_deref().map(|leaf| (Vec::new(), leaf)));
    };

    if let KeySet::Key(key) = segment {
        if let Some(child) = node.children.get(&Discriminator::Literal(key.to_string())) {
            if let Some(found) = descend(child, path, index, || Ok(segment.clone()))? {
                return Ok(Some(found));
            }
        }
    }

    if segment.is_numeric() {
        if let Some(child) = range_child(node, segment)? {
            if let Some(found) = descend(child, path, index, || Ok(segment.clone()))? {
                return Ok(Some(found));
            }
        }
        if let Some(child) = node.children.get(&Discriminator::Integers) {
            let expand = || -> Result<KeySet, ExpandError> {
                let integers = segment.integers()?;
                Ok(KeySet::List(integers.into_iter().map(KeySet::from).collect()))
            };
            if let Some(found) = descend(child, path, index, expand)? {
                return Ok(Some(found));
            }
        }
        if let Some(child) = node.children.get(&Discriminator::Ranges) {
            let expand = || -> Result<KeySet, ExpandError> {
                let ranges = segment.ranges()?;
                Ok(KeySet::List(ranges.into_iter().map(KeySet::Range).collect()))
            };
            if let Some(found) = descend(child, path, index, expand)? {
                return Ok(Some(found));
            }
        }
    }

    if let Some(child) = node.children.get(&Discriminator::Keys) {
        let expand = || Ok(KeySet::List(segment.keys().into_iter().map(KeySet::Key).collect()));
        if let Some(found) = descend(child, path, index, expand)? {
            return Ok(Some(found));
        }
    }

    Ok(None)
}

fn descend<'a, T>(
    child: &'a TrieNode<T>,
    path: &[KeySet],
    index: usize,
    expand: impl FnOnce() -> Result<KeySet, ExpandError>,
) -> Result<Descent<'a, T>, ExpandError> {
    let Some((mut segments, leaf)) = match_at(child, path, index + 1)? else {
        return Ok(None);
    };
    segments.push(expand()?);
    Ok(Some((segments, leaf)))
}

/// The single literal range child covering every integer of `segment`.
fn range_child<'a, T>(
    node: &'a TrieNode<T>,
    segment: &KeySet,
) -> Result<Option<&'a TrieNode<T>>, ExpandError> {
    if node.range_index.is_empty() {
        return Ok(None);
    }
    let mut slot = None;
    for run in segment.ranges()? {
        if run.is_empty() {
            continue;
        }
        let fragments = node.range_index.intersection(run.from(), run.to());
        if fragments.is_empty() {
            return Ok(None);
        }
        for fragment in fragments {
            match slot {
                None => slot = Some(*fragment.data),
                Some(current) if current == *fragment.data => {}
                Some(_) => return Ok(None),
            }
        }
    }
    Ok(slot.map(|slot| &node.range_children[slot]))
}

/// Route rendering for diagnostics: `users[{integers:ids}].name`.
pub fn format_route(pattern: &[RouteElement]) -> String {
    let mut out = String::new();
    for (i, element) in pattern.iter().enumerate() {
        match element {
            RouteElement::Literal {
                keys: KeySet::Key(key),
            } => {
                if i > 0 {
                    out.push('.');
                }
                out.push_str(&key.to_string());
            }
            RouteElement::Literal { keys } => out.push_str(&format!("[{keys}]")),
            RouteElement::Wildcard(wildcard) => match &wildcard.name {
                Some(name) => out.push_str(&format!("[{{{}:{name}}}]", wildcard.kind.as_str())),
                None => out.push_str(&format!("[{{{}}}]", wildcard.kind.as_str())),
            },
        }
    }
    out
}
