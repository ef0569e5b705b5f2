//! Folding resolved pairs into the response envelope, and projecting the
//! envelope back into the plain JSON view a client sees.

use std::collections::HashSet;

use pathgraph_syntax::{join_path, Key, KeySet, Path, PathSet};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

const MAX_PROJECTION_HOPS: usize = 32;

/// A resolved leaf: a plain value or a link to another location.
#[derive(Debug, Clone, PartialEq)]
pub enum Leaf {
    Atom(Value),
    Ref(Path),
}

impl Leaf {
    /// Wire form: links and non-scalar atoms become `$type` sentinels.
    pub fn to_json(&self) -> Value {
        match self {
            Leaf::Atom(value @ (Value::Object(_) | Value::Array(_))) => sentinel("atom", value.clone()),
            Leaf::Atom(value) => value.clone(),
            Leaf::Ref(path) => sentinel("ref", Value::Array(path.iter().map(Key::to_json).collect())),
        }
    }
}

fn sentinel(kind: &str, value: Value) -> Value {
    let mut map = Map::new();
    map.insert("$type".to_string(), Value::from(kind));
    map.insert("value".to_string(), value);
    Value::Object(map)
}

#[derive(Debug, Clone, PartialEq)]
pub struct PathValue {
    pub path: Path,
    pub value: Leaf,
}

impl PathValue {
    pub fn atom(path: Path, value: Value) -> Self {
        Self {
            path,
            value: Leaf::Atom(value),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub tree: Value,
    /// Dotted paths written into `tree`, in first-seen order.
    pub paths: Vec<String>,
}

impl Default for Envelope {
    fn default() -> Self {
        Self {
            tree: Value::Object(Map::new()),
            paths: Vec::new(),
        }
    }
}

impl Envelope {
    /// Deduplicate by joined path (first occurrence wins) and write each
    /// surviving pair into the tree.
    pub fn fold(pairs: impl IntoIterator<Item = PathValue>) -> Self {
        let mut envelope = Envelope::default();
        let mut seen = HashSet::new();
        for pair in pairs {
            let joined = join_path(&pair.path);
            if !seen.insert(joined.clone()) {
                continue;
            }
            if write_at(&mut envelope.tree, &pair.path, pair.value.to_json()) {
                envelope.paths.push(joined);
            } else {
                tracing::warn!(path = %joined, "dropping value that conflicts with an existing leaf");
            }
        }
        envelope
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// The client view of `path_sets`: values at the requested paths, with
    /// links in the tree followed to their targets.
    pub fn project(&self, path_sets: &[PathSet]) -> Value {
        let mut out = Value::Object(Map::new());
        let mut requested = Vec::new();
        for path_set in path_sets {
            self.project_into(&self.tree, path_set, &mut requested, &mut out);
        }
        out
    }

    fn project_into(&self, node: &Value, rest: &[KeySet], requested: &mut Path, out: &mut Value) {
        let Some((segment, tail)) = rest.split_first() else {
            return;
        };
        for key in segment.keys() {
            let Some(child) = node.get(key.to_string()).and_then(|child| self.follow(child)) else {
                continue;
            };
            requested.push(key);
            if tail.is_empty() {
                if let Some(value) = atom_value(child) {
                    write_at(out, requested, value.clone());
                }
            } else {
                self.project_into(child, tail, requested, out);
            }
            requested.pop();
        }
    }

    /// Follow links until a non-link value; `None` when a target is missing
    /// or the chain does not end.
    fn follow<'a>(&'a self, mut value: &'a Value) -> Option<&'a Value> {
        for _ in 0..MAX_PROJECTION_HOPS {
            let Some(target) = ref_target(value) else {
                return Some(value);
            };
            value = lookup(&self.tree, target)?;
        }
        None
    }
}

fn ref_target(value: &Value) -> Option<&Vec<Value>> {
    let map = value.as_object()?;
    if map.get("$type")?.as_str()? != "ref" {
        return None;
    }
    map.get("value")?.as_array()
}

fn lookup<'a>(tree: &'a Value, path: &[Value]) -> Option<&'a Value> {
    let mut node = tree;
    for key in path {
        let key = Key::from_json(key)?;
        node = node.get(key.to_string())?;
    }
    Some(node)
}

/// Atoms project as themselves; `$type: atom` sentinels unwrap; branches
/// do not project.
fn atom_value(value: &Value) -> Option<&Value> {
    match value {
        Value::Object(map) => match map.get("$type").and_then(Value::as_str) {
            Some("atom") => map.get("value"),
            _ => None,
        },
        other => Some(other),
    }
}

/// Write `value` at `path`, creating intermediate objects. Returns false
/// when an intermediate slot holds a leaf or the final slot already exists.
fn write_at(tree: &mut Value, path: &[Key], value: Value) -> bool {
    let Some((last, init)) = path.split_last() else {
        return false;
    };
    let mut node = tree;
    for key in init {
        let child = match node {
            Value::Object(map) => map
                .entry(key.to_string())
                .or_insert_with(|| Value::Object(Map::new())),
            _ => return false,
        };
        if ref_target(child).is_some() || atom_value(child).is_some() {
            return false;
        }
        node = child;
    }
    let Value::Object(map) = node else {
        return false;
    };
    let slot = last.to_string();
    if map.contains_key(&slot) {
        return false;
    }
    map.insert(slot, value);
    true
}
