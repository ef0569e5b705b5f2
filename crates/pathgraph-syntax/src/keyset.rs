//! Key-set vocabulary shared by the trie, the resolver and the wire shape.
//!
//! A request into the graph is a *path-set*: an ordered list of key-sets, one
//! per depth. A key-set denotes one or more keys at that depth:
//!
//! - a scalar [`Key`] (`"foo"`, `3`, `true`, `null`)
//! - a [`Range`] of consecutive integers (`{"from": 2, "to": 3}`)
//! - a list of key-sets, flattened recursively
//!
//! On the wire key-sets are plain JSON: scalars, arrays, or range objects with
//! `from`/`to`/`length` members.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// ============================================================================
// Keys
// ============================================================================

/// A single concrete key at one depth of the graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Key {
    Integer(i64),
    Bool(bool),
    String(String),
    Null,
}

impl Key {
    /// Integer view of the key: integers, and strings holding a canonical integer.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Key::Integer(n) => Some(*n),
            Key::String(s) => {
                let n = s.trim().parse::<i64>().ok()?;
                Some(n)
            }
            Key::Bool(_) | Key::Null => None,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Key::Integer(n) => serde_json::Value::from(*n),
            Key::Bool(b) => serde_json::Value::Bool(*b),
            Key::String(s) => serde_json::Value::String(s.clone()),
            Key::Null => serde_json::Value::Null,
        }
    }

    /// Scalar JSON values become keys; arrays and objects do not.
    ///
    /// Non-integral numbers are kept by their decimal text so they still
    /// address a unique location.
    pub fn from_json(value: &serde_json::Value) -> Option<Key> {
        match value {
            serde_json::Value::Null => Some(Key::Null),
            serde_json::Value::Bool(b) => Some(Key::Bool(*b)),
            serde_json::Value::Number(n) => Some(match n.as_i64() {
                Some(i) => Key::Integer(i),
                None => Key::String(n.to_string()),
            }),
            serde_json::Value::String(s) => Some(Key::String(s.clone())),
            serde_json::Value::Array(_) | serde_json::Value::Object(_) => None,
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Integer(n) => write!(f, "{n}"),
            Key::Bool(b) => write!(f, "{b}"),
            Key::String(s) => f.write_str(s),
            Key::Null => f.write_str("null"),
        }
    }
}

impl From<&str> for Key {
    fn from(value: &str) -> Self {
        Key::String(value.to_string())
    }
}

impl From<String> for Key {
    fn from(value: String) -> Self {
        Key::String(value)
    }
}

impl From<i64> for Key {
    fn from(value: i64) -> Self {
        Key::Integer(value)
    }
}

impl From<bool> for Key {
    fn from(value: bool) -> Self {
        Key::Bool(value)
    }
}

/// A concrete, fully expanded path.
pub type Path = Vec<Key>;

/// Dotted rendering used for dedup and for the envelope's `paths` list.
pub fn join_path(path: &[Key]) -> String {
    path.iter()
        .map(Key::to_string)
        .collect::<Vec<_>>()
        .join(".")
}

// ============================================================================
// Ranges
// ============================================================================

/// Inclusive integer range. `to < from` denotes the empty range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RangeSpec", into = "RangeSpec")]
pub struct Range {
    from: i64,
    to: i64,
}

impl Range {
    pub const fn new(from: i64, to: i64) -> Self {
        Self { from, to }
    }

    /// `length` keys starting at `from`; `None` when the last key would not
    /// fit in an `i64`.
    pub fn with_length(from: i64, length: i64) -> Option<Self> {
        let to = if length > 0 {
            from.checked_add(length - 1)?
        } else {
            from.checked_sub(1)?
        };
        Some(Self { from, to })
    }

    pub const fn from(&self) -> i64 {
        self.from
    }

    pub const fn to(&self) -> i64 {
        self.to
    }

    pub fn is_empty(&self) -> bool {
        self.to < self.from
    }

    pub fn len(&self) -> usize {
        if self.is_empty() {
            0
        } else {
            let span = (i128::from(self.to) - i128::from(self.from)) as u128 + 1;
            usize::try_from(span).unwrap_or(usize::MAX)
        }
    }

    pub fn contains(&self, value: i64) -> bool {
        self.from <= value && value <= self.to
    }

    pub fn iter(&self) -> std::ops::RangeInclusive<i64> {
        self.from..=self.to
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.from, self.to)
    }
}

/// Wire shape of a range: `from` defaults to 0, exactly one of `to`
/// (inclusive) or `length` is expected.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RangeSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    from: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    to: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    length: Option<i64>,
}

impl TryFrom<RangeSpec> for Range {
    type Error = String;

    fn try_from(spec: RangeSpec) -> Result<Self, Self::Error> {
        let from = spec.from.unwrap_or(0);
        match (spec.to, spec.length) {
            (Some(to), _) => Ok(Range::new(from, to)),
            (None, Some(length)) => Range::with_length(from, length)
                .ok_or_else(|| format!("range of length {length} from {from} overflows")),
            (None, None) => Err("range needs either `to` or `length`".to_string()),
        }
    }
}

impl From<Range> for RangeSpec {
    fn from(range: Range) -> Self {
        RangeSpec {
            from: Some(range.from),
            to: Some(range.to),
            length: None,
        }
    }
}

// ============================================================================
// Key-sets
// ============================================================================

/// One or more keys at a single depth.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KeySet {
    Key(Key),
    Range(Range),
    List(Vec<KeySet>),
}

/// A request into the graph: one key-set per depth.
pub type PathSet = Vec<KeySet>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExpandError {
    #[error("cannot expand `{0}` to integers")]
    NotIntegers(String),
    #[error("cannot expand `{0}` to ranges")]
    NotRanges(String),
}

impl KeySet {
    /// Every concrete key the key-set denotes, in order. Ranges become integers.
    pub fn keys(&self) -> Vec<Key> {
        let mut out = Vec::new();
        self.collect_keys(&mut out);
        out
    }

    fn collect_keys(&self, out: &mut Vec<Key>) {
        match self {
            KeySet::Key(key) => out.push(key.clone()),
            KeySet::Range(range) => out.extend(range.iter().map(Key::Integer)),
            KeySet::List(items) => {
                for item in items {
                    item.collect_keys(out);
                }
            }
        }
    }

    /// True when every key denoted is an integer (or a numeric string).
    pub fn is_numeric(&self) -> bool {
        match self {
            KeySet::Key(key) => key.as_integer().is_some(),
            KeySet::Range(_) => true,
            KeySet::List(items) => items.iter().all(KeySet::is_numeric),
        }
    }

    pub fn integers(&self) -> Result<Vec<i64>, ExpandError> {
        let mut out = Vec::new();
        self.collect_integers(&mut out)
            .map_err(|_| ExpandError::NotIntegers(self.to_string()))?;
        Ok(out)
    }

    fn collect_integers(&self, out: &mut Vec<i64>) -> Result<(), ()> {
        match self {
            KeySet::Key(key) => out.push(key.as_integer().ok_or(())?),
            KeySet::Range(range) => out.extend(range.iter()),
            KeySet::List(items) => {
                for item in items {
                    item.collect_integers(out)?;
                }
            }
        }
        Ok(())
    }

    /// Coalesced integer runs. Adjacent ascending integers merge into one
    /// range; explicit ranges pass through untouched.
    pub fn ranges(&self) -> Result<Vec<Range>, ExpandError> {
        let mut builder = RunBuilder::default();
        builder
            .push_keyset(self)
            .map_err(|_| ExpandError::NotRanges(self.to_string()))?;
        Ok(builder.finish())
    }
}

#[derive(Default)]
struct RunBuilder {
    out: Vec<Range>,
    open: Option<Range>,
}

impl RunBuilder {
    fn push_keyset(&mut self, keyset: &KeySet) -> Result<(), ()> {
        match keyset {
            KeySet::Key(key) => {
                let n = key.as_integer().ok_or(())?;
                self.push_integer(n);
            }
            KeySet::Range(range) => {
                self.close();
                self.out.push(*range);
            }
            KeySet::List(items) => {
                for item in items {
                    self.push_keyset(item)?;
                }
            }
        }
        Ok(())
    }

    fn push_integer(&mut self, n: i64) {
        match &mut self.open {
            Some(run) if run.to.checked_add(1) == Some(n) => run.to = n,
            _ => {
                self.close();
                self.open = Some(Range::new(n, n));
            }
        }
    }

    fn close(&mut self) {
        if let Some(run) = self.open.take() {
            self.out.push(run);
        }
    }

    fn finish(mut self) -> Vec<Range> {
        self.close();
        self.out
    }
}

impl fmt::Display for KeySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeySet::Key(key) => write!(f, "{key}"),
            KeySet::Range(range) => write!(f, "{range}"),
            KeySet::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
        }
    }
}

/// Human-readable rendering of a path-set for error messages.
pub fn format_path_set(path_set: &[KeySet]) -> String {
    path_set
        .iter()
        .map(KeySet::to_string)
        .collect::<Vec<_>>()
        .join(".")
}

impl From<Key> for KeySet {
    fn from(key: Key) -> Self {
        KeySet::Key(key)
    }
}

impl From<&str> for KeySet {
    fn from(value: &str) -> Self {
        KeySet::Key(Key::from(value))
    }
}

impl From<i64> for KeySet {
    fn from(value: i64) -> Self {
        KeySet::Key(Key::Integer(value))
    }
}

impl From<Range> for KeySet {
    fn from(range: Range) -> Self {
        KeySet::Range(range)
    }
}

impl<T: Into<KeySet>> From<Vec<T>> for KeySet {
    fn from(items: Vec<T>) -> Self {
        KeySet::List(items.into_iter().map(Into::into).collect())
    }
}
