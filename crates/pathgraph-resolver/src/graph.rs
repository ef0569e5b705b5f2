//! The graph being resolved, and its JSON document form.
//!
//! Plain JSON objects and arrays are containers, scalars are atoms. Objects
//! carrying a `$type` member are sentinels:
//!
//! ```json
//! {"$type": "ref", "value": ["bar", "someValues"]}
//! {"$type": "atom", "value": {"any": "json"}}
//! {"$type": "query", "table": "users", "filters": ["id"], "key": "id",
//!  "fields": {"id": "user_id", "active": {"column": "is_active", "codec": "bool_int"}}}
//! {"$type": "routes", "routes": [{"route": "byName[{keys:name}][{keys}]",
//!  "table": "users", "fields": {"name": "display_name"}}]}
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use pathgraph_syntax::{join_path, parse_path, Key, KeySet, Path};
use serde::Deserialize;
use serde_json::Value;

use crate::error::ConfigError;
use crate::model::{codec_by_name, Field, FieldModel, QueryBinding};
use crate::routes::{RouteDef, RouteTable};

/// A symbolic pointer to another location, by absolute path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub path: Path,
}

impl Reference {
    pub fn new(path: impl IntoIterator<Item = impl Into<Key>>) -> Self {
        Self {
            path: path.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum Node {
    Atom(Value),
    Branch(BTreeMap<String, Node>),
    List(Vec<Node>),
    Ref(Reference),
    Query(Arc<QueryBinding>),
    Routes(Arc<RouteTable>),
}

impl Node {
    pub fn atom(value: impl Into<Value>) -> Self {
        Node::Atom(value.into())
    }

    pub fn branch<K: Into<String>>(entries: impl IntoIterator<Item = (K, Node)>) -> Self {
        Node::Branch(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn reference(path: impl IntoIterator<Item = impl Into<Key>>) -> Self {
        Node::Ref(Reference::new(path))
    }

    pub fn query(binding: QueryBinding) -> Self {
        Node::Query(Arc::new(binding))
    }

    pub fn routes(table: RouteTable) -> Self {
        Node::Routes(Arc::new(table))
    }

    /// Child under `key`. Lists are addressed by integer keys or numeric strings.
    pub fn child(&self, key: &Key) -> Option<&Node> {
        match self {
            Node::Branch(entries) => entries.get(&key.to_string()),
            Node::List(items) => {
                let index = usize::try_from(key.as_integer()?).ok()?;
                items.get(index)
            }
            Node::Atom(_) | Node::Ref(_) | Node::Query(_) | Node::Routes(_) => None,
        }
    }

    pub fn is_container(&self) -> bool {
        matches!(self, Node::Branch(_) | Node::List(_))
    }

    fn from_json(value: &Value, at: &mut Path) -> Result<Node, ConfigError> {
        match value {
            Value::Object(map) => match map.get("$type") {
                Some(Value::String(kind)) => sentinel(kind, value, at),
                Some(_) => Err(invalid(at, "`$type` must be a string")),
                None => {
                    let mut entries = BTreeMap::new();
                    for (key, child) in map {
                        at.push(Key::from(key.as_str()));
                        let node = Node::from_json(child, at)?;
                        at.pop();
                        entries.insert(key.clone(), node);
                    }
                    Ok(Node::Branch(entries))
                }
            },
            Value::Array(items) => {
                let mut nodes = Vec::with_capacity(items.len());
                for (i, child) in items.iter().enumerate() {
                    at.push(Key::Integer(i as i64));
                    nodes.push(Node::from_json(child, at)?);
                    at.pop();
                }
                Ok(Node::List(nodes))
            }
            scalar => Ok(Node::Atom(scalar.clone())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Graph {
    root: Node,
}

impl Graph {
    /// The root must be a container.
    pub fn new(root: Node) -> Result<Self, ConfigError> {
        if !root.is_container() {
            return Err(invalid(&[], "graph root must be an object or an array"));
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    pub fn from_json(value: &Value) -> Result<Self, ConfigError> {
        Graph::new(Node::from_json(value, &mut Vec::new())?)
    }

    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let value: Value = serde_json::from_str(text).map_err(|err| invalid(&[], &err.to_string()))?;
        Graph::from_json(&value)
    }
}

// ============================================================================
// Sentinels
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FieldDoc {
    Column(String),
    Full {
        column: String,
        #[serde(default)]
        codec: Option<String>,
    },
}

#[derive(Debug, Deserialize)]
struct QueryDoc {
    table: String,
    filters: Vec<String>,
    key: String,
    fields: BTreeMap<String, FieldDoc>,
}

#[derive(Debug, Deserialize)]
struct RouteDoc {
    route: String,
    table: String,
    fields: BTreeMap<String, FieldDoc>,
}

#[derive(Debug, Deserialize)]
struct RoutesDoc {
    routes: Vec<RouteDoc>,
}

#[derive(Debug, Deserialize)]
struct SentinelDoc {
    value: Value,
}

fn sentinel(kind: &str, value: &Value, at: &[Key]) -> Result<Node, ConfigError> {
    match kind {
        "ref" => {
            let doc: SentinelDoc = parse_doc(value, at)?;
            Ok(Node::Ref(Reference {
                path: reference_path(&doc.value, at)?,
            }))
        }
        "atom" => {
            let doc: SentinelDoc = parse_doc(value, at)?;
            Ok(Node::Atom(doc.value))
        }
        "query" => {
            let doc: QueryDoc = parse_doc(value, at)?;
            let model = field_model(doc.fields)?;
            let binding = QueryBinding::new(doc.table, doc.filters, doc.key, model)?;
            Ok(Node::query(binding))
        }
        "routes" => {
            let doc: RoutesDoc = parse_doc(value, at)?;
            Ok(Node::routes(route_table(doc.routes)?))
        }
        other => Err(invalid(at, &format!("unknown `$type` `{other}`"))),
    }
}

/// Compile route documents (`[{"route", "table", "fields"}]`).
pub fn route_table_from_json(value: &Value) -> Result<RouteTable, ConfigError> {
    let docs: Vec<RouteDoc> = parse_doc(value, &[])?;
    route_table(docs)
}

fn route_table(docs: Vec<RouteDoc>) -> Result<RouteTable, ConfigError> {
    let mut defs = Vec::with_capacity(docs.len());
    for doc in docs {
        defs.push(RouteDef::new(doc.route, doc.table, field_model(doc.fields)?));
    }
    RouteTable::new(defs)
}

fn field_model(fields: BTreeMap<String, FieldDoc>) -> Result<FieldModel, ConfigError> {
    fields
        .into_iter()
        .map(|(name, doc)| {
            let field = match doc {
                FieldDoc::Column(column) => Field::new(column),
                FieldDoc::Full { column, codec: None } => Field::new(column),
                FieldDoc::Full {
                    column,
                    codec: Some(codec),
                } => Field::with_codec(column, codec_by_name(&codec)?),
            };
            Ok((name, field))
        })
        .collect()
}

/// `["bar", "someValues"]` or `"bar.someValues"`.
fn reference_path(value: &Value, at: &[Key]) -> Result<Path, ConfigError> {
    match value {
        Value::Array(items) => items
            .iter()
            .map(|item| {
                Key::from_json(item).ok_or_else(|| invalid(at, "reference keys must be scalars"))
            })
            .collect(),
        Value::String(text) => {
            let path = parse_path(text).map_err(|err| invalid(at, &err.to_string()))?;
            path.into_iter()
                .map(|segment| match segment {
                    KeySet::Key(key) => Ok(key),
                    _ => Err(invalid(at, "reference paths must not contain ranges or lists")),
                })
                .collect()
        }
        _ => Err(invalid(at, "reference value must be an array or a path string")),
    }
}

fn parse_doc<T: for<'de> Deserialize<'de>>(value: &Value, at: &[Key]) -> Result<T, ConfigError> {
    T::deserialize(value).map_err(|err| invalid(at, &err.to_string()))
}

fn invalid(at: &[Key], message: &str) -> ConfigError {
    ConfigError::InvalidDocument {
        path: join_path(at),
        message: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn plain_json_becomes_containers_and_atoms() {
        let graph = Graph::from_json(&json!({
            "foo": 12,
            "bar": {"someValues": [{"value": 1}, {"value": 2}]}
        }))
        .unwrap();
        let root = graph.root();
        assert!(matches!(root.child(&Key::from("foo")), Some(Node::Atom(v)) if *v == json!(12)));

        let values = root
            .child(&Key::from("bar"))
            .and_then(|n| n.child(&Key::from("someValues")))
            .unwrap();
        assert!(matches!(values, Node::List(items) if items.len() == 2));
        assert!(values.child(&Key::Integer(1)).is_some());
        assert!(values.child(&Key::from("1")).is_some());
        assert!(values.child(&Key::Integer(-1)).is_none());
        assert!(values.child(&Key::Integer(5)).is_none());
    }

    #[test]
    fn sentinels() {
        let graph = Graph::from_json(&json!({
            "bleeh": {"$type": "ref", "value": ["bar", "someValues"]},
            "short": {"$type": "ref", "value": "bar.someValues"},
            "blob": {"$type": "atom", "value": {"x": 1}},
            "users": {
                "$type": "query",
                "table": "users",
                "filters": ["id"],
                "key": "id",
                "fields": {"id": "user_id", "active": {"column": "is_active", "codec": "bool_int"}}
            },
            "routed": {
                "$type": "routes",
                "routes": [{"route": "byId[{integers:id}][{keys}]", "table": "users", "fields": {"id": "user_id"}}]
            }
        }))
        .unwrap();
        let root = graph.root();
        let expected = Reference::new(["bar", "someValues"]);
        assert!(matches!(root.child(&Key::from("bleeh")), Some(Node::Ref(r)) if *r == expected));
        assert!(matches!(root.child(&Key::from("short")), Some(Node::Ref(r)) if *r == expected));
        assert!(matches!(root.child(&Key::from("blob")), Some(Node::Atom(v)) if *v == json!({"x": 1})));
        match root.child(&Key::from("users")) {
            Some(Node::Query(binding)) => {
                assert_eq!(binding.key_column(), "user_id");
                assert_eq!(binding.field("active").map(|f| f.codec.name()), Some("bool_int"));
            }
            other => panic!("expected query binding, got {other:?}"),
        }
        assert!(matches!(root.child(&Key::from("routed")), Some(Node::Routes(t)) if t.len() == 1));
    }

    #[test]
    fn document_errors_name_their_location() {
        let err = Graph::from_json(&json!({"a": {"b": {"$type": "mystery"}}})).unwrap_err();
        assert!(matches!(&err, ConfigError::InvalidDocument { path, .. } if path == "a.b"));

        let err = Graph::from_json(&json!({
            "q": {"$type": "query", "table": "t", "filters": [], "key": "id", "fields": {"id": "id"}}
        }))
        .unwrap_err();
        assert!(matches!(err, ConfigError::EmptyFilters { .. }));

        let err = Graph::from_json(&json!({
            "q": {"$type": "query", "table": "t", "filters": ["id"], "key": "id",
                  "fields": {"id": {"column": "id", "codec": "rot13"}}}
        }))
        .unwrap_err();
        assert!(matches!(err, ConfigError::UnknownCodec(_)));

        assert!(Graph::from_json(&json!(12)).is_err());
    }
}
