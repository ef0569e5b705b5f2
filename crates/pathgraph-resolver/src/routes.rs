//! Route mounts: declared routes compiled into a [`RouteTrie`] and turned
//! into executor queries at resolve time.
//!
//! Every wildcard before the last element names a model field and becomes a
//! filter. `{integers}` and `{keys}` bindings filter by equality or set
//! membership; `{ranges}` bindings filter by inclusive range, one query per
//! coalesced run. The last element names the output field(s).

use pathgraph_index::{RouteError, RouteTrie};
use pathgraph_syntax::{format_path_set, parse_route, Key, KeySet, Path, RouteElement, WildcardKind};
use serde_json::Value;

use crate::error::{ConfigError, ResolveError};
use crate::model::{Field, FieldModel};
use crate::query::{Predicate, Query, Row};

#[derive(Debug, Clone)]
pub struct RouteDef {
    pub route: String,
    pub table: String,
    pub model: FieldModel,
}

impl RouteDef {
    pub fn new(route: impl Into<String>, table: impl Into<String>, model: FieldModel) -> Self {
        Self {
            route: route.into(),
            table: table.into(),
            model,
        }
    }
}

pub struct RouteTable {
    trie: RouteTrie<RouteDef>,
}

impl std::fmt::Debug for RouteTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteTable")
            .field("routes", &self.trie.len())
            .finish()
    }
}

impl RouteTable {
    pub fn new(defs: impl IntoIterator<Item = RouteDef>) -> Result<Self, ConfigError> {
        let mut trie = RouteTrie::new();
        for def in defs {
            let pattern = parse_route(&def.route).map_err(RouteError::from)?;
            validate(&def, &pattern)?;
            trie.insert_pattern(pattern, def)?;
        }
        Ok(Self { trie })
    }

    pub fn len(&self) -> usize {
        self.trie.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trie.is_empty()
    }

    pub fn trie(&self) -> &RouteTrie<RouteDef> {
        &self.trie
    }

    /// Match `path` and build the queries that answer it.
    pub fn plan(&self, path: &[KeySet]) -> Result<RoutePlan<'_>, ResolveError> {
        let Some(found) = self.trie.find(path)? else {
            return Err(ResolveError::NoRoute(format_path_set(path)));
        };
        let def = found.data();
        let pattern = &found.leaf.pattern;
        let Some((_, init)) = pattern.split_last() else {
            return Err(ResolveError::NoRoute(format_path_set(path)));
        };

        let mut positions = Vec::with_capacity(init.len());
        let mut filters: Vec<Vec<Predicate>> = Vec::new();
        for (element, segment) in init.iter().zip(&found.path) {
            match element {
                RouteElement::Literal { .. } => positions.push(Position::Literal(segment.keys())),
                RouteElement::Wildcard(wildcard) => {
                    let name = wildcard.name.as_deref().unwrap_or_default();
                    let field = model_field(def, name)?;
                    filters.push(filter_alternatives(wildcard.kind, field, segment));
                    positions.push(Position::Bound(field));
                }
            }
        }

        let requested = found.path.last().map(KeySet::keys).unwrap_or_default();
        let mut fields = Vec::with_capacity(requested.len());
        for key in requested {
            let field = model_field(def, &key.to_string())?;
            fields.push((key, field));
        }

        let queries: Vec<Query> = cartesian(&filters)
            .into_iter()
            .map(|predicates| Query {
                table: def.table.clone(),
                predicates,
                order_by: None,
            })
            .collect();

        tracing::debug!(route = %def.route, queries = queries.len(), "matched route");
        Ok(RoutePlan {
            def,
            queries,
            positions,
            fields,
        })
    }
}

fn model_field<'d>(def: &'d RouteDef, name: &str) -> Result<&'d Field, ResolveError> {
    def.model.get(name).ok_or_else(|| ResolveError::UnknownField {
        table: def.table.clone(),
        field: name.to_string(),
    })
}

fn validate(def: &RouteDef, pattern: &[RouteElement]) -> Result<(), ConfigError> {
    let invalid = |message: &str| ConfigError::InvalidRoute {
        route: def.route.clone(),
        message: message.to_string(),
    };
    let unknown = |field: String| ConfigError::UnknownField {
        table: def.table.clone(),
        field,
    };

    let Some((last, init)) = pattern.split_last() else {
        return Err(invalid("empty route"));
    };
    for element in init {
        if let RouteElement::Wildcard(wildcard) = element {
            let Some(name) = &wildcard.name else {
                return Err(invalid("wildcards before the field must be named"));
            };
            if !def.model.contains_key(name) {
                return Err(unknown(name.clone()));
            }
        }
    }
    match last {
        RouteElement::Literal { keys } => {
            for key in keys.keys() {
                if !def.model.contains_key(&key.to_string()) {
                    return Err(unknown(key.to_string()));
                }
            }
            Ok(())
        }
        RouteElement::Wildcard(wildcard) if wildcard.kind == WildcardKind::Keys => Ok(()),
        RouteElement::Wildcard(_) => Err(invalid("route must end with field names")),
    }
}

fn filter_alternatives(kind: WildcardKind, field: &Field, segment: &KeySet) -> Vec<Predicate> {
    let serialize = |key: &Key| field.codec.serialize(&key.to_json());
    match kind {
        WildcardKind::Integers | WildcardKind::Keys => {
            let values: Vec<Value> = segment.keys().iter().map(serialize).collect();
            if values.is_empty() {
                Vec::new()
            } else {
                vec![Predicate::any_of(field.column.clone(), values)]
            }
        }
        // the trie already expanded the segment into coalesced runs
        WildcardKind::Ranges => match segment {
            KeySet::List(items) => items
                .iter()
                .filter_map(|item| match item {
                    KeySet::Range(range) if !range.is_empty() => Some(Predicate::Between {
                        column: field.column.clone(),
                        from: serialize(&Key::Integer(range.from())),
                        to: serialize(&Key::Integer(range.to())),
                    }),
                    _ => None,
                })
                .collect(),
            other => vec![Predicate::any_of(
                field.column.clone(),
                other.keys().iter().map(serialize).collect(),
            )],
        },
    }
}

/// Every combination picking one item from each list.
fn cartesian<T: Clone>(lists: &[Vec<T>]) -> Vec<Vec<T>> {
    let mut out = vec![Vec::with_capacity(lists.len())];
    for list in lists {
        let mut next = Vec::with_capacity(out.len() * list.len());
        for prefix in &out {
            for item in list {
                let mut combo = prefix.clone();
                combo.push(item.clone());
                next.push(combo);
            }
        }
        out = next;
    }
    out
}

#[derive(Debug)]
enum Position<'a> {
    Literal(Vec<Key>),
    Bound(&'a Field),
}

/// Queries for one matched route, plus how to turn their rows into pairs.
#[derive(Debug)]
pub struct RoutePlan<'a> {
    pub def: &'a RouteDef,
    pub queries: Vec<Query>,
    positions: Vec<Position<'a>>,
    fields: Vec<(Key, &'a Field)>,
}

impl RoutePlan<'_> {
    /// `(suffix path, value)` for every row and requested field. Literal
    /// positions that matched several keys repeat the row under each key.
    pub fn pairs(&self, rows: &[Row]) -> Result<Vec<(Path, Value)>, ResolveError> {
        let literals: Vec<Vec<Key>> = self
            .positions
            .iter()
            .filter_map(|position| match position {
                Position::Literal(keys) => Some(keys.clone()),
                Position::Bound(_) => None,
            })
            .collect();
        let combos = cartesian(&literals);

        let mut out = Vec::new();
        for row in rows {
            let mut bound = Vec::new();
            for position in &self.positions {
                if let Position::Bound(field) = position {
                    bound.push(row_key(row, field)?);
                }
            }

            for combo in &combos {
                let (mut literal, mut bound) = (combo.iter(), bound.iter());
                let mut base = Vec::with_capacity(self.positions.len() + 1);
                for position in &self.positions {
                    let key = match position {
                        Position::Literal(_) => literal.next(),
                        Position::Bound(_) => bound.next(),
                    };
                    base.extend(key.cloned());
                }
                for (name, field) in &self.fields {
                    let mut path = base.clone();
                    path.push(name.clone());
                    out.push((path, row_value(row, field)));
                }
            }
        }
        Ok(out)
    }
}

pub(crate) fn row_value(row: &Row, field: &Field) -> Value {
    field
        .codec
        .deserialize(row.get(&field.column).unwrap_or(&Value::Null))
}

pub(crate) fn row_key(row: &Row, field: &Field) -> Result<Key, ResolveError> {
    Key::from_json(&row_value(row, field)).ok_or_else(|| ResolveError::NonScalarKey {
        column: field.column.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pathgraph_syntax::parse_path;
    use serde_json::json;

    fn model(names: &[&str]) -> FieldModel {
        names
            .iter()
            .map(|name| (name.to_string(), Field::new(format!("{name}_col"))))
            .collect()
    }

    fn table() -> RouteTable {
        RouteTable::new([
            RouteDef::new("users[{integers:id}][{keys}]", "users", model(&["id", "name", "email"])),
            RouteDef::new("events[{ranges:day}].count", "events", model(&["day", "count"])),
            RouteDef::new("archive[2000..2009].title", "archive", model(&["title"])),
        ])
        .unwrap()
    }

    fn row(value: Value) -> Row {
        match value {
            Value::Object(map) => map,
            _ => unreachable!("rows are objects"),
        }
    }

    #[test]
    fn integer_binding_becomes_membership_filter() {
        let table = table();
        let path = parse_path("users[1,2].name").unwrap();
        let plan = table.plan(&path).unwrap();
        assert_eq!(plan.def.table, "users");
        assert_eq!(
            plan.queries,
            vec![Query::new("users").with_predicate(Predicate::In {
                column: "id_col".to_string(),
                values: vec![json!(1), json!(2)],
            })]
        );

        let pairs = plan
            .pairs(&[row(json!({"id_col": 2, "name_col": "bob"}))])
            .unwrap();
        assert_eq!(
            pairs,
            vec![(
                vec![Key::from("users"), Key::Integer(2), Key::from("name")],
                json!("bob")
            )]
        );
    }

    #[test]
    fn range_binding_issues_one_query_per_run() {
        let table = table();
        let plan = table.plan(&parse_path("events[1,2,3,7].count").unwrap()).unwrap();
        let bounds: Vec<(Value, Value)> = plan
            .queries
            .iter()
            .map(|q| match &q.predicates[..] {
                [Predicate::Between { from, to, .. }] => (from.clone(), to.clone()),
                other => panic!("unexpected predicates {other:?}"),
            })
            .collect();
        assert_eq!(bounds, vec![(json!(1), json!(3)), (json!(7), json!(7))]);
    }

    #[test]
    fn literal_positions_repeat_rows() {
        let table = table();
        let plan = table.plan(&parse_path("archive[2001,2002].title").unwrap()).unwrap();
        assert_eq!(plan.queries, vec![Query::new("archive")]);
        let pairs = plan.pairs(&[row(json!({"title_col": "t"}))]).unwrap();
        let paths: Vec<Path> = pairs.into_iter().map(|(path, _)| path).collect();
        assert_eq!(
            paths,
            vec![
                vec![Key::from("archive"), Key::Integer(2001), Key::from("title")],
                vec![Key::from("archive"), Key::Integer(2002), Key::from("title")],
            ]
        );
    }

    #[test]
    fn unroutable_and_unknown_fields() {
        let table = table();
        assert!(matches!(
            table.plan(&parse_path("posts[1].title").unwrap()),
            Err(ResolveError::NoRoute(_))
        ));
        assert!(matches!(
            table.plan(&parse_path("users[1].age").unwrap()),
            Err(ResolveError::UnknownField { field, .. }) if field == "age"
        ));
    }

    #[test]
    fn construction_validates_routes_against_model() {
        let err = RouteTable::new([RouteDef::new("users[{integers}].name", "users", model(&["name"]))])
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidRoute { .. }));

        let err = RouteTable::new([RouteDef::new("users[{integers:uid}].name", "users", model(&["name"]))])
            .unwrap_err();
        assert!(matches!(err, ConfigError::UnknownField { field, .. } if field == "uid"));

        let err = RouteTable::new([RouteDef::new("users.{integers}", "users", model(&["name"]))])
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidRoute { .. }));

        let err = RouteTable::new([
            RouteDef::new("a[{keys:name}]", "t", model(&["name"])),
            RouteDef::new("a[{keys:other}]", "t", model(&["other"])),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::Route(RouteError::Duplicate(_))));
    }

    #[test]
    fn cartesian_of_nothing_is_one_empty_combination() {
        assert_eq!(cartesian::<i32>(&[]), vec![Vec::<i32>::new()]);
        assert_eq!(
            cartesian(&[vec![1, 2], vec![3]]),
            vec![vec![1, 3], vec![2, 3]]
        );
        assert!(cartesian(&[vec![1], vec![]]).is_empty());
    }
}
