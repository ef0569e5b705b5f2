//! Query vocabulary handed to executors.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A fetched row: column name → stored value.
pub type Row = serde_json::Map<String, Value>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Predicate {
    Eq { column: String, value: Value },
    In { column: String, values: Vec<Value> },
    /// Inclusive on both ends.
    Between { column: String, from: Value, to: Value },
}

impl Predicate {
    /// Equality for a single value, set membership otherwise.
    pub fn any_of(column: impl Into<String>, mut values: Vec<Value>) -> Self {
        let column = column.into();
        if values.len() == 1 {
            Predicate::Eq {
                column,
                value: values.remove(0),
            }
        } else {
            Predicate::In { column, values }
        }
    }

    pub fn column(&self) -> &str {
        match self {
            Predicate::Eq { column, .. }
            | Predicate::In { column, .. }
            | Predicate::Between { column, .. } => column,
        }
    }

    pub fn matches(&self, row: &Row) -> bool {
        let Some(stored) = row.get(self.column()) else {
            return false;
        };
        match self {
            Predicate::Eq { value, .. } => compare_values(stored, value) == Ordering::Equal,
            Predicate::In { values, .. } => values
                .iter()
                .any(|value| compare_values(stored, value) == Ordering::Equal),
            Predicate::Between { from, to, .. } => {
                compare_values(stored, from) != Ordering::Less
                    && compare_values(stored, to) != Ordering::Greater
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    pub table: String,
    /// Conjunction of predicates.
    pub predicates: Vec<Predicate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_by: Option<String>,
}

impl Query {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            predicates: Vec::new(),
            order_by: None,
        }
    }

    pub fn with_predicate(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    pub fn ordered_by(mut self, column: impl Into<String>) -> Self {
        self.order_by = Some(column.into());
        self
    }
}

/// Runs queries against the backing store.
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    async fn fetch(&self, query: &Query) -> anyhow::Result<Vec<Row>>;
}

/// Total order over stored values: null < bool < number < string < array < object.
/// Numbers compare numerically regardless of representation.
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    fn rank(value: &Value) -> u8 {
        match value {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Number(_) => 2,
            Value::String(_) => 3,
            Value::Array(_) => 4,
            Value::Object(_) => 5,
        }
    }

    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(x), Some(y)) => x.cmp(&y),
            _ => {
                let (x, y) = (x.as_f64().unwrap_or(f64::NAN), y.as_f64().unwrap_or(f64::NAN));
                x.partial_cmp(&y).unwrap_or(Ordering::Equal)
            }
        },
        (Value::String(x), Value::String(y)) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)).then_with(|| a.to_string().cmp(&b.to_string())),
    }
}

/// In-memory tables of JSON rows.
///
/// Deserializes from `{"table": [{"column": value, ...}, ...], ...}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemoryExecutor {
    tables: BTreeMap<String, Vec<Row>>,
}

impl MemoryExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(mut self, name: impl Into<String>, rows: Vec<Row>) -> Self {
        self.tables.insert(name.into(), rows);
        self
    }

    pub fn from_json(value: Value) -> anyhow::Result<Self> {
        Ok(serde_json::from_value(value)?)
    }
}

#[async_trait]
impl QueryExecutor for MemoryExecutor {
    async fn fetch(&self, query: &Query) -> anyhow::Result<Vec<Row>> {
        let Some(rows) = self.tables.get(&query.table) else {
            anyhow::bail!("no such table `{}`", query.table);
        };
        let mut out: Vec<Row> = rows
            .iter()
            .filter(|row| query.predicates.iter().all(|p| p.matches(row)))
            .cloned()
            .collect();
        if let Some(column) = &query.order_by {
            out.sort_by(|a, b| {
                compare_values(
                    a.get(column).unwrap_or(&Value::Null),
                    b.get(column).unwrap_or(&Value::Null),
                )
            });
        }
        Ok(out)
    }
}
