//! SQLite-backed executor.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::Connection;
use serde_json::Value;

use crate::query::{Predicate, Query, QueryExecutor, Row};

#[derive(Clone)]
pub struct SqliteExecutor {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteExecutor {
    pub fn open(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        Ok(Self::from_connection(Connection::open(path)?))
    }

    pub fn in_memory() -> anyhow::Result<Self> {
        Ok(Self::from_connection(Connection::open_in_memory()?))
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    /// Run DDL/DML statements, e.g. to seed fixtures.
    pub fn execute_batch(&self, sql: &str) -> anyhow::Result<()> {
        self.conn.lock().execute_batch(sql)?;
        Ok(())
    }

    fn run(&self, query: &Query) -> anyhow::Result<Vec<Row>> {
        let (sql, params) = render(query);
        tracing::debug!(%sql, params = params.len(), "sqlite query");

        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&sql)?;
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let rows = stmt.query_map(rusqlite::params_from_iter(params), |row| {
            let mut out = Row::new();
            for (i, column) in columns.iter().enumerate() {
                out.insert(column.clone(), to_json(row.get_ref(i)?));
            }
            Ok(out)
        })?;
        let rows = rows.collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

impl std::fmt::Debug for SqliteExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteExecutor").finish_non_exhaustive()
    }
}

#[async_trait]
impl QueryExecutor for SqliteExecutor {
    async fn fetch(&self, query: &Query) -> anyhow::Result<Vec<Row>> {
        self.run(query)
    }
}

/// `SELECT * FROM "t" WHERE ... ORDER BY "k"` with positional parameters.
pub fn render(query: &Query) -> (String, Vec<SqlValue>) {
    let mut sql = format!("SELECT * FROM {}", quote_ident(&query.table));
    let mut params = Vec::new();
    let mut clauses = Vec::with_capacity(query.predicates.len());

    for predicate in &query.predicates {
        let column = quote_ident(predicate.column());
        let clause = match predicate {
            Predicate::Eq { value, .. } => {
                params.push(to_sql(value));
                format!("{column} = ?{}", params.len())
            }
            Predicate::In { values, .. } if values.is_empty() => "1 = 0".to_string(),
            Predicate::In { values, .. } => {
                let mut slots = Vec::with_capacity(values.len());
                for value in values {
                    params.push(to_sql(value));
                    slots.push(format!("?{}", params.len()));
                }
                format!("{column} IN ({})", slots.join(", "))
            }
            Predicate::Between { from, to, .. } => {
                params.push(to_sql(from));
                params.push(to_sql(to));
                format!("{column} BETWEEN ?{} AND ?{}", params.len() - 1, params.len())
            }
        };
        clauses.push(clause);
    }

    if !clauses.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&clauses.join(" AND "));
    }
    if let Some(column) = &query.order_by {
        sql.push_str(" ORDER BY ");
        sql.push_str(&quote_ident(column));
    }
    (sql, params)
}

fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

fn to_sql(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => SqlValue::Integer(i),
            None => SqlValue::Real(n.as_f64().unwrap_or_default()),
        },
        Value::String(s) => SqlValue::Text(s.clone()),
        Value::Array(_) | Value::Object(_) => SqlValue::Text(value.to_string()),
    }
}

fn to_json(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        ValueRef::Text(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => Value::Array(bytes.iter().map(|b| Value::from(*b)).collect()),
    }
}
