//! Field models, codecs and query bindings.
//!
//! A field model maps application field names to stored columns. Each field
//! carries a [`FieldCodec`] that converts between the application value (the
//! key a client puts in a path, the value a client reads back) and the stored
//! value the executor sees.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::error::ConfigError;

/// Converts between application values and stored values.
///
/// Implementations must round-trip every value used as a key:
/// `deserialize(serialize(x)) == x`.
pub trait FieldCodec: Send + Sync + fmt::Debug {
    fn name(&self) -> &'static str;
    fn serialize(&self, app: &Value) -> Value;
    fn deserialize(&self, stored: &Value) -> Value;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Identity;

impl FieldCodec for Identity {
    fn name(&self) -> &'static str {
        "identity"
    }

    fn serialize(&self, app: &Value) -> Value {
        app.clone()
    }

    fn deserialize(&self, stored: &Value) -> Value {
        stored.clone()
    }
}

/// Numbers stored as decimal text.
#[derive(Debug, Clone, Copy, Default)]
pub struct NumericText;

impl FieldCodec for NumericText {
    fn name(&self) -> &'static str {
        "numeric_text"
    }

    fn serialize(&self, app: &Value) -> Value {
        match app {
            Value::Number(n) => Value::String(n.to_string()),
            other => other.clone(),
        }
    }

    fn deserialize(&self, stored: &Value) -> Value {
        let Value::String(text) = stored else {
            return stored.clone();
        };
        if let Ok(n) = text.parse::<i64>() {
            return Value::from(n);
        }
        match text.parse::<f64>().ok().and_then(serde_json::Number::from_f64) {
            Some(n) => Value::Number(n),
            None => stored.clone(),
        }
    }
}

/// Booleans stored as `0` / `1`.
#[derive(Debug, Clone, Copy, Default)]
pub struct BoolInt;

impl FieldCodec for BoolInt {
    fn name(&self) -> &'static str {
        "bool_int"
    }

    fn serialize(&self, app: &Value) -> Value {
        match app {
            Value::Bool(b) => Value::from(i64::from(*b)),
            other => other.clone(),
        }
    }

    fn deserialize(&self, stored: &Value) -> Value {
        match stored.as_i64() {
            Some(n) => Value::Bool(n != 0),
            None => stored.clone(),
        }
    }
}

/// Look up a built-in codec by its document name.
pub fn codec_by_name(name: &str) -> Result<Arc<dyn FieldCodec>, ConfigError> {
    match name {
        "identity" => Ok(Arc::new(Identity)),
        "numeric_text" => Ok(Arc::new(NumericText)),
        "bool_int" => Ok(Arc::new(BoolInt)),
        other => Err(ConfigError::UnknownCodec(other.to_string())),
    }
}

#[derive(Debug, Clone)]
pub struct Field {
    pub column: String,
    pub codec: Arc<dyn FieldCodec>,
}

impl Field {
    pub fn new(column: impl Into<String>) -> Self {
        Self::with_codec(column, Arc::new(Identity))
    }

    pub fn with_codec(column: impl Into<String>, codec: Arc<dyn FieldCodec>) -> Self {
        Self {
            column: column.into(),
            codec,
        }
    }
}

pub type FieldModel = BTreeMap<String, Field>;

/// A query-backed subtree: the table to read, the fields that address a row,
/// and the columns behind every field.
#[derive(Debug, Clone)]
pub struct QueryBinding {
    table: String,
    filters: Vec<String>,
    key: String,
    model: FieldModel,
}

impl QueryBinding {
    pub fn new(
        table: impl Into<String>,
        filters: Vec<String>,
        key: impl Into<String>,
        model: FieldModel,
    ) -> Result<Self, ConfigError> {
        let table = table.into();
        let key = key.into();
        if filters.is_empty() {
            return Err(ConfigError::EmptyFilters { table });
        }
        for name in filters.iter().chain(std::iter::once(&key)) {
            if !model.contains_key(name) {
                return Err(ConfigError::UnknownField {
                    table,
                    field: name.clone(),
                });
            }
        }
        Ok(Self {
            table,
            filters,
            key,
            model,
        })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn filters(&self) -> &[String] {
        &self.filters
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn model(&self) -> &FieldModel {
        &self.model
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.model.get(name)
    }

    /// Column of the key field.
    pub fn key_column(&self) -> &str {
        // validated in `new`
        self.model
            .get(&self.key)
            .map(|field| field.column.as_str())
            .unwrap_or(self.key.as_str())
    }
}
