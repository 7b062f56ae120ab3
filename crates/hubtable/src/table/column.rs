//! Column descriptors and value extraction.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::error::HydrateError;
use super::value::Value;

/// Semantic column type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    String,
    Int,
    Bool,
    Timestamp,
    Json,
}

impl ColumnType {
    pub fn as_str(self) -> &'static str {
        match self {
            ColumnType::String => "string",
            ColumnType::Int => "int",
            ColumnType::Bool => "bool",
            ColumnType::Timestamp => "timestamp",
            ColumnType::Json => "json",
        }
    }
}

/// Extracts one column's value from a parent item.
pub type Hydrator<I> = fn(&I) -> Result<Value, HydrateError>;

/// How a column gets its value.
pub enum Extract<I> {
    /// JSON pointer into the serialized parent item, e.g. `/author/login`.
    Field(&'static str),
    /// A dedicated hydrator function.
    Hydrate(Hydrator<I>),
}

/// Post-extraction value transforms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transform {
    /// Empty strings, arrays and objects become null.
    NullIfEmpty,
}

impl Transform {
    pub fn apply(self, value: Value) -> Value {
        match (self, value) {
            (Transform::NullIfEmpty, Value::String(s)) if s.is_empty() => Value::Null,
            (Transform::NullIfEmpty, Value::Json(serde_json::Value::Array(a))) if a.is_empty() => {
                Value::Null
            }
            (Transform::NullIfEmpty, Value::Json(serde_json::Value::Object(o)))
                if o.is_empty() =>
            {
                Value::Null
            }
            (_, value) => value,
        }
    }
}

pub struct ColumnDescriptor<I> {
    pub name: &'static str,
    pub column_type: ColumnType,
    pub description: &'static str,
    pub extract: Extract<I>,
    pub transform: Option<Transform>,
}

impl<I> ColumnDescriptor<I> {
    /// A column read from a named field of the serialized item.
    pub const fn field(
        name: &'static str,
        column_type: ColumnType,
        pointer: &'static str,
        description: &'static str,
    ) -> Self {
        Self {
            name,
            column_type,
            description,
            extract: Extract::Field(pointer),
            transform: None,
        }
    }

    /// A column computed by a hydrator function.
    pub const fn hydrate(
        name: &'static str,
        column_type: ColumnType,
        hydrator: Hydrator<I>,
        description: &'static str,
    ) -> Self {
        Self {
            name,
            column_type,
            description,
            extract: Extract::Hydrate(hydrator),
            transform: None,
        }
    }

    pub const fn transform(mut self, transform: Transform) -> Self {
        self.transform = Some(transform);
        self
    }

    pub fn info(&self) -> ColumnInfo {
        ColumnInfo {
            name: self.name,
            column_type: self.column_type,
            description: self.description,
        }
    }

    /// Extract this column's value.
    ///
    /// `serialized` is the item rendered as JSON; it is only consulted for
    /// [`Extract::Field`] columns.
    pub fn extract(
        &self,
        item: &I,
        serialized: Option<&serde_json::Value>,
    ) -> Result<Value, HydrateError> {
        let value = match &self.extract {
            Extract::Hydrate(hydrator) => hydrator(item)?,
            Extract::Field(pointer) => {
                let raw = serialized
                    .and_then(|json| json.pointer(pointer))
                    .cloned()
                    .unwrap_or(serde_json::Value::Null);
                self.coerce(raw)?
            }
        };

        Ok(match self.transform {
            Some(transform) => transform.apply(value),
            None => value,
        })
    }

    /// Convert a raw JSON field to this column's type.
    fn coerce(&self, raw: serde_json::Value) -> Result<Value, HydrateError> {
        use serde_json::Value as Json;

        let mismatch = |raw: &Json| HydrateError::TypeMismatch {
            column: self.name,
            expected: self.column_type,
            actual: raw.to_string(),
        };

        match (self.column_type, raw) {
            (_, Json::Null) => Ok(Value::Null),
            (ColumnType::Json, raw) => Ok(Value::Json(raw)),
            (ColumnType::String, Json::String(s)) => Ok(Value::String(s)),
            (ColumnType::String, Json::Number(n)) => Ok(Value::String(n.to_string())),
            (ColumnType::String, Json::Bool(b)) => Ok(Value::String(b.to_string())),
            (ColumnType::Int, Json::Number(n)) => n.as_i64().map(Value::Int).ok_or_else(|| {
                HydrateError::TypeMismatch {
                    column: self.name,
                    expected: self.column_type,
                    actual: n.to_string(),
                }
            }),
            (ColumnType::Bool, Json::Bool(b)) => Ok(Value::Bool(b)),
            (ColumnType::Timestamp, Json::String(s)) => DateTime::parse_from_rfc3339(&s)
                .map(|ts| Value::Timestamp(ts.with_timezone(&Utc)))
                .map_err(|_| mismatch(&Json::String(s))),
            (ColumnType::Timestamp, Json::Number(n)) => n
                .as_i64()
                .and_then(|secs| DateTime::from_timestamp(secs, 0))
                .map(Value::Timestamp)
                .ok_or_else(|| mismatch(&Json::Number(n))),
            (_, raw) => Err(mismatch(&raw)),
        }
    }
}

/// Column metadata without the extraction rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ColumnInfo {
    pub name: &'static str,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    pub description: &'static str,
}
