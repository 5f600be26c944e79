use chrono::NaiveDateTime;
use serde::Serialize;
use std::fmt;

pub const TEMPORAL_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Number {
    Integer(i64),
    Decimal(f64),
}

/// A coerced bind value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    String(String),
    Number(Number),
    Temporal(NaiveDateTime),
    /// Source text passed through untouched because it could not be decoded.
    RawLiteral(String),
}

pub type Row = Vec<Value>;

impl Value {
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::String(_) => "string",
            Value::Number(Number::Integer(_)) => "integer",
            Value::Number(Number::Decimal(_)) => "decimal",
            Value::Temporal(_) => "temporal",
            Value::RawLiteral(_) => "raw",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) | Value::RawLiteral(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Integer(i) => write!(f, "{}", i),
            Number::Decimal(d) => write!(f, "{}", d),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::String(s) | Value::RawLiteral(s) => write!(f, "{}", s),
            Value::Number(n) => write!(f, "{}", n),
            Value::Temporal(ts) => write!(f, "{}", ts.format(TEMPORAL_FORMAT)),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Number(Number::Integer(i))
    }
}

impl From<f64> for Value {
    fn from(d: f64) -> Self {
        Value::Number(Number::Decimal(d))
    }
}

impl From<NaiveDateTime> for Value {
    fn from(ts: NaiveDateTime) -> Self {
        Value::Temporal(ts)
    }
}

/// `COLUMN = value (kind)` for the first `limit` columns of a row.
pub fn describe_bindings(columns: &[String], row: &[Value], limit: usize) -> String {
    columns
        .iter()
        .zip(row.iter())
        .take(limit)
        .map(|(column, value)| format!("{} = {} ({})", column, value, value.kind()))
        .collect::<Vec<_>>()
        .join(", ")
}
