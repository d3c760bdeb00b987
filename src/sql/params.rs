//! Bind serde_json::Value parameters onto sqlx SQLite queries.

use serde_json::Value;
use sqlx::query::{Query, QueryScalar};
use sqlx::sqlite::{Sqlite, SqliteArguments};

/// A JSON value in the shape SQLite can store. Arrays and objects are stored as JSON text.
#[derive(Clone, Debug, PartialEq)]
pub enum BindValue {
    Null,
    Bool(bool),
    I64(i64),
    F64(f64),
    Text(String),
}

impl BindValue {
    pub fn from_json(v: &Value) -> Self {
        match v {
            Value::Null => BindValue::Null,
            Value::Bool(b) => BindValue::Bool(*b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    BindValue::I64(i)
                } else {
                    BindValue::F64(n.as_f64().unwrap_or(0.0))
                }
            }
            Value::String(s) => BindValue::Text(s.clone()),
            Value::Array(_) | Value::Object(_) => BindValue::Text(v.to_string()),
        }
    }
}

pub fn bind_value<'q>(
    query: Query<'q, Sqlite, SqliteArguments<'q>>,
    v: &Value,
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    match BindValue::from_json(v) {
        BindValue::Null => query.bind(None::<i64>),
        BindValue::Bool(b) => query.bind(b),
        BindValue::I64(n) => query.bind(n),
        BindValue::F64(n) => query.bind(n),
        BindValue::Text(s) => query.bind(s),
    }
}

pub fn bind_scalar<'q, O>(
    query: QueryScalar<'q, Sqlite, O, SqliteArguments<'q>>,
    v: &Value,
) -> QueryScalar<'q, Sqlite, O, SqliteArguments<'q>> {
    match BindValue::from_json(v) {
        BindValue::Null => query.bind(None::<i64>),
        BindValue::Bool(b) => query.bind(b),
        BindValue::I64(n) => query.bind(n),
        BindValue::F64(n) => query.bind(n),
        BindValue::Text(s) => query.bind(s),
    }
}
