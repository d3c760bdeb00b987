//! Read-only JSON access to any registered table through its mapper.

use crate::error::AppError;
use crate::response::{row, rows};
use crate::schema::TableSchema;
use crate::sql::MAX_LIMIT;
use crate::state::AppState;
use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use serde_json::Value;
use std::collections::HashMap;

const DEFAULT_LIMIT: u32 = 100;

/// Type a query-string value by the column's declared affinity; falls back to text.
/// `null` means IS NULL only on nullable columns.
fn query_value_for_column(schema: &TableSchema, col: &str, s: &str) -> Value {
    let Some(column) = schema.column(col) else {
        return Value::String(s.to_string());
    };
    if column.nullable && s.eq_ignore_ascii_case("null") {
        return Value::Null;
    }
    let sql_type = column.sql_type.to_ascii_uppercase();
    if sql_type.contains("INT") {
        if let Ok(n) = s.parse::<i64>() {
            return Value::from(n);
        }
    }
    if sql_type.contains("REAL") || sql_type.contains("FLOA") || sql_type.contains("DOUB") {
        if let Some(n) = s.parse::<f64>().ok().and_then(serde_json::Number::from_f64) {
            return Value::Number(n);
        }
    }
    Value::String(s.to_string())
}

fn parse_paging(raw: &str, key: &str) -> Result<u32, AppError> {
    raw.parse()
        .map_err(|_| AppError::BadRequest(format!("'{}' must be a non-negative integer", key)))
}

pub async fn list(
    State(state): State<AppState>,
    Path(table): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, AppError> {
    let mapper = state.registry.get_mapper(&table)?;
    let schema = mapper.schema();

    let mut limit = DEFAULT_LIMIT;
    let mut offset: Option<u32> = None;
    let mut filters: Vec<(String, Value)> = Vec::new();
    for (k, v) in params {
        match k.as_str() {
            "limit" => limit = parse_paging(&v, "limit")?,
            "offset" => offset = Some(parse_paging(&v, "offset")?),
            _ => {
                if schema.has_column(&k) {
                    let val = query_value_for_column(schema, &k, &v);
                    filters.push((k, val));
                }
            }
        }
    }
    // Deterministic parameter order regardless of query-string order.
    filters.sort_by(|a, b| a.0.cmp(&b.0));

    let limit = limit.min(MAX_LIMIT);
    let found = mapper.find_where(&state.pool, &filters, Some(limit), offset).await?;
    Ok(rows(&table, found, limit, offset))
}

pub async fn read(
    State(state): State<AppState>,
    Path((table, id_str)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let mapper = state.registry.get_mapper(&table)?;
    let id: i64 = id_str
        .parse()
        .map_err(|_| AppError::BadRequest("invalid id".into()))?;
    let found = mapper
        .find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("{} {}", table, id_str)))?;
    Ok(row(&table, found))
}
