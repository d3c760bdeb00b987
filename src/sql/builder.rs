//! Builds parameterized SELECT, INSERT, UPDATE, DELETE from a reflected table schema.

use crate::error::SchemaError;
use crate::mapper::Record;
use crate::schema::TableSchema;
use serde_json::Value;

pub const MAX_LIMIT: u32 = 1000;

/// Quote identifier for SQLite (safe: names only come from reflected schemas).
pub fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

#[derive(Debug, Default)]
pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<Value>,
}

impl QueryBuf {
    fn new() -> Self {
        QueryBuf::default()
    }

    fn push_param(&mut self, v: Value) {
        self.params.push(v);
    }
}

fn column_list(schema: &TableSchema) -> String {
    schema
        .columns
        .iter()
        .map(|c| quoted(&c.name))
        .collect::<Vec<_>>()
        .join(", ")
}

fn order_clause(schema: &TableSchema) -> String {
    if schema.pk_columns.is_empty() {
        return " ORDER BY rowid".to_string();
    }
    let cols: Vec<String> = schema.pk_columns.iter().map(|c| quoted(c)).collect();
    format!(" ORDER BY {}", cols.join(", "))
}

/// WHERE clause for exact-match filters; a null value matches with IS NULL. Unknown columns are skipped.
fn where_clause(q: &mut QueryBuf, schema: &TableSchema, filters: &[(String, Value)]) -> String {
    let mut parts = Vec::new();
    for (col, val) in filters {
        if !schema.has_column(col) {
            continue;
        }
        if val.is_null() {
            parts.push(format!("{} IS NULL", quoted(col)));
        } else {
            q.push_param(val.clone());
            parts.push(format!("{} = ?", quoted(col)));
        }
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", parts.join(" AND "))
    }
}

/// SELECT with optional exact-match filters, ORDER BY primary key, optional LIMIT/OFFSET.
pub fn select_list(
    schema: &TableSchema,
    filters: &[(String, Value)],
    limit: Option<u32>,
    offset: Option<u32>,
) -> QueryBuf {
    let mut q = QueryBuf::new();
    let where_sql = where_clause(&mut q, schema, filters);
    let limit_sql = match (limit, offset) {
        (Some(n), _) => format!(" LIMIT {}", n.min(MAX_LIMIT)),
        // SQLite only accepts OFFSET after a LIMIT.
        (None, Some(_)) => " LIMIT -1".to_string(),
        (None, None) => String::new(),
    };
    let offset_sql = offset.map(|n| format!(" OFFSET {}", n)).unwrap_or_default();
    q.sql = format!(
        "SELECT {} FROM {}{}{}{}{}",
        column_list(schema),
        quoted(&schema.name),
        where_sql,
        order_clause(schema),
        limit_sql,
        offset_sql
    );
    q
}

/// SELECT one row by its single-column primary key.
pub fn select_by_id(schema: &TableSchema, id: &Value) -> Result<QueryBuf, SchemaError> {
    let pk = schema.single_pk()?;
    let mut q = QueryBuf::new();
    q.push_param(id.clone());
    q.sql = format!(
        "SELECT {} FROM {} WHERE {} = ?",
        column_list(schema),
        quoted(&schema.name),
        quoted(pk)
    );
    Ok(q)
}

pub fn count(schema: &TableSchema, filters: &[(String, Value)]) -> QueryBuf {
    let mut q = QueryBuf::new();
    let where_sql = where_clause(&mut q, schema, filters);
    q.sql = format!("SELECT COUNT(*) FROM {}{}", quoted(&schema.name), where_sql);
    q
}

/// INSERT the record's known columns in schema order; falls back to DEFAULT VALUES when none are given.
pub fn insert(schema: &TableSchema, record: &Record) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut cols = Vec::new();
    for c in &schema.columns {
        if let Some(val) = record.get(&c.name) {
            // Leave a null auto-assigned key to the database.
            if val.is_null() && c.primary_key && c.has_default {
                continue;
            }
            q.push_param(val.clone());
            cols.push(quoted(&c.name));
        }
    }
    let table = quoted(&schema.name);
    let returning = column_list(schema);
    q.sql = if cols.is_empty() {
        format!("INSERT INTO {} DEFAULT VALUES RETURNING {}", table, returning)
    } else {
        let placeholders = vec!["?"; cols.len()].join(", ");
        format!(
            "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
            table,
            cols.join(", "),
            placeholders,
            returning
        )
    };
    q
}

/// UPDATE by id: SET only known non-key columns present in the record.
/// With nothing to set the statement degrades to a SELECT of the row.
pub fn update(schema: &TableSchema, id: &Value, record: &Record) -> Result<QueryBuf, SchemaError> {
    let pk = schema.single_pk()?;
    let mut q = QueryBuf::new();
    let mut sets = Vec::new();
    for c in &schema.columns {
        if c.primary_key {
            continue;
        }
        if let Some(val) = record.get(&c.name) {
            q.push_param(val.clone());
            sets.push(format!("{} = ?", quoted(&c.name)));
        }
    }
    if sets.is_empty() {
        return select_by_id(schema, id);
    }
    q.push_param(id.clone());
    q.sql = format!(
        "UPDATE {} SET {} WHERE {} = ? RETURNING {}",
        quoted(&schema.name),
        sets.join(", "),
        quoted(pk),
        column_list(schema)
    );
    Ok(q)
}

/// DELETE rows matching every filter. An empty filter list would wipe the table and is refused.
pub fn delete_where(schema: &TableSchema, filters: &[(String, Value)]) -> Result<QueryBuf, SchemaError> {
    let mut q = QueryBuf::new();
    let where_sql = where_clause(&mut q, schema, filters);
    if where_sql.is_empty() {
        return Err(SchemaError::EmptyFilter(schema.name.clone()));
    }
    q.sql = format!("DELETE FROM {}{}", quoted(&schema.name), where_sql);
    Ok(q)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ColumnInfo;
    use serde_json::json;

    fn col(name: &str, pk: bool, has_default: bool) -> ColumnInfo {
        ColumnInfo {
            name: name.into(),
            sql_type: if pk { "INTEGER".into() } else { "TEXT".into() },
            nullable: !pk,
            has_default,
            primary_key: pk,
        }
    }

    fn course() -> TableSchema {
        TableSchema {
            name: "course".into(),
            columns: vec![
                col("id", true, true),
                col("name", false, false),
                col("kind", false, true),
                col("category_id", false, false),
            ],
            pk_columns: vec!["id".into()],
        }
    }

    fn record(v: serde_json::Value) -> Record {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn quoted_doubles_embedded_quotes() {
        assert_eq!(quoted("a\"b"), "\"a\"\"b\"");
    }

    #[test]
    fn select_list_with_filters_and_paging() {
        let q = select_list(
            &course(),
            &[("category_id".into(), json!(2)), ("bogus".into(), json!(1))],
            Some(5000),
            Some(10),
        );
        assert_eq!(
            q.sql,
            "SELECT \"id\", \"name\", \"kind\", \"category_id\" FROM \"course\" WHERE \"category_id\" = ? ORDER BY \"id\" LIMIT 1000 OFFSET 10"
        );
        assert_eq!(q.params, vec![json!(2)]);
    }

    #[test]
    fn offset_without_limit_uses_unbounded_limit() {
        let q = select_list(&course(), &[], None, Some(3));
        assert!(q.sql.ends_with("ORDER BY \"id\" LIMIT -1 OFFSET 3"));
    }

    #[test]
    fn null_filter_uses_is_null() {
        let q = count(&course(), &[("category_id".into(), Value::Null)]);
        assert_eq!(q.sql, "SELECT COUNT(*) FROM \"course\" WHERE \"category_id\" IS NULL");
        assert!(q.params.is_empty());
    }

    #[test]
    fn insert_follows_schema_order_and_skips_missing() {
        let q = insert(&course(), &record(json!({"category_id": 1, "name": "Rust", "extra": true})));
        assert_eq!(
            q.sql,
            "INSERT INTO \"course\" (\"name\", \"category_id\") VALUES (?, ?) RETURNING \"id\", \"name\", \"kind\", \"category_id\""
        );
        assert_eq!(q.params, vec![json!("Rust"), json!(1)]);
    }

    #[test]
    fn insert_keeps_explicit_id_but_drops_null_id() {
        let q = insert(&course(), &record(json!({"id": 7, "name": "A", "category_id": 1})));
        assert!(q.sql.starts_with("INSERT INTO \"course\" (\"id\", \"name\", \"category_id\")"));
        let q = insert(&course(), &record(json!({"id": null, "name": "A", "category_id": 1})));
        assert!(q.sql.starts_with("INSERT INTO \"course\" (\"name\", \"category_id\")"));
    }

    #[test]
    fn insert_empty_record_uses_default_values() {
        let q = insert(&course(), &Record::new());
        assert!(q.sql.starts_with("INSERT INTO \"course\" DEFAULT VALUES RETURNING"));
    }

    #[test]
    fn update_sets_non_key_columns_and_binds_id_last() {
        let q = update(&course(), &json!(3), &record(json!({"id": 9, "name": "B"}))).unwrap();
        assert_eq!(
            q.sql,
            "UPDATE \"course\" SET \"name\" = ? WHERE \"id\" = ? RETURNING \"id\", \"name\", \"kind\", \"category_id\""
        );
        assert_eq!(q.params, vec![json!("B"), json!(3)]);
    }

    #[test]
    fn update_without_changes_selects_row() {
        let q = update(&course(), &json!(3), &Record::new()).unwrap();
        assert!(q.sql.starts_with("SELECT"));
        assert_eq!(q.params, vec![json!(3)]);
    }

    #[test]
    fn delete_requires_a_filter() {
        assert_eq!(
            delete_where(&course(), &[]).unwrap_err(),
            SchemaError::EmptyFilter("course".into())
        );
        let q = delete_where(&course(), &[("id".into(), json!(1))]).unwrap();
        assert_eq!(q.sql, "DELETE FROM \"course\" WHERE \"id\" = ?");
    }

    #[test]
    fn by_id_needs_single_key() {
        let mut junction = course();
        junction.pk_columns = vec!["id".into(), "category_id".into()];
        assert!(select_by_id(&junction, &json!(1)).is_err());
    }
}
