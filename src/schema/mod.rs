//! Table schemas reflected from SQLite at runtime. Mappers build every statement from these.

use crate::error::{AppError, SchemaError};
use crate::sql::quoted;
use sqlx::{Row, SqlitePool};

/// Tables managed by the application, in foreign-key dependency order.
pub const TABLES: &[&str] = &["category", "course", "student", "course_student"];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColumnInfo {
    pub name: String,
    /// Declared type as written in the DDL (may be empty).
    pub sql_type: String,
    pub nullable: bool,
    /// Whether the database fills the column when an insert omits it (DEFAULT or rowid alias).
    pub has_default: bool,
    pub primary_key: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TableSchema {
    pub name: String,
    pub columns: Vec<ColumnInfo>,
    /// Primary-key columns in key order.
    pub pk_columns: Vec<String>,
}

impl TableSchema {
    pub fn column(&self, name: &str) -> Option<&ColumnInfo> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    /// The primary-key column when the key is a single column.
    pub fn single_pk(&self) -> Result<&str, SchemaError> {
        match self.pk_columns.as_slice() {
            [pk] => Ok(pk.as_str()),
            _ => Err(SchemaError::CompositeKey(self.name.clone())),
        }
    }

    /// Fails with `UnknownColumn` for the first name that is not a column of this table.
    pub fn check_columns<'a, I>(&self, names: I) -> Result<(), SchemaError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        for name in names {
            if !self.has_column(name) {
                return Err(SchemaError::UnknownColumn {
                    table: self.name.clone(),
                    column: name.to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Reflect one table through `PRAGMA table_info`.
pub async fn introspect(pool: &SqlitePool, table: &str) -> Result<TableSchema, AppError> {
    let sql = format!("PRAGMA table_info({})", quoted(table));
    tracing::debug!(sql = %sql, "introspect");
    let rows = sqlx::query(&sql).fetch_all(pool).await?;
    if rows.is_empty() {
        return Err(SchemaError::UnknownTable(table.to_string()).into());
    }

    let mut keyed: Vec<(i64, String)> = Vec::new();
    let mut columns = Vec::with_capacity(rows.len());
    for row in &rows {
        let name: String = row.try_get("name")?;
        let sql_type: String = row.try_get::<Option<String>, _>("type")?.unwrap_or_default();
        let notnull: i64 = row.try_get("notnull")?;
        let default: Option<String> = row.try_get("dflt_value")?;
        let pk_position: i64 = row.try_get("pk")?;
        if pk_position > 0 {
            keyed.push((pk_position, name.clone()));
        }
        columns.push(ColumnInfo {
            name,
            sql_type,
            nullable: notnull == 0,
            has_default: default.is_some(),
            primary_key: pk_position > 0,
        });
    }
    keyed.sort();
    let pk_columns: Vec<String> = keyed.into_iter().map(|(_, n)| n).collect();

    // A lone INTEGER PRIMARY KEY aliases the rowid, so SQLite assigns it.
    if let [pk] = pk_columns.as_slice() {
        if let Some(c) = columns.iter_mut().find(|c| &c.name == pk) {
            if c.sql_type.eq_ignore_ascii_case("INTEGER") {
                c.has_default = true;
            }
        }
    }

    Ok(TableSchema {
        name: table.to_string(),
        columns,
        pk_columns,
    })
}
