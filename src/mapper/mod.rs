//! UniversalMapper: generic CRUD for one table, driven entirely by its reflected schema.
//! Works against any SQLite executor, so the same mapper serves the pool and open transactions.

mod registry;
mod unit_of_work;
pub use registry::MapperRegistry;
pub use unit_of_work::{CommitReport, UnitOfWork};

use crate::error::AppError;
use crate::schema::TableSchema;
use crate::sql::{self, bind_scalar, bind_value, QueryBuf};
use serde_json::Value;
use sqlx::sqlite::{Sqlite, SqliteRow};
use sqlx::Executor;

/// One row: column name to value.
pub type Record = serde_json::Map<String, Value>;

#[derive(Clone, Debug)]
pub struct UniversalMapper {
    schema: TableSchema,
}

impl UniversalMapper {
    pub fn new(schema: TableSchema) -> Self {
        UniversalMapper { schema }
    }

    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    pub fn table(&self) -> &str {
        &self.schema.name
    }

    pub async fn all<'e, E>(&self, executor: E) -> Result<Vec<Record>, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        self.find_where(executor, &[], None, None).await
    }

    /// Rows matching every (column, value) filter, ordered by primary key.
    pub async fn find_where<'e, E>(
        &self,
        executor: E,
        filters: &[(String, Value)],
        limit: Option<u32>,
        offset: Option<u32>,
    ) -> Result<Vec<Record>, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        self.schema.check_columns(filters.iter().map(|(c, _)| c.as_str()))?;
        let q = sql::select_list(&self.schema, filters, limit, offset);
        fetch_many(executor, &q).await
    }

    pub async fn find_by_id<'e, E>(&self, executor: E, id: i64) -> Result<Option<Record>, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let q = sql::select_by_id(&self.schema, &Value::from(id))?;
        fetch_optional(executor, &q).await
    }

    pub async fn count<'e, E>(&self, executor: E, filters: &[(String, Value)]) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        self.schema.check_columns(filters.iter().map(|(c, _)| c.as_str()))?;
        let q = sql::count(&self.schema, filters);
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let mut query = sqlx::query_scalar::<_, i64>(&q.sql);
        for p in &q.params {
            query = bind_scalar(query, p);
        }
        Ok(query.fetch_one(executor).await?)
    }

    /// Insert one row. Returns the stored row, including database-assigned values.
    pub async fn insert<'e, E>(&self, executor: E, record: &Record) -> Result<Record, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        self.schema.check_columns(record.keys().map(String::as_str))?;
        let q = sql::insert(&self.schema, record);
        fetch_optional(executor, &q)
            .await?
            .ok_or(AppError::Db(sqlx::Error::RowNotFound))
    }

    /// Update one row by id. Returns the updated row, or None when no row has that id.
    pub async fn update<'e, E>(&self, executor: E, id: i64, record: &Record) -> Result<Option<Record>, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        self.schema.check_columns(record.keys().map(String::as_str))?;
        let q = sql::update(&self.schema, &Value::from(id), record)?;
        fetch_optional(executor, &q).await
    }

    pub async fn delete_by_id<'e, E>(&self, executor: E, id: i64) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let pk = self.schema.single_pk()?.to_string();
        self.delete_where(executor, &[(pk, Value::from(id))]).await
    }

    /// Delete every row matching all filters. Returns the number of rows removed.
    pub async fn delete_where<'e, E>(&self, executor: E, filters: &[(String, Value)]) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        self.schema.check_columns(filters.iter().map(|(c, _)| c.as_str()))?;
        let q = sql::delete_where(&self.schema, filters)?;
        tracing::debug!(sql = %q.sql, params = ?q.params, "execute");
        let mut query = sqlx::query(&q.sql);
        for p in &q.params {
            query = bind_value(query, p);
        }
        let done = query.execute(executor).await?;
        Ok(done.rows_affected())
    }
}

async fn fetch_many<'e, E>(executor: E, q: &QueryBuf) -> Result<Vec<Record>, AppError>
where
    E: Executor<'e, Database = Sqlite>,
{
    tracing::debug!(sql = %q.sql, params = ?q.params, "query");
    let mut query = sqlx::query(&q.sql);
    for p in &q.params {
        query = bind_value(query, p);
    }
    let rows = query.fetch_all(executor).await?;
    rows.iter().map(row_to_record).collect()
}

async fn fetch_optional<'e, E>(executor: E, q: &QueryBuf) -> Result<Option<Record>, AppError>
where
    E: Executor<'e, Database = Sqlite>,
{
    tracing::debug!(sql = %q.sql, params = ?q.params, "query");
    let mut query = sqlx::query(&q.sql);
    for p in &q.params {
        query = bind_value(query, p);
    }
    let row = query.fetch_optional(executor).await?;
    row.as_ref().map(row_to_record).transpose()
}

/// Convert a row by the storage class of each value, not the declared column type.
fn row_to_record(row: &SqliteRow) -> Result<Record, AppError> {
    use sqlx::{Column, Row, TypeInfo, ValueRef};
    let mut map = Record::new();
    for col in row.columns() {
        let i = col.ordinal();
        let raw = row.try_get_raw(i)?;
        let value = if raw.is_null() {
            Value::Null
        } else {
            let storage = raw.type_info().name().to_string();
            match storage.as_str() {
                "INTEGER" => Value::from(row.try_get::<i64, _>(i)?),
                "REAL" => serde_json::Number::from_f64(row.try_get::<f64, _>(i)?)
                    .map(Value::Number)
                    .unwrap_or(Value::Null),
                "BLOB" => Value::from(row.try_get::<Vec<u8>, _>(i)?),
                _ => Value::String(row.try_get::<String, _>(i)?),
            }
        };
        map.insert(col.name().to_string(), value);
    }
    Ok(map)
}

/// Read an integer column out of a record.
pub fn record_i64(record: &Record, column: &str) -> Result<i64, AppError> {
    record
        .get(column)
        .and_then(Value::as_i64)
        .ok_or_else(|| AppError::Validation(format!("{} must be an integer", column)))
}

/// Read a text column out of a record.
pub fn record_str<'a>(record: &'a Record, column: &str) -> Result<&'a str, AppError> {
    record
        .get(column)
        .and_then(Value::as_str)
        .ok_or_else(|| AppError::Validation(format!("{} must be text", column)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SchemaError;
    use crate::migration::apply_schema;
    use crate::schema::TABLES;
    use crate::store::connect;
    use serde_json::json;
    use sqlx::SqlitePool;

    async fn setup() -> (SqlitePool, MapperRegistry) {
        let pool = connect("sqlite::memory:", 1).await.unwrap();
        apply_schema(&pool).await.unwrap();
        let registry = MapperRegistry::load(&pool, TABLES).await.unwrap();
        (pool, registry)
    }

    fn record(v: serde_json::Value) -> Record {
        v.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn insert_assigns_id_and_defaults() {
        let (pool, registry) = setup().await;
        let categories = registry.get_mapper("category").unwrap();
        let cat = categories.insert(&pool, &record(json!({"name": "Web"}))).await.unwrap();
        assert_eq!(cat.get("id"), Some(&json!(1)));
        assert_eq!(cat.get("category_id"), Some(&Value::Null));

        let courses = registry.get_mapper("course").unwrap();
        let course = courses
            .insert(&pool, &record(json!({"name": "HTML", "category_id": 1})))
            .await
            .unwrap();
        assert_eq!(course.get("kind"), Some(&json!("record")));
    }

    #[tokio::test]
    async fn find_update_delete_round() {
        let (pool, registry) = setup().await;
        let students = registry.get_mapper("student").unwrap();
        for name in ["Ann", "Bob", "Cid"] {
            students.insert(&pool, &record(json!({ "name": name }))).await.unwrap();
        }
        assert_eq!(students.count(&pool, &[]).await.unwrap(), 3);

        let bob = students.find_by_id(&pool, 2).await.unwrap().unwrap();
        assert_eq!(record_str(&bob, "name").unwrap(), "Bob");

        let renamed = students
            .update(&pool, 2, &record(json!({"name": "Robert"})))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(renamed.get("name"), Some(&json!("Robert")));
        assert!(students.update(&pool, 99, &record(json!({"name": "x"}))).await.unwrap().is_none());

        let page = students.find_where(&pool, &[], Some(1), Some(1)).await.unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(record_i64(&page[0], "id").unwrap(), 2);

        assert_eq!(students.delete_by_id(&pool, 1).await.unwrap(), 1);
        assert_eq!(students.delete_by_id(&pool, 1).await.unwrap(), 0);
        assert!(students.find_by_id(&pool, 1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn unknown_columns_are_rejected_before_sql() {
        let (pool, registry) = setup().await;
        let students = registry.get_mapper("student").unwrap();
        let err = students
            .insert(&pool, &record(json!({"name": "A", "age": 3})))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Schema(SchemaError::UnknownColumn { column, .. }) if column == "age"));
        let err = students
            .find_where(&pool, &[("age".into(), json!(3))], None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Schema(_)));
    }

    #[tokio::test]
    async fn junction_rows_use_filters_not_ids() {
        let (pool, registry) = setup().await;
        registry
            .get_mapper("category")
            .unwrap()
            .insert(&pool, &record(json!({"name": "C"})))
            .await
            .unwrap();
        registry
            .get_mapper("course")
            .unwrap()
            .insert(&pool, &record(json!({"name": "K", "category_id": 1})))
            .await
            .unwrap();
        registry
            .get_mapper("student")
            .unwrap()
            .insert(&pool, &record(json!({"name": "S"})))
            .await
            .unwrap();
        let links = registry.get_mapper("course_student").unwrap();
        links
            .insert(&pool, &record(json!({"course_id": 1, "student_id": 1})))
            .await
            .unwrap();
        assert!(matches!(
            links.find_by_id(&pool, 1).await.unwrap_err(),
            AppError::Schema(SchemaError::CompositeKey(_))
        ));
        let removed = links
            .delete_where(&pool, &[("course_id".into(), json!(1)), ("student_id".into(), json!(1))])
            .await
            .unwrap();
        assert_eq!(removed, 1);
    }

    #[tokio::test]
    async fn real_and_blob_values_convert_by_storage_class() {
        let pool = connect("sqlite::memory:", 1).await.unwrap();
        sqlx::query("CREATE TABLE sample (id INTEGER PRIMARY KEY, score REAL, raw BLOB, note, flag BOOLEAN)")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("INSERT INTO sample (score, raw, note, flag) VALUES (2.5, x'0102', 42, 1)")
            .execute(&pool)
            .await
            .unwrap();
        let registry = MapperRegistry::load(&pool, &["sample"]).await.unwrap();
        let rows = registry.get_mapper("sample").unwrap().all(&pool).await.unwrap();
        assert_eq!(rows[0].get("score"), Some(&json!(2.5)));
        assert_eq!(rows[0].get("raw"), Some(&json!([1, 2])));
        assert_eq!(rows[0].get("note"), Some(&json!(42)));
        // declared BOOLEAN, stored INTEGER
        assert_eq!(rows[0].get("flag"), Some(&json!(1)));
    }
}
