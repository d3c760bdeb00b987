//! Database bootstrap: open (or create) the SQLite file and fill empty tables with demo rows.

use crate::error::AppError;
use crate::mapper::{record_i64, MapperRegistry, Record, UnitOfWork};
use serde_json::{json, Value};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;

fn is_in_memory(database_url: &str) -> bool {
    database_url.contains(":memory:") || database_url.contains("mode=memory")
}

/// Open a pool on `database_url`, creating the database file and its directory if missing.
/// In-memory databases get a single connection kept alive for the pool's whole life,
/// since every new connection would open a fresh empty database.
pub async fn connect(database_url: &str, max_connections: u32) -> Result<SqlitePool, AppError> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true);
    let in_memory = is_in_memory(database_url);
    if !in_memory {
        if let Some(dir) = options.get_filename().parent() {
            if !dir.as_os_str().is_empty() {
                tokio::fs::create_dir_all(dir).await?;
            }
        }
    }

    let mut pool_options = SqlitePoolOptions::new().max_connections(max_connections.max(1));
    if in_memory {
        pool_options = pool_options
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None);
    }
    let pool = pool_options.connect_with(options).await?;
    tracing::debug!(database_url, "connection to SQLite DB successful");
    Ok(pool)
}

fn row(v: Value) -> Record {
    match v {
        Value::Object(m) => m,
        _ => Record::new(),
    }
}

/// Fill category, student and course tables with demo rows, each only when it is empty.
/// Returns true when anything was written.
pub async fn seed(pool: &SqlitePool, registry: &MapperRegistry) -> Result<bool, AppError> {
    let categories = registry.get_mapper("category")?;
    let students = registry.get_mapper("student")?;
    let courses = registry.get_mapper("course")?;

    let mut uow = UnitOfWork::new();
    if categories.count(pool, &[]).await? == 0 {
        tracing::debug!("table category has no records");
        uow.register_new("category", row(json!({"id": 1, "name": "Interactive courses"})));
        uow.register_new("category", row(json!({"id": 2, "name": "Web category"})));
    }
    if students.count(pool, &[]).await? == 0 {
        tracing::debug!("table student has no records");
        uow.register_new("student", row(json!({"id": 1, "name": "Ivan Ivanov"})));
        uow.register_new("student", row(json!({"id": 2, "name": "Petr Sidorov"})));
    }
    let mut wrote = !uow.is_empty();
    uow.commit(pool, registry).await?;

    if courses.count(pool, &[]).await? == 0 {
        tracing::debug!("table course has no records");
        let existing = categories.find_where(pool, &[], Some(2), None).await?;
        let ids: Vec<i64> = existing
            .iter()
            .map(|r| record_i64(r, "id"))
            .collect::<Result<_, _>>()?;
        if let (Some(&first), Some(&last)) = (ids.first(), ids.last()) {
            let demo = [
                ("Programming outlook", "interactive", first),
                ("Programming in Rust", "interactive", first),
                ("Applications for the desktop", "record", first),
                ("WEB for everyone", "record", last),
            ];
            for (name, kind, category_id) in demo {
                uow.register_new(
                    "course",
                    row(json!({"name": name, "kind": kind, "category_id": category_id})),
                );
            }
            uow.commit(pool, registry).await?;
            wrote = true;
        }
    }
    Ok(wrote)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migration::apply_schema;
    use crate::schema::TABLES;

    #[tokio::test]
    async fn seed_fills_empty_tables_once() {
        let pool = connect("sqlite::memory:", 1).await.unwrap();
        apply_schema(&pool).await.unwrap();
        let registry = MapperRegistry::load(&pool, TABLES).await.unwrap();

        assert!(seed(&pool, &registry).await.unwrap());
        assert!(!seed(&pool, &registry).await.unwrap());

        let courses = registry.get_mapper("course").unwrap();
        assert_eq!(courses.count(&pool, &[]).await.unwrap(), 4);
        let web = courses
            .count(&pool, &[("category_id".to_string(), json!(2))])
            .await
            .unwrap();
        assert_eq!(web, 1);
        assert_eq!(registry.get_mapper("student").unwrap().count(&pool, &[]).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn file_database_is_created_with_its_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("campus.db");
        let url = format!("sqlite://{}", path.display());
        let pool = connect(&url, 2).await.unwrap();
        apply_schema(&pool).await.unwrap();
        pool.close().await;
        assert!(path.exists());
    }

    #[test]
    fn detects_memory_urls() {
        assert!(is_in_memory("sqlite::memory:"));
        assert!(is_in_memory("sqlite://file?mode=memory"));
        assert!(!is_in_memory("sqlite://database/campus.db"));
    }
}
