//! Apply the application schema: idempotent DDL for the category tree, courses, students and enrolments.

use crate::error::AppError;
use sqlx::SqlitePool;

const DDL: &[(&str, &str)] = &[
    (
        "category",
        r#"
        CREATE TABLE IF NOT EXISTS category (
            id INTEGER NOT NULL PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            category_id INTEGER
                REFERENCES category (id)
                ON UPDATE CASCADE
                ON DELETE CASCADE
        )
        "#,
    ),
    (
        "course",
        r#"
        CREATE TABLE IF NOT EXISTS course (
            id INTEGER NOT NULL PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            kind TEXT NOT NULL DEFAULT 'record',
            category_id INTEGER NOT NULL
                REFERENCES category (id)
                ON UPDATE CASCADE
                ON DELETE CASCADE
        )
        "#,
    ),
    (
        "student",
        r#"
        CREATE TABLE IF NOT EXISTS student (
            id INTEGER NOT NULL PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL
        )
        "#,
    ),
    (
        "course_student",
        r#"
        CREATE TABLE IF NOT EXISTS course_student (
            course_id INTEGER NOT NULL
                REFERENCES course (id)
                ON DELETE CASCADE,
            student_id INTEGER NOT NULL
                REFERENCES student (id)
                ON DELETE CASCADE,
            PRIMARY KEY (course_id, student_id)
        )
        "#,
    ),
];

/// Create every application table that does not exist yet. Safe to run on each startup.
pub async fn apply_schema(pool: &SqlitePool) -> Result<(), AppError> {
    for (table, ddl) in DDL {
        tracing::debug!(table, "ensure table");
        sqlx::query(ddl).execute(pool).await?;
    }
    Ok(())
}
