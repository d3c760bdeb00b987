//! UnitOfWork: collect new, dirty and removed rows, then write them in one transaction.

use super::{MapperRegistry, Record};
use crate::domain::DomainObject;
use crate::error::AppError;
use serde_json::Value;
use sqlx::SqlitePool;

#[derive(Clone, Debug)]
enum Removal {
    Id(i64),
    Filters(Vec<(String, Value)>),
}

/// Outcome of a commit. `inserted` follows registration order and carries database-assigned ids.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CommitReport {
    pub inserted: Vec<Record>,
    pub updated: usize,
    pub removed: u64,
}

#[derive(Clone, Debug, Default)]
pub struct UnitOfWork {
    new_objects: Vec<(String, Record)>,
    dirty_objects: Vec<(String, i64, Record)>,
    removed_objects: Vec<(String, Removal)>,
}

impl UnitOfWork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.new_objects.is_empty() && self.dirty_objects.is_empty() && self.removed_objects.is_empty()
    }

    /// Queue an insert. Returns the index of its row in `CommitReport::inserted`.
    pub fn register_new(&mut self, table: impl Into<String>, record: Record) -> usize {
        self.new_objects.push((table.into(), record));
        self.new_objects.len() - 1
    }

    pub fn register_new_object<T: DomainObject>(&mut self, obj: &T) -> usize {
        self.register_new(T::TABLE, obj.to_record())
    }

    pub fn register_dirty(&mut self, table: impl Into<String>, id: i64, record: Record) {
        self.dirty_objects.push((table.into(), id, record));
    }

    pub fn register_dirty_object<T: DomainObject>(&mut self, obj: &T) -> Result<(), AppError> {
        let id = persisted_id(obj)?;
        self.register_dirty(T::TABLE, id, obj.to_record());
        Ok(())
    }

    pub fn register_removed(&mut self, table: impl Into<String>, filters: Vec<(String, Value)>) {
        self.removed_objects.push((table.into(), Removal::Filters(filters)));
    }

    pub fn register_removed_id(&mut self, table: impl Into<String>, id: i64) {
        self.removed_objects.push((table.into(), Removal::Id(id)));
    }

    pub fn register_removed_object<T: DomainObject>(&mut self, obj: &T) -> Result<(), AppError> {
        let id = persisted_id(obj)?;
        self.register_removed_id(T::TABLE, id);
        Ok(())
    }

    /// Inserts, then updates, then deletes, all in one transaction. On success the work is cleared;
    /// on failure the transaction rolls back and the queued work stays as it was.
    pub async fn commit(&mut self, pool: &SqlitePool, registry: &MapperRegistry) -> Result<CommitReport, AppError> {
        let mut report = CommitReport::default();
        if self.is_empty() {
            return Ok(report);
        }

        let mut tx = pool.begin().await?;
        for (table, record) in &self.new_objects {
            let mapper = registry.get_mapper(table)?;
            report.inserted.push(mapper.insert(&mut *tx, record).await?);
        }
        for (table, id, record) in &self.dirty_objects {
            let mapper = registry.get_mapper(table)?;
            if mapper.update(&mut *tx, *id, record).await?.is_none() {
                return Err(AppError::NotFound(format!("{} {}", table, id)));
            }
            report.updated += 1;
        }
        for (table, removal) in &self.removed_objects {
            let mapper = registry.get_mapper(table)?;
            report.removed += match removal {
                Removal::Id(id) => mapper.delete_by_id(&mut *tx, *id).await?,
                Removal::Filters(filters) => mapper.delete_where(&mut *tx, filters).await?,
            };
        }
        tx.commit().await?;

        tracing::debug!(
            inserted = report.inserted.len(),
            updated = report.updated,
            removed = report.removed,
            "unit of work committed"
        );
        self.new_objects.clear();
        self.dirty_objects.clear();
        self.removed_objects.clear();
        Ok(report)
    }
}

fn persisted_id<T: DomainObject>(obj: &T) -> Result<i64, AppError> {
    obj.id()
        .ok_or_else(|| AppError::Validation(format!("{} row has not been saved yet", T::TABLE)))
}
