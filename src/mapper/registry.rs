use super::UniversalMapper;
use crate::domain::DomainObject;
use crate::error::{AppError, SchemaError};
use crate::schema::{introspect, TableSchema};
use sqlx::SqlitePool;
use std::collections::HashMap;

/// Table name to mapper. Built once at startup; schemas are not re-read afterwards.
#[derive(Clone, Debug, Default)]
pub struct MapperRegistry {
    mappers: HashMap<String, UniversalMapper>,
}

impl MapperRegistry {
    /// Reflect every listed table and register a mapper for it.
    pub async fn load(pool: &SqlitePool, tables: &[&str]) -> Result<Self, AppError> {
        let mut schemas = Vec::with_capacity(tables.len());
        for table in tables {
            schemas.push(introspect(pool, table).await?);
        }
        tracing::info!(tables = ?tables, "mapper registry loaded");
        Ok(Self::from_schemas(schemas))
    }

    pub fn from_schemas(schemas: Vec<TableSchema>) -> Self {
        let mappers = schemas
            .into_iter()
            .map(|s| (s.name.clone(), UniversalMapper::new(s)))
            .collect();
        MapperRegistry { mappers }
    }

    pub fn get_mapper(&self, table: &str) -> Result<&UniversalMapper, SchemaError> {
        self.mappers
            .get(table)
            .ok_or_else(|| SchemaError::UnknownTable(table.to_string()))
    }

    /// Mapper for the table a domain object persists to.
    pub fn get_current_mapper<T: DomainObject>(&self, _obj: &T) -> Result<&UniversalMapper, SchemaError> {
        self.get_mapper(T::TABLE)
    }

    /// Registered table names, sorted.
    pub fn tables(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.mappers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
