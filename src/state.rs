//! Shared application state for all routes, and the startup sequence that builds it.

use crate::config::Settings;
use crate::domain::default_observers;
use crate::engine::Engine;
use crate::error::AppError;
use crate::framework::{default_fronts, FrontController, Templates};
use crate::handlers::default_routes;
use crate::mapper::MapperRegistry;
use crate::migration::apply_schema;
use crate::schema::TABLES;
use crate::store::{connect, seed};
use sqlx::SqlitePool;
use std::sync::Arc;
use tokio::sync::Mutex;

const MAX_CONNECTIONS: u32 = 5;

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub registry: Arc<MapperRegistry>,
    /// Single writer for the object graph; views hold the lock for the whole request.
    pub engine: Arc<Mutex<Engine>>,
    pub templates: Arc<Templates>,
    pub front: Arc<FrontController>,
}

impl AppState {
    /// Open the database, apply the schema, reflect the tables, optionally seed, and hydrate the engine.
    pub async fn bootstrap(settings: &Settings) -> Result<Self, AppError> {
        let pool = connect(&settings.database_url, MAX_CONNECTIONS).await?;
        apply_schema(&pool).await?;
        let registry = Arc::new(MapperRegistry::load(&pool, TABLES).await?);
        if settings.seed && seed(&pool, &registry).await? {
            tracing::info!("database filled with demo data");
        }
        let engine = Engine::load(pool.clone(), registry.clone(), default_observers()).await?;
        let templates = match &settings.template_dir {
            Some(dir) => Templates::with_overrides(dir).await?,
            None => Templates::builtin()?,
        };
        let front = FrontController::new(default_routes(), default_fronts(), settings.mode);
        Ok(AppState {
            pool,
            registry,
            engine: Arc::new(Mutex::new(engine)),
            templates: Arc::new(templates),
            front: Arc::new(front),
        })
    }
}
