//! Campus: a small web framework (front controller, templates) over a table-driven
//! data mapper and unit of work on SQLite, with a course catalogue built on top.

pub mod config;
pub mod domain;
pub mod engine;
pub mod error;
pub mod framework;
pub mod handlers;
pub mod mapper;
pub mod migration;
pub mod response;
pub mod routes;
pub mod schema;
pub mod sql;
pub mod state;
pub mod store;

pub use config::{AppMode, Settings};
pub use engine::Engine;
pub use error::{AppError, ConfigError, SchemaError};
pub use mapper::{CommitReport, MapperRegistry, Record, UnitOfWork, UniversalMapper};
pub use migration::apply_schema;
pub use routes::app;
pub use state::AppState;
pub use store::{connect, seed};
