//! JSON table routes: list and read rows of any table in the mapper registry.

use crate::handlers::tables::{list, read};
use crate::state::AppState;
use axum::{routing::get, Router};

pub fn table_routes() -> Router<AppState> {
    Router::new()
        .route("/tables/:table", get(list))
        .route("/tables/:table/:id", get(read))
}
