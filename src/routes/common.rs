//! Service routes: liveness, readiness of every mapped table, build info.

use crate::state::AppState;
use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde_json::{json, Map, Value};

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Ready when every registered mapper can count its table.
async fn ready(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let mut tables = Map::new();
    for table in state.registry.tables() {
        let counted = match state.registry.get_mapper(table) {
            Ok(mapper) => mapper.count(&state.pool, &[]).await.ok(),
            Err(_) => None,
        };
        let Some(rows) = counted else {
            tracing::warn!(table, "table not readable");
            return (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "degraded", "table": table })),
            );
        };
        tables.insert(table.to_string(), Value::from(rows));
    }
    (StatusCode::OK, Json(json!({ "status": "ok", "tables": tables })))
}

async fn version(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "mode": format!("{:?}", state.front.mode()).to_lowercase(),
        "tables": state.registry.tables(),
    }))
}

pub fn common_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/ready", get(ready))
        .route("/version", get(version))
}
