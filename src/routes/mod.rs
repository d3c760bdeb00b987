//! Router assembly: JSON routes first, everything else falls through to the front controller.
//! The application mode wraps all of it.

mod common;
mod tables;
pub use common::common_routes;
pub use tables::table_routes;

use crate::framework::{app_mode, dispatch};
use crate::state::AppState;
use axum::{middleware, Router};
use tower::ServiceBuilder;
use tower_http::limit::RequestBodyLimitLayer;

/// Largest accepted request body (form posts are small).
pub const MAX_BODY_BYTES: usize = 64 * 1024;

pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(common_routes())
        .nest("/api/v1", table_routes())
        .fallback(dispatch)
        .layer(middleware::from_fn_with_state(state.clone(), app_mode))
        .with_state(state)
        .layer(ServiceBuilder::new().layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES)))
}
