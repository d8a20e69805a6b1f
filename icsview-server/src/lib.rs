//! HTTP front end for icsview: server-rendered calendar pages and a JSON API.

pub mod html;
pub mod routes;
pub mod state;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// All routes with CORS and request tracing.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(routes::views::router())
        .merge(routes::api::router())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
