//! Route definitions and router construction.

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

/// All API routes without the `/api` prefix.
pub(crate) fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/status", get(handlers::status::get))
        .route(
            "/servers",
            get(handlers::servers::list).post(handlers::servers::create),
        )
        .route(
            "/servers/{name}",
            get(handlers::servers::get)
                .put(handlers::servers::update)
                .delete(handlers::servers::remove),
        )
        .route("/servers/{name}/tools", get(handlers::operations::list_tools))
        .route("/query", post(handlers::operations::query))
        .route("/tools/parse", post(handlers::operations::parse_tools))
        .route("/config/export", post(handlers::config::export))
        .route("/config/import", post(handlers::config::import))
}

/// Router with the API nested under `/api`, open CORS and request tracing.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .nest("/api", api_routes().with_state(state))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
