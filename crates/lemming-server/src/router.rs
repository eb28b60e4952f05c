//! Router construction for the Lemming server.

use axum::routing::{get, post};
use axum::{Extension, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

/// Build the full axum router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let scenarios = Router::new()
        .route("/import_domain/:name", post(handlers::scenarios::import_domain))
        .route("/scenarios", get(handlers::scenarios::list_scenarios))
        .route("/file_upload", post(handlers::scenarios::file_upload));

    let planning = Router::new()
        .route("/get_plans", post(handlers::planning::get_plans))
        .route(
            "/get_landmarks/:category",
            post(handlers::planning::get_landmarks),
        );

    let disambiguation = Router::new()
        .route(
            "/generate_select_view",
            post(handlers::disambiguation::select_view),
        )
        .route(
            "/generate_build_forward",
            post(handlers::disambiguation::build_forward),
        )
        .route(
            "/generate_build_backward",
            post(handlers::disambiguation::build_backward),
        )
        .route(
            "/generate_nl2ltl_integration",
            post(handlers::disambiguation::nl2ltl_integration),
        );

    let ltl = Router::new()
        .route("/nl2ltl", post(handlers::ltl::nl2ltl))
        .route("/ltl_compile/:tool", post(handlers::ltl::ltl_compile));

    Router::new()
        .route("/", get(handlers::health::root))
        .route("/health", get(handlers::health::health))
        .merge(scenarios)
        .merge(planning)
        .merge(disambiguation)
        .merge(ltl)
        .layer(Extension(state))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}
