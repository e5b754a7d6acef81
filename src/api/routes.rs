use axum::{
    middleware,
    routing::{delete, get, patch, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::middleware::{make_span_with_request_id, request_id_middleware};

use super::handlers;
use super::AppState;

/// Creates the main API router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/api", api_routes())
        .layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn(request_id_middleware))
                .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id))
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

/// Catalog routes under /api
fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/game", get(handlers::get_game))
        .route("/games", get(handlers::list_games))
        .route("/games/recommend", get(handlers::recommend_games))
        .route("/games/create", post(handlers::create_game))
        .route("/games/update", patch(handlers::update_game))
        .route("/games/delete", delete(handlers::delete_game))
}
