use axum::middleware as axum_middleware;
use axum::routing::{get, patch, post};
use axum::Router;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::admin::{handlers, middleware};
use crate::AppState;

/// Builds the admin router: every route gated by the bearer/privileged-key
/// check, nothing reaching a handler unauthenticated (§4.6).
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/stores", get(handlers::list_stores).post(handlers::create_store))
        .route("/stores/:id", patch(handlers::patch_store).delete(handlers::delete_store))
        .route("/stores/:id/token", post(handlers::rotate_token))
        .route("/stores/:id/metrics", get(handlers::store_metrics))
        .route("/metrics", get(handlers::global_metrics))
        .route_layer(axum_middleware::from_fn_with_state(state.clone(), middleware::require_admin_key))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(CorsLayer::permissive()))
        .with_state(state)
}
