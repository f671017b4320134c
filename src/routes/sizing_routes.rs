use axum::{
    response::Html,
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_scalar::Scalar;

use crate::api_docs::ApiDoc;
use crate::controllers::sizing_controller::{
    // Reference data
    get_health, list_panels, list_locations, get_location_sunshine,
    // Engine
    compute_metrics, recommend_battery, recommendations,
    // Location-based
    size_installation, compare_locations,
    // Feedback
    submit_feedback,
};
use crate::shared_state::AppState;

/// Build the `/api/*` sub-router.
pub fn api_routes(state: AppState) -> Router {
    Router::new()
        .route("/health",                    get(get_health))
        .route("/panels",                    get(list_panels))
        .route("/locations",                 get(list_locations))
        .route("/locations/{name}/sunshine", get(get_location_sunshine))
        .route("/metrics",                   post(compute_metrics))
        .route("/battery",                   post(recommend_battery))
        .route("/recommendations",           post(recommendations))
        .route("/sizing",                    post(size_installation))
        .route("/compare",                   post(compare_locations))
        .route("/feedback",                  post(submit_feedback))
        .with_state(state)
}

/// Full application: API, Scalar reference page, tracing and CORS.
pub fn app(state: AppState) -> Router {
    Router::new()
        .nest("/api", api_routes(state))
        .route("/scalar", get(|| async {
            Html(Scalar::new(ApiDoc::openapi()).to_html())
        }))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
