use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use crate::error::{ApiJson, SizingError};
use crate::models::sizing::{
    BatteryRecommendation, BatteryRequest, CalculationInput, CalculationResult, CompareRequest,
    FeedbackReceipt, FeedbackRequest, HealthStatus, LocationComparison, PanelSpec,
    RecommendationRequest, SizingReport, SizingRequest, SunshineResponse,
};
use crate::services::calculation;
use crate::services::recommendation::build_recommendations;
use crate::shared_state::AppState;

/// GET /api/health
/// Service liveness
#[utoipa::path(
    get,
    path = "/api/health",
    responses(
        (status = 200, description = "Service is up", body = HealthStatus)
    )
)]
pub async fn get_health(State(state): State<AppState>) -> impl IntoResponse {
    Json(HealthStatus {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.uptime_seconds(),
        sunshine_provider: state.sizing.provider().name().to_string(),
        panel_types: state.sizing.catalog().specs().len(),
    })
}

/// GET /api/panels
/// List panel technologies
///
/// Returns every panel type with the efficiency factor and unit cost used by the calculator.
#[utoipa::path(
    get,
    path = "/api/panels",
    responses(
        (status = 200, description = "Panel catalog", body = Vec<PanelSpec>)
    )
)]
pub async fn list_panels(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.sizing.catalog().specs())
}

/// GET /api/locations
/// List locations known without a network lookup
///
/// Empty when the live sunshine provider is active; any place name may then be used.
#[utoipa::path(
    get,
    path = "/api/locations",
    responses(
        (status = 200, description = "Known location names", body = Vec<String>)
    )
)]
pub async fn list_locations(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.sizing.provider().known_locations())
}

/// GET /api/locations/{name}/sunshine
/// Annual sunshine hours for a location
#[utoipa::path(
    get,
    path = "/api/locations/{name}/sunshine",
    params(
        ("name" = String, Path, description = "Location (province) name")
    ),
    responses(
        (status = 200, description = "Annual sunshine hours", body = SunshineResponse),
        (status = 404, description = "Location not found"),
        (status = 502, description = "Sunshine data provider unavailable")
    )
)]
pub async fn get_location_sunshine(
    Path(name): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<SunshineResponse>, SizingError> {
    let provider = state.sizing.provider();
    let sunshine_hours = provider.lookup(&name).await?;
    Ok(Json(SunshineResponse {
        location: name.trim().to_string(),
        sunshine_hours,
        provider: provider.name().to_string(),
    }))
}

/// POST /api/metrics
/// Compute yield, carbon, cost, savings and payback for explicit inputs
#[utoipa::path(
    post,
    path = "/api/metrics",
    request_body = CalculationInput,
    responses(
        (status = 200, description = "Derived metrics", body = CalculationResult),
        (status = 400, description = "Invalid input")
    )
)]
pub async fn compute_metrics(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<CalculationInput>,
) -> Result<Json<CalculationResult>, SizingError> {
    Ok(Json(calculation::compute_metrics(&input, state.sizing.catalog())?))
}

/// POST /api/battery
/// Battery capacity for a number of backup days
#[utoipa::path(
    post,
    path = "/api/battery",
    request_body = BatteryRequest,
    responses(
        (status = 200, description = "Battery recommendation", body = BatteryRecommendation),
        (status = 400, description = "Backup days outside 1–10")
    )
)]
pub async fn recommend_battery(ApiJson(req): ApiJson<BatteryRequest>) -> Result<Json<BatteryRecommendation>, SizingError> {
    Ok(Json(calculation::recommend_battery(req.daily_energy, req.backup_days)?))
}

/// POST /api/recommendations
/// Advisory notes for a configuration
#[utoipa::path(
    post,
    path = "/api/recommendations",
    request_body = RecommendationRequest,
    responses(
        (status = 200, description = "Ordered advisory notes", body = Vec<String>),
        (status = 400, description = "Malformed request or unknown panel type")
    )
)]
pub async fn recommendations(ApiJson(req): ApiJson<RecommendationRequest>) -> impl IntoResponse {
    Json(build_recommendations(req.location.trim(), req.panel_type, req.area, req.sunshine_hours))
}

/// POST /api/sizing
/// Full sizing report for a location
///
/// Resolves the location's sunshine hours, then returns metrics, battery sizing and recommendations.
#[utoipa::path(
    post,
    path = "/api/sizing",
    request_body = SizingRequest,
    responses(
        (status = 200, description = "Sizing report", body = SizingReport),
        (status = 400, description = "Invalid input"),
        (status = 404, description = "Location not found"),
        (status = 502, description = "Sunshine data provider unavailable")
    )
)]
pub async fn size_installation(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<SizingRequest>,
) -> Result<Json<SizingReport>, SizingError> {
    Ok(Json(state.sizing.size(&req).await?))
}

/// POST /api/compare
/// Same installation in two locations
#[utoipa::path(
    post,
    path = "/api/compare",
    request_body = CompareRequest,
    responses(
        (status = 200, description = "Side-by-side comparison", body = LocationComparison),
        (status = 400, description = "Invalid input"),
        (status = 404, description = "Location not found"),
        (status = 502, description = "Sunshine data provider unavailable")
    )
)]
pub async fn compare_locations(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<CompareRequest>,
) -> Result<Json<LocationComparison>, SizingError> {
    Ok(Json(state.sizing.compare(&req).await?))
}

/// POST /api/feedback
/// Leave feedback
///
/// The message is queued; delivery happens in the background.
#[utoipa::path(
    post,
    path = "/api/feedback",
    request_body = FeedbackRequest,
    responses(
        (status = 202, description = "Feedback accepted", body = FeedbackReceipt),
        (status = 400, description = "Empty message"),
        (status = 503, description = "Feedback cannot be accepted right now")
    )
)]
pub async fn submit_feedback(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<FeedbackRequest>,
) -> Result<impl IntoResponse, SizingError> {
    let receipt = state.feedback.send(&req.message).await?;
    Ok((StatusCode::ACCEPTED, Json(receipt)))
}
