use utoipa::OpenApi;
use crate::controllers::sizing_controller;
use crate::error;
use crate::models::sizing;

#[derive(OpenApi)]
#[openapi(
    paths(
        sizing_controller::get_health,
        sizing_controller::list_panels,
        sizing_controller::list_locations,
        sizing_controller::get_location_sunshine,
        sizing_controller::compute_metrics,
        sizing_controller::recommend_battery,
        sizing_controller::recommendations,
        sizing_controller::size_installation,
        sizing_controller::compare_locations,
        sizing_controller::submit_feedback
    ),
    components(
        schemas(
            sizing::PanelType,
            sizing::PanelSpec,
            sizing::CalculationInput,
            sizing::CalculationResult,
            sizing::BatteryBand,
            sizing::BatteryRecommendation,
            sizing::SizingReport,
            sizing::LocationComparison,
            error::ErrorResponse
        )
    ),
    tags(
        (name = "solar-panel-sizer", description = "Solar Panel Sizing API")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_route_is_documented() {
        let doc = ApiDoc::openapi();
        for path in [
            "/api/health",
            "/api/panels",
            "/api/locations",
            "/api/locations/{name}/sunshine",
            "/api/metrics",
            "/api/battery",
            "/api/recommendations",
            "/api/sizing",
            "/api/compare",
            "/api/feedback",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {}", path);
        }
    }
}
