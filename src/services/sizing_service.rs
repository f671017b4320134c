use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use crate::error::SizingError;
use crate::models::sizing::{
    CalculationInput, CompareRequest, LocationComparison, LocationMetrics, PanelType, SizingReport,
    SizingRequest,
};
use crate::services::calculation::{self, PanelCatalog, MIN_BACKUP_DAYS};
use crate::services::recommendation::build_recommendations;
use crate::services::sunshine_service::SunshineProvider;

/// Ties a sunshine provider to the engine. Any failure halts the request;
/// no partial report is produced.
#[derive(Clone)]
pub struct SizingService {
    provider: Arc<dyn SunshineProvider>,
    catalog: Arc<PanelCatalog>,
}

impl SizingService {
    pub fn new(provider: Arc<dyn SunshineProvider>, catalog: Arc<PanelCatalog>) -> Self {
        Self { provider, catalog }
    }

    pub fn catalog(&self) -> &PanelCatalog {
        &self.catalog
    }

    pub fn provider(&self) -> &dyn SunshineProvider {
        self.provider.as_ref()
    }

    pub async fn size(&self, req: &SizingRequest) -> Result<SizingReport, SizingError> {
        let location = req.location.trim().to_string();
        let backup_days = req.backup_days.unwrap_or(MIN_BACKUP_DAYS);
        let sunshine_hours = self.provider.lookup(&location).await?;

        let input = CalculationInput {
            area: req.area,
            user_efficiency_percent: req.efficiency_percent,
            panel_type: req.panel_type,
            annual_sunshine_hours: sunshine_hours,
        };
        let metrics = calculation::compute_metrics(&input, &self.catalog)?;
        let battery = calculation::recommend_battery(metrics.daily_energy, backup_days)?;
        let recommendations = build_recommendations(&location, req.panel_type, req.area, sunshine_hours);

        info!(
            location = %location,
            panel = %req.panel_type,
            area = req.area,
            sunshine_hours,
            annual_energy = metrics.annual_energy,
            "sizing computed"
        );

        Ok(SizingReport {
            location,
            sunshine_hours,
            input,
            metrics,
            battery,
            recommendations,
            generated_at: Utc::now(),
        })
    }

    pub async fn compare(&self, req: &CompareRequest) -> Result<LocationComparison, SizingError> {
        let first = self
            .location_metrics(&req.first_location, req.panel_type, req.area, req.efficiency_percent)
            .await?;
        let second = self
            .location_metrics(&req.second_location, req.panel_type, req.area, req.efficiency_percent)
            .await?;

        Ok(LocationComparison {
            panel_type: req.panel_type,
            area: req.area,
            efficiency_percent: req.efficiency_percent,
            first,
            second,
        })
    }

    async fn location_metrics(
        &self,
        location: &str,
        panel_type: PanelType,
        area: f64,
        efficiency_percent: f64,
    ) -> Result<LocationMetrics, SizingError> {
        let location = location.trim();
        let sunshine_hours = self.provider.lookup(location).await?;
        let metrics = calculation::compute_metrics(
            &CalculationInput {
                area,
                user_efficiency_percent: efficiency_percent,
                panel_type,
                annual_sunshine_hours: sunshine_hours,
            },
            &self.catalog,
        )?;
        Ok(LocationMetrics {
            location: location.to_string(),
            sunshine_hours,
            annual_energy: metrics.annual_energy,
            carbon_offset: metrics.carbon_offset,
            total_cost: metrics.total_cost,
            annual_savings: metrics.annual_savings,
        })
    }
}
