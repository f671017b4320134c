use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::SizingError;

// ─── Panel technology ────────────────────────────────────────────────────────

/// Closed set of panel technologies offered by the calculator.
/// Wire names follow the labels shown to users; incoming names are matched
/// case-insensitively through `FromStr`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, ToSchema)]
pub enum PanelType {
    #[serde(rename = "Monokristalin")]
    Monokristalin,
    #[serde(rename = "Polikristalin")]
    Polikristalin,
    #[serde(rename = "İnce Film")]
    InceFilm,
    #[serde(rename = "Hibrid")]
    Hibrid,
    #[serde(rename = "CIGS")]
    Cigs,
}

impl PanelType {
    /// Declaration order, also the order panels are listed in.
    pub const ALL: [PanelType; 5] = [
        PanelType::Monokristalin,
        PanelType::Polikristalin,
        PanelType::InceFilm,
        PanelType::Hibrid,
        PanelType::Cigs,
    ];

    pub fn label(self) -> &'static str {
        match self {
            PanelType::Monokristalin => "Monokristalin",
            PanelType::Polikristalin => "Polikristalin",
            PanelType::InceFilm => "İnce Film",
            PanelType::Hibrid => "Hibrid",
            PanelType::Cigs => "CIGS",
        }
    }
}

impl fmt::Display for PanelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for PanelType {
    type Err = SizingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        if wanted == "ince film" {
            return Ok(PanelType::InceFilm);
        }
        PanelType::ALL
            .into_iter()
            .find(|p| p.label().to_lowercase() == wanted)
            .ok_or_else(|| SizingError::invalid(format!("unknown panel type '{}'", s.trim())))
    }
}

impl<'de> Deserialize<'de> for PanelType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        name.parse().map_err(serde::de::Error::custom)
    }
}

/// Intrinsic constants of one panel technology.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PanelSpec {
    pub panel_type: PanelType,
    /// Conversion efficiency, 0 < f ≤ 1
    pub efficiency_factor: f64,
    /// Installation cost per m² (TL)
    pub unit_cost: f64,
}

// ─── Engine input / output ───────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CalculationInput {
    /// Panel area (m²), must be > 0
    pub area: f64,
    /// System derating slider, 0–100
    pub user_efficiency_percent: f64,
    pub panel_type: PanelType,
    /// Annualized sunshine hours, ≥ 0
    pub annual_sunshine_hours: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CalculationResult {
    /// kWh per day
    pub daily_energy: f64,
    /// kWh per year
    pub annual_energy: f64,
    /// kg CO2-equivalent avoided per year
    pub carbon_offset: f64,
    /// TL
    pub total_cost: f64,
    /// TL per year
    pub annual_savings: f64,
    /// Absent when there are no savings to pay the system back
    pub payback_years: Option<f64>,
}

// ─── Battery sizing ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BatteryBand {
    Small,
    Mid,
    High,
}

impl BatteryBand {
    pub fn label(self) -> &'static str {
        match self {
            BatteryBand::Small => "small-system sufficient",
            BatteryBand::Mid => "mid-size home suitable",
            BatteryBand::High => "high-demand system",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BatteryRecommendation {
    pub backup_days: u32,
    /// Energy the storage must hold per backed-up day (kWh)
    pub storable_energy_per_day: f64,
    pub capacity_watt_hours: f64,
    pub band: BatteryBand,
    pub band_label: String,
}

// ─── REST API request / response types ───────────────────────────────────────

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BatteryRequest {
    pub daily_energy: f64,
    /// 1–10
    pub backup_days: u32,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationRequest {
    pub location: String,
    pub panel_type: PanelType,
    pub area: f64,
    pub sunshine_hours: f64,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SizingRequest {
    pub location: String,
    pub panel_type: PanelType,
    pub area: f64,
    pub efficiency_percent: f64,
    /// Defaults to one day of storage
    pub backup_days: Option<u32>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SizingReport {
    pub location: String,
    pub sunshine_hours: f64,
    pub input: CalculationInput,
    pub metrics: CalculationResult,
    pub battery: BatteryRecommendation,
    pub recommendations: Vec<String>,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompareRequest {
    pub first_location: String,
    pub second_location: String,
    pub panel_type: PanelType,
    pub area: f64,
    pub efficiency_percent: f64,
}

/// One column of the two-location comparison table.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LocationMetrics {
    pub location: String,
    pub sunshine_hours: f64,
    pub annual_energy: f64,
    pub carbon_offset: f64,
    pub total_cost: f64,
    pub annual_savings: f64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LocationComparison {
    pub panel_type: PanelType,
    pub area: f64,
    pub efficiency_percent: f64,
    pub first: LocationMetrics,
    pub second: LocationMetrics,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SunshineResponse {
    pub location: String,
    pub sunshine_hours: f64,
    pub provider: String,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct FeedbackRequest {
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackReceipt {
    pub id: Uuid,
    pub accepted_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HealthStatus {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub sunshine_provider: String,
    pub panel_types: usize,
}

// ─── Nominatim / Open-Meteo wire types ───────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct GeocodePlace {
    pub lat: String,
    pub lon: String,
    pub display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SunshineForecastResponse {
    pub daily: Option<DailySunshine>,
}

#[derive(Debug, Deserialize)]
pub struct DailySunshine {
    /// Seconds of sunshine per day; the API reports null for missing days
    #[serde(default)]
    pub sunshine_duration: Vec<Option<f64>>,
}
