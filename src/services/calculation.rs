//! ============================================================
//!  Panel Sizing Calculation Engine
//!
//!  Straight-line pipeline, every step a pure function:
//!   1. Daily energy   – area × normalization × panel efficiency × derating
//!   2. Annual energy  – daily energy × annual sunshine hours
//!   3. Carbon offset  – annual energy × emissions factor
//!   4. Cost / savings – area × unit cost, annual energy × tariff
//!   5. Payback        – cost / savings (undefined without savings)
//!   6. Battery sizing – daily energy × kWh→Wh × backup days, banded
//! ============================================================

use std::collections::HashMap;

use crate::error::SizingError;
use crate::models::sizing::{
    BatteryBand, BatteryRecommendation, CalculationInput, CalculationResult, PanelSpec, PanelType,
};

// ─── Domain constants ────────────────────────────────────────
/// Nominal W/m² at reference irradiance folded into the daily-energy formula.
pub const ENERGY_NORMALIZATION_FACTOR: f64 = 1000.0;
/// kg CO2-equivalent avoided per kWh produced.
pub const CARBON_OFFSET_FACTOR: f64 = 0.4;
/// TL saved per kWh produced.
pub const SAVINGS_RATE: f64 = 1.5;
/// Battery capacity is reported in Wh, daily energy is in kWh.
pub const WATT_HOURS_PER_KILOWATT_HOUR: f64 = 1000.0;
/// Efficiency factor given to a catalog entry configured without one.
pub const DEFAULT_EFFICIENCY_FACTOR: f64 = 0.18;

pub const SMALL_BATTERY_LIMIT_WH: f64 = 5000.0;
pub const MID_BATTERY_LIMIT_WH: f64 = 10000.0;
pub const MIN_BACKUP_DAYS: u32 = 1;
pub const MAX_BACKUP_DAYS: u32 = 10;

impl PanelType {
    /// Constants used when no catalog overrides them.
    pub fn builtin_spec(self) -> PanelSpec {
        let (efficiency_factor, unit_cost) = match self {
            PanelType::Monokristalin => (0.22, 2000.0),
            PanelType::Polikristalin => (DEFAULT_EFFICIENCY_FACTOR, 1500.0),
            PanelType::InceFilm => (0.14, 1000.0),
            PanelType::Hibrid => (0.25, 2200.0),
            PanelType::Cigs => (0.17, 1800.0),
        };
        PanelSpec { panel_type: self, efficiency_factor, unit_cost }
    }
}

// ─── Panel catalog ───────────────────────────────────────────

/// Immutable panel constants, injected at startup.
#[derive(Debug, Clone)]
pub struct PanelCatalog {
    specs: HashMap<PanelType, PanelSpec>,
}

impl PanelCatalog {
    pub fn builtin() -> Self {
        let specs = PanelType::ALL.into_iter().map(|p| (p, p.builtin_spec())).collect();
        Self { specs }
    }

    /// Entries not listed keep their built-in constants.
    pub fn from_specs(entries: impl IntoIterator<Item = PanelSpec>) -> Result<Self, SizingError> {
        let mut catalog = Self::builtin();
        for spec in entries {
            if !spec.efficiency_factor.is_finite()
                || spec.efficiency_factor <= 0.0
                || spec.efficiency_factor > 1.0
            {
                return Err(SizingError::invalid(format!(
                    "efficiency factor for {} must be in (0, 1], got {}",
                    spec.panel_type, spec.efficiency_factor
                )));
            }
            if !spec.unit_cost.is_finite() || spec.unit_cost < 0.0 {
                return Err(SizingError::invalid(format!(
                    "unit cost for {} must be non-negative, got {}",
                    spec.panel_type, spec.unit_cost
                )));
            }
            catalog.specs.insert(spec.panel_type, spec);
        }
        Ok(catalog)
    }

    pub fn spec(&self, panel: PanelType) -> PanelSpec {
        self.specs.get(&panel).copied().unwrap_or_else(|| panel.builtin_spec())
    }

    /// All entries in declaration order.
    pub fn specs(&self) -> Vec<PanelSpec> {
        PanelType::ALL.into_iter().map(|p| self.spec(p)).collect()
    }
}

impl Default for PanelCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

// ─── Formulas ────────────────────────────────────────────────

/// kWh/day. Does not validate the percent; `compute_metrics` does.
pub fn daily_energy(area: f64, user_efficiency_percent: f64, panel: &PanelSpec) -> Result<f64, SizingError> {
    if !area.is_finite() || area <= 0.0 {
        return Err(SizingError::invalid(format!("area must be greater than 0, got {}", area)));
    }
    Ok(area * ENERGY_NORMALIZATION_FACTOR * panel.efficiency_factor * (user_efficiency_percent / 100.0))
}

pub fn annual_energy(daily_energy: f64, annual_sunshine_hours: f64) -> f64 {
    daily_energy * annual_sunshine_hours
}

pub fn carbon_offset(annual_energy: f64) -> f64 {
    annual_energy * CARBON_OFFSET_FACTOR
}

pub fn total_cost(area: f64, panel: &PanelSpec) -> f64 {
    area * panel.unit_cost
}

pub fn annual_savings(annual_energy: f64) -> f64 {
    annual_energy * SAVINGS_RATE
}

pub fn payback_years(total_cost: f64, annual_savings: f64) -> Option<f64> {
    (annual_savings > 0.0).then(|| total_cost / annual_savings)
}

/// Full metric set for one input. No partial result on invalid input.
pub fn compute_metrics(input: &CalculationInput, catalog: &PanelCatalog) -> Result<CalculationResult, SizingError> {
    let pct = input.user_efficiency_percent;
    if !pct.is_finite() || !(0.0..=100.0).contains(&pct) {
        return Err(SizingError::invalid(format!("efficiency percent must be within 0–100, got {}", pct)));
    }
    let hours = input.annual_sunshine_hours;
    if !hours.is_finite() || hours < 0.0 {
        return Err(SizingError::invalid(format!("sunshine hours must be non-negative, got {}", hours)));
    }

    let panel = catalog.spec(input.panel_type);
    let daily = daily_energy(input.area, pct, &panel)?;
    let annual = annual_energy(daily, hours);
    let cost = total_cost(input.area, &panel);
    let savings = annual_savings(annual);

    Ok(CalculationResult {
        daily_energy: daily,
        annual_energy: annual,
        carbon_offset: carbon_offset(annual),
        total_cost: cost,
        annual_savings: savings,
        payback_years: payback_years(cost, savings),
    })
}

pub fn battery_band(capacity_wh: f64) -> BatteryBand {
    if capacity_wh < SMALL_BATTERY_LIMIT_WH {
        BatteryBand::Small
    } else if capacity_wh < MID_BATTERY_LIMIT_WH {
        BatteryBand::Mid
    } else {
        BatteryBand::High
    }
}

/// Storage needed to cover `backup_days` of production.
pub fn recommend_battery(daily_energy: f64, backup_days: u32) -> Result<BatteryRecommendation, SizingError> {
    if !(MIN_BACKUP_DAYS..=MAX_BACKUP_DAYS).contains(&backup_days) {
        return Err(SizingError::invalid(format!(
            "backup days must be within {}–{}, got {}",
            MIN_BACKUP_DAYS, MAX_BACKUP_DAYS, backup_days
        )));
    }
    if !daily_energy.is_finite() {
        return Err(SizingError::invalid("daily energy must be a finite number"));
    }

    let capacity = daily_energy * WATT_HOURS_PER_KILOWATT_HOUR * f64::from(backup_days);
    let band = battery_band(capacity);
    Ok(BatteryRecommendation {
        backup_days,
        storable_energy_per_day: daily_energy,
        capacity_watt_hours: capacity,
        band,
        band_label: band.label().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const REFERENCE_HOURS: f64 = 270.0 * 365.0 / 12.0;

    fn mono() -> PanelSpec {
        PanelType::Monokristalin.builtin_spec()
    }

    fn input(area: f64, pct: f64, hours: f64) -> CalculationInput {
        CalculationInput {
            area,
            user_efficiency_percent: pct,
            panel_type: PanelType::Monokristalin,
            annual_sunshine_hours: hours,
        }
    }

    #[test]
    fn reference_scenario() {
        let r = compute_metrics(&input(20.0, 50.0, REFERENCE_HOURS), &PanelCatalog::builtin()).unwrap();
        assert!((r.daily_energy - 2200.0).abs() < 1e-9);
        assert!((r.annual_energy - 18_067_500.0).abs() < 1e-6);
        assert!((r.carbon_offset - 7_227_000.0).abs() < 1e-6);
        assert_eq!(r.total_cost, 40_000.0);
        assert!((r.annual_savings - 27_101_250.0).abs() < 1e-6);
        let payback = r.payback_years.unwrap();
        assert_eq!(payback, r.total_cost / r.annual_savings);
        assert!((payback - 0.0015).abs() < 1e-4);
    }

    #[test]
    fn zero_area_is_rejected() {
        let err = compute_metrics(&input(0.0, 50.0, 2000.0), &PanelCatalog::builtin()).unwrap_err();
        assert!(matches!(err, SizingError::InvalidInput(_)));
        assert!(daily_energy(-3.0, 50.0, &mono()).is_err());
        assert!(daily_energy(f64::NAN, 50.0, &mono()).is_err());
    }

    #[test]
    fn out_of_range_percent_and_hours_are_rejected() {
        let catalog = PanelCatalog::builtin();
        assert!(compute_metrics(&input(10.0, 100.5, 2000.0), &catalog).is_err());
        assert!(compute_metrics(&input(10.0, -1.0, 2000.0), &catalog).is_err());
        assert!(compute_metrics(&input(10.0, 50.0, -1.0), &catalog).is_err());
        assert!(compute_metrics(&input(10.0, 0.0, 0.0), &catalog).is_ok());
        assert!(compute_metrics(&input(10.0, 100.0, 0.0), &catalog).is_ok());
    }

    #[test]
    fn daily_energy_is_linear_in_area_and_percent() {
        for panel in PanelType::ALL.map(PanelType::builtin_spec) {
            let base = daily_energy(5.0, 40.0, &panel).unwrap();
            assert!(base >= 0.0);
            let double_area = daily_energy(10.0, 40.0, &panel).unwrap();
            let double_pct = daily_energy(5.0, 80.0, &panel).unwrap();
            assert!((double_area - 2.0 * base).abs() < 1e-9);
            assert!((double_pct - 2.0 * base).abs() < 1e-9);
            assert_eq!(daily_energy(5.0, 0.0, &panel).unwrap(), 0.0);
        }
    }

    #[test]
    fn annual_energy_scales_with_hours() {
        assert_eq!(annual_energy(2200.0, 0.0), 0.0);
        assert_eq!(annual_energy(2200.0, 1000.0), 2_200_000.0);
    }

    #[test]
    fn payback_is_undefined_without_savings() {
        assert_eq!(payback_years(40_000.0, 0.0), None);
        assert_eq!(payback_years(40_000.0, 8_000.0), Some(5.0));

        let r = compute_metrics(&input(20.0, 0.0, REFERENCE_HOURS), &PanelCatalog::builtin()).unwrap();
        assert_eq!(r.annual_savings, 0.0);
        assert_eq!(r.payback_years, None);
        assert_eq!(r.total_cost, 40_000.0);
    }

    #[test]
    fn compute_metrics_is_deterministic() {
        let catalog = PanelCatalog::builtin();
        let i = input(13.7, 63.0, 2731.0);
        let a = compute_metrics(&i, &catalog).unwrap();
        let b = compute_metrics(&i, &catalog).unwrap();
        assert_eq!(a.annual_energy.to_bits(), b.annual_energy.to_bits());
        assert_eq!(a, b);
    }

    #[test]
    fn battery_band_boundaries() {
        assert_eq!(battery_band(4999.0), BatteryBand::Small);
        assert_eq!(battery_band(5000.0), BatteryBand::Mid);
        assert_eq!(battery_band(9999.0), BatteryBand::Mid);
        assert_eq!(battery_band(10000.0), BatteryBand::High);
    }

    #[test]
    fn battery_capacity_covers_backup_days() {
        let rec = recommend_battery(2.5, 3).unwrap();
        assert_eq!(rec.capacity_watt_hours, 7500.0);
        assert_eq!(rec.band, BatteryBand::Mid);
        assert_eq!(rec.band_label, "mid-size home suitable");
        assert_eq!(rec.storable_energy_per_day, 2.5);

        assert_eq!(recommend_battery(4.0, 1).unwrap().band, BatteryBand::Small);
        assert_eq!(recommend_battery(1.0, 10).unwrap().band, BatteryBand::High);
    }

    #[test]
    fn backup_days_outside_range_are_rejected() {
        assert!(matches!(recommend_battery(2.0, 0), Err(SizingError::InvalidInput(_))));
        assert!(matches!(recommend_battery(2.0, 11), Err(SizingError::InvalidInput(_))));
    }

    #[test]
    fn catalog_overrides_and_validates() {
        let catalog = PanelCatalog::from_specs([PanelSpec {
            panel_type: PanelType::Hibrid,
            efficiency_factor: 0.3,
            unit_cost: 2500.0,
        }])
        .unwrap();
        assert_eq!(catalog.spec(PanelType::Hibrid).efficiency_factor, 0.3);
        assert_eq!(catalog.spec(PanelType::Cigs), PanelType::Cigs.builtin_spec());
        assert_eq!(catalog.specs().len(), 5);

        let bad = PanelCatalog::from_specs([PanelSpec {
            panel_type: PanelType::Cigs,
            efficiency_factor: 1.2,
            unit_cost: 100.0,
        }]);
        assert!(bad.is_err());
    }
}
