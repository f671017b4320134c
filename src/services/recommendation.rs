//! Canned advisory notes shown next to a sizing result.

use crate::models::sizing::PanelType;

/// 270 hours a month, annualized. Locations above this count as sunny.
pub const HIGH_SUNSHINE_THRESHOLD_HOURS: f64 = 270.0 * 365.0 / 12.0;
/// Areas below this (m²) get the high-efficiency hint.
pub const SMALL_AREA_THRESHOLD_M2: f64 = 20.0;

const MAINTENANCE_NOTE: &str =
    "Regular maintenance keeps panel output up: clean the surface and inspect the system periodically.";
const HOUSEHOLD_NOTE: &str =
    "Switching off unused lights and choosing energy-saving appliances also improves overall efficiency.";

fn panel_note(panel: PanelType) -> &'static str {
    match panel {
        PanelType::Monokristalin => "Monocrystalline panels are highly efficient and ideal for small areas.",
        PanelType::Polikristalin => "Polycrystalline panels are the more cost-effective choice.",
        PanelType::InceFilm => "Thin-film panels are a good fit for large areas.",
        PanelType::Hibrid => {
            "Hybrid panels benefit from both sunlight and temperature differences, giving high efficiency."
        }
        PanelType::Cigs => "CIGS panels keep working efficiently even in low-light conditions.",
    }
}

/// Ordered notes from independent rule checks: sunshine level, panel type,
/// small area (only when it applies), then the two general notes.
pub fn build_recommendations(location: &str, panel: PanelType, area: f64, annual_sunshine_hours: f64) -> Vec<String> {
    let mut notes = Vec::with_capacity(5);

    if annual_sunshine_hours > HIGH_SUNSHINE_THRESHOLD_HOURS {
        notes.push(format!(
            "{} has long sunshine duration; make the most of the panels' output.",
            location
        ));
    } else {
        notes.push(format!(
            "{} has short sunshine duration; pay attention to choosing an efficient panel.",
            location
        ));
    }

    notes.push(panel_note(panel).to_string());

    if area < SMALL_AREA_THRESHOLD_M2 {
        notes.push("Your area is small, so a high-efficiency panel is recommended.".to_string());
    }

    notes.push(MAINTENANCE_NOTE.to_string());
    notes.push(HOUSEHOLD_NOTE.to_string());
    notes
}
