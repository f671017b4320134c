//! Annual sunshine-hour sources.
//!
//! Two interchangeable providers sit behind `SunshineProvider`: a static
//! per-region table loaded from configuration, and a live lookup that
//! geocodes the name (Nominatim) and annualizes the Open-Meteo daily
//! sunshine-duration forecast.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{Days, Local, NaiveDate};
use tracing::{debug, info, warn};

use crate::config::SunshineConfig;
use crate::error::SizingError;
use crate::models::sizing::{DailySunshine, GeocodePlace, SunshineForecastResponse};

const DAYS_PER_YEAR: f64 = 365.0;
const SECONDS_PER_HOUR: f64 = 3600.0;

#[async_trait]
pub trait SunshineProvider: Send + Sync {
    /// Short identifier reported by the health endpoint.
    fn name(&self) -> &'static str;

    /// Annual sunshine hours for a location name.
    async fn lookup(&self, location: &str) -> Result<f64, SizingError>;

    /// Names this provider can resolve without a network call.
    fn known_locations(&self) -> Vec<String> {
        Vec::new()
    }
}

/// Unicode lowercase without the combining dot left behind by 'İ'.
fn fold_case(name: &str) -> String {
    name.to_lowercase().replace('\u{307}', "")
}

fn normalized_name(location: &str) -> Result<&str, SizingError> {
    let name = location.trim();
    if name.is_empty() {
        return Err(SizingError::invalid("location name is empty"));
    }
    Ok(name)
}

// ─── Static table ────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct StaticSunshineTable {
    hours: BTreeMap<String, f64>,
}

impl StaticSunshineTable {
    pub fn new(hours: BTreeMap<String, f64>) -> Self {
        Self { hours }
    }

    fn resolve(&self, name: &str) -> Option<f64> {
        if let Some(h) = self.hours.get(name) {
            return Some(*h);
        }
        let wanted = fold_case(name);
        self.hours
            .iter()
            .find(|(region, _)| fold_case(region) == wanted)
            .map(|(_, h)| *h)
    }
}

#[async_trait]
impl SunshineProvider for StaticSunshineTable {
    fn name(&self) -> &'static str {
        "static"
    }

    async fn lookup(&self, location: &str) -> Result<f64, SizingError> {
        let name = normalized_name(location)?;
        self.resolve(name)
            .ok_or_else(|| SizingError::LocationNotFound(name.to_string()))
    }

    fn known_locations(&self) -> Vec<String> {
        self.hours.keys().cloned().collect()
    }
}

// ─── Nominatim + Open-Meteo ──────────────────────────────────────────────────

pub struct OpenMeteoSunshineProvider {
    client: reqwest::Client,
    geocoding_base_url: String,
    forecast_base_url: String,
    country: String,
    forecast_days: u32,
}

impl OpenMeteoSunshineProvider {
    pub fn new(cfg: &SunshineConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.http_timeout_seconds))
            .user_agent(cfg.user_agent.clone())
            .build()?;
        Ok(Self {
            client,
            geocoding_base_url: cfg.geocoding_base_url.trim_end_matches('/').to_string(),
            forecast_base_url: cfg.forecast_base_url.trim_end_matches('/').to_string(),
            country: cfg.country.clone(),
            forecast_days: cfg.forecast_days.max(1),
        })
    }

    /// Name → (latitude, longitude) of the first match.
    pub async fn geocode(&self, name: &str) -> Result<(f64, f64), SizingError> {
        let query = if self.country.is_empty() {
            name.to_string()
        } else {
            format!("{},{}", name, self.country)
        };
        let url = format!("{}/search", self.geocoding_base_url);
        debug!(%url, %query, "geocoding location");

        let response = self
            .client
            .get(&url)
            .query(&[("format", "json"), ("q", query.as_str())])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(SizingError::unavailable(format!("geocoding returned {}", response.status())));
        }
        let places: Vec<GeocodePlace> = response
            .json()
            .await
            .map_err(|e| SizingError::unavailable(format!("malformed geocoding response: {}", e)))?;

        let place = places
            .into_iter()
            .next()
            .ok_or_else(|| SizingError::LocationNotFound(name.to_string()))?;
        let lat = place.lat.trim().parse::<f64>();
        let lon = place.lon.trim().parse::<f64>();
        match (lat, lon) {
            (Ok(lat), Ok(lon)) => {
                debug!(lat, lon, display_name = ?place.display_name, "location resolved");
                Ok((lat, lon))
            }
            _ => Err(SizingError::unavailable(format!(
                "geocoding returned unparsable coordinates '{}', '{}'",
                place.lat, place.lon
            ))),
        }
    }

    /// Annualized sunshine hours from the forecast window starting `start`.
    pub async fn annual_hours_at(&self, lat: f64, lon: f64, start: NaiveDate) -> Result<f64, SizingError> {
        let end = start
            .checked_add_days(Days::new(u64::from(self.forecast_days - 1)))
            .unwrap_or(start);
        let url = format!("{}/v1/forecast", self.forecast_base_url);
        let start_date = start.to_string();
        let end_date = end.to_string();
        let latitude = lat.to_string();
        let longitude = lon.to_string();
        debug!(%url, %start_date, %end_date, "fetching sunshine forecast");

        let response = self
            .client
            .get(&url)
            .query(&[
                ("latitude", latitude.as_str()),
                ("longitude", longitude.as_str()),
                ("daily", "sunshine_duration"),
                ("timezone", "auto"),
                ("start_date", start_date.as_str()),
                ("end_date", end_date.as_str()),
            ])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(SizingError::unavailable(format!("forecast returned {}", response.status())));
        }
        let forecast: SunshineForecastResponse = response
            .json()
            .await
            .map_err(|e| SizingError::unavailable(format!("malformed forecast response: {}", e)))?;

        let daily = forecast
            .daily
            .ok_or_else(|| SizingError::unavailable("forecast response has no daily block"))?;
        annualize(&daily)
    }
}

/// Mean daily sunshine (h) × 365, rounded half-to-even to whole hours.
/// Null days are skipped.
pub fn annualize(daily: &DailySunshine) -> Result<f64, SizingError> {
    let hours: Vec<f64> = daily
        .sunshine_duration
        .iter()
        .flatten()
        .filter(|s| s.is_finite() && **s >= 0.0)
        .map(|s| s / SECONDS_PER_HOUR)
        .collect();
    if hours.is_empty() {
        return Err(SizingError::unavailable("forecast contains no sunshine durations"));
    }
    let mean = hours.iter().sum::<f64>() / hours.len() as f64;
    Ok((mean * DAYS_PER_YEAR).round_ties_even())
}

#[async_trait]
impl SunshineProvider for OpenMeteoSunshineProvider {
    fn name(&self) -> &'static str {
        "open_meteo"
    }

    async fn lookup(&self, location: &str) -> Result<f64, SizingError> {
        let name = normalized_name(location)?;
        let (lat, lon) = self.geocode(name).await.inspect_err(|e| {
            warn!(location = %name, error = %e, "geocoding failed");
        })?;
        let hours = self.annual_hours_at(lat, lon, Local::now().date_naive()).await?;
        info!(location = %name, lat, lon, hours, "annual sunshine hours resolved");
        Ok(hours)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProviderKind;
    use mockito::{Matcher, Server, ServerGuard};

    fn table() -> StaticSunshineTable {
        StaticSunshineTable::new(BTreeMap::from([
            ("Ankara".to_string(), 2600.0),
            ("İzmir".to_string(), 3000.0),
        ]))
    }

    fn provider_for(server: &ServerGuard) -> OpenMeteoSunshineProvider {
        let cfg = SunshineConfig {
            provider: ProviderKind::OpenMeteo,
            geocoding_base_url: server.url(),
            forecast_base_url: server.url(),
            ..Default::default()
        };
        OpenMeteoSunshineProvider::new(&cfg).unwrap()
    }

    #[tokio::test]
    async fn static_lookup_is_case_insensitive() {
        let t = table();
        assert_eq!(t.lookup("Ankara").await, Ok(2600.0));
        assert_eq!(t.lookup("  ankara ").await, Ok(2600.0));
        assert_eq!(t.lookup("İZMİR").await, Ok(3000.0));
        assert_eq!(t.lookup("izmir").await, Ok(3000.0));
    }

    #[tokio::test]
    async fn static_lookup_unknown_name() {
        let err = table().lookup("Atlantis").await.unwrap_err();
        assert_eq!(err, SizingError::LocationNotFound("Atlantis".to_string()));
        assert!(matches!(table().lookup("   ").await, Err(SizingError::InvalidInput(_))));
    }

    #[test]
    fn static_table_lists_regions_sorted() {
        assert_eq!(table().known_locations(), vec!["Ankara".to_string(), "İzmir".to_string()]);
    }

    #[test]
    fn annualize_averages_and_rounds() {
        let daily = DailySunshine {
            sunshine_duration: vec![Some(36000.0), Some(28800.0), None],
        };
        // mean 9 h/day
        assert_eq!(annualize(&daily), Ok(3285.0));

        // 0.5 h/day → 182.5 h, a tie
        let half_hour = DailySunshine { sunshine_duration: vec![Some(1800.0)] };
        assert_eq!(annualize(&half_hour), Ok(182.0));

        let empty = DailySunshine { sunshine_duration: vec![None] };
        assert!(matches!(annualize(&empty), Err(SizingError::DataProviderUnavailable(_))));
    }

    #[tokio::test]
    async fn live_lookup_geocodes_then_annualizes() {
        let mut server = Server::new_async().await;
        let geo = server
            .mock("GET", "/search")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("format".into(), "json".into()),
                Matcher::UrlEncoded("q".into(), "Konya,Turkey".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"[{"lat":"37.8716","lon":"32.4846","display_name":"Konya, Türkiye"}]"#)
            .create_async()
            .await;
        let forecast = server
            .mock("GET", "/v1/forecast")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("daily".into(), "sunshine_duration".into()),
                Matcher::UrlEncoded("latitude".into(), "37.8716".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"daily":{"time":["a","b"],"sunshine_duration":[43200.0,21600.0]}}"#)
            .create_async()
            .await;

        let hours = provider_for(&server).lookup("Konya").await.unwrap();
        // mean 9 h/day
        assert_eq!(hours, 3285.0);
        geo.assert_async().await;
        forecast.assert_async().await;
    }

    #[tokio::test]
    async fn live_lookup_empty_geocode_is_not_found() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/search")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("[]")
            .create_async()
            .await;

        let err = provider_for(&server).lookup("Nowhere").await.unwrap_err();
        assert_eq!(err, SizingError::LocationNotFound("Nowhere".to_string()));
    }

    #[tokio::test]
    async fn live_lookup_without_daily_block_is_unavailable() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/search")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"[{"lat":"39.93","lon":"32.85"}]"#)
            .create_async()
            .await;
        server
            .mock("GET", "/v1/forecast")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"error":true,"reason":"bad date"}"#)
            .create_async()
            .await;

        let err = provider_for(&server).lookup("Ankara").await.unwrap_err();
        assert!(matches!(err, SizingError::DataProviderUnavailable(_)));
    }

    #[tokio::test]
    async fn live_lookup_server_error_is_unavailable() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/search")
            .match_query(Matcher::Any)
            .with_status(503)
            .create_async()
            .await;

        let err = provider_for(&server).lookup("Ankara").await.unwrap_err();
        assert!(matches!(err, SizingError::DataProviderUnavailable(_)));
    }
}
