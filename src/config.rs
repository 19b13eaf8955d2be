use std::{collections::BTreeMap, fs::File, io::BufReader, path::Path};

use anyhow::{Context, Result as AnyResult};
use serde::{Deserialize, Serialize};

use crate::common::Anchor;
use crate::error::{Error, Result};
use crate::geom::ProjectionStrategy;
use crate::net::RetryPolicy;
use crate::risk::Thresholds;
use crate::vulnerability::Factor;

/// Every tunable constant of the pipeline. Omitted JSON fields keep their defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub anchors: Anchors,
    pub u_weights: BTreeMap<Factor, f64>,
    pub thresholds: Thresholds,
    pub hazard: HazardSettings,
    pub dryness: DrynessSettings,
    pub buffer: BufferSettings,
    pub dataset: DatasetSettings,
    pub providers: ProviderSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            anchors: Anchors::default(),
            u_weights: Factor::default_weights(),
            thresholds: Thresholds::default(),
            hazard: HazardSettings::default(),
            dryness: DrynessSettings::default(),
            buffer: BufferSettings::default(),
            dataset: DatasetSettings::default(),
            providers: ProviderSettings::default(),
        }
    }
}

/// Normalization anchors for raw metrics.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Anchors {
    pub dens_pav_km_km2: Anchor,
    pub dreno_km_km2: Anchor,
    pub canal_km_km2: Anchor,
    pub frac_verde: Anchor,
    pub sm_clamp: Anchor,
    pub et_day: Anchor,
}

impl Default for Anchors {
    fn default() -> Self {
        Self {
            dens_pav_km_km2: Anchor::new(4.0, 18.0),
            dreno_km_km2: Anchor::new(0.05, 0.50),
            canal_km_km2: Anchor::new(0.10, 1.00),
            frac_verde: Anchor::new(0.05, 0.30),
            sm_clamp: Anchor::new(0.10, 0.45),
            et_day: Anchor::new(1.0, 6.0),
        }
    }
}

/// Blend weights and default horizons for hazard scoring.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HazardSettings {
    pub w6h: f64,
    pub w72h: f64,
    pub horizons: Vec<u32>,
}

impl Default for HazardSettings {
    fn default() -> Self {
        Self { w6h: 0.5, w72h: 0.5, horizons: vec![6, 24, 48, 72] }
    }
}

/// Dynamic dryness correction bound and supported date window.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DrynessSettings {
    pub delta: f64,
    pub past_days: u32,
    pub forecast_days: u32,
}

impl Default for DrynessSettings {
    fn default() -> Self {
        Self { delta: 0.10, past_days: 2, forecast_days: 16 }
    }
}

/// Catchment buffer construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BufferSettings {
    pub radius_km: f64,
    /// Segments per quarter circle; the disk has `4 * quad_segments` vertices.
    pub quad_segments: usize,
    pub projections: Vec<ProjectionStrategy>,
}

impl Default for BufferSettings {
    fn default() -> Self {
        Self {
            radius_km: 2.0,
            quad_segments: 16,
            projections: vec![ProjectionStrategy::Utm, ProjectionStrategy::WebMercator],
        }
    }
}

/// Variables pulled for the daily flood/weather dataset.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetSettings {
    /// Hourly weather and soil variables, aggregated to local days.
    pub hourly_variables: Vec<String>,
    /// Daily river discharge variables from the flood endpoint.
    pub flood_variables: Vec<String>,
}

impl Default for DatasetSettings {
    fn default() -> Self {
        let hourly = [
            "temperature_2m", "relative_humidity_2m", "dew_point_2m", "apparent_temperature",
            "precipitation", "rain", "showers", "weather_code", "pressure_msl", "surface_pressure",
            "cloud_cover", "cloud_cover_low", "cloud_cover_mid", "cloud_cover_high",
            "evapotranspiration", "et0_fao_evapotranspiration", "vapour_pressure_deficit",
            "wind_speed_10m", "wind_gusts_10m", "soil_temperature_0cm",
            "soil_moisture_0_to_1cm", "soil_moisture_1_to_3cm", "soil_moisture_3_to_9cm",
            "soil_moisture_9_to_27cm", "soil_moisture_27_to_81cm",
        ];
        let flood = [
            "river_discharge", "river_discharge_mean", "river_discharge_median",
            "river_discharge_min", "river_discharge_max", "river_discharge_p25", "river_discharge_p75",
        ];
        Self {
            hourly_variables: hourly.into_iter().map(String::from).collect(),
            flood_variables: flood.into_iter().map(String::from).collect(),
        }
    }
}

/// Endpoints and transport settings for external providers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    pub overpass_urls: Vec<String>,
    pub open_meteo_forecast_url: String,
    pub open_meteo_archive_url: String,
    pub open_meteo_flood_url: String,
    pub meteomatics_url: String,
    pub meteomatics_model: String,
    pub timezone: String,
    pub timeout_secs: u64,
    pub retry: RetryPolicy,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            overpass_urls: vec![
                "https://overpass-api.de/api/interpreter".into(),
                "https://overpass.kumi.systems/api/interpreter".into(),
                "https://overpass.openstreetmap.ru/api/interpreter".into(),
            ],
            open_meteo_forecast_url: "https://api.open-meteo.com/v1/forecast".into(),
            open_meteo_archive_url: "https://archive-api.open-meteo.com/v1/archive".into(),
            open_meteo_flood_url: "https://flood-api.open-meteo.com/v1/flood".into(),
            meteomatics_url: "https://api.meteomatics.com".into(),
            meteomatics_model: "mix".into(),
            timezone: "America/Sao_Paulo".into(),
            timeout_secs: 120,
            retry: RetryPolicy::default(),
        }
    }
}

impl Config {
    /// Read a (possibly partial) JSON configuration file.
    pub fn from_json_file(path: &Path) -> AnyResult<Self> {
        let file = File::open(path)
            .with_context(|| format!("[config] Failed to open config file: {}", path.display()))?;
        let config: Self = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("[config] Failed to parse config file: {}", path.display()))?;
        config.validate()
            .with_context(|| format!("[config] Invalid config in {}", path.display()))?;
        Ok(config)
    }

    /// Weight map with defaults filled in for any factor the file omitted.
    pub fn factor_weights(&self) -> BTreeMap<Factor, f64> {
        let mut weights = Factor::default_weights();
        weights.extend(self.u_weights.iter().map(|(&f, &w)| (f, w)));
        weights
    }

    /// Reject settings that would make downstream computations meaningless.
    pub fn validate(&self) -> Result<()> {
        if !(self.buffer.radius_km > 0.0) {
            return Err(Error::validation(format!("buffer radius must be positive, got {}", self.buffer.radius_km)));
        }
        if self.buffer.quad_segments == 0 {
            return Err(Error::validation("buffer quad_segments must be at least 1"));
        }
        if self.buffer.projections.is_empty() {
            return Err(Error::validation("at least one projection strategy is required"));
        }
        if self.hazard.horizons.is_empty() {
            return Err(Error::validation("hazard horizon list is empty"));
        }
        if self.dataset.hourly_variables.is_empty() || self.dataset.flood_variables.is_empty() {
            return Err(Error::validation("dataset variable lists must not be empty"));
        }
        if self.providers.overpass_urls.is_empty() {
            return Err(Error::validation("overpass endpoint list is empty"));
        }
        if self.factor_weights().values().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(Error::validation("factor weights must be finite and non-negative"));
        }
        self.thresholds.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.providers.overpass_urls.len(), 3);
        assert_eq!(config.factor_weights().len(), 4);
        assert_eq!(config.dataset.flood_variables[0], "river_discharge");
        assert!(config.dataset.hourly_variables.iter().any(|v| v == "precipitation"));
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config: Config = serde_json::from_str(r#"{
            "thresholds": { "green_max": 0.2 },
            "u_weights": { "perm": 0.7 },
            "buffer": { "radius_km": 1.5 }
        }"#).unwrap();
        assert_eq!(config.thresholds.green_max, 0.2);
        assert_eq!(config.thresholds.yellow_max, 0.66);
        assert_eq!(config.buffer.radius_km, 1.5);
        assert_eq!(config.buffer.quad_segments, 16);
        assert_eq!(config.anchors.dens_pav_km_km2, Anchor::new(4.0, 18.0));

        let weights = config.factor_weights();
        assert_eq!(weights[&Factor::Perm], 0.7);
        assert_eq!(weights[&Factor::Macro], 0.25);
    }

    #[test]
    fn rejects_bad_radius_and_horizons() {
        let mut config = Config::default();
        config.buffer.radius_km = 0.0;
        assert!(matches!(config.validate(), Err(Error::Validation(_))));

        let mut config = Config::default();
        config.hazard.horizons.clear();
        assert!(matches!(config.validate(), Err(Error::Validation(_))));

        let mut config = Config::default();
        config.dataset.flood_variables.clear();
        assert!(matches!(config.validate(), Err(Error::Validation(_))));
    }

    #[test]
    fn projection_order_from_json() {
        let config: Config = serde_json::from_str(r#"{ "buffer": { "projections": ["web_mercator"] } }"#).unwrap();
        assert_eq!(config.buffer.projections, vec![ProjectionStrategy::WebMercator]);
    }
}
