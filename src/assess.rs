//! End-to-end vulnerability assessment for a single location.

use chrono::NaiveDate;
use serde::Serialize;

use crate::config::Config;
use crate::error::Result;
use crate::features::FeatureProvider;
use crate::metrics::{GeoMetrics, GeoMetricsExtractor, Location};
use crate::vulnerability::{
    Densities, DrynessSignal, DynamicDrynessAdjuster, StaticVulnerabilityScorer, Subindices, Today, WeightMap,
};
use crate::weather::HydroProvider;

/// Outcome of the dynamic adjustment.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DrynessOutcome {
    /// No target date was given.
    Skipped,
    Applied { date: NaiveDate, delta: f64, signal: DrynessSignal },
    /// Fell back to U_static.
    NotComputable { date: NaiveDate, reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VulnerabilityReport {
    pub location: Location,
    pub metrics: GeoMetrics,
    pub densities: Densities,
    pub subindices: Subindices,
    pub weights: WeightMap,
    pub u_static: f64,
    pub dryness: DrynessOutcome,
    /// Present only when the dryness signal was applied.
    pub u_t: Option<f64>,
    /// `1 - U`, with U = U_t when available, else U_static.
    pub fragility: f64,
}

impl VulnerabilityReport {
    #[inline] pub fn u(&self) -> f64 { self.u_t.unwrap_or(self.u_static) }
}

/// Extraction, static scoring and the optional dryness adjustment.
pub struct VulnerabilityAssessor<F, H> {
    extractor: GeoMetricsExtractor<F>,
    scorer: StaticVulnerabilityScorer,
    adjuster: DynamicDrynessAdjuster<H>,
}

impl<F: FeatureProvider, H: HydroProvider> VulnerabilityAssessor<F, H> {
    pub fn new(features: F, hydro: H, config: &Config) -> Result<Self> {
        Ok(Self {
            extractor: GeoMetricsExtractor::new(features, &config.buffer)?,
            scorer: StaticVulnerabilityScorer::from_config(config),
            adjuster: DynamicDrynessAdjuster::new(hydro, config),
        })
    }

    pub fn with_delta(mut self, delta: f64) -> Self {
        self.adjuster = self.adjuster.with_delta(delta);
        self
    }

    /// Assess `location`; when `date` is given, adjust for dryness relative to `today`.
    pub fn assess(&self, location: &Location, date: Option<NaiveDate>, today: impl Into<Today>) -> Result<VulnerabilityReport> {
        let metrics = self.extractor.extract(location)?;
        let score = self.scorer.score(&metrics)?;

        let (dryness, u_t) = match date {
            None => (DrynessOutcome::Skipped, None),
            Some(date) => match self.adjuster.adjust(score.u_static, location.lat, location.lon, date, today) {
                Ok(adjusted) => (
                    DrynessOutcome::Applied { date, delta: adjusted.delta, signal: adjusted.signal },
                    Some(adjusted.u_t),
                ),
                Err(err) if err.is_not_computable() => {
                    tracing::warn!(%date, error = %err, "dryness not computable, using static vulnerability");
                    (DrynessOutcome::NotComputable { date, reason: err.to_string() }, None)
                }
                Err(err) => return Err(err),
            },
        };

        let fragility = 1.0 - u_t.unwrap_or(score.u_static);
        tracing::info!(u_static = score.u_static, u_t = ?u_t, fragility, "vulnerability assessed");

        Ok(VulnerabilityReport {
            location: *location,
            metrics,
            densities: score.densities,
            subindices: score.subindices,
            weights: score.weights,
            u_static: score.u_static,
            dryness,
            u_t,
            fragility,
        })
    }
}
