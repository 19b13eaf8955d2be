use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::common::{clamp01, Anchor};
use crate::config::{Anchors, Config};
use crate::error::Result;
use crate::metrics::GeoMetrics;
use crate::vulnerability::{Factor, WeightMap};

/// Floor applied to the buffer area before dividing by it.
const MIN_AREA_KM2: f64 = 1e-6;

/// Metrics per unit buffer area.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Densities {
    pub dens_pav_km_km2: f64,
    pub dreno_km_km2: f64,
    pub canal_km_km2: f64,
    /// Green area over buffer area, capped at 1.
    pub frac_verde: f64,
}

impl Densities {
    pub fn from_metrics(metrics: &GeoMetrics) -> Self {
        let area = metrics.area_km2.max(MIN_AREA_KM2);
        Self {
            dens_pav_km_km2: metrics.paved_km / area,
            dreno_km_km2: metrics.drain_km / area,
            canal_km_km2: metrics.canal_km / area,
            frac_verde: (metrics.green_km2 / area).min(1.0),
        }
    }
}

/// Normalized subindices. `None` marks a factor whose metric could not be computed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Subindices {
    pub u_cobertura: Option<f64>,
    pub u_micro: Option<f64>,
    pub u_macro: Option<f64>,
    pub u_permeabilidade: Option<f64>,
}

impl Subindices {
    #[inline]
    pub fn get(&self, factor: Factor) -> Option<f64> {
        match factor {
            Factor::Perm => self.u_permeabilidade,
            Factor::Macro => self.u_macro,
            Factor::Cob => self.u_cobertura,
            Factor::Micro => self.u_micro,
        }
    }

    pub fn available(&self) -> Vec<Factor> {
        Factor::ALL.into_iter().filter(|&f| self.get(f).is_some()).collect()
    }
}

/// Output of [`StaticVulnerabilityScorer::score`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StaticScore {
    pub u_static: f64,
    pub subindices: Subindices,
    pub weights: WeightMap,
    pub densities: Densities,
}

/// Turns raw geo metrics into the static vulnerability index.
#[derive(Debug, Clone)]
pub struct StaticVulnerabilityScorer {
    anchors: Anchors,
    weights: BTreeMap<Factor, f64>,
}

impl StaticVulnerabilityScorer {
    pub fn new(anchors: Anchors, weights: BTreeMap<Factor, f64>) -> Self {
        Self { anchors, weights }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.anchors.clone(), config.factor_weights())
    }

    /// Normalize densities against their anchors. Non-finite densities become `None`.
    pub fn subindices(&self, densities: &Densities, pumps_n: usize) -> Subindices {
        let scaled = |value: f64, anchor: &Anchor| {
            value.is_finite().then(|| anchor.scale(value))
        };
        let has_pump = if pumps_n > 0 { 1.0 } else { 0.0 };

        Subindices {
            u_cobertura: scaled(densities.dens_pav_km_km2, &self.anchors.dens_pav_km_km2),
            u_micro: scaled(densities.dreno_km_km2, &self.anchors.dreno_km_km2),
            u_macro: scaled(densities.canal_km_km2, &self.anchors.canal_km_km2)
                .map(|canal| clamp01(0.5 * has_pump + 0.5 * canal)),
            u_permeabilidade: scaled(densities.frac_verde, &self.anchors.frac_verde),
        }
    }

    /// Weighted combination of the subindices, renormalized over available factors.
    pub fn score(&self, metrics: &GeoMetrics) -> Result<StaticScore> {
        let densities = Densities::from_metrics(metrics);
        let subindices = self.subindices(&densities, metrics.pumps_n);

        let available = subindices.available();
        if available.len() < Factor::ALL.len() {
            tracing::warn!(?available, "renormalizing weights over available factors");
        }
        let weights = WeightMap::renormalized(&self.weights, &available)?;

        let u_static = clamp01(available.iter()
            .map(|&f| weights.get(f) * subindices.get(f).unwrap_or(0.0))
            .sum());

        tracing::debug!(u_static, ?subindices, "static vulnerability scored");
        Ok(StaticScore { u_static, subindices, weights, densities })
    }
}
