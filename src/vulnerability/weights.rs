use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// One of the four vulnerability subindices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Factor {
    /// Permeability, from green-area fraction.
    Perm,
    /// Macro-drainage, from pumps and canals.
    Macro,
    /// Impervious coverage, from paved road density.
    Cob,
    /// Micro-drainage, from drain density.
    Micro,
}

impl Factor {
    pub const ALL: [Factor; 4] = [Factor::Perm, Factor::Macro, Factor::Cob, Factor::Micro];

    /// Default factor weights.
    pub fn default_weights() -> BTreeMap<Factor, f64> {
        BTreeMap::from([
            (Factor::Perm, 0.40),
            (Factor::Macro, 0.25),
            (Factor::Cob, 0.20),
            (Factor::Micro, 0.15),
        ])
    }
}

/// Factor weights renormalized over the available factors.
/// Unavailable factors carry weight 0; available ones sum to 1.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct WeightMap(BTreeMap<Factor, f64>);

impl WeightMap {
    /// Renormalize `base` so the weights of `available` factors sum to 1.
    pub fn renormalized(base: &BTreeMap<Factor, f64>, available: &[Factor]) -> Result<Self> {
        let total: f64 = available.iter()
            .map(|f| base.get(f).copied().unwrap_or(0.0))
            .sum();
        if !(total > 0.0) || !total.is_finite() {
            return Err(Error::NotComputable("weight map"));
        }

        let weights = Factor::ALL.iter()
            .map(|f| {
                let w = if available.contains(f) { base.get(f).copied().unwrap_or(0.0) / total } else { 0.0 };
                (*f, w)
            })
            .collect();
        Ok(Self(weights))
    }

    #[inline] pub fn get(&self, factor: Factor) -> f64 { self.0.get(&factor).copied().unwrap_or(0.0) }

    #[inline] pub fn sum(&self) -> f64 { self.0.values().sum() }

    pub fn iter(&self) -> impl Iterator<Item = (Factor, f64)> + '_ {
        self.0.iter().map(|(&f, &w)| (f, w))
    }
}
