use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::risk::{RiskRecord, Thresholds};

/// Daily hazard scores, kept sorted by date.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct HazardTimeline {
    rows: Vec<(NaiveDate, f64)>,
}

impl HazardTimeline {
    /// Build from unordered rows. Later rows win on duplicate dates.
    pub fn new(rows: impl IntoIterator<Item = (NaiveDate, f64)>) -> Self {
        let mut rows: Vec<(NaiveDate, f64)> = rows.into_iter().collect();
        rows.sort_by_key(|(d, _)| *d);
        rows.reverse();
        rows.dedup_by_key(|(d, _)| *d);
        rows.reverse();
        Self { rows }
    }

    #[inline] pub fn len(&self) -> usize { self.rows.len() }

    #[inline] pub fn is_empty(&self) -> bool { self.rows.is_empty() }

    #[inline] pub fn latest(&self) -> Option<(NaiveDate, f64)> { self.rows.last().copied() }

    /// Row for `date`, or the latest row when `date` is absent or unknown.
    pub fn select(&self, date: Option<NaiveDate>) -> Result<(NaiveDate, f64)> {
        let latest = self.latest().ok_or_else(|| Error::validation("hazard timeline is empty"))?;
        let Some(date) = date else { return Ok(latest) };
        match self.rows.binary_search_by_key(&date, |(d, _)| *d) {
            Ok(i) => Ok(self.rows[i]),
            Err(_) => {
                tracing::warn!(requested = %date, using = %latest.0, "hazard date not found, using latest");
                Ok(latest)
            }
        }
    }
}

/// Vulnerability of a named location as handed to the combiner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedVulnerability {
    pub name: String,
    #[serde(default)]
    pub u_static: Option<f64>,
    #[serde(default)]
    pub u_t: Option<f64>,
}

impl NamedVulnerability {
    /// U_t when present, else U_static.
    #[inline] pub fn u(&self) -> Option<f64> { self.u_t.or(self.u_static) }
}

/// Risk of one named location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationRisk {
    pub name: String,
    #[serde(flatten)]
    pub record: RiskRecord,
}

impl AsRef<RiskRecord> for LocationRisk {
    fn as_ref(&self) -> &RiskRecord { &self.record }
}

/// Combine one hazard score with every location, preserving input order.
pub fn assess_locations(h_score: f64, locations: &[NamedVulnerability], thresholds: &Thresholds) -> Vec<LocationRisk> {
    locations.iter()
        .map(|loc| LocationRisk {
            name: loc.name.clone(),
            record: RiskRecord::combine(h_score, loc.u(), thresholds),
        })
        .collect()
}
