use serde::{Deserialize, Serialize};

use crate::common::clamp01;
use crate::error::{Error, Result};

/// Upper bounds (exclusive) of the green and yellow tiers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    pub green_max: f64,
    pub yellow_max: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self { green_max: 0.33, yellow_max: 0.66 }
    }
}

impl Thresholds {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.green_max) || !(0.0..=1.0).contains(&self.yellow_max) {
            return Err(Error::validation(format!(
                "thresholds must lie in [0, 1], got ({}, {})", self.green_max, self.yellow_max
            )));
        }
        if self.green_max > self.yellow_max {
            return Err(Error::validation(format!(
                "green_max {} exceeds yellow_max {}", self.green_max, self.yellow_max
            )));
        }
        Ok(())
    }

    pub fn level(&self, risk_score: f64) -> RiskLevel {
        if risk_score < self.green_max {
            RiskLevel::Green
        } else if risk_score < self.yellow_max {
            RiskLevel::Yellow
        } else {
            RiskLevel::Red
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Green,
    Yellow,
    Red,
    /// No usable vulnerability for the location.
    NoData,
}

/// Hazard and vulnerability combined for one location and date.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskRecord {
    pub h_score: f64,
    pub u: Option<f64>,
    pub fragility: Option<f64>,
    pub risk_score: Option<f64>,
    pub risk_level: RiskLevel,
}

impl RiskRecord {
    /// `risk = clamp01(h * (1 - u))`. A zero, missing or NaN `u` yields a `no_data` record.
    pub fn combine(h_score: f64, u: Option<f64>, thresholds: &Thresholds) -> Self {
        match u.filter(|u| *u != 0.0 && !u.is_nan()) {
            Some(u) => {
                let fragility = 1.0 - u;
                let risk_score = clamp01(h_score * fragility);
                Self {
                    h_score,
                    u: Some(u),
                    fragility: Some(fragility),
                    risk_score: Some(risk_score),
                    risk_level: thresholds.level(risk_score),
                }
            }
            None => Self { h_score, u, fragility: None, risk_score: None, risk_level: RiskLevel::NoData },
        }
    }

    #[inline] pub fn is_no_data(&self) -> bool { self.risk_level == RiskLevel::NoData }
}

impl AsRef<RiskRecord> for RiskRecord {
    fn as_ref(&self) -> &RiskRecord { self }
}

/// Highest `n` scored records, `no_data` excluded, ties kept in input order.
pub fn top_n<T: AsRef<RiskRecord> + Clone>(records: &[T], n: usize) -> Vec<T> {
    let mut scored: Vec<(f64, &T)> = records.iter()
        .filter_map(|r| r.as_ref().risk_score.filter(|s| !s.is_nan()).map(|s| (s, r)))
        .collect();
    // sort_by is stable.
    scored.sort_by(|a, b| b.0.total_cmp(&a.0));
    scored.into_iter().take(n).map(|(_, r)| r.clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn combine_example() {
        let r = RiskRecord::combine(0.8, Some(0.4), &Thresholds::default());
        assert!((r.fragility.unwrap() - 0.6).abs() < 1e-12);
        assert!((r.risk_score.unwrap() - 0.48).abs() < 1e-12);
        assert_eq!(r.risk_level, RiskLevel::Yellow);
    }

    #[test]
    fn tier_boundaries_are_exclusive() {
        let t = Thresholds::default();
        assert_eq!(t.level(0.0), RiskLevel::Green);
        assert_eq!(t.level(0.3299), RiskLevel::Green);
        assert_eq!(t.level(0.33), RiskLevel::Yellow);
        assert_eq!(t.level(0.66), RiskLevel::Red);
        assert_eq!(t.level(1.0), RiskLevel::Red);
    }

    #[test]
    fn zero_or_missing_u_is_no_data() {
        let t = Thresholds::default();
        for u in [Some(0.0), None, Some(f64::NAN)] {
            let r = RiskRecord::combine(0.9, u, &t);
            assert_eq!(r.risk_level, RiskLevel::NoData);
            assert_eq!(r.risk_score, None);
            assert!(r.is_no_data());
        }
    }

    #[test]
    fn risk_score_clamped() {
        let t = Thresholds::default();
        for h in [0.0, 0.5, 1.0, 1.7] {
            for u in [0.01, 0.5, 1.0, -0.5] {
                let s = RiskRecord::combine(h, Some(u), &t).risk_score.unwrap();
                assert!((0.0..=1.0).contains(&s), "h={h} u={u} -> {s}");
            }
        }
    }

    #[test]
    fn top_n_skips_no_data() {
        let t = Thresholds::default();
        let scored = |s: f64| RiskRecord { h_score: s, u: Some(0.5), fragility: Some(0.5), risk_score: Some(s), risk_level: t.level(s) };
        let records = [scored(0.9), RiskRecord::combine(0.9, Some(0.0), &t), scored(0.5), scored(0.7)];
        let top: Vec<f64> = top_n(&records, 3).iter().filter_map(|r| r.risk_score).collect();
        assert_eq!(top, vec![0.9, 0.7, 0.5]);
        assert_eq!(top_n(&records, 10).len(), 3);
        assert!(top_n(&records, 0).is_empty());
    }

    #[test]
    fn top_n_is_stable_on_ties() {
        let t = Thresholds::default();
        let records: Vec<RiskRecord> = [0.3, 0.5, 0.3]
            .iter()
            .enumerate()
            .map(|(i, &s)| RiskRecord { h_score: i as f64, u: Some(0.5), fragility: Some(0.5), risk_score: Some(s), risk_level: t.level(s) })
            .collect();
        let top = top_n(&records, 3);
        assert_eq!(top.iter().map(|r| r.h_score).collect::<Vec<_>>(), vec![1.0, 0.0, 2.0]);
    }

    #[test]
    fn level_serializes_snake_case() {
        assert_eq!(serde_json::to_string(&RiskLevel::NoData).unwrap(), "\"no_data\"");
        assert_eq!(serde_json::to_string(&RiskLevel::Yellow).unwrap(), "\"yellow\"");
    }

    #[test]
    fn thresholds_validate() {
        assert!(Thresholds::default().validate().is_ok());
        assert!(Thresholds { green_max: 0.7, yellow_max: 0.6 }.validate().is_err());
        assert!(Thresholds { green_max: -0.1, yellow_max: 0.6 }.validate().is_err());
    }
}
