use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::config::HazardSettings;
use crate::error::{Error, Result};
use crate::hazard::{percentile_rank, rolling_sum};
use crate::weather::{PrecipRequest, PrecipitationProvider, PrecipitationSeries};

/// Antecedent window length, hours.
pub const ANTECEDENT_HOURS: i64 = 24;
const PEAK_WINDOW: usize = 6;
const BASELINE_WINDOW: usize = 24;

/// Hazard for one forecast horizon.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HazardResult {
    pub horizon_h: u32,
    pub peak6h_mm: f64,
    pub peak6h_pct: f64,
    pub ant24h_mm: f64,
    pub ant24h_pct: f64,
    pub h_score: f64,
}

/// Parse a reference instant. The string must carry an explicit UTC offset.
pub fn parse_reference_instant(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s.trim())
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| Error::validation(format!("reference instant {s:?} must be RFC 3339 with an offset: {e}")))
}

fn validate_horizons(horizons: &[u32]) -> Result<u32> {
    horizons.iter().copied().max()
        .ok_or_else(|| Error::validation("hazard horizon list is empty"))
}

/// Score every horizon from already materialized series.
///
/// `antecedent` covers `[t0 - 24h, t0]` and is also the percentile baseline;
/// `forecast` covers `[t0, t0 + max(horizons)]`.
pub fn score_series(
    forecast: &PrecipitationSeries,
    antecedent: &PrecipitationSeries,
    t0: DateTime<Utc>,
    horizons: &[u32],
    w6h: f64,
    w72h: f64,
) -> Result<Vec<HazardResult>> {
    validate_horizons(horizons)?;

    let ant24h_mm = antecedent.total();
    let base_6h = rolling_sum(antecedent.values(), PEAK_WINDOW);
    let base_24h = rolling_sum(antecedent.values(), BASELINE_WINDOW);
    let ant24h_pct = percentile_rank(ant24h_mm, &base_24h);

    let results = horizons.iter()
        .map(|&horizon_h| {
            let window = forecast.until(t0 + Duration::hours(horizon_h as i64));
            let (peak6h_mm, peak6h_pct) = if window.is_empty() {
                (0.0, 0.0)
            } else {
                let peak = rolling_sum(window, PEAK_WINDOW).into_iter().fold(f64::NEG_INFINITY, f64::max);
                (peak, percentile_rank(peak, &base_6h))
            };
            HazardResult {
                horizon_h,
                peak6h_mm,
                peak6h_pct,
                ant24h_mm,
                ant24h_pct,
                h_score: w6h * peak6h_pct + w72h * ant24h_pct,
            }
        })
        .collect();
    Ok(results)
}

/// Percentile-ranked precipitation hazard per forecast horizon.
pub struct HazardScorer<P> {
    provider: P,
    w6h: f64,
    w72h: f64,
    model: String,
}

impl<P: PrecipitationProvider> HazardScorer<P> {
    pub fn new(provider: P, settings: &HazardSettings) -> Self {
        Self { provider, w6h: settings.w6h, w72h: settings.w72h, model: "mix".to_string() }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Pull forecast and antecedent series once and score every horizon.
    pub fn score(&self, lat: f64, lon: f64, t0: DateTime<Utc>, horizons: &[u32]) -> Result<Vec<HazardResult>> {
        let max_h = validate_horizons(horizons)?;

        let forecast_req = PrecipRequest::hourly(lat, lon, t0, t0 + Duration::hours(max_h as i64))?
            .with_model(self.model.as_str());
        let antecedent_req = PrecipRequest::hourly(lat, lon, t0 - Duration::hours(ANTECEDENT_HOURS), t0)?
            .with_model(self.model.as_str());

        let forecast = self.provider.precipitation(&forecast_req)?;
        let antecedent = self.provider.precipitation(&antecedent_req)?;

        let results = score_series(&forecast, &antecedent, t0, horizons, self.w6h, self.w72h)?;
        for r in &results {
            tracing::info!(
                horizon_h = r.horizon_h, peak6h_mm = r.peak6h_mm, peak6h_pct = r.peak6h_pct,
                ant24h_mm = r.ant24h_mm, ant24h_pct = r.ant24h_pct, h_score = r.h_score,
                "hazard scored"
            );
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use chrono::TimeZone;

    use super::*;

    fn t0() -> DateTime<Utc> { Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap() }

    fn series(start: DateTime<Utc>, values: &[f64]) -> PrecipitationSeries {
        let times = (0..values.len()).map(|i| start + Duration::hours(i as i64)).collect();
        PrecipitationSeries::new(times, values.to_vec()).unwrap()
    }

    /// Serves series by request start; records every request.
    struct Scripted {
        antecedent: Vec<f64>,
        forecast: Vec<f64>,
        seen: RefCell<Vec<PrecipRequest>>,
    }

    impl PrecipitationProvider for Scripted {
        fn precipitation(&self, request: &PrecipRequest) -> Result<PrecipitationSeries> {
            self.seen.borrow_mut().push(request.clone());
            let values = if request.start < t0() { &self.antecedent } else { &self.forecast };
            Ok(series(request.start, values))
        }
    }

    #[test]
    fn parse_requires_offset() {
        assert_eq!(parse_reference_instant("2024-05-01T12:00:00Z").unwrap(), t0());
        assert_eq!(parse_reference_instant("2024-05-01T09:00:00-03:00").unwrap(), t0());
        assert!(matches!(parse_reference_instant("2024-05-01T12:00:00"), Err(Error::Validation(_))));
        assert!(matches!(parse_reference_instant("yesterday"), Err(Error::Validation(_))));
    }

    #[test]
    fn empty_horizons_rejected_before_fetch() {
        let p = Scripted { antecedent: vec![], forecast: vec![], seen: RefCell::new(vec![]) };
        let scorer = HazardScorer::new(&p, &HazardSettings::default());
        assert!(matches!(scorer.score(-29.9, -51.2, t0(), &[]), Err(Error::Validation(_))));
        assert!(p.seen.borrow().is_empty());
    }

    #[test]
    fn dry_antecedent_and_forecast() {
        let ant = series(t0() - Duration::hours(24), &[0.0; 25]);
        let fc = series(t0(), &[0.0; 73]);
        let out = score_series(&fc, &ant, t0(), &[6, 72], 0.5, 0.5).unwrap();
        assert_eq!(out.len(), 2);
        for r in out {
            assert_eq!((r.peak6h_mm, r.ant24h_mm), (0.0, 0.0));
            // Everything ties at zero.
            assert!((r.ant24h_pct - 26.0 * 50.0 / 25.0 / 100.0).abs() < 1e-12);
            assert!((r.h_score - 0.5 * r.peak6h_pct - 0.5 * r.ant24h_pct).abs() < 1e-12);
        }
    }

    #[test]
    fn peaks_respect_horizon_limit() {
        let ant = series(t0() - Duration::hours(24), &[1.0; 25]);
        let mut fc = vec![0.0; 73];
        fc[3] = 2.0;
        fc[30] = 10.0;
        let fc = series(t0(), &fc);

        let out = score_series(&fc, &ant, t0(), &[6, 24, 48], 0.5, 0.5).unwrap();
        assert_eq!(out[0].peak6h_mm, 2.0);
        assert_eq!(out[1].peak6h_mm, 2.0);
        assert_eq!(out[2].peak6h_mm, 10.0);
        assert_eq!(out[0].ant24h_mm, 25.0);
        // Antecedent total exceeds every 24h baseline window.
        assert_eq!(out[0].ant24h_pct, 1.0);
        // 6h baseline tops out at 6 mm: 2 mm is low, 10 mm is above all.
        assert!(out[0].peak6h_pct < 0.1);
        assert_eq!(out[2].peak6h_pct, 1.0);
        assert!(out[2].h_score > out[0].h_score);
    }

    #[test]
    fn empty_forecast_window_scores_zero_peak() {
        let ant = series(t0() - Duration::hours(24), &[1.0; 25]);
        let fc = series(t0() + Duration::hours(10), &[5.0; 5]);
        let out = score_series(&fc, &ant, t0(), &[6], 0.5, 0.5).unwrap();
        assert_eq!((out[0].peak6h_mm, out[0].peak6h_pct), (0.0, 0.0));
        assert_eq!(out[0].h_score, 0.5 * out[0].ant24h_pct);
    }

    #[test]
    fn scorer_requests_both_windows() {
        let p = Scripted { antecedent: vec![0.5; 25], forecast: vec![1.0; 73], seen: RefCell::new(vec![]) };
        let out = HazardScorer::new(&p, &HazardSettings::default())
            .score(-29.9, -51.2, t0(), &[6, 24, 48, 72])
            .unwrap();
        assert_eq!(out.iter().map(|r| r.horizon_h).collect::<Vec<_>>(), vec![6, 24, 48, 72]);

        let seen = p.seen.borrow();
        assert_eq!(seen.len(), 2);
        assert_eq!((seen[0].start, seen[0].end), (t0(), t0() + Duration::hours(72)));
        assert_eq!((seen[1].start, seen[1].end), (t0() - Duration::hours(24), t0()));
        assert!(seen.iter().all(|r| r.parameter == "precip_1h:mm" && r.model == "mix"));
    }
}
