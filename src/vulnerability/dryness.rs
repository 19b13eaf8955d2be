use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::common::{clamp01, Anchor};
use crate::config::{Config, DrynessSettings};
use crate::error::{Error, Result};
use crate::weather::{HourlyRequest, HourlyTable, HydroProvider, Window, EVAPOTRANSPIRATION, SOIL_MOISTURE};

/// Number of trailing soil moisture samples averaged into `sm6`.
const SM_SAMPLES: usize = 6;

/// Normalized dryness for one location and date. Higher is drier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DrynessSignal {
    pub et24_mm: f64,
    pub sm6_m3m3: f64,
    pub sm_norm: f64,
    pub et_scaled: f64,
    pub dryness: f64,
}

impl DrynessSignal {
    /// Combine the two aggregates. Either one missing makes the whole signal not computable.
    pub fn from_aggregates(et24: Option<f64>, sm6: Option<f64>, sm_anchor: &Anchor, et_anchor: &Anchor) -> Result<Self> {
        let et24_mm = et24.filter(|v| v.is_finite()).ok_or(Error::NotComputable("et24"))?;
        let sm6_m3m3 = sm6.filter(|v| v.is_finite()).ok_or(Error::NotComputable("sm6"))?;

        let sm_norm = sm_anchor.scale(sm6_m3m3);
        let et_scaled = et_anchor.scale(et24_mm);
        let dryness = clamp01(0.5 * (1.0 - sm_norm) + 0.5 * et_scaled);
        Ok(Self { et24_mm, sm6_m3m3, sm_norm, et_scaled, dryness })
    }
}

/// Reference "today" for the supported window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Today {
    /// A calendar date fixed by the caller.
    Date(NaiveDate),
    /// The local date of this instant in the UTC offset reported by the provider.
    ProviderLocal(DateTime<Utc>),
}

impl From<NaiveDate> for Today {
    fn from(date: NaiveDate) -> Self { Today::Date(date) }
}

/// Inclusive range of target dates the forecast provider can cover.
pub fn supported_window(today: NaiveDate, settings: &DrynessSettings) -> (NaiveDate, NaiveDate) {
    let first = today.checked_sub_days(Days::new(settings.past_days as u64)).unwrap_or(NaiveDate::MIN);
    let last = today.checked_add_days(Days::new(settings.forecast_days as u64)).unwrap_or(NaiveDate::MAX);
    (first, last)
}

pub fn check_window(date: NaiveDate, today: NaiveDate, settings: &DrynessSettings) -> Result<()> {
    let (first, last) = supported_window(today, settings);
    if date < first || date > last {
        return Err(Error::OutOfWindow { date, first, last });
    }
    Ok(())
}

/// Sum of non-null evapotranspiration samples on the local `date`.
pub fn et24(table: &HourlyTable, date: NaiveDate) -> Option<f64> {
    let column = table.column(EVAPOTRANSPIRATION)?;
    let values: Vec<f64> = (0..table.len())
        .filter(|&i| table.local_date(i) == date)
        .filter_map(|i| column[i])
        .filter(|v| !v.is_nan())
        .collect();
    (!values.is_empty()).then(|| values.iter().sum())
}

/// Mean of the last six non-null soil moisture samples up to the end of the local `date`.
pub fn sm6(table: &HourlyTable, date: NaiveDate) -> Option<f64> {
    let column = table.column(SOIL_MOISTURE)?;
    let recent: Vec<f64> = (0..table.len())
        .rev()
        .filter(|&i| table.local_date(i) <= date)
        .filter_map(|i| column[i])
        .filter(|v| !v.is_nan())
        .take(SM_SAMPLES)
        .collect();
    (!recent.is_empty()).then(|| recent.iter().sum::<f64>() / recent.len() as f64)
}

/// Bounded correction of the static index: `clamp01(u + delta * (dryness - 0.5))`.
#[inline]
pub fn adjust(u_static: f64, dryness: f64, delta: f64) -> f64 {
    clamp01(u_static + delta * (dryness - 0.5))
}

/// Dryness signal and the adjusted index it produced.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Adjusted {
    pub signal: DrynessSignal,
    pub delta: f64,
    pub u_t: f64,
}

/// Fetches soil moisture and evapotranspiration and adjusts U_static with them.
pub struct DynamicDrynessAdjuster<H> {
    provider: H,
    sm_anchor: Anchor,
    et_anchor: Anchor,
    settings: DrynessSettings,
}

impl<H: HydroProvider> DynamicDrynessAdjuster<H> {
    pub fn new(provider: H, config: &Config) -> Self {
        Self {
            provider,
            sm_anchor: config.anchors.sm_clamp,
            et_anchor: config.anchors.et_day,
            settings: config.dryness.clone(),
        }
    }

    pub fn with_delta(mut self, delta: f64) -> Self {
        self.settings.delta = delta;
        self
    }

    #[inline] pub fn delta(&self) -> f64 { self.settings.delta }

    /// Dryness on `date`, judged against the provider window around `today`.
    ///
    /// A fixed date is checked before any request; a provider-local today is
    /// resolved from the offset of the returned series.
    pub fn signal(&self, lat: f64, lon: f64, date: NaiveDate, today: impl Into<Today>) -> Result<DrynessSignal> {
        let today = today.into();
        if let Today::Date(today) = today {
            check_window(date, today, &self.settings)?;
        }

        let request = HourlyRequest::new(lat, lon, &[EVAPOTRANSPIRATION, SOIL_MOISTURE], Window::Relative {
            past_days: self.settings.past_days,
            forecast_days: self.settings.forecast_days,
        })?;
        let table = self.provider.hourly(&request)?;

        if let Today::ProviderLocal(now) = today {
            let local_today = now.with_timezone(&table.utc_offset()).date_naive();
            tracing::debug!(%local_today, offset = %table.utc_offset(), "today resolved in provider offset");
            check_window(date, local_today, &self.settings)?;
        }

        let signal = DrynessSignal::from_aggregates(et24(&table, date), sm6(&table, date), &self.sm_anchor, &self.et_anchor)?;
        tracing::debug!(%date, et24 = signal.et24_mm, sm6 = signal.sm6_m3m3, dryness = signal.dryness, "dryness signal");
        Ok(signal)
    }

    pub fn adjust(&self, u_static: f64, lat: f64, lon: f64, date: NaiveDate, today: impl Into<Today>) -> Result<Adjusted> {
        let signal = self.signal(lat, lon, date, today)?;
        let u_t = adjust(u_static, signal.dryness, self.settings.delta);
        Ok(Adjusted { signal, delta: self.settings.delta, u_t })
    }
}
