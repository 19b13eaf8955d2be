use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::Deserialize;

use crate::error::{Error, Result};

use super::DailyTable;

/// Surface soil moisture, m³/m³.
pub const SOIL_MOISTURE: &str = "soil_moisture_0_to_1cm";
/// Hourly evapotranspiration, mm.
pub const EVAPOTRANSPIRATION: &str = "evapotranspiration";

/// Time span of an hourly request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Window {
    /// Days before and after the provider's current local date.
    Relative { past_days: u32, forecast_days: u32 },
    /// Inclusive local date range.
    Range { start: NaiveDate, end: NaiveDate },
}

pub(super) fn check_point(lat: f64, lon: f64) -> Result<()> {
    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
        return Err(Error::validation(format!("coordinates out of range: ({lat}, {lon})")));
    }
    Ok(())
}

/// Hourly variables for one point over a window.
#[derive(Debug, Clone, PartialEq)]
pub struct HourlyRequest {
    pub lat: f64,
    pub lon: f64,
    pub variables: Vec<String>,
    pub window: Window,
}

impl HourlyRequest {
    pub fn new(lat: f64, lon: f64, variables: &[impl AsRef<str>], window: Window) -> Result<Self> {
        check_point(lat, lon)?;
        if variables.is_empty() {
            return Err(Error::validation("no hourly variables requested"));
        }
        if let Window::Range { start, end } = window {
            if start > end {
                return Err(Error::validation(format!("date range is inverted: {start} > {end}")));
            }
        }
        Ok(Self { lat, lon, variables: variables.iter().map(|v| v.as_ref().to_string()).collect(), window })
    }

    /// Query string parameters for an Open-Meteo style endpoint.
    pub fn query_params(&self, timezone: &str) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("latitude", self.lat.to_string()),
            ("longitude", self.lon.to_string()),
            ("timezone", timezone.to_string()),
            ("timeformat", "unixtime".to_string()),
            ("hourly", self.variables.join(",")),
        ];
        match self.window {
            Window::Relative { past_days, forecast_days } => {
                params.push(("past_days", past_days.to_string()));
                params.push(("forecast_days", forecast_days.to_string()));
            }
            Window::Range { start, end } => {
                params.push(("start_date", start.format("%Y-%m-%d").to_string()));
                params.push(("end_date", end.format("%Y-%m-%d").to_string()));
            }
        }
        params
    }
}

/// Hourly series on a shared UTC time axis; every column has one entry per timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct HourlyTable {
    utc_offset: FixedOffset,
    times: Vec<DateTime<Utc>>,
    columns: BTreeMap<String, Vec<Option<f64>>>,
}

impl HourlyTable {
    pub fn new(
        utc_offset: FixedOffset,
        times: Vec<DateTime<Utc>>,
        columns: BTreeMap<String, Vec<Option<f64>>>,
    ) -> Result<Self> {
        if let Some((name, col)) = columns.iter().find(|(_, col)| col.len() != times.len()) {
            return Err(Error::decode("hourly table", format!(
                "column {name} has {} values for {} timestamps", col.len(), times.len()
            )));
        }
        Ok(Self { utc_offset, times, columns })
    }

    #[inline] pub fn len(&self) -> usize { self.times.len() }

    #[inline] pub fn is_empty(&self) -> bool { self.times.is_empty() }

    #[inline] pub fn utc_offset(&self) -> FixedOffset { self.utc_offset }

    #[inline] pub fn times(&self) -> &[DateTime<Utc>] { &self.times }

    #[inline]
    pub fn column(&self, name: &str) -> Option<&[Option<f64>]> {
        self.columns.get(name).map(Vec::as_slice)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> { self.columns.keys().map(String::as_str) }

    #[inline]
    pub fn local_time(&self, i: usize) -> DateTime<FixedOffset> {
        self.times[i].with_timezone(&self.utc_offset)
    }

    #[inline] pub fn local_date(&self, i: usize) -> NaiveDate { self.local_time(i).date_naive() }

    /// Aggregate to one row per local date.
    pub fn daily(&self) -> DailyTable {
        let mut dates: Vec<NaiveDate> = Vec::new();
        let mut groups: Vec<(usize, usize)> = Vec::new();
        for i in 0..self.len() {
            let date = self.local_date(i);
            match dates.last() {
                Some(&last) if last == date => {
                    if let Some(group) = groups.last_mut() { group.1 = i + 1 }
                }
                _ => {
                    dates.push(date);
                    groups.push((i, i + 1));
                }
            }
        }

        let columns = self.columns.iter()
            .map(|(name, values)| {
                let rule = Aggregation::for_column(name);
                let daily = groups.iter()
                    .map(|&(start, end)| rule.apply(values[start..end].iter().flatten().copied()))
                    .collect();
                (name.clone(), daily)
            })
            .collect();

        DailyTable::from_parts(dates, columns)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Aggregation { Sum, Max, Mode, Mean }

impl Aggregation {
    fn for_column(name: &str) -> Self {
        match name {
            "precipitation" | "rain" | "showers" | "evapotranspiration" | "et0_fao_evapotranspiration" => Aggregation::Sum,
            "wind_gusts_10m" => Aggregation::Max,
            "weather_code" => Aggregation::Mode,
            _ => Aggregation::Mean,
        }
    }

    /// Nulls are excluded upstream; an empty group yields `None`.
    fn apply(&self, values: impl Iterator<Item = f64>) -> Option<f64> {
        let values: Vec<f64> = values.filter(|v| !v.is_nan()).collect();
        if values.is_empty() { return None }
        match self {
            Aggregation::Sum => Some(values.iter().sum()),
            Aggregation::Max => values.iter().copied().reduce(f64::max),
            Aggregation::Mean => Some(values.iter().sum::<f64>() / values.len() as f64),
            Aggregation::Mode => {
                let mut sorted = values;
                sorted.sort_by(f64::total_cmp);
                // Most frequent value; ties go to the smallest.
                let mut best = (sorted[0], 0usize);
                let mut run = (sorted[0], 0usize);
                for v in sorted {
                    if v == run.0 { run.1 += 1 } else { run = (v, 1) }
                    if run.1 > best.1 { best = run }
                }
                Some(best.0)
            }
        }
    }
}

#[derive(Deserialize)]
struct OpenMeteoResponse {
    #[serde(default)]
    utc_offset_seconds: i32,
    hourly: Option<BTreeMap<String, Vec<Option<f64>>>>,
}

/// Decode an Open-Meteo JSON response requested with `timeformat=unixtime`.
/// Requested variables absent from the payload become all-null columns.
pub fn decode_open_meteo(body: &str, variables: &[String]) -> Result<HourlyTable> {
    let response: OpenMeteoResponse = serde_json::from_str(body)
        .map_err(|e| Error::decode("open-meteo response", e))?;
    let utc_offset = FixedOffset::east_opt(response.utc_offset_seconds)
        .ok_or_else(|| Error::decode("open-meteo response", format!("bad utc offset {}", response.utc_offset_seconds)))?;

    let mut hourly = response.hourly.unwrap_or_default();
    let times = hourly.remove("time").unwrap_or_default().into_iter()
        .map(|t| t.and_then(|secs| DateTime::from_timestamp(secs as i64, 0)))
        .collect::<Option<Vec<_>>>()
        .ok_or_else(|| Error::decode("open-meteo response", "null or invalid timestamp"))?;

    let mut columns = BTreeMap::new();
    for name in variables {
        let values = match hourly.remove(name) {
            Some(values) => values,
            None => {
                tracing::warn!(variable = %name, "variable missing from open-meteo response");
                vec![None; times.len()]
            }
        };
        columns.insert(name.clone(), values);
    }

    HourlyTable::new(utc_offset, times, columns)
}

/// Source of hourly weather and hydrology series.
pub trait HydroProvider {
    fn hourly(&self, request: &HourlyRequest) -> Result<HourlyTable>;
}

impl<P: HydroProvider + ?Sized> HydroProvider for &P {
    fn hourly(&self, request: &HourlyRequest) -> Result<HourlyTable> { (**self).hourly(request) }
}

#[cfg(feature = "network")]
pub use client::OpenMeteoClient;

#[cfg(feature = "network")]
mod client {
    use crate::config::ProviderSettings;
    use crate::error::Result;
    use crate::net::{HttpClient, RetryPolicy};

    use super::{decode_open_meteo, HourlyRequest, HourlyTable, HydroProvider, Window};

    /// Open-Meteo forecast (relative windows) and archive (date ranges) client.
    #[derive(Debug, Clone)]
    pub struct OpenMeteoClient {
        http: HttpClient,
        forecast_url: String,
        archive_url: String,
        timezone: String,
        retry: RetryPolicy,
    }

    impl OpenMeteoClient {
        pub fn new(http: HttpClient, settings: &ProviderSettings) -> Self {
            Self {
                http,
                forecast_url: settings.open_meteo_forecast_url.clone(),
                archive_url: settings.open_meteo_archive_url.clone(),
                timezone: settings.timezone.clone(),
                retry: settings.retry.clone(),
            }
        }
    }

    impl HydroProvider for OpenMeteoClient {
        fn hourly(&self, request: &HourlyRequest) -> Result<HourlyTable> {
            let url = match request.window {
                Window::Relative { .. } => &self.forecast_url,
                Window::Range { .. } => &self.archive_url,
            };
            let params = request.query_params(&self.timezone);
            let body = self.retry.run("open-meteo", || {
                self.http.send_text(url, self.http.get(url).query(&params))
            })?;
            let table = decode_open_meteo(&body, &request.variables)?;
            tracing::debug!(rows = table.len(), url = %url, "open-meteo series received");
            Ok(table)
        }
    }
}
