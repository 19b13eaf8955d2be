use std::{collections::BTreeMap, io::Cursor};

use chrono::{DateTime, Duration, Utc};
use polars::{io::SerReader, prelude::{CsvReadOptions, DataFrame}};

use crate::error::{Error, Result};
use crate::weather::ColumnMatchers;

/// Meteomatics hourly precipitation depth, mm.
pub const PRECIP_1H: &str = "precip_1h:mm";

/// Precipitation time series for one point over a UTC window.
#[derive(Debug, Clone, PartialEq)]
pub struct PrecipRequest {
    pub lat: f64,
    pub lon: f64,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub interval_hours: u32,
    pub parameter: String,
    pub model: String,
}

impl PrecipRequest {
    /// Hourly `precip_1h:mm` from the `mix` model over `[start, end]`.
    pub fn hourly(lat: f64, lon: f64, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self> {
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
            return Err(Error::validation(format!("coordinates out of range: ({lat}, {lon})")));
        }
        if start > end {
            return Err(Error::validation(format!("time range is inverted: {start} > {end}")));
        }
        Ok(Self {
            lat,
            lon,
            start,
            end,
            interval_hours: 1,
            parameter: PRECIP_1H.to_string(),
            model: "mix".to_string(),
        })
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    #[inline] pub fn step(&self) -> Duration { Duration::hours(self.interval_hours.max(1) as i64) }

    /// URL path (after the base URL) of the time series query.
    pub fn path(&self) -> String {
        let fmt = "%Y-%m-%dT%H:%M:%SZ";
        format!(
            "{}--{}:PT{}H/{}/{},{}/csv",
            self.start.format(fmt), self.end.format(fmt), self.interval_hours.max(1),
            self.parameter, self.lat, self.lon,
        )
    }
}

/// Precipitation depths on a regular UTC grid.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PrecipitationSeries {
    times: Vec<DateTime<Utc>>,
    values: Vec<f64>,
}

impl PrecipitationSeries {
    pub fn new(times: Vec<DateTime<Utc>>, values: Vec<f64>) -> Result<Self> {
        if times.len() != values.len() {
            return Err(Error::validation(format!(
                "series has {} timestamps and {} values", times.len(), values.len()
            )));
        }
        if times.windows(2).any(|w| w[0] >= w[1]) {
            return Err(Error::validation("series timestamps must be strictly increasing"));
        }
        Ok(Self { times, values })
    }

    /// Place samples on the grid `start, start + step, ..., <= end`.
    /// Grid points without a sample are 0; samples off the grid are dropped.
    pub fn on_grid(samples: &[(DateTime<Utc>, f64)], start: DateTime<Utc>, end: DateTime<Utc>, step: Duration) -> Self {
        let by_time: BTreeMap<DateTime<Utc>, f64> = samples.iter().copied().collect();

        let mut times = Vec::new();
        let mut t = start;
        while t <= end && step > Duration::zero() {
            times.push(t);
            t += step;
        }
        let values: Vec<f64> = times.iter().map(|t| by_time.get(t).copied().unwrap_or(0.0)).collect();

        let dropped = samples.iter().filter(|(t, _)| times.binary_search(t).is_err()).count();
        if dropped > 0 {
            tracing::debug!(dropped, "precipitation samples off the hourly grid");
        }
        Self { times, values }
    }

    #[inline] pub fn len(&self) -> usize { self.times.len() }

    #[inline] pub fn is_empty(&self) -> bool { self.times.is_empty() }

    #[inline] pub fn times(&self) -> &[DateTime<Utc>] { &self.times }

    #[inline] pub fn values(&self) -> &[f64] { &self.values }

    #[inline] pub fn total(&self) -> f64 { self.values.iter().sum() }

    /// Values with timestamp at or before `limit`.
    pub fn until(&self, limit: DateTime<Utc>) -> &[f64] {
        let n = self.times.partition_point(|t| *t <= limit);
        &self.values[..n]
    }
}

fn read_table(body: &str) -> Result<DataFrame> {
    CsvReadOptions::default()
        .with_has_header(true)
        .map_parse_options(|po| po.with_separator(b';'))
        .with_infer_schema_length(Some(0))
        .into_reader_with_file_handle(Cursor::new(body.as_bytes()))
        .finish()
        .map_err(|e| Error::decode("meteomatics csv", e))
}

fn string_column(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    let column = df.column(name).map_err(|e| Error::decode("meteomatics csv", e))?;
    let values = column.str().map_err(|e| Error::decode("meteomatics csv", e))?;
    Ok(values.into_iter().map(|v| v.map(str::to_string)).collect())
}

/// Decode a `;`-separated Meteomatics CSV into (time, value) samples.
/// Non-numeric values count as 0; unparseable timestamps are an error.
pub fn decode_meteomatics_csv(body: &str) -> Result<Vec<(DateTime<Utc>, f64)>> {
    let df = read_table(body)?;
    let names: Vec<String> = df.get_column_names().iter().map(|s| s.to_string()).collect();

    let time_col = &names[ColumnMatchers::TIME.resolve(names.as_slice())?];
    let value_col = &names[ColumnMatchers::PRECIPITATION.resolve(names.as_slice())?];

    let times = string_column(&df, time_col)?;
    let values = string_column(&df, value_col)?;

    times.into_iter().zip(values)
        .map(|(time, value)| {
            let raw = time.ok_or_else(|| Error::decode("meteomatics csv", "null timestamp"))?;
            let time = DateTime::parse_from_rfc3339(raw.trim())
                .map_err(|e| Error::decode("meteomatics csv", format!("{raw}: {e}")))?
                .with_timezone(&Utc);
            let value = value
                .and_then(|v| v.trim().parse::<f64>().ok())
                .filter(|v| v.is_finite())
                .unwrap_or(0.0);
            Ok((time, value))
        })
        .collect()
}

/// Source of precipitation time series.
pub trait PrecipitationProvider {
    fn precipitation(&self, request: &PrecipRequest) -> Result<PrecipitationSeries>;
}

impl<P: PrecipitationProvider + ?Sized> PrecipitationProvider for &P {
    fn precipitation(&self, request: &PrecipRequest) -> Result<PrecipitationSeries> { (**self).precipitation(request) }
}

/// Account credentials for the commercial precipitation provider.
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub const USERNAME_VAR: &'static str = "METEOMATICS_USERNAME";
    pub const PASSWORD_VAR: &'static str = "METEOMATICS_PASSWORD";

    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self { username: username.into(), password: password.into() }
    }

    /// Read credentials from `METEOMATICS_USERNAME` / `METEOMATICS_PASSWORD`.
    pub fn from_env() -> Result<Self> {
        let var = |name: &str| std::env::var(name)
            .ok()
            .filter(|v| !v.is_empty())
            .ok_or_else(|| Error::validation(format!("{name} is not set")));
        Ok(Self::new(var(Self::USERNAME_VAR)?, var(Self::PASSWORD_VAR)?))
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials").field("username", &self.username).field("password", &"***").finish()
    }
}

#[cfg(feature = "network")]
pub use client::MeteomaticsClient;

#[cfg(feature = "network")]
mod client {
    use crate::config::ProviderSettings;
    use crate::error::Result;
    use crate::net::{HttpClient, RetryPolicy};

    use super::{decode_meteomatics_csv, Credentials, PrecipRequest, PrecipitationProvider, PrecipitationSeries};

    /// Meteomatics time series API client.
    #[derive(Debug, Clone)]
    pub struct MeteomaticsClient {
        http: HttpClient,
        base_url: String,
        credentials: Credentials,
        retry: RetryPolicy,
    }

    impl MeteomaticsClient {
        pub fn new(http: HttpClient, settings: &ProviderSettings, credentials: Credentials) -> Self {
            Self {
                http,
                base_url: settings.meteomatics_url.trim_end_matches('/').to_string(),
                credentials,
                retry: settings.retry.clone(),
            }
        }
    }

    impl PrecipitationProvider for MeteomaticsClient {
        fn precipitation(&self, request: &PrecipRequest) -> Result<PrecipitationSeries> {
            let url = format!("{}/{}", self.base_url, request.path());
            let body = self.retry.run("meteomatics", || {
                let builder = self.http.get(&url)
                    .query(&[("model", request.model.as_str())])
                    .basic_auth(&self.credentials.username, Some(&self.credentials.password));
                self.http.send_text(&url, builder)
            })?;
            // Schema problems are not transient; decode outside the retry loop.
            let samples = decode_meteomatics_csv(&body)?;
            tracing::debug!(samples = samples.len(), start = %request.start, end = %request.end, "meteomatics series received");
            Ok(PrecipitationSeries::on_grid(&samples, request.start, request.end, request.step()))
        }
    }
}
