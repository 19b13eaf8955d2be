use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::ser::{SerializeMap, SerializeSeq, Serializer};
use serde::{Deserialize, Serialize};

use crate::config::DatasetSettings;
use crate::error::{Error, Result};

use super::hourly::check_point;
use super::{HourlyRequest, HydroProvider, Window};

/// Daily values keyed by local date.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyTable {
    dates: Vec<NaiveDate>,
    columns: BTreeMap<String, Vec<Option<f64>>>,
}

impl DailyTable {
    /// Dates must be strictly increasing and every column must have one value per date.
    pub fn new(dates: Vec<NaiveDate>, columns: BTreeMap<String, Vec<Option<f64>>>) -> Result<Self> {
        if let Some(pair) = dates.windows(2).find(|pair| pair[0] >= pair[1]) {
            return Err(Error::decode("daily table", format!("dates out of order: {} then {}", pair[0], pair[1])));
        }
        if let Some((name, col)) = columns.iter().find(|(_, col)| col.len() != dates.len()) {
            return Err(Error::decode("daily table", format!(
                "column {name} has {} values for {} dates", col.len(), dates.len()
            )));
        }
        Ok(Self::from_parts(dates, columns))
    }

    pub(super) fn from_parts(dates: Vec<NaiveDate>, columns: BTreeMap<String, Vec<Option<f64>>>) -> Self {
        Self { dates, columns }
    }

    #[inline] pub fn len(&self) -> usize { self.dates.len() }

    #[inline] pub fn is_empty(&self) -> bool { self.dates.is_empty() }

    #[inline] pub fn dates(&self) -> &[NaiveDate] { &self.dates }

    #[inline]
    pub fn column(&self, name: &str) -> Option<&[Option<f64>]> {
        self.columns.get(name).map(Vec::as_slice)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> { self.columns.keys().map(String::as_str) }

    /// Value of `name` on `date`, if both exist and the value is not null.
    pub fn value(&self, name: &str, date: NaiveDate) -> Option<f64> {
        let i = self.dates.iter().position(|&d| d == date)?;
        self.columns.get(name)?.get(i).copied().flatten()
    }

    /// Keep every row of `self` and attach the columns of `other` by date.
    /// Dates missing from `other` get nulls; on a name clash the left column wins.
    pub fn left_join(&self, other: &DailyTable) -> DailyTable {
        let index: BTreeMap<NaiveDate, usize> = other.dates.iter().enumerate().map(|(i, &d)| (d, i)).collect();
        let rows: Vec<Option<usize>> = self.dates.iter().map(|d| index.get(d).copied()).collect();

        let mut columns = self.columns.clone();
        for (name, values) in &other.columns {
            if columns.contains_key(name) {
                tracing::warn!(column = %name, "column on both sides of the join, keeping the left one");
                continue;
            }
            let joined = rows.iter().map(|row| row.and_then(|j| values[j])).collect();
            columns.insert(name.clone(), joined);
        }
        Self::from_parts(self.dates.clone(), columns)
    }
}

/// Serializes as one `{"date": ..., <column>: value}` record per date.
impl Serialize for DailyTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.len()))?;
        for i in 0..self.len() {
            seq.serialize_element(&DailyRow { table: self, row: i })?;
        }
        seq.end()
    }
}

struct DailyRow<'a> {
    table: &'a DailyTable,
    row: usize,
}

impl Serialize for DailyRow<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.table.columns.len() + 1))?;
        map.serialize_entry("date", &self.table.dates[self.row])?;
        for (name, values) in &self.table.columns {
            map.serialize_entry(name, &values[self.row])?;
        }
        map.end()
    }
}

/// Daily variables for one point over an inclusive local date range.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyRequest {
    pub lat: f64,
    pub lon: f64,
    pub variables: Vec<String>,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DailyRequest {
    pub fn new(lat: f64, lon: f64, variables: &[impl AsRef<str>], start: NaiveDate, end: NaiveDate) -> Result<Self> {
        check_point(lat, lon)?;
        if variables.is_empty() {
            return Err(Error::validation("no daily variables requested"));
        }
        if start > end {
            return Err(Error::validation(format!("date range is inverted: {start} > {end}")));
        }
        let variables = variables.iter().map(|v| v.as_ref().to_string()).collect();
        Ok(Self { lat, lon, variables, start, end })
    }

    pub fn query_params(&self, timezone: &str) -> Vec<(&'static str, String)> {
        vec![
            ("latitude", self.lat.to_string()),
            ("longitude", self.lon.to_string()),
            ("timezone", timezone.to_string()),
            ("timeformat", "unixtime".to_string()),
            ("daily", self.variables.join(",")),
            ("start_date", self.start.format("%Y-%m-%d").to_string()),
            ("end_date", self.end.format("%Y-%m-%d").to_string()),
        ]
    }
}

#[derive(Deserialize)]
struct DailyResponse {
    #[serde(default)]
    utc_offset_seconds: i32,
    daily: Option<BTreeMap<String, Vec<Option<f64>>>>,
}

/// Decode the `daily` block of an Open-Meteo style response requested with `timeformat=unixtime`.
/// Timestamps are local midnights; requested variables absent from the payload become all-null columns.
pub fn decode_open_meteo_daily(body: &str, variables: &[String]) -> Result<DailyTable> {
    let response: DailyResponse = serde_json::from_str(body)
        .map_err(|e| Error::decode("open-meteo daily response", e))?;
    let offset = FixedOffset::east_opt(response.utc_offset_seconds)
        .ok_or_else(|| Error::decode("open-meteo daily response", format!("bad utc offset {}", response.utc_offset_seconds)))?;

    let mut daily = response.daily.unwrap_or_default();
    let dates = daily.remove("time").unwrap_or_default().into_iter()
        .map(|t| t.and_then(|secs| DateTime::from_timestamp(secs as i64, 0)))
        .map(|t| t.map(|t| t.with_timezone(&offset).date_naive()))
        .collect::<Option<Vec<_>>>()
        .ok_or_else(|| Error::decode("open-meteo daily response", "null or invalid timestamp"))?;

    let mut columns = BTreeMap::new();
    for name in variables {
        let values = daily.remove(name).unwrap_or_else(|| {
            tracing::warn!(variable = %name, "daily variable missing from response");
            vec![None; dates.len()]
        });
        columns.insert(name.clone(), values);
    }
    DailyTable::new(dates, columns)
}

/// Source of daily river discharge.
pub trait DischargeProvider {
    fn daily(&self, request: &DailyRequest) -> Result<DailyTable>;
}

impl<P: DischargeProvider + ?Sized> DischargeProvider for &P {
    fn daily(&self, request: &DailyRequest) -> Result<DailyTable> { (**self).daily(request) }
}

/// Daily discharge joined with hourly weather aggregated to the same local days.
/// Rows follow the discharge dates.
pub fn daily_dataset<H: HydroProvider, D: DischargeProvider>(
    hydro: H,
    discharge: D,
    lat: f64,
    lon: f64,
    start: NaiveDate,
    end: NaiveDate,
    settings: &DatasetSettings,
) -> Result<DailyTable> {
    let hourly = HourlyRequest::new(lat, lon, settings.hourly_variables.as_slice(), Window::Range { start, end })?;
    let flood = DailyRequest::new(lat, lon, settings.flood_variables.as_slice(), start, end)?;

    let weather = hydro.hourly(&hourly)?.daily();
    let discharge = discharge.daily(&flood)?;
    tracing::info!(weather_days = weather.len(), discharge_days = discharge.len(), %start, %end, "daily dataset assembled");
    Ok(discharge.left_join(&weather))
}

#[cfg(feature = "network")]
pub use client::FloodClient;

#[cfg(feature = "network")]
mod client {
    use crate::config::ProviderSettings;
    use crate::error::Result;
    use crate::net::{HttpClient, RetryPolicy};

    use super::{decode_open_meteo_daily, DailyRequest, DailyTable, DischargeProvider};

    /// Open-Meteo flood API client (daily river discharge).
    #[derive(Debug, Clone)]
    pub struct FloodClient {
        http: HttpClient,
        url: String,
        timezone: String,
        retry: RetryPolicy,
    }

    impl FloodClient {
        pub fn new(http: HttpClient, settings: &ProviderSettings) -> Self {
            Self {
                http,
                url: settings.open_meteo_flood_url.clone(),
                timezone: settings.timezone.clone(),
                retry: settings.retry.clone(),
            }
        }
    }

    impl DischargeProvider for FloodClient {
        fn daily(&self, request: &DailyRequest) -> Result<DailyTable> {
            let params = request.query_params(&self.timezone);
            let body = self.retry.run("open-meteo flood", || {
                self.http.send_text(&self.url, self.http.get(&self.url).query(&params))
            })?;
            let table = decode_open_meteo_daily(&body, &request.variables)?;
            tracing::debug!(rows = table.len(), url = %self.url, "discharge series received");
            Ok(table)
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::weather::HourlyTable;

    fn date(d: u32) -> NaiveDate { NaiveDate::from_ymd_opt(2024, 5, d).unwrap() }

    fn table(dates: &[u32], cols: &[(&str, Vec<Option<f64>>)]) -> DailyTable {
        let columns = cols.iter().map(|(k, v)| (k.to_string(), v.clone())).collect();
        DailyTable::new(dates.iter().map(|&d| date(d)).collect(), columns).unwrap()
    }

    #[test]
    fn request_params_carry_daily_variables() {
        let req = DailyRequest::new(-30.03, -51.22, &["river_discharge", "river_discharge_max"], date(1), date(31)).unwrap();
        let params = req.query_params("America/Sao_Paulo");
        assert!(params.contains(&("daily", "river_discharge,river_discharge_max".into())));
        assert!(params.contains(&("start_date", "2024-05-01".into())));
        assert!(params.contains(&("end_date", "2024-05-31".into())));

        assert!(matches!(DailyRequest::new(0.0, 0.0, &["river_discharge"], date(2), date(1)), Err(Error::Validation(_))));
        assert!(matches!(DailyRequest::new(95.0, 0.0, &["river_discharge"], date(1), date(2)), Err(Error::Validation(_))));
    }

    #[test]
    fn decodes_local_midnights_and_fills_missing() {
        let body = r#"{
            "utc_offset_seconds": -10800,
            "daily": {
                "time": [1714532400, 1714618800],
                "river_discharge": [12.5, null]
            }
        }"#;
        let vars = vec!["river_discharge".to_string(), "river_discharge_max".to_string()];
        let t = decode_open_meteo_daily(body, &vars).unwrap();
        assert_eq!(t.dates(), &[date(1), date(2)]);
        assert_eq!(t.column("river_discharge").unwrap(), &[Some(12.5), None]);
        assert_eq!(t.column("river_discharge_max").unwrap(), &[None, None]);
    }

    #[test]
    fn rejects_unordered_dates() {
        let body = r#"{"daily": {"time": [86400, 0], "river_discharge": [1.0, 2.0]}}"#;
        assert!(matches!(decode_open_meteo_daily(body, &["river_discharge".to_string()]), Err(Error::Decode { .. })));
    }

    #[test]
    fn left_join_keeps_left_rows() {
        let flood = table(&[1, 2, 3], &[("river_discharge", vec![Some(10.0), Some(11.0), Some(12.0)])]);
        let weather = table(&[2, 3, 4], &[
            ("precipitation", vec![Some(5.0), None, Some(7.0)]),
            ("river_discharge", vec![Some(0.0), Some(0.0), Some(0.0)]),
        ]);
        let merged = flood.left_join(&weather);
        assert_eq!(merged.dates(), &[date(1), date(2), date(3)]);
        assert_eq!(merged.column("precipitation").unwrap(), &[None, Some(5.0), None]);
        assert_eq!(merged.column("river_discharge").unwrap(), &[Some(10.0), Some(11.0), Some(12.0)]);
    }

    #[test]
    fn serializes_as_records() {
        let t = table(&[1], &[("river_discharge", vec![Some(3.5)]), ("rain", vec![None])]);
        let json = serde_json::to_value(&t).unwrap();
        assert_eq!(json[0]["date"], "2024-05-01");
        assert_eq!(json[0]["river_discharge"], 3.5);
        assert!(json[0]["rain"].is_null());
    }

    struct Weather(HourlyTable);

    impl HydroProvider for Weather {
        fn hourly(&self, request: &HourlyRequest) -> Result<HourlyTable> {
            assert!(matches!(request.window, Window::Range { .. }));
            Ok(self.0.clone())
        }
    }

    struct Discharge(DailyTable);

    impl DischargeProvider for Discharge {
        fn daily(&self, _: &DailyRequest) -> Result<DailyTable> { Ok(self.0.clone()) }
    }

    #[test]
    fn dataset_aggregates_weather_onto_discharge_days() {
        // 48 hours from local midnight of May 1st at UTC-3.
        let start = Utc.with_ymd_and_hms(2024, 5, 1, 3, 0, 0).unwrap();
        let times = (0..48).map(|h| start + chrono::Duration::hours(h)).collect();
        let columns = BTreeMap::from([("precipitation".to_string(), vec![Some(0.5); 48])]);
        let hourly = HourlyTable::new(FixedOffset::west_opt(3 * 3600).unwrap(), times, columns).unwrap();
        let flood = table(&[1, 2, 3], &[("river_discharge", vec![Some(100.0), Some(140.0), Some(90.0)])]);

        let settings = DatasetSettings::default();
        let out = daily_dataset(Weather(hourly), Discharge(flood), -30.03, -51.22, date(1), date(3), &settings).unwrap();
        assert_eq!(out.len(), 3);
        assert_eq!(out.column("precipitation").unwrap(), &[Some(12.0), Some(12.0), None]);
        assert_eq!(out.value("river_discharge", date(2)), Some(140.0));
    }
}
