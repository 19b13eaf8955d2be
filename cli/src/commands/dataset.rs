use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use floodrisk::{daily_dataset, DailyTable, FloodClient, HttpClient, OpenMeteoClient};
use serde::Serialize;

use crate::cli::{Cli, DatasetArgs};

#[derive(Serialize)]
struct Dataset<'a> {
    lat: f64,
    lon: f64,
    start: NaiveDate,
    end: NaiveDate,
    rows: &'a DailyTable,
}

pub fn run(cli: &Cli, args: &DatasetArgs) -> Result<()> {
    let config = crate::load_config(cli.config.as_deref())?;
    let end = args.end.unwrap_or_else(|| Utc::now().date_naive());

    let http = HttpClient::new(&config.providers)?;
    let archive = OpenMeteoClient::new(http.clone(), &config.providers);
    let flood = FloodClient::new(http, &config.providers);

    let rows = daily_dataset(archive, flood, args.lat, args.lon, args.start, end, &config.dataset)
        .with_context(|| format!("[dataset] Failed to build dataset for ({}, {}) {}..{end}", args.lat, args.lon, args.start))?;

    crate::print_json(&Dataset { lat: args.lat, lon: args.lon, start: args.start, end, rows: &rows })
}
