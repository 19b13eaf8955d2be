use anyhow::{Context, Result};
use chrono::Utc;
use floodrisk::{HttpClient, Location, OpenMeteoClient, OverpassClient, Today, VulnerabilityAssessor};

use crate::cli::{Cli, VulnerabilityArgs};

pub fn run(cli: &Cli, args: &VulnerabilityArgs) -> Result<()> {
    let config = crate::load_config(cli.config.as_deref())?;
    let radius_km = args.radius_km.unwrap_or(config.buffer.radius_km);
    let location = Location::new(args.lat, args.lon, radius_km)
        .context("[vulnerability] Invalid location")?;

    let http = HttpClient::new(&config.providers)?;
    let overpass = OverpassClient::new(http.clone(), &config.providers);
    let open_meteo = OpenMeteoClient::new(http, &config.providers);

    let mut assessor = VulnerabilityAssessor::new(overpass, open_meteo, &config)?;
    if let Some(delta) = args.delta {
        assessor = assessor.with_delta(delta);
    }

    // Open-Meteo answers in the configured timezone; its offset fixes the local date.
    let today = Today::ProviderLocal(Utc::now());
    let report = assessor.assess(&location, args.date, today)
        .with_context(|| format!("[vulnerability] Failed to assess ({}, {})", args.lat, args.lon))?;

    crate::print_json(&report)
}
