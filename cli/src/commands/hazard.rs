use anyhow::{Context, Result};
use chrono::{DurationRound, TimeDelta, Utc};
use floodrisk::{parse_reference_instant, Credentials, HazardScorer, HttpClient, MeteomaticsClient};

use crate::cli::{Cli, HazardArgs};

pub fn run(cli: &Cli, args: &HazardArgs) -> Result<()> {
    let config = crate::load_config(cli.config.as_deref())?;

    let t0 = match &args.t0 {
        Some(s) => parse_reference_instant(s)?,
        None => Utc::now().duration_trunc(TimeDelta::hours(1))
            .context("[hazard] Failed to round current time")?,
    };
    let horizons = if args.horizons.is_empty() { config.hazard.horizons.clone() } else { args.horizons.clone() };

    let credentials = Credentials::from_env()
        .context("[hazard] Meteomatics credentials are required")?;
    let http = HttpClient::new(&config.providers)?;
    let meteomatics = MeteomaticsClient::new(http, &config.providers, credentials);

    let results = HazardScorer::new(meteomatics, &config.hazard)
        .with_model(config.providers.meteomatics_model.as_str())
        .score(args.lat, args.lon, t0, &horizons)
        .with_context(|| format!("[hazard] Failed to score hazard at {t0}"))?;

    crate::print_json(&results)
}
