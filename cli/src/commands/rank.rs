use std::{fs::File, io::BufReader, path::Path};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use floodrisk::{assess_locations, top_n, HazardTimeline, NamedVulnerability};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::cli::{Cli, RankArgs};

#[derive(Deserialize)]
struct TimelineRow {
    date: NaiveDate,
    h_score: f64,
}

#[derive(Serialize)]
struct Ranking<'a> {
    date: Option<NaiveDate>,
    h_score: f64,
    locations: &'a [floodrisk::LocationRisk],
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let file = File::open(path)
        .with_context(|| format!("[rank] Failed to open {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("[rank] Failed to parse {}", path.display()))
}

pub fn run(cli: &Cli, args: &RankArgs) -> Result<()> {
    let config = crate::load_config(cli.config.as_deref())?;
    let locations: Vec<NamedVulnerability> = read_json(&args.input)?;

    let (date, h_score) = match (&args.timeline, args.hazard) {
        (Some(path), _) => {
            let rows: Vec<TimelineRow> = read_json(path)?;
            let timeline = HazardTimeline::new(rows.into_iter().map(|r| (r.date, r.h_score)));
            let (date, h) = timeline.select(args.date)?;
            (Some(date), h)
        }
        (None, Some(h)) => (None, h),
        (None, None) => anyhow::bail!("[rank] Either --hazard or --timeline is required"),
    };

    let risks = assess_locations(h_score, &locations, &config.thresholds);
    let top = top_n(&risks, args.n);
    tracing::info!(locations = locations.len(), ranked = top.len(), h_score, "ranking complete");

    crate::print_json(&Ranking { date, h_score, locations: &top })
}
