use std::path::PathBuf;

use chrono::NaiveDate;

/// Flood risk CLI (argument schema only)
#[derive(clap::Parser, Debug)]
#[command(name = "floodrisk", version, about, propagate_version = true)]
pub struct Cli {
    /// Increase log verbosity (-v, -vv, -vvv); RUST_LOG takes precedence
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// JSON config file; omitted fields keep their defaults
    #[arg(short, long, global = true, value_hint = clap::ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(clap::Subcommand, Debug)]
pub enum Commands {
    /// Static and dryness-adjusted vulnerability for a point
    Vulnerability(VulnerabilityArgs),

    /// Precipitation hazard per forecast horizon (needs METEOMATICS_USERNAME/PASSWORD)
    Hazard(HazardArgs),

    /// Combine one hazard score with one vulnerability value
    Risk(RiskArgs),

    /// Rank named locations by risk for a hazard score
    Rank(RankArgs),

    /// Daily river discharge joined with daily-aggregated weather for a point
    Dataset(DatasetArgs),
}

#[derive(clap::Args, Debug)]
pub struct VulnerabilityArgs {
    #[arg(long, allow_negative_numbers = true)]
    pub lat: f64,

    #[arg(long, allow_negative_numbers = true)]
    pub lon: f64,

    /// Buffer radius in km, defaults to the configured radius
    #[arg(short, long)]
    pub radius_km: Option<f64>,

    /// Target date (YYYY-MM-DD) for the dryness adjustment
    #[arg(short, long)]
    pub date: Option<NaiveDate>,

    /// Dryness correction bound, defaults to the configured delta
    #[arg(long, allow_negative_numbers = true)]
    pub delta: Option<f64>,
}

#[derive(clap::Args, Debug)]
pub struct HazardArgs {
    #[arg(long, allow_negative_numbers = true)]
    pub lat: f64,

    #[arg(long, allow_negative_numbers = true)]
    pub lon: f64,

    /// Reference instant, RFC 3339 with offset; defaults to the current hour
    #[arg(long)]
    pub t0: Option<String>,

    /// Forecast horizons in hours, defaults to the configured list
    #[arg(long, value_delimiter = ',')]
    pub horizons: Vec<u32>,
}

#[derive(clap::Args, Debug)]
pub struct RiskArgs {
    /// Hazard score
    #[arg(long)]
    pub hazard: f64,

    /// Vulnerability (U_t or U_static); 0 means no data
    #[arg(short, long)]
    pub u: Option<f64>,
}

#[derive(clap::Args, Debug)]
pub struct RankArgs {
    /// JSON array of {"name", "u_static", "u_t"}
    #[arg(short, long, value_hint = clap::ValueHint::FilePath)]
    pub input: PathBuf,

    /// Hazard score; alternatively a JSON hazard timeline via --timeline
    #[arg(long, conflicts_with = "timeline", required_unless_present = "timeline")]
    pub hazard: Option<f64>,

    /// JSON array of {"date", "h_score"} rows
    #[arg(long, value_hint = clap::ValueHint::FilePath)]
    pub timeline: Option<PathBuf>,

    /// Date to pick from the timeline, defaults to the latest
    #[arg(short, long, requires = "timeline")]
    pub date: Option<NaiveDate>,

    /// Number of locations to return
    #[arg(short, default_value_t = 5)]
    pub n: usize,
}

#[derive(clap::Args, Debug)]
pub struct DatasetArgs {
    #[arg(long, allow_negative_numbers = true)]
    pub lat: f64,

    #[arg(long, allow_negative_numbers = true)]
    pub lon: f64,

    /// First local date (YYYY-MM-DD)
    #[arg(long)]
    pub start: NaiveDate,

    /// Last local date (YYYY-MM-DD), defaults to today
    #[arg(long)]
    pub end: Option<NaiveDate>,
}
