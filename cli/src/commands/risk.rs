use anyhow::Result;
use floodrisk::RiskRecord;

use crate::cli::{Cli, RiskArgs};

pub fn run(cli: &Cli, args: &RiskArgs) -> Result<()> {
    let config = crate::load_config(cli.config.as_deref())?;
    let record = RiskRecord::combine(args.hazard, args.u, &config.thresholds);
    crate::print_json(&record)
}
