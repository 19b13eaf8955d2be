mod scorer;
mod stats;

pub use scorer::{parse_reference_instant, score_series, HazardResult, HazardScorer, ANTECEDENT_HOURS};
pub use stats::{percentile_rank, rolling_sum};
