mod combine;
mod timeline;

pub use combine::{top_n, RiskLevel, RiskRecord, Thresholds};
pub use timeline::{assess_locations, HazardTimeline, LocationRisk, NamedVulnerability};
