mod extract;

pub use extract::{measure, GeoMetrics, GeoMetricsExtractor, Location};
