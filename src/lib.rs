#![doc = "Flood risk scoring: urban vulnerability from spatial infrastructure, precipitation hazard, and their combination"]
mod assess;
mod common;
mod config;
mod error;
mod features;
mod geom;
mod hazard;
mod metrics;
mod net;
mod risk;
mod vulnerability;
mod weather;

#[doc(inline)]
pub use error::{Error, Result};

#[doc(inline)]
pub use config::{Anchors, BufferSettings, Config, DatasetSettings, DrynessSettings, HazardSettings, ProviderSettings};

#[doc(inline)]
pub use common::{clamp01, Anchor};

#[doc(inline)]
pub use geom::{Buffer, ProjectionStrategy, Projector};

#[doc(inline)]
pub use net::{first_success, RetryPolicy};

#[cfg(feature = "network")]
#[doc(inline)]
pub use net::HttpClient;

#[doc(inline)]
pub use features::{
    decode_overpass, Classifier, ElementKind, Feature, FeatureClass, FeatureProvider, FeatureQuery, LonLat, TagFilter,
    TagValue, Tags,
};

#[cfg(feature = "network")]
#[doc(inline)]
pub use features::OverpassClient;

#[doc(inline)]
pub use metrics::{measure, GeoMetrics, GeoMetricsExtractor, Location};

#[doc(inline)]
pub use vulnerability::{
    adjust, check_window, et24, sm6, supported_window, Adjusted, Densities, DrynessSignal, DynamicDrynessAdjuster,
    Factor, StaticScore, StaticVulnerabilityScorer, Subindices, Today, WeightMap,
};

#[doc(inline)]
pub use weather::{
    daily_dataset, decode_meteomatics_csv, decode_open_meteo, decode_open_meteo_daily, ColumnMatcher, ColumnMatchers,
    Credentials, DailyRequest, DailyTable, DischargeProvider, HourlyRequest, HourlyTable, HydroProvider, PrecipRequest,
    PrecipitationProvider, PrecipitationSeries, Window, EVAPOTRANSPIRATION, PRECIP_1H, SOIL_MOISTURE,
};

#[cfg(feature = "network")]
#[doc(inline)]
pub use weather::{FloodClient, MeteomaticsClient, OpenMeteoClient};

#[doc(inline)]
pub use hazard::{
    parse_reference_instant, percentile_rank, rolling_sum, score_series, HazardResult, HazardScorer, ANTECEDENT_HOURS,
};

#[doc(inline)]
pub use risk::{assess_locations, top_n, HazardTimeline, LocationRisk, NamedVulnerability, RiskLevel, RiskRecord, Thresholds};

#[doc(inline)]
pub use assess::{DrynessOutcome, VulnerabilityAssessor, VulnerabilityReport};
