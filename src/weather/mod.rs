//! Hourly weather, hydrology and precipitation series from external providers.

mod columns;
mod daily;
mod hourly;
mod precip;

pub use columns::{ColumnMatcher, ColumnMatchers};
pub use daily::{daily_dataset, decode_open_meteo_daily, DailyRequest, DailyTable, DischargeProvider};
pub use hourly::{decode_open_meteo, HourlyRequest, HourlyTable, HydroProvider, Window, EVAPOTRANSPIRATION, SOIL_MOISTURE};
pub use precip::{decode_meteomatics_csv, Credentials, PrecipRequest, PrecipitationProvider, PrecipitationSeries, PRECIP_1H};

#[cfg(feature = "network")]
pub use daily::FloodClient;
#[cfg(feature = "network")]
pub use hourly::OpenMeteoClient;
#[cfg(feature = "network")]
pub use precip::MeteomaticsClient;
