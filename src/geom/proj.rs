use geo::Coord;
use proj4rs::{proj::Proj as Proj4, transform::transform};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

const WGS84_PROJ4: &str = "+proj=longlat +datum=WGS84 +no_defs +type=crs";

/// A way of choosing a metric CRS around a center point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectionStrategy {
    /// Transverse Mercator zone containing the center (true distance/area locally).
    Utm,
    /// Spherical Web Mercator; always available, distorted away from the equator.
    WebMercator,
}

impl ProjectionStrategy {
    /// Build the target PROJ.4 string for a center given in degrees.
    /// - Utm: zone from longitude, `+south` below the equator, WGS84 datum.
    fn proj4(&self, lon: f64, lat: f64) -> String {
        match self {
            ProjectionStrategy::Utm => {
                let zone = (((lon + 180.0) / 6.0).floor() as i32 + 1).clamp(1, 60) as u32;
                let south = if lat >= 0.0 { "" } else { " +south" };
                format!("+proj=utm +zone={zone}{south} +datum=WGS84 +units=m +no_defs +type=crs")
            }
            ProjectionStrategy::WebMercator => {
                "+proj=merc +a=6378137 +b=6378137 +lat_ts=0 +lon_0=0 +x_0=0 +y_0=0 +k=1 +units=m +no_defs".to_string()
            }
        }
    }
}

/// Forward transform from WGS84 lon/lat (degrees) into a planar CRS (meters).
pub struct Projector {
    strategy: ProjectionStrategy,
    from: Proj4,
    to: Proj4,
}

impl std::fmt::Debug for Projector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Projector").field("strategy", &self.strategy).finish()
    }
}

impl Projector {
    /// Try each strategy in order; the first that projects the center to a
    /// finite coordinate wins.
    pub fn resolve(lat: f64, lon: f64, strategies: &[ProjectionStrategy]) -> Result<Self> {
        let mut failures = Vec::new();
        for &strategy in strategies {
            match Self::build(strategy, lat, lon) {
                Ok(projector) => {
                    tracing::debug!(?strategy, lat, lon, "resolved projection");
                    return Ok(projector);
                }
                Err(err) => {
                    tracing::warn!(?strategy, error = %err, "projection strategy failed, trying next");
                    failures.push(format!("{strategy:?}: {err}"));
                }
            }
        }
        if failures.is_empty() { failures.push("no strategies given".into()) }
        Err(Error::Projection(failures.join("; ")))
    }

    fn build(strategy: ProjectionStrategy, lat: f64, lon: f64) -> Result<Self> {
        let from = Proj4::from_proj_string(WGS84_PROJ4)
            .map_err(|e| Error::Projection(format!("failed to build source PROJ.4: {e:?}")))?;

        let proj_string = strategy.proj4(lon, lat);
        let to = Proj4::from_proj_string(&proj_string)
            .map_err(|e| Error::Projection(format!("failed to build target PROJ.4 {proj_string}: {e:?}")))?;

        let projector = Self { strategy, from, to };
        projector.project(lon, lat)?;
        Ok(projector)
    }

    /// The strategy that was selected.
    #[inline] pub fn strategy(&self) -> ProjectionStrategy { self.strategy }

    /// Project a lon/lat pair in degrees to planar meters.
    pub fn project(&self, lon: f64, lat: f64) -> Result<Coord<f64>> {
        // Map coords → radians in, meters out.
        let mut point = (lon.to_radians(), lat.to_radians(), 0.0);
        transform(&self.from, &self.to, &mut point)
            .map_err(|e| Error::Projection(format!("transform of ({lon}, {lat}) failed: {e:?}")))?;
        if !point.0.is_finite() || !point.1.is_finite() {
            return Err(Error::Projection(format!("non-finite projection of ({lon}, {lat})")));
        }
        Ok(Coord { x: point.0, y: point.1 })
    }
}
