use geo::{BoundingRect, Coord, LineString};
use serde::{Deserialize, Serialize};

use crate::config::BufferSettings;
use crate::error::{Error, Result};
use crate::features::{Classifier, Feature, FeatureClass, FeatureProvider, FeatureQuery};
use crate::geom::{intersecting, repair, ring_polygon, BoundingBox, Buffer, ProjectionStrategy, Projector};

/// A point of interest and the radius of its catchment buffer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub lat: f64,
    pub lon: f64,
    pub radius_km: f64,
}

impl Location {
    pub fn new(lat: f64, lon: f64, radius_km: f64) -> Result<Self> {
        FeatureQuery::new(lat, lon, radius_km)?;
        Ok(Self { lat, lon, radius_km })
    }
}

/// Raw infrastructure aggregates clipped to the buffer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoMetrics {
    pub area_km2: f64,
    pub paved_km: f64,
    pub drain_km: f64,
    pub canal_km: f64,
    pub green_km2: f64,
    pub pumps_n: usize,
    /// Projection the buffer and features were measured in.
    pub projection: ProjectionStrategy,
    /// Green polygons that had to be repaired before clipping.
    pub repaired_polygons: usize,
}

/// Derives [`GeoMetrics`] for a location from a feature provider.
pub struct GeoMetricsExtractor<P> {
    provider: P,
    classifier: Classifier,
    quad_segments: usize,
    projections: Vec<ProjectionStrategy>,
}

impl<P: FeatureProvider> GeoMetricsExtractor<P> {
    pub fn new(provider: P, settings: &BufferSettings) -> Result<Self> {
        if settings.projections.is_empty() {
            return Err(Error::validation("at least one projection strategy is required"));
        }
        Ok(Self {
            provider,
            classifier: Classifier::new()?,
            quad_segments: settings.quad_segments,
            projections: settings.projections.clone(),
        })
    }

    /// Project, buffer, query and clip. Input is validated before the provider is called.
    pub fn extract(&self, location: &Location) -> Result<GeoMetrics> {
        let query = FeatureQuery::new(location.lat, location.lon, location.radius_km)?;
        let projector = Projector::resolve(location.lat, location.lon, &self.projections)?;
        let center = projector.project(location.lon, location.lat)?;
        let buffer = Buffer::disk(center, location.radius_km * 1000.0, self.quad_segments);

        let features = self.provider.features(&query)?;
        let metrics = measure(&features, &buffer, &projector, &self.classifier);

        tracing::info!(
            lat = location.lat, lon = location.lon, radius_km = location.radius_km,
            features = features.len(), projection = ?metrics.projection,
            paved_km = metrics.paved_km, drain_km = metrics.drain_km, canal_km = metrics.canal_km,
            green_km2 = metrics.green_km2, pumps_n = metrics.pumps_n,
            "geo metrics extracted"
        );
        Ok(metrics)
    }
}

/// Accumulate clipped lengths, areas and point counts for `features` inside `buffer`.
pub fn measure(features: &[Feature], buffer: &Buffer, projector: &Projector, classifier: &Classifier) -> GeoMetrics {
    // Project every feature once; unprojectable or empty features drop out here.
    let projected: Vec<(&Feature, Vec<Coord<f64>>)> = features.iter()
        .filter_map(|feature| {
            let coords = feature.coords.iter()
                .map(|p| projector.project(p.lon, p.lat))
                .collect::<Result<Vec<_>>>();
            match coords {
                Ok(coords) if !coords.is_empty() => Some((feature, coords)),
                Ok(_) => None,
                Err(err) => {
                    tracing::warn!(id = feature.id, error = %err, "skipping unprojectable feature");
                    None
                }
            }
        })
        .collect();

    let boxes = projected.iter().enumerate()
        .filter_map(|(i, (_, coords))| {
            LineString::new(coords.clone()).bounding_rect().map(|rect| BoundingBox::new(i, rect))
        })
        .collect();

    let mut metrics = GeoMetrics {
        area_km2: buffer.area_km2(),
        paved_km: 0.0,
        drain_km: 0.0,
        canal_km: 0.0,
        green_km2: 0.0,
        pumps_n: 0,
        projection: projector.strategy(),
        repaired_polygons: 0,
    };

    let (mut paved_m, mut drain_m, mut canal_m, mut green_m2) = (0.0, 0.0, 0.0, 0.0);

    for idx in intersecting(boxes, &buffer.envelope()) {
        let (feature, coords) = &projected[idx];
        for class in classifier.classify(feature) {
            match class {
                FeatureClass::Paved | FeatureClass::Drain | FeatureClass::Canal => {
                    if coords.len() < 2 { continue }
                    let length = buffer.clipped_length_m(&LineString::new(coords.clone()));
                    match class {
                        FeatureClass::Paved => paved_m += length,
                        FeatureClass::Drain => drain_m += length,
                        _ => canal_m += length,
                    }
                }
                FeatureClass::Green => {
                    let Some(polygon) = ring_polygon(coords.clone()) else { continue };
                    let (shape, repaired) = repair(polygon);
                    if repaired {
                        tracing::warn!(id = feature.id, "repaired self-intersecting polygon");
                        metrics.repaired_polygons += 1;
                    }
                    green_m2 += buffer.clipped_area_m2(&shape);
                }
                FeatureClass::Pump => {
                    if coords.iter().any(|&c| buffer.contains(c)) { metrics.pumps_n += 1 }
                }
            }
        }
    }

    metrics.paved_km = paved_m / 1000.0;
    metrics.drain_km = drain_m / 1000.0;
    metrics.canal_km = canal_m / 1000.0;
    metrics.green_km2 = green_m2 / 1e6;
    metrics
}
