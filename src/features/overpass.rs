use serde::Deserialize;

use crate::error::{Error, Result};
use crate::features::{ElementKind, Feature, LonLat, Tags};

#[derive(Deserialize)]
struct OverpassResponse {
    #[serde(default)]
    elements: Vec<RawElement>,
}

#[derive(Deserialize)]
struct RawElement {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    id: i64,
    lat: Option<f64>,
    lon: Option<f64>,
    #[serde(default)]
    tags: Tags,
    #[serde(default)]
    geometry: Vec<Option<LonLat>>,
}

/// Decode an Overpass `out tags geom` JSON payload.
/// Relations are ignored; null vertices are dropped; nodes carry their own position.
pub fn decode_overpass(body: &str) -> Result<Vec<Feature>> {
    let response: OverpassResponse = serde_json::from_str(body)
        .map_err(|e| Error::decode("overpass response", e))?;

    let features = response.elements.into_iter()
        .filter_map(|el| {
            let kind = match el.kind.as_str() {
                "node" => ElementKind::Node,
                "way" => ElementKind::Way,
                _ => return None,
            };
            let coords = match kind {
                ElementKind::Node => match (el.lon, el.lat) {
                    (Some(lon), Some(lat)) => vec![LonLat { lon, lat }],
                    _ => vec![],
                },
                ElementKind::Way => el.geometry.into_iter().flatten().collect(),
            };
            Some(Feature { kind, id: el.id, tags: el.tags, coords })
        })
        .collect();

    Ok(features)
}

#[cfg(feature = "network")]
pub use client::OverpassClient;

#[cfg(feature = "network")]
mod client {
    use crate::config::ProviderSettings;
    use crate::error::Result;
    use crate::features::{Feature, FeatureProvider, FeatureQuery};
    use crate::net::{first_success, HttpClient, RetryPolicy};

    use super::decode_overpass;

    /// Overpass API client rotating over a fixed, ordered endpoint list.
    #[derive(Debug, Clone)]
    pub struct OverpassClient {
        http: HttpClient,
        endpoints: Vec<String>,
        retry: RetryPolicy,
    }

    impl OverpassClient {
        pub fn new(http: HttpClient, settings: &ProviderSettings) -> Self {
            Self { http, endpoints: settings.overpass_urls.clone(), retry: settings.retry.clone() }
        }
    }

    impl FeatureProvider for OverpassClient {
        fn features(&self, query: &FeatureQuery) -> Result<Vec<Feature>> {
            let ql = query.to_overpass_ql();
            let features = first_success("overpass", &self.endpoints, &self.retry, |url| {
                let request = self.http.post(url).form(&[("data", ql.as_str())]);
                let body = self.http.send_text(url, request)?;
                decode_overpass(&body)
            })?;
            tracing::debug!(count = features.len(), radius_m = query.radius_m, "overpass features received");
            Ok(features)
        }
    }
}
