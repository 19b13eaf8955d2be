use std::collections::HashMap;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// OSM-style key/value tags.
pub type Tags = HashMap<String, String, ahash::RandomState>;

/// Element type as reported by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementKind { Node, Way }

impl ElementKind {
    fn as_ql(&self) -> &'static str {
        match self { ElementKind::Node => "node", ElementKind::Way => "way" }
    }
}

/// A WGS84 vertex in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LonLat {
    pub lon: f64,
    pub lat: f64,
}

/// A spatial feature: a point (node) or an ordered vertex sequence (way).
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub kind: ElementKind,
    pub id: i64,
    pub tags: Tags,
    pub coords: Vec<LonLat>,
}

impl Feature {
    #[inline] pub fn tag(&self, key: &str) -> Option<&str> { self.tags.get(key).map(String::as_str) }
}

/// Infrastructure category a feature contributes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureClass {
    /// Paved road (proxy for impervious coverage), measured as length.
    Paved,
    /// Drains and ditches (micro-drainage), measured as length.
    Drain,
    /// Canals (macro-drainage), measured as length.
    Canal,
    /// Green space (permeability), measured as area.
    Green,
    /// Pumping stations (macro-drainage), counted.
    Pump,
}

/// How a tag value is matched. `Matches` is an unanchored regex, like Overpass `~`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagValue {
    Any,
    Exact(&'static str),
    Matches(&'static str),
}

/// Element type plus a conjunction of tag conditions.
#[derive(Debug, Clone, Copy)]
pub struct TagFilter {
    pub kind: ElementKind,
    pub conditions: &'static [(&'static str, TagValue)],
}

const PAVED: &[TagFilter] = &[TagFilter {
    kind: ElementKind::Way,
    conditions: &[("highway", TagValue::Any), ("surface", TagValue::Matches("asphalt|paved|concrete"))],
}];

const DRAIN: &[TagFilter] = &[TagFilter {
    kind: ElementKind::Way,
    conditions: &[("waterway", TagValue::Matches("drain|ditch"))],
}];

const CANAL: &[TagFilter] = &[TagFilter {
    kind: ElementKind::Way,
    conditions: &[("waterway", TagValue::Exact("canal"))],
}];

const GREEN: &[TagFilter] = &[
    TagFilter { kind: ElementKind::Way, conditions: &[("landuse", TagValue::Matches("grass|forest|meadow|recreation_ground|park"))] },
    TagFilter { kind: ElementKind::Way, conditions: &[("natural", TagValue::Matches("wood|scrub|grassland|heath|wetland"))] },
    TagFilter { kind: ElementKind::Way, conditions: &[("leisure", TagValue::Exact("park"))] },
];

const PUMP: &[TagFilter] = &[TagFilter {
    kind: ElementKind::Node,
    conditions: &[("man_made", TagValue::Exact("pumping_station"))],
}];

impl FeatureClass {
    pub const ALL: [FeatureClass; 5] = [
        FeatureClass::Paved, FeatureClass::Drain, FeatureClass::Canal, FeatureClass::Green, FeatureClass::Pump,
    ];

    /// Filters selecting this class; a feature belongs to the class if any filter matches.
    pub fn filters(&self) -> &'static [TagFilter] {
        match self {
            FeatureClass::Paved => PAVED,
            FeatureClass::Drain => DRAIN,
            FeatureClass::Canal => CANAL,
            FeatureClass::Green => GREEN,
            FeatureClass::Pump => PUMP,
        }
    }
}

/// Query for all infrastructure features within `radius_m` of a point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureQuery {
    pub lat: f64,
    pub lon: f64,
    pub radius_m: u32,
}

impl FeatureQuery {
    /// Validate the center and radius before anything goes over the wire.
    pub fn new(lat: f64, lon: f64, radius_km: f64) -> Result<Self> {
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
            return Err(Error::validation(format!("coordinates out of range: ({lat}, {lon})")));
        }
        if !(radius_km > 0.0) || !radius_km.is_finite() {
            return Err(Error::validation(format!("radius must be positive, got {radius_km}")));
        }
        Ok(Self { lat, lon, radius_m: (radius_km * 1000.0) as u32 })
    }

    /// Render the Overpass QL union of every class filter around the point.
    pub fn to_overpass_ql(&self) -> String {
        let mut ql = String::from("[out:json][timeout:60];\n(\n");
        for class in FeatureClass::ALL {
            for filter in class.filters() {
                ql.push_str(&format!("  {}(around:{},{},{})", filter.kind.as_ql(), self.radius_m, self.lat, self.lon));
                for (key, value) in filter.conditions {
                    match value {
                        TagValue::Any => ql.push_str(&format!("[\"{key}\"]")),
                        TagValue::Exact(v) => ql.push_str(&format!("[\"{key}\"=\"{v}\"]")),
                        TagValue::Matches(v) => ql.push_str(&format!("[\"{key}\"~\"{v}\"]")),
                    }
                }
                ql.push_str(";\n");
            }
        }
        ql.push_str(");\nout tags geom;\n");
        ql
    }
}

enum CompiledValue { Any, Exact(&'static str), Matches(Regex) }

impl CompiledValue {
    fn compile(value: TagValue) -> Result<Self> {
        Ok(match value {
            TagValue::Any => CompiledValue::Any,
            TagValue::Exact(v) => CompiledValue::Exact(v),
            TagValue::Matches(p) => CompiledValue::Matches(Regex::new(p)
                .map_err(|e| Error::validation(format!("bad tag pattern {p}: {e}")))?),
        })
    }
}

struct CompiledFilter {
    kind: ElementKind,
    conditions: Vec<(&'static str, CompiledValue)>,
}

impl CompiledFilter {
    fn compile(filter: &TagFilter) -> Result<Self> {
        let mut conditions = Vec::with_capacity(filter.conditions.len());
        for &(key, value) in filter.conditions {
            conditions.push((key, CompiledValue::compile(value)?));
        }
        Ok(Self { kind: filter.kind, conditions })
    }

    fn matches(&self, feature: &Feature) -> bool {
        feature.kind == self.kind && self.conditions.iter().all(|(key, value)| {
            match (feature.tag(key), value) {
                (None, _) => false,
                (Some(_), CompiledValue::Any) => true,
                (Some(v), CompiledValue::Exact(e)) => v == *e,
                (Some(v), CompiledValue::Matches(re)) => re.is_match(v),
            }
        })
    }
}

/// Assigns features to classes with the same filters used to build the query.
pub struct Classifier {
    filters: Vec<(FeatureClass, Vec<CompiledFilter>)>,
}

impl Classifier {
    pub fn new() -> Result<Self> {
        let mut filters = Vec::with_capacity(FeatureClass::ALL.len());
        for class in FeatureClass::ALL {
            let compiled = class.filters().iter()
                .map(CompiledFilter::compile)
                .collect::<Result<Vec<_>>>()?;
            filters.push((class, compiled));
        }
        Ok(Self { filters })
    }

    /// Every class the feature belongs to (possibly several, possibly none).
    pub fn classify(&self, feature: &Feature) -> Vec<FeatureClass> {
        self.filters.iter()
            .filter(|(_, filters)| filters.iter().any(|f| f.matches(feature)))
            .map(|(class, _)| *class)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn way(tags: &[(&str, &str)]) -> Feature {
        Feature {
            kind: ElementKind::Way,
            id: 1,
            tags: tags.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
            coords: vec![],
        }
    }

    #[test]
    fn query_contains_every_filter() {
        let q = FeatureQuery::new(-29.918, -51.185, 2.0).unwrap();
        assert_eq!(q.radius_m, 2000);
        let ql = q.to_overpass_ql();
        assert!(ql.starts_with("[out:json][timeout:60];"));
        assert!(ql.contains("way(around:2000,-29.918,-51.185)[\"highway\"][\"surface\"~\"asphalt|paved|concrete\"];"));
        assert!(ql.contains("[\"waterway\"=\"canal\"]"));
        assert!(ql.contains("node(around:2000,-29.918,-51.185)[\"man_made\"=\"pumping_station\"];"));
        assert!(ql.trim_end().ends_with("out tags geom;"));
        assert_eq!(ql.matches("(around:").count(), 7);
    }

    #[test]
    fn query_rejects_bad_radius() {
        assert!(matches!(FeatureQuery::new(0.0, 0.0, 0.0), Err(Error::Validation(_))));
        assert!(matches!(FeatureQuery::new(0.0, 0.0, -1.0), Err(Error::Validation(_))));
        assert!(matches!(FeatureQuery::new(0.0, 0.0, f64::NAN), Err(Error::Validation(_))));
        assert!(matches!(FeatureQuery::new(95.0, 0.0, 1.0), Err(Error::Validation(_))));
    }

    #[test]
    fn classify_paved_requires_both_tags() {
        let c = Classifier::new().unwrap();
        assert_eq!(c.classify(&way(&[("highway", "primary"), ("surface", "asphalt")])), vec![FeatureClass::Paved]);
        assert!(c.classify(&way(&[("highway", "primary")])).is_empty());
        assert!(c.classify(&way(&[("surface", "asphalt")])).is_empty());
    }

    #[test]
    fn classify_waterways() {
        let c = Classifier::new().unwrap();
        assert_eq!(c.classify(&way(&[("waterway", "ditch")])), vec![FeatureClass::Drain]);
        assert_eq!(c.classify(&way(&[("waterway", "canal")])), vec![FeatureClass::Canal]);
        assert!(c.classify(&way(&[("waterway", "river")])).is_empty());
    }

    #[test]
    fn classify_green_variants_and_overlap() {
        let c = Classifier::new().unwrap();
        assert_eq!(c.classify(&way(&[("leisure", "park")])), vec![FeatureClass::Green]);
        assert_eq!(c.classify(&way(&[("natural", "wetland")])), vec![FeatureClass::Green]);
        let both = way(&[("landuse", "grass"), ("highway", "service"), ("surface", "concrete")]);
        assert_eq!(c.classify(&both), vec![FeatureClass::Paved, FeatureClass::Green]);
    }

    #[test]
    fn pumps_must_be_nodes() {
        let c = Classifier::new().unwrap();
        let mut f = way(&[("man_made", "pumping_station")]);
        assert!(c.classify(&f).is_empty());
        f.kind = ElementKind::Node;
        assert_eq!(c.classify(&f), vec![FeatureClass::Pump]);
    }
}
