mod feature;
mod overpass;

pub use feature::{Classifier, ElementKind, Feature, FeatureClass, FeatureQuery, LonLat, TagFilter, TagValue, Tags};
pub use overpass::decode_overpass;
#[cfg(feature = "network")]
pub use overpass::OverpassClient;

use crate::error::Result;

/// Source of spatial infrastructure features around a point.
pub trait FeatureProvider {
    /// All features matching the class filters within the query radius.
    /// An empty list is a valid answer.
    fn features(&self, query: &FeatureQuery) -> Result<Vec<Feature>>;
}

impl<P: FeatureProvider + ?Sized> FeatureProvider for &P {
    fn features(&self, query: &FeatureQuery) -> Result<Vec<Feature>> { (**self).features(query) }
}
