mod dryness;
mod scorer;
mod weights;

pub use dryness::{
    adjust, check_window, et24, sm6, supported_window, Adjusted, DrynessSignal, DynamicDrynessAdjuster, Today,
};
pub use scorer::{Densities, StaticScore, StaticVulnerabilityScorer, Subindices};
pub use weights::{Factor, WeightMap};
