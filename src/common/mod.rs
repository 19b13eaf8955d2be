mod normalize;

pub use normalize::{clamp01, Anchor};
