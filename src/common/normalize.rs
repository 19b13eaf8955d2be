use serde::{Deserialize, Serialize};

/// Clamp a value into [0, 1]. NaN passes through unchanged.
#[inline]
pub fn clamp01(x: f64) -> f64 {
    if x.is_nan() { x } else { x.clamp(0.0, 1.0) }
}

/// Fixed (lo, hi) domain for linear normalization of a raw metric.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Anchor {
    pub lo: f64,
    pub hi: f64,
}

impl Anchor {
    #[inline] pub const fn new(lo: f64, hi: f64) -> Self { Self { lo, hi } }

    /// Clamped linear scaling: `lo` maps to 0, `hi` to 1.
    /// A degenerate anchor (`lo == hi`) always yields 0.
    #[inline]
    pub fn scale(&self, x: f64) -> f64 {
        if self.hi == self.lo { return 0.0 }
        clamp01((x - self.lo) / (self.hi - self.lo))
    }

    /// Complement of [`Anchor::scale`]: `lo` maps to 1, `hi` to 0.
    #[inline]
    pub fn scale_inverted(&self, x: f64) -> f64 {
        1.0 - self.scale(x)
    }
}

impl From<(f64, f64)> for Anchor {
    fn from((lo, hi): (f64, f64)) -> Self { Self::new(lo, hi) }
}
