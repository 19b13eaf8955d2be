/// Trailing rolling sum over `window` samples; the first windows are partial.
pub fn rolling_sum(values: &[f64], window: usize) -> Vec<f64> {
    let window = window.max(1);
    (0..values.len())
        .map(|i| values[(i + 1).saturating_sub(window)..=i].iter().sum())
        .collect()
}

/// Percentile rank of `score` within `baseline`, in [0, 1].
///
/// Ties count half: `(below + at_or_below + [any ties]) / (2n)`. An empty baseline ranks 0.
pub fn percentile_rank(score: f64, baseline: &[f64]) -> f64 {
    if baseline.is_empty() { return 0.0 }
    let below = baseline.iter().filter(|&&v| v < score).count();
    let at_or_below = baseline.iter().filter(|&&v| v <= score).count();
    let tie = usize::from(at_or_below > below);
    (below + at_or_below + tie) as f64 * 50.0 / baseline.len() as f64 / 100.0
}
