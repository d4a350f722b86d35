// Range normalization and sample-size shrinkage.

use tracing::warn;

use crate::config::{Metric, MetricRanges};

/// Neutral score returned when a range is degenerate.
pub const NEUTRAL_SCORE: f64 = 50.0;

/// Threshold below which a range width is treated as zero.
const RANGE_EPSILON: f64 = 1e-12;

/// Rescale a raw stat to 0-100 using the configured range for `metric`.
///
/// - missing or non-finite input scores 0
/// - a degenerate range (`min == max`) scores 50
/// - values outside the range clamp to the nearest end
/// - `higher_is_better = false` inverts the scale
///
/// A metric without a configured range falls back to `value * 100`,
/// clamped. Config validation rejects that for every metric the pipeline
/// normalizes, so hitting it means the caller passed an unusual metric.
pub fn normalize(
    value: Option<f64>,
    metric: Metric,
    ranges: &MetricRanges,
    higher_is_better: bool,
) -> f64 {
    let Some(value) = value.filter(|v| v.is_finite()) else {
        return 0.0;
    };

    let Some(range) = ranges.get(metric) else {
        warn!(
            metric = metric.key(),
            "no range configured; falling back to value * 100"
        );
        return (value * 100.0).clamp(0.0, 100.0);
    };

    let width = range.max - range.min;
    if width.abs() < RANGE_EPSILON {
        return NEUTRAL_SCORE;
    }

    let scaled = ((value - range.min) / width * 100.0).clamp(0.0, 100.0);
    if higher_is_better {
        scaled
    } else {
        100.0 - scaled
    }
}

/// Bayesian-style shrinkage toward the league average:
/// `w * observed + (1 - w) * league_average` with `w = n / (n + k)`.
///
/// A missing observed rate, a missing sample size or a negative sample
/// size passes the observed value through unchanged.
pub fn shrink(
    observed: Option<f64>,
    sample_size: Option<f64>,
    league_average: f64,
    confidence_k: f64,
) -> Option<f64> {
    let observed = observed?;
    let Some(n) = sample_size.filter(|n| *n >= 0.0) else {
        return Some(observed);
    };
    let denom = n + confidence_k;
    if denom <= 0.0 {
        return Some(observed);
    }
    let w = n / denom;
    Some(w * observed + (1.0 - w) * league_average)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
