//! Score normalization onto a comparable [0, 1] scale.

use fusion_core::NormalizeMethod;

/// Spread below which a score list is treated as all-equal.
pub const DEGENERATE_EPSILON: f64 = 1e-9;

/// Score given to every element of an all-equal list.
pub const TIE_SCORE: f64 = 0.5;

/// Normalize one source's scores (higher is better) into [0, 1].
///
/// The output has the same length and order as the input.
pub fn normalize(scores: &[f64], method: NormalizeMethod) -> Vec<f64> {
    match method {
        NormalizeMethod::MinMax => min_max(scores),
        NormalizeMethod::ZScoreSigmoid => zscore_sigmoid(scores),
    }
}

/// Linear rescale: `(s - min) / (max - min)`.
///
/// A single score maps to 1.0; an all-equal list maps to [`TIE_SCORE`].
/// Any finite input yields finite output.
pub fn min_max(scores: &[f64]) -> Vec<f64> {
    if scores.len() <= 1 {
        return vec![1.0; scores.len()];
    }

    let (min, max) = scores
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &s| {
            (lo.min(s), hi.max(s))
        });

    // Work in halves: `max - min` overflows for scores near f64::MAX.
    let half_min = min / 2.0;
    let half_range = max / 2.0 - half_min;

    if half_range < DEGENERATE_EPSILON / 2.0 {
        return vec![TIE_SCORE; scores.len()];
    }

    scores
        .iter()
        .map(|&s| finite_or_tie((s / 2.0 - half_min) / half_range))
        .collect()
}

/// Population z-score passed through the logistic function.
///
/// A single score maps to 1.0; a list with (near) zero spread maps to
/// [`TIE_SCORE`]. Any finite input yields finite output.
pub fn zscore_sigmoid(scores: &[f64]) -> Vec<f64> {
    if scores.len() <= 1 {
        return vec![1.0; scores.len()];
    }

    // z-scores are scale-invariant; dividing by the largest magnitude keeps
    // the sums below from overflowing.
    let scale = scores.iter().fold(0.0_f64, |m, s| m.max(s.abs()));
    if scale == 0.0 {
        return vec![TIE_SCORE; scores.len()];
    }
    let scaled: Vec<f64> = scores.iter().map(|&s| s / scale).collect();

    let n = scaled.len() as f64;
    let mean = scaled.iter().sum::<f64>() / n;
    let variance = scaled.iter().map(|&s| (s - mean).powi(2)).sum::<f64>() / n;
    let std_dev = variance.sqrt();

    if std_dev * scale < DEGENERATE_EPSILON {
        return vec![TIE_SCORE; scores.len()];
    }

    scaled
        .iter()
        .map(|&s| finite_or_tie(sigmoid((s - mean) / std_dev)))
        .collect()
}

/// Convert a vector distance (lower is better) into a non-negative similarity.
///
/// Distances above 1.0 (possible for some metrics) clamp to zero.
pub fn distance_to_similarity(distance: f64) -> f64 {
    (1.0 - distance).max(0.0)
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

fn finite_or_tie(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        TIE_SCORE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: &[f64], expected: &[f64]) {
        assert_eq!(actual.len(), expected.len());
        for (a, e) in actual.iter().zip(expected) {
            assert!((a - e).abs() < 1e-9, "{} != {}", a, e);
        }
    }

    #[test]
    fn test_min_max_basic() {
        assert_close(&min_max(&[15.2, 12.8, 8.5]), &[1.0, 4.3 / 6.7, 0.0]);
    }

    #[test]
    fn test_min_max_edge_cases() {
        assert!(min_max(&[]).is_empty());
        assert_eq!(min_max(&[42.0]), vec![1.0]);
        assert_eq!(min_max(&[3.0, 3.0, 3.0]), vec![TIE_SCORE; 3]);
        assert_eq!(min_max(&[3.0, 3.0 + 1e-12]), vec![TIE_SCORE; 2]);
    }

    #[test]
    fn test_zscore_sigmoid() {
        let out = zscore_sigmoid(&[1.0, 2.0, 3.0]);
        // Mean maps to the sigmoid midpoint.
        assert!((out[1] - 0.5).abs() < 1e-12);
        assert!(out[0] < out[1] && out[1] < out[2]);
        // Symmetric around the mean.
        assert!((out[0] + out[2] - 1.0).abs() < 1e-12);
        assert!(out.iter().all(|s| (0.0..=1.0).contains(s)));
    }

    #[test]
    fn test_zscore_sigmoid_edge_cases() {
        assert!(zscore_sigmoid(&[]).is_empty());
        assert_eq!(zscore_sigmoid(&[7.0]), vec![1.0]);
        assert_eq!(zscore_sigmoid(&[2.0, 2.0]), vec![TIE_SCORE; 2]);
    }

    #[test]
    fn test_extreme_finite_scores_stay_finite() {
        assert_close(&min_max(&[f64::MAX, -f64::MAX, 0.0]), &[1.0, 0.0, 0.5]);
        assert_close(&min_max(&[1e308, 1e308, 1.0]), &[1.0, 1.0, 0.0]);

        let out = zscore_sigmoid(&[1e308, 1e308, 1.0]);
        assert!(out.iter().all(|s| s.is_finite() && (0.0..=1.0).contains(s)));
        assert_eq!(out[0], out[1]);
        assert!(out[0] > 0.5 && out[2] < 0.5);

        let out = zscore_sigmoid(&[f64::MAX, -f64::MAX]);
        assert!(out.iter().all(|s| s.is_finite()));
        assert!(out[0] > out[1]);
    }

    #[test]
    fn test_tiny_spread_is_still_a_tie_after_scaling() {
        assert_eq!(zscore_sigmoid(&[1e6, 1e6 + 1e-12]), vec![TIE_SCORE; 2]);
        assert_eq!(zscore_sigmoid(&[0.0, 0.0, 0.0]), vec![TIE_SCORE; 3]);
    }

    #[test]
    fn test_normalize_dispatch() {
        let scores = [1.0, 5.0];
        assert_eq!(normalize(&scores, NormalizeMethod::MinMax), vec![0.0, 1.0]);
        let z = normalize(&scores, NormalizeMethod::ZScoreSigmoid);
        assert!(z[0] < 0.5 && z[1] > 0.5);
    }

    #[test]
    fn test_distance_to_similarity() {
        assert!((distance_to_similarity(0.12) - 0.88).abs() < 1e-12);
        assert_eq!(distance_to_similarity(0.0), 1.0);
        assert_eq!(distance_to_similarity(1.0), 0.0);
        assert_eq!(distance_to_similarity(1.7), 0.0);
    }
}
