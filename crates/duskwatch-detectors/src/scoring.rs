//! Shared raw-score normalization used by every base detector.
//!
//! Convention: each detector's raw score is lower for more anomalous rows
//! (mirroring the sklearn decision-function convention). Normalization
//! inverts that (negates), then min-max scales onto `[0, 1]` where `1.0`
//! is the strongest anomaly.

/// Invert and min-max scale `raw` onto `[0, 1]`. Returns all zeros when the
/// input range collapses to (near) a single point.
pub fn normalize(raw: &[f64]) -> Vec<f64> {
    if raw.is_empty() {
        return Vec::new();
    }
    let inverted: Vec<f64> = raw.iter().map(|r| -r).collect();
    let min = inverted.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = inverted.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let range = max - min;
    if range.abs() < 1e-12 {
        return vec![0.0; raw.len()];
    }
    inverted.iter().map(|v| (v - min) / range).collect()
}

/// Mean and population standard deviation of a column, substituting a small
/// epsilon for a zero standard deviation so a constant column never divides
/// by zero downstream.
pub fn mean_std(values: &[f64]) -> (f64, f64) {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    let std = variance.sqrt();
    (mean, if std < 1e-9 { 1e-9 } else { std })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_maps_lowest_raw_to_one() {
        let raw = vec![5.0, -5.0, 0.0];
        let scores = normalize(&raw);
        let max_idx = scores
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
            .unwrap()
            .0;
        assert_eq!(max_idx, 1);
        assert!((scores[1] - 1.0).abs() < 1e-9);
    }

    #[test]
    fn normalize_handles_constant_input() {
        let raw = vec![3.0, 3.0, 3.0];
        assert_eq!(normalize(&raw), vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn mean_std_substitutes_epsilon_for_zero_variance() {
        let (_, std) = mean_std(&[1.0, 1.0, 1.0]);
        assert!(std > 0.0);
    }
}
