//! Score calibration: the canonical anomaly score surface
//! every component downstream of the ensemble reads severity bands from.

const EPSILON: f64 = 1e-9;
const SIGMOID_STEEPNESS: f64 = 6.0;
const RESCALE_LO: f64 = 0.1;
const RESCALE_SPAN: f64 = 0.89;

/// Calibrates a non-empty vector of raw blended scores into `[0.1, 0.99]`.
///
/// When the input is (near-)constant, min-max normalization is undefined,
/// so the result falls back to a rank-preserving `linspace(0.1, 0.9, N)`:
/// the argsort of the input determines the argsort of the output.
pub fn calibrate(raw: &[f64]) -> Vec<f64> {
    if raw.is_empty() {
        return Vec::new();
    }

    let min = raw.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = raw.iter().cloned().fold(f64::NEG_INFINITY, f64::max);

    if (max - min).abs() < EPSILON {
        return rank_preserving_linspace(raw);
    }

    raw.iter()
        .map(|&x| {
            let normalized = (x - min) / (max - min);
            let sigma = 1.0 / (1.0 + (-SIGMOID_STEEPNESS * (normalized - 0.5)).exp());
            RESCALE_LO + RESCALE_SPAN * sigma
        })
        .collect()
}

/// Assigns `linspace(0.1, 0.9, N)` to the input's rank order: the smallest
/// input gets `0.1`, the largest gets `0.9`, ties keep their relative
/// input-order position (a stable sort by value).
fn rank_preserving_linspace(raw: &[f64]) -> Vec<f64> {
    let n = raw.len();
    if n == 1 {
        return vec![0.5];
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| raw[a].partial_cmp(&raw[b]).unwrap());

    let mut out = vec![0.0; n];
    for (rank, idx) in order.into_iter().enumerate() {
        out[idx] = 0.1 + 0.8 * (rank as f64) / ((n - 1) as f64);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_input_falls_back_to_rank_preserving_linspace() {
        let calibrated = calibrate(&[5.0, 5.0, 5.0]);
        assert!(calibrated.iter().all(|&v| (0.1..=0.9).contains(&v)));
    }

    #[test]
    fn varying_input_lands_in_rescaled_range() {
        let calibrated = calibrate(&[-3.0, -1.0, 0.0, 2.0, 10.0]);
        for &v in &calibrated {
            assert!((0.1..=0.99).contains(&v), "got {v}");
        }
    }

    #[test]
    fn calibration_preserves_rank_order() {
        let raw = vec![0.2, -0.5, 3.0, 1.1];
        let calibrated = calibrate(&raw);
        let mut raw_order: Vec<usize> = (0..raw.len()).collect();
        raw_order.sort_by(|&a, &b| raw[a].partial_cmp(&raw[b]).unwrap());
        let mut calibrated_order: Vec<usize> = (0..calibrated.len()).collect();
        calibrated_order.sort_by(|&a, &b| calibrated[a].partial_cmp(&calibrated[b]).unwrap());
        assert_eq!(raw_order, calibrated_order);
    }

    #[test]
    fn single_element_input_does_not_panic() {
        let calibrated = calibrate(&[42.0]);
        assert_eq!(calibrated.len(), 1);
    }

    proptest::proptest! {
        #[test]
        fn calibration_always_in_bounds(raw in proptest::collection::vec(-100.0f64..100.0, 1..50)) {
            let calibrated = calibrate(&raw);
            proptest::prop_assert_eq!(calibrated.len(), raw.len());
            for v in calibrated {
                proptest::prop_assert!((0.0..=1.0).contains(&v));
            }
        }
    }
}
