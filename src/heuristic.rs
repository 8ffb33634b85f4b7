use crate::{
    engine::{RawScore, ScoringStrategy},
    error::ScoringError,
    features::{FeatureVector, FEATURE_COUNT},
    types::Tier,
};

/// Normalization budget: three standard deviations per weighted feature.
const Z_CAP: f64 = 3.0;

/// Per-feature `(median, std, weight)`, in `FEATURE_NAMES` order.
pub const REFERENCE: [(f64, f64, f64); FEATURE_COUNT] = [
    (200.0, 500.0, 1.0),
    (1.0, 2.0, 1.0),
    (3600.0, 3600.0, 0.5),
    (2.0, 2.0, 0.3),
    (50000.0, 20000.0, 0.5),
    (30.0, 10.0, 0.5),
    (0.1, 0.3, 0.8),
];

/// Weighted z-score distance from typical transaction medians.
///
/// Needs no artifact, so it is always applicable and closes the chain.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicStrategy;

impl HeuristicStrategy {
    pub fn magnitude(x: &FeatureVector) -> f64 {
        let mut weighted_sum = 0.0;
        let mut cap_sum = 0.0;
        for (value, (median, std, weight)) in x.iter().zip(REFERENCE) {
            let z = if std <= 0.0 { 0.0 } else { (value - median).abs() / std };
            weighted_sum += z * weight;
            cap_sum += Z_CAP * weight;
        }
        if cap_sum <= 0.0 {
            return 0.0;
        }
        (weighted_sum / cap_sum).clamp(0.0, 1.0)
    }
}

impl ScoringStrategy for HeuristicStrategy {
    fn tier(&self) -> Tier {
        Tier::Fallback
    }

    fn evaluate(&self, x: &FeatureVector) -> Result<RawScore, ScoringError> {
        // Already in [0, 1]; the unit range makes normalization a no-op.
        Ok(RawScore::new(Self::magnitude(x), 0.0, 1.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn medians() -> [f64; FEATURE_COUNT] {
        REFERENCE.map(|(median, _, _)| median)
    }

    #[test]
    fn medians_score_zero() {
        let x = FeatureVector::from_array(medians());
        assert_eq!(HeuristicStrategy::magnitude(&x), 0.0);
    }

    #[test]
    fn single_feature_contribution() {
        let mut values = medians();
        // z = 3 on valueUSD: 3 * 1.0 / (3 * 4.6)
        values[0] = 1700.0;
        let raw = HeuristicStrategy::magnitude(&FeatureVector::from_array(values));
        assert!((raw - 1.0 / 4.6).abs() < 1e-12);
    }

    #[test]
    fn large_deviations_saturate_at_one() {
        let values = [1e9, 1e6, 1e9, 1e6, 1e9, 1e6, 1e6];
        let raw = HeuristicStrategy::magnitude(&FeatureVector::from_array(values));
        assert_eq!(raw, 1.0);
    }

    #[test]
    fn all_zero_vector_is_mildly_unusual() {
        let raw = HeuristicStrategy::magnitude(&FeatureVector::from_array([0.0; FEATURE_COUNT]));
        assert!(raw > 0.0 && raw < 0.85);
    }

    #[test]
    fn evaluate_reports_unit_range() {
        let raw = HeuristicStrategy
            .evaluate(&FeatureVector::from_array(medians()))
            .unwrap();
        assert_eq!((raw.score_min, raw.score_max), (0.0, 1.0));
        assert!(!raw.degraded);
        assert_eq!(HeuristicStrategy.tier(), Tier::Fallback);
    }
}
