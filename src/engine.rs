use std::time::Instant;
use tracing::{debug, info};

use crate::{
    error::ScoringError,
    features::{FeatureRecord, FeatureVector, FeatureVectorizer},
    heuristic::HeuristicStrategy,
    linear::LinearModelStrategy,
    model::{LoadedModel, ScoringModel},
    normalize,
    pipeline::LearnedPipelineStrategy,
    types::{ModelInfo, ScoreResult, Tier},
};

/// Un-normalized strategy output plus the range it should be rescaled by.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawScore {
    pub raw: f64,
    pub score_min: f64,
    pub score_max: f64,
    pub degraded: bool,
}

impl RawScore {
    pub fn new(raw: f64, score_min: f64, score_max: f64) -> Self {
        Self {
            raw,
            score_min,
            score_max,
            degraded: false,
        }
    }

    pub fn degraded(mut self) -> Self {
        self.degraded = true;
        self
    }
}

pub trait ScoringStrategy {
    fn tier(&self) -> Tier;

    fn evaluate(&self, x: &FeatureVector) -> Result<RawScore, ScoringError>;
}

/// Owns the process-wide scoring model and picks a strategy per request.
///
/// The model is never mutated after construction, so an `Arc<ScoringEngine>`
/// can be shared across any number of request handlers without locking.
#[derive(Debug)]
pub struct ScoringEngine {
    model: ScoringModel,
    info: Option<ModelInfo>,
}

impl ScoringEngine {
    pub fn new(loaded: LoadedModel) -> Self {
        let tier = Self::select_tier(&loaded.model);
        info!("Scoring engine initialized, serving tier {}", tier);
        Self {
            model: loaded.model,
            info: loaded.info,
        }
    }

    pub fn from_model(model: ScoringModel) -> Self {
        Self::new(LoadedModel { model, info: None })
    }

    pub fn model_loaded(&self) -> bool {
        self.model.is_loaded()
    }

    pub fn model_info(&self) -> Option<&ModelInfo> {
        self.info.as_ref()
    }

    /// Tier every request will be served by; fixed for the engine's lifetime.
    pub fn active_tier(&self) -> Tier {
        Self::select_tier(&self.model)
    }

    fn select_tier(model: &ScoringModel) -> Tier {
        match model {
            ScoringModel::LearnedPipeline(artifact) if artifact.score_range().is_some() => Tier::Model,
            ScoringModel::LinearModel(_) => Tier::PrecomputedLinear,
            ScoringModel::LearnedPipeline(_) | ScoringModel::Absent => Tier::Fallback,
        }
    }

    /// First applicable strategy: learned pipeline with a full score range,
    /// then the linear model, then the heuristic.
    pub fn strategy(&self) -> Box<dyn ScoringStrategy + '_> {
        match &self.model {
            ScoringModel::LearnedPipeline(artifact) => match artifact.score_range() {
                Some((score_min, score_max)) => Box::new(LearnedPipelineStrategy::new(
                    &artifact.pipeline,
                    score_min,
                    score_max,
                )),
                None => Box::new(HeuristicStrategy),
            },
            ScoringModel::LinearModel(model) => Box::new(LinearModelStrategy::new(model)),
            ScoringModel::Absent => Box::new(HeuristicStrategy),
        }
    }

    pub fn score(&self, record: &FeatureRecord) -> Result<ScoreResult, ScoringError> {
        self.score_vector(&FeatureVectorizer::vectorize(record))
    }

    pub fn score_vector(&self, x: &FeatureVector) -> Result<ScoreResult, ScoringError> {
        let start = Instant::now();
        let strategy = self.strategy();
        let raw = strategy.evaluate(x)?;

        let score = normalize::normalize(raw.raw, raw.score_min, raw.score_max);
        let result = ScoreResult {
            score,
            label: normalize::label(score),
            tier: strategy.tier(),
            degraded: raw.degraded,
        };

        metrics::counter!("anomaly_requests_total", "tier" => result.tier.as_str()).increment(1);
        metrics::histogram!("anomaly_scoring_duration_ms").record(start.elapsed().as_secs_f64() * 1000.0);
        debug!(
            "Scored vector: raw {:.6} in [{:.6}, {:.6}] -> {} ({:?}, {})",
            raw.raw,
            raw.score_min,
            raw.score_max,
            result.score,
            result.label,
            result.tier
        );

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        linear::LinearModel,
        pipeline::{tests::forest, tests::stump, Pipeline, PipelineArtifact},
        types::Label,
    };

    fn at_medians() -> FeatureRecord {
        FeatureRecord {
            value_usd: Some(200.0),
            relative_value: Some(1.0),
            time_delta: Some(3600.0),
            tx_count_24h: Some(2.0),
            gas_used: Some(50000.0),
            gas_price_gwei: Some(30.0),
            is_new_counterparty: Some(0.1),
        }
    }

    fn pipeline_artifact(score_min: Option<f64>, score_max: Option<f64>) -> PipelineArtifact {
        PipelineArtifact {
            pipeline: Pipeline {
                scaler: None,
                iforest: forest(vec![stump(0)]),
            },
            score_min,
            score_max,
        }
    }

    #[test]
    fn absent_model_uses_heuristic() {
        let engine = ScoringEngine::from_model(ScoringModel::Absent);
        let result = engine.score(&at_medians()).unwrap();
        assert_eq!(result.score, 0.0);
        assert_eq!(result.label, Label::Normal);
        assert_eq!(result.tier, Tier::Fallback);
        assert!(!engine.model_loaded());
    }

    #[test]
    fn linear_model_scores_against_declared_range() {
        let model = LinearModel::new(vec![1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0], 0.0).with_range(0.0, 1000.0);
        let engine = ScoringEngine::from_model(ScoringModel::LinearModel(model));
        let record = FeatureRecord {
            value_usd: Some(500.0),
            ..Default::default()
        };
        let result = engine.score(&record).unwrap();
        assert_eq!(result.score, 0.5);
        assert_eq!(result.label, Label::Normal);
        assert_eq!(result.tier, Tier::PrecomputedLinear);
        assert!(engine.model_loaded());
    }

    #[test]
    fn pipeline_with_range_takes_priority() {
        let engine = ScoringEngine::from_model(ScoringModel::LearnedPipeline(pipeline_artifact(
            Some(-0.2),
            Some(0.2),
        )));
        assert_eq!(engine.active_tier(), Tier::Model);

        let typical = engine.score(&at_medians()).unwrap();
        let outlier = engine
            .score(&FeatureRecord {
                value_usd: Some(90_000.0),
                ..at_medians()
            })
            .unwrap();
        assert_eq!(typical.tier, Tier::Model);
        assert!(outlier.score > typical.score);
        assert!(!outlier.degraded);
    }

    #[test]
    fn pipeline_without_range_falls_through_to_heuristic() {
        let engine = ScoringEngine::from_model(ScoringModel::LearnedPipeline(pipeline_artifact(
            Some(-0.2),
            None,
        )));
        assert!(engine.model_loaded());
        assert_eq!(engine.active_tier(), Tier::Fallback);
        assert_eq!(engine.score(&at_medians()).unwrap().tier, Tier::Fallback);
    }

    #[test]
    fn degraded_pipeline_result_is_neutral() {
        let mut artifact = pipeline_artifact(Some(-0.2), Some(0.2));
        artifact.pipeline.iforest.n_features_in = 5;
        let engine = ScoringEngine::from_model(ScoringModel::LearnedPipeline(artifact));
        let result = engine.score(&at_medians()).unwrap();
        assert!(result.degraded);
        assert_eq!(result.score, 0.5);
        assert_eq!(result.label, Label::Normal);
        assert_eq!(result.tier, Tier::Model);
    }

    #[test]
    fn degraded_result_stays_normal_for_degenerate_ranges() {
        for (min, max) in [(0.9, 0.9), (2.0, 1.0)] {
            let mut artifact = pipeline_artifact(Some(min), Some(max));
            artifact.pipeline.iforest.n_features_in = 9;
            let engine = ScoringEngine::from_model(ScoringModel::LearnedPipeline(artifact));
            let result = engine.score(&at_medians()).unwrap();
            assert!(result.degraded, "range ({min}, {max})");
            assert_eq!(result.score, 0.5, "range ({min}, {max})");
            assert_eq!(result.label, Label::Normal, "range ({min}, {max})");
        }
    }

    #[test]
    fn non_finite_linear_score_propagates() {
        let model = LinearModel::new(vec![f64::MAX, f64::MAX], 0.0);
        let engine = ScoringEngine::from_model(ScoringModel::LinearModel(model));
        let record = FeatureRecord {
            value_usd: Some(10.0),
            relative_value: Some(10.0),
            ..Default::default()
        };
        assert_eq!(
            engine.score(&record),
            Err(ScoringError::NonFiniteScore {
                tier: Tier::PrecomputedLinear
            })
        );
    }

    #[test]
    fn repeated_calls_are_identical() {
        let model = LinearModel::new(vec![0.001, 0.2, 0.0, 0.05], -0.1).with_range(-1.0, 5.0);
        let engine = ScoringEngine::from_model(ScoringModel::LinearModel(model));
        let record = FeatureRecord {
            value_usd: Some(1234.5),
            relative_value: Some(3.3),
            tx_count_24h: Some(9.0),
            ..Default::default()
        };
        let first = engine.score(&record).unwrap();
        for _ in 0..100 {
            assert_eq!(engine.score(&record).unwrap(), first);
        }
    }
}
