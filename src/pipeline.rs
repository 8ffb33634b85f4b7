//! Learned anomaly pipeline: optional standard scaling followed by an
//! isolation forest exported from the offline training job.
//!
//! The forest is evaluated the way scikit-learn's `decision_function`
//! does it, then negated so that larger magnitudes are more anomalous.

use nalgebra::DVector;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{
    engine::{RawScore, ScoringStrategy},
    error::{PipelineStage, ScoringError},
    features::FeatureVector,
    types::Tier,
};

const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;
const TREE_LEAF: i64 = -1;
/// Served on a unit range, not the artifact's, when the pipeline cannot
/// score a vector.
const NEUTRAL_SCORE: f64 = 0.5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineArtifact {
    pub pipeline: Pipeline,
    #[serde(default)]
    pub score_min: Option<f64>,
    #[serde(default)]
    pub score_max: Option<f64>,
}

impl PipelineArtifact {
    /// Both bounds, or `None` when the artifact cannot be normalized.
    pub fn score_range(&self) -> Option<(f64, f64)> {
        self.score_min.zip(self.score_max)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pipeline {
    #[serde(default)]
    pub scaler: Option<StandardScaler>,
    pub iforest: IsolationForest,
}

impl Pipeline {
    pub fn transform(&self, x: &FeatureVector) -> Result<DVector<f64>, ScoringError> {
        let x = DVector::from_column_slice(x.as_slice());
        match &self.scaler {
            Some(scaler) => scaler.transform(&x),
            None => Ok(x),
        }
    }

    pub fn anomaly_magnitude(&self, x: &DVector<f64>) -> Result<f64, ScoringError> {
        self.iforest.anomaly_magnitude(x)
    }

    pub fn validate(&self) -> Result<(), String> {
        if let Some(scaler) = &self.scaler {
            scaler.validate()?;
        }
        self.iforest.validate()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

impl StandardScaler {
    pub fn transform(&self, x: &DVector<f64>) -> Result<DVector<f64>, ScoringError> {
        if self.mean.len() != x.len() {
            return Err(ScoringError::ShapeMismatch {
                stage: PipelineStage::Transform,
                expected: self.mean.len(),
                actual: x.len(),
            });
        }
        let mean = DVector::from_column_slice(&self.mean);
        let scale = DVector::from_column_slice(&self.scale);
        Ok((x - mean).component_div(&scale))
    }

    fn validate(&self) -> Result<(), String> {
        if self.mean.len() != self.scale.len() {
            return Err(format!(
                "scaler has {} means but {} scales",
                self.mean.len(),
                self.scale.len()
            ));
        }
        if self.scale.iter().any(|s| *s == 0.0) {
            return Err("scaler has a zero scale".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IsolationForest {
    pub n_features_in: usize,
    pub max_samples: usize,
    pub offset: f64,
    pub estimators: Vec<IsolationTree>,
}

impl IsolationForest {
    /// Negated decision function: `2^(-E[h(x)] / c(max_samples)) + offset`.
    pub fn anomaly_magnitude(&self, x: &DVector<f64>) -> Result<f64, ScoringError> {
        if x.len() != self.n_features_in {
            return Err(ScoringError::ShapeMismatch {
                stage: PipelineStage::Magnitude,
                expected: self.n_features_in,
                actual: x.len(),
            });
        }

        let mut depth_sum = 0.0;
        for tree in &self.estimators {
            depth_sum += tree.path_length(x)?;
        }
        let mean_depth = depth_sum / self.estimators.len() as f64;
        let normalizer = average_path_length(self.max_samples as f64);
        let score_samples = -(2f64.powf(-mean_depth / normalizer));

        Ok(-(score_samples - self.offset))
    }

    fn validate(&self) -> Result<(), String> {
        if self.estimators.is_empty() {
            return Err("isolation forest has no estimators".to_string());
        }
        if self.max_samples < 2 {
            return Err(format!("max_samples must be at least 2, got {}", self.max_samples));
        }
        for (i, tree) in self.estimators.iter().enumerate() {
            tree.validate().map_err(|reason| format!("estimator {i}: {reason}"))?;
        }
        Ok(())
    }
}

/// One fitted isolation tree in scikit-learn's flat array layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IsolationTree {
    pub children_left: Vec<i64>,
    pub children_right: Vec<i64>,
    pub feature: Vec<i64>,
    pub threshold: Vec<f64>,
    pub n_node_samples: Vec<u64>,
    /// Column subset the tree was fitted on; tree feature `k` reads
    /// input column `features[k]`. Absent means the identity map.
    #[serde(default)]
    pub features: Option<Vec<usize>>,
}

impl IsolationTree {
    fn path_length(&self, x: &DVector<f64>) -> Result<f64, ScoringError> {
        let mut node = 0usize;
        let mut depth = 0.0;
        while self.children_left[node] != TREE_LEAF {
            let column = self.column(self.feature[node] as usize);
            let value = x.get(column).copied().ok_or(ScoringError::ShapeMismatch {
                stage: PipelineStage::Magnitude,
                expected: column.saturating_add(1),
                actual: x.len(),
            })?;
            node = if value <= self.threshold[node] {
                self.children_left[node] as usize
            } else {
                self.children_right[node] as usize
            };
            depth += 1.0;
        }
        Ok(depth + average_path_length(self.n_node_samples[node] as f64))
    }

    fn column(&self, tree_feature: usize) -> usize {
        match &self.features {
            Some(map) => map.get(tree_feature).copied().unwrap_or(usize::MAX),
            None => tree_feature,
        }
    }

    fn validate(&self) -> Result<(), String> {
        let nodes = self.children_left.len();
        if nodes == 0 {
            return Err("tree has no nodes".to_string());
        }
        if [
            self.children_right.len(),
            self.feature.len(),
            self.threshold.len(),
            self.n_node_samples.len(),
        ]
        .iter()
        .any(|len| *len != nodes)
        {
            return Err("node arrays differ in length".to_string());
        }
        for node in 0..nodes {
            let (left, right) = (self.children_left[node], self.children_right[node]);
            if left == TREE_LEAF && right == TREE_LEAF {
                continue;
            }
            // Children must point forward so traversal always terminates.
            let in_range = |child: i64| child > node as i64 && (child as usize) < nodes;
            if !in_range(left) || !in_range(right) {
                return Err(format!("node {node} has an invalid child"));
            }
            if self.feature[node] < 0 {
                return Err(format!("split node {node} has a negative feature"));
            }
        }
        Ok(())
    }
}

/// Expected path length of an unsuccessful BST search over `n` samples.
pub fn average_path_length(n: f64) -> f64 {
    if n <= 1.0 {
        0.0
    } else if n <= 2.0 {
        1.0
    } else {
        2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
    }
}

pub struct LearnedPipelineStrategy<'a> {
    pipeline: &'a Pipeline,
    score_min: f64,
    score_max: f64,
}

impl<'a> LearnedPipelineStrategy<'a> {
    pub fn new(pipeline: &'a Pipeline, score_min: f64, score_max: f64) -> Self {
        Self {
            pipeline,
            score_min,
            score_max,
        }
    }

    fn magnitude(&self, x: &FeatureVector) -> Result<f64, ScoringError> {
        let transformed = self.pipeline.transform(x)?;
        self.pipeline.anomaly_magnitude(&transformed)
    }
}

impl ScoringStrategy for LearnedPipelineStrategy<'_> {
    fn tier(&self) -> Tier {
        Tier::Model
    }

    fn evaluate(&self, x: &FeatureVector) -> Result<RawScore, ScoringError> {
        match self.magnitude(x) {
            Ok(raw) if raw.is_finite() => Ok(RawScore::new(raw, self.score_min, self.score_max)),
            Ok(_) => Err(ScoringError::NonFiniteScore { tier: self.tier() }),
            Err(err @ ScoringError::ShapeMismatch { .. }) => {
                warn!("Pipeline cannot score vector, serving neutral score: {}", err);
                metrics::counter!("anomaly_degraded_total").increment(1);
                Ok(RawScore::new(NEUTRAL_SCORE, 0.0, 1.0).degraded())
            }
            Err(err) => Err(err),
        }
    }
}
