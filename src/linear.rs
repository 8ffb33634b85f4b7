use nalgebra::SVector;
use serde::{Deserialize, Serialize};

use crate::{
    engine::{RawScore, ScoringStrategy},
    error::ScoringError,
    features::{FeatureVector, FEATURE_COUNT},
    types::Tier,
};

pub const LINEAR_KIND: &str = "linear";

/// Declarative linear model document, `{"type": "linear", "coefs": [...], ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearModel {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub coefs: Vec<f64>,
    #[serde(default)]
    pub intercept: f64,
    #[serde(default)]
    pub score_min: Option<f64>,
    #[serde(default)]
    pub score_max: Option<f64>,
}

impl LinearModel {
    pub fn new(coefs: Vec<f64>, intercept: f64) -> Self {
        Self {
            kind: LINEAR_KIND.to_string(),
            coefs,
            intercept,
            score_min: None,
            score_max: None,
        }
    }

    pub fn with_range(mut self, score_min: f64, score_max: f64) -> Self {
        self.score_min = Some(score_min);
        self.score_max = Some(score_max);
        self
    }

    /// Coefficients zero-padded or truncated to the feature width.
    pub fn aligned_coefficients(&self) -> SVector<f64, FEATURE_COUNT> {
        SVector::from_fn(|i, _| self.coefs.get(i).copied().unwrap_or(0.0))
    }

    pub fn predict(&self, x: &FeatureVector) -> f64 {
        x.as_vector().dot(&self.aligned_coefficients()) + self.intercept
    }
}

#[derive(Debug, Clone, Copy)]
pub struct LinearModelStrategy<'a> {
    model: &'a LinearModel,
}

impl<'a> LinearModelStrategy<'a> {
    pub fn new(model: &'a LinearModel) -> Self {
        Self { model }
    }
}

impl ScoringStrategy for LinearModelStrategy<'_> {
    fn tier(&self) -> Tier {
        Tier::PrecomputedLinear
    }

    fn evaluate(&self, x: &FeatureVector) -> Result<RawScore, ScoringError> {
        let raw = self.model.predict(x);
        if !raw.is_finite() {
            return Err(ScoringError::NonFiniteScore { tier: self.tier() });
        }
        // An undeclared upper bound self-normalizes around the current raw
        // value; calibrating it is up to whoever writes the artifact.
        let score_min = self.model.score_min.unwrap_or(0.0);
        let score_max = self.model.score_max.unwrap_or_else(|| raw.max(1.0));
        Ok(RawScore::new(raw, score_min, score_max))
    }
}
