use serde::{ser::SerializeMap, Deserialize, Serialize, Serializer};
use std::fmt;

use crate::features::FeatureRecord;

/// Scores strictly above this are labelled suspicious, whatever the tier.
pub const SUSPICIOUS_THRESHOLD: f64 = 0.85;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Label {
    Normal,
    Suspicious,
}

impl Label {
    pub fn as_str(&self) -> &'static str {
        match self {
            Label::Normal => "normal",
            Label::Suspicious => "suspicious",
        }
    }
}

/// Which strategy produced a score.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Model,
    PrecomputedLinear,
    Fallback,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Model => "model",
            Tier::PrecomputedLinear => "precomputed_linear",
            Tier::Fallback => "fallback",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScoreRequest {
    #[serde(rename = "txHash", default)]
    pub tx_hash: Option<String>,
    #[serde(default)]
    pub from_addr: Option<String>,
    #[serde(default)]
    pub to: Option<String>,
    #[serde(flatten)]
    pub features: FeatureRecord,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreResult {
    pub score: f64,
    pub label: Label,
    pub tier: Tier,
    /// Set when the learned pipeline could not be applied to the vector.
    pub degraded: bool,
}

/// Wire form of a [`ScoreResult`]: `{score, label, tier, <tier>: true}`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreResponse(pub ScoreResult);

impl From<ScoreResult> for ScoreResponse {
    fn from(result: ScoreResult) -> Self {
        Self(result)
    }
}

impl Serialize for ScoreResponse {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let result = &self.0;
        let len = if result.degraded { 5 } else { 4 };
        let mut map = serializer.serialize_map(Some(len))?;
        map.serialize_entry("score", &result.score)?;
        map.serialize_entry("label", &result.label)?;
        map.serialize_entry("tier", &result.tier)?;
        map.serialize_entry(result.tier.as_str(), &true)?;
        if result.degraded {
            map.serialize_entry("degraded", &true)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ModelInfo {
    pub kind: Tier,
    pub path: String,
    pub sha256: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub model_loaded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<ModelInfo>,
    pub timestamp: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeeRequest {
    #[serde(default)]
    pub recent_gas: Option<Vec<f64>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeeResponse {
    pub predicted_gwei: f64,
}
