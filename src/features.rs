use nalgebra::SVector;
use serde::{Deserialize, Serialize};

pub const FEATURE_COUNT: usize = 7;

/// Column order shared by the vectorizer, every model artifact and the
/// heuristic reference table.
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "valueUSD",
    "relativeValue",
    "timeDelta",
    "txCount24h",
    "gasUsed",
    "gasPriceGwei",
    "isNewCounterparty",
];

/// Untyped transaction features as they arrive over the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureRecord {
    #[serde(rename = "valueUSD", default)]
    pub value_usd: Option<f64>,
    #[serde(rename = "relativeValue", default)]
    pub relative_value: Option<f64>,
    #[serde(rename = "timeDelta", default)]
    pub time_delta: Option<f64>,
    #[serde(rename = "txCount24h", default)]
    pub tx_count_24h: Option<f64>,
    #[serde(rename = "gasUsed", default)]
    pub gas_used: Option<f64>,
    #[serde(rename = "gasPriceGwei", default)]
    pub gas_price_gwei: Option<f64>,
    #[serde(rename = "isNewCounterparty", default)]
    pub is_new_counterparty: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector(SVector<f64, FEATURE_COUNT>);

impl FeatureVector {
    pub fn from_array(values: [f64; FEATURE_COUNT]) -> Self {
        Self(SVector::from(values))
    }

    pub fn as_slice(&self) -> &[f64] {
        self.0.as_slice()
    }

    pub fn as_vector(&self) -> &SVector<f64, FEATURE_COUNT> {
        &self.0
    }

    pub fn len(&self) -> usize {
        FEATURE_COUNT
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.0.iter().copied()
    }
}

pub struct FeatureVectorizer;

impl FeatureVectorizer {
    /// Total: absent fields become `0.0`, values are not range-checked.
    pub fn vectorize(record: &FeatureRecord) -> FeatureVector {
        let fields = [
            record.value_usd,
            record.relative_value,
            record.time_delta,
            record.tx_count_24h,
            record.gas_used,
            record.gas_price_gwei,
            record.is_new_counterparty,
        ];
        FeatureVector::from_array(fields.map(|v| v.unwrap_or(0.0)))
    }
}
