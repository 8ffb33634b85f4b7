#![allow(dead_code)]

use chaintrack_ml::FeatureRecord;
use serde_json::{json, Value};

pub fn at_medians() -> FeatureRecord {
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

/// Two-tree forest over the 7 transaction features, scaled first.
/// Both trees isolate large `valueUSD` (column 0) quickly.
pub fn pipeline_document(score_range: Option<(f64, f64)>) -> Value {
    let mut doc = json!({
        "pipeline": {
            "scaler": {
                "mean": [200.0, 1.0, 3600.0, 2.0, 50000.0, 30.0, 0.1],
                "scale": [500.0, 2.0, 3600.0, 2.0, 20000.0, 10.0, 0.3]
            },
            "iforest": {
                "n_features_in": 7,
                "max_samples": 256,
                "offset": -0.5,
                "estimators": [
                    {
                        "children_left": [1, 3, -1, -1, -1],
                        "children_right": [2, 4, -1, -1, -1],
                        "feature": [0, 1, -2, -2, -2],
                        "threshold": [3.0, 2.5, -2.0, -2.0, -2.0],
                        "n_node_samples": [256, 250, 6, 240, 10]
                    },
                    {
                        "children_left": [1, -1, -1],
                        "children_right": [2, -1, -1],
                        "feature": [6, -2, -2],
                        "threshold": [2.0, -2.0, -2.0],
                        "n_node_samples": [256, 254, 2],
                        "features": [1, 2, 3, 4, 5, 6, 0]
                    }
                ]
            }
        }
    });
    if let Some((min, max)) = score_range {
        doc["score_min"] = json!(min);
        doc["score_max"] = json!(max);
    }
    doc
}

pub fn linear_document() -> Value {
    json!({
        "type": "linear",
        "coefs": [1, 0, 0, 0, 0, 0, 0],
        "intercept": 0,
        "score_min": 0,
        "score_max": 1000
    })
}
