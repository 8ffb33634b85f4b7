use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::path::PathBuf;
use thiserror::Error;

use crate::types::Tier;

/// Failure to turn a file on disk into a usable scoring model.
///
/// Never fatal: the loader logs it and moves on to the next tier.
#[derive(Error, Debug)]
pub enum ArtifactError {
    #[error("failed to read artifact {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse artifact {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("artifact {path} is invalid: {reason}")]
    Invalid { path: PathBuf, reason: String },

    #[error("artifact {path} has unsupported type {kind:?}")]
    UnsupportedKind { path: PathBuf, kind: String },
}

/// Which half of the learned pipeline rejected the vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Transform,
    Magnitude,
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineStage::Transform => f.write_str("transform"),
            PipelineStage::Magnitude => f.write_str("magnitude"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScoringError {
    #[error("{stage} expected {expected} features, got {actual}")]
    ShapeMismatch {
        stage: PipelineStage,
        expected: usize,
        actual: usize,
    },

    #[error("{tier} tier produced a non-finite raw score")]
    NonFiniteScore { tier: Tier },
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Scoring error: {0}")]
    Scoring(#[from] ScoringError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found")]
    NotFound,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            AppError::InvalidInput(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            AppError::NotFound => (StatusCode::NOT_FOUND, self.to_string()),
            AppError::Scoring(_) => {
                tracing::error!("Internal server error: {}", self);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
        };

        let body = Json(json!({
            "error": error_message,
            "status": status.as_u16(),
            "timestamp": chrono::Utc::now().to_rfc3339(),
        }));

        (status, body).into_response()
    }
}

pub fn validation_error(msg: &str) -> AppError {
    AppError::InvalidInput(msg.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shape_mismatch_names_the_stage() {
        let err = ScoringError::ShapeMismatch {
            stage: PipelineStage::Transform,
            expected: 9,
            actual: 7,
        };
        assert_eq!(err.to_string(), "transform expected 9 features, got 7");
    }

    #[test]
    fn status_codes_follow_error_kind() {
        let bad = validation_error("recent_gas must be finite").into_response();
        assert_eq!(bad.status(), StatusCode::BAD_REQUEST);

        let fault = AppError::from(ScoringError::NonFiniteScore {
            tier: Tier::PrecomputedLinear,
        })
        .into_response();
        assert_eq!(fault.status(), StatusCode::INTERNAL_SERVER_ERROR);

        assert_eq!(AppError::NotFound.into_response().status(), StatusCode::NOT_FOUND);
    }
}
