//! Transaction anomaly scoring service.
//!
//! A feature record is vectorized, scored by the first applicable tier
//! (learned pipeline, precomputed linear model, heuristic), normalized to
//! `[0, 1]` and labelled.

pub mod config;
pub mod engine;
pub mod error;
pub mod features;
pub mod fees;
pub mod heuristic;
pub mod linear;
pub mod model;
pub mod normalize;
pub mod pipeline;
pub mod routes;
pub mod types;

pub use crate::config::Config;
pub use crate::engine::ScoringEngine;
pub use crate::error::{AppError, ArtifactError, ScoringError};
pub use crate::features::{FeatureRecord, FeatureVector, FeatureVectorizer};
pub use crate::model::{LoadedModel, ScoringModel};
pub use crate::types::{Label, ScoreResult, Tier};
