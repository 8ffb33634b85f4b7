use serde::de::DeserializeOwned;
use sha2::{Digest, Sha256};
use std::{fs, io::ErrorKind, path::Path};
use tracing::{info, warn};

use crate::{
    config::Config,
    error::ArtifactError,
    linear::{LinearModel, LINEAR_KIND},
    pipeline::PipelineArtifact,
    types::{ModelInfo, Tier},
};

/// The scoring artifact available to this process. Loaded once at startup.
#[derive(Debug, Clone, PartialEq)]
pub enum ScoringModel {
    LearnedPipeline(PipelineArtifact),
    LinearModel(LinearModel),
    Absent,
}

impl ScoringModel {
    pub fn is_loaded(&self) -> bool {
        !matches!(self, ScoringModel::Absent)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoadedModel {
    pub model: ScoringModel,
    pub info: Option<ModelInfo>,
}

impl LoadedModel {
    pub fn absent() -> Self {
        Self {
            model: ScoringModel::Absent,
            info: None,
        }
    }
}

pub fn load_from_config(config: &Config) -> LoadedModel {
    load(&config.pipeline_path(), &config.linear_path())
}

/// Tries the pipeline artifact, then the linear document. Never fails:
/// every problem is logged and the next tier is tried.
pub fn load(pipeline_path: &Path, linear_path: &Path) -> LoadedModel {
    match load_pipeline(pipeline_path) {
        Ok(Some((artifact, info))) => {
            info!("Loaded anomaly pipeline from {} (sha256 {})", info.path, info.sha256);
            if artifact.score_range().is_none() {
                warn!("Pipeline artifact has no score range, heuristic scoring will be used");
            }
            return LoadedModel {
                model: ScoringModel::LearnedPipeline(artifact),
                info: Some(info),
            };
        }
        Ok(None) => info!("No pipeline artifact at {}", pipeline_path.display()),
        Err(e) => warn!("Failed loading pipeline artifact: {}", e),
    }

    match load_linear(linear_path) {
        Ok(Some((model, info))) => {
            info!("Loaded precomputed linear model from {} (sha256 {})", info.path, info.sha256);
            return LoadedModel {
                model: ScoringModel::LinearModel(model),
                info: Some(info),
            };
        }
        Ok(None) => info!("No precomputed linear model at {}", linear_path.display()),
        Err(e) => warn!("No precomputed model loaded: {}", e),
    }

    warn!("No model artifact available, serving heuristic scores only");
    LoadedModel::absent()
}

pub fn load_pipeline(path: &Path) -> Result<Option<(PipelineArtifact, ModelInfo)>, ArtifactError> {
    let Some((artifact, info)) = read_artifact::<PipelineArtifact>(path, Tier::Model)? else {
        return Ok(None);
    };
    artifact.pipeline.validate().map_err(|reason| ArtifactError::Invalid {
        path: path.to_path_buf(),
        reason,
    })?;
    Ok(Some((artifact, info)))
}

pub fn load_linear(path: &Path) -> Result<Option<(LinearModel, ModelInfo)>, ArtifactError> {
    let Some((model, info)) = read_artifact::<LinearModel>(path, Tier::PrecomputedLinear)? else {
        return Ok(None);
    };
    if model.kind != LINEAR_KIND {
        return Err(ArtifactError::UnsupportedKind {
            path: path.to_path_buf(),
            kind: model.kind,
        });
    }
    Ok(Some((model, info)))
}

fn read_artifact<T: DeserializeOwned>(
    path: &Path,
    kind: Tier,
) -> Result<Option<(T, ModelInfo)>, ArtifactError> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(ArtifactError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    let parsed = serde_json::from_slice(&bytes).map_err(|source| ArtifactError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    let info = ModelInfo {
        kind,
        path: path.display().to_string(),
        sha256: fingerprint(&bytes),
    };
    Ok(Some((parsed, info)))
}

/// Short SHA-256 of the artifact bytes, enough to tell deployments apart.
pub fn fingerprint(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    hex::encode(&digest[..6])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_is_twelve_hex_chars() {
        // sha256("") = e3b0c442 98fc...
        assert_eq!(fingerprint(b""), "e3b0c44298fc");
    }

    #[test]
    fn missing_files_yield_absent_model() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = load(&dir.path().join("nope.json"), &dir.path().join("nada.json"));
        assert_eq!(loaded, LoadedModel::absent());
        assert!(!loaded.model.is_loaded());
    }
}
