use ::config::{builder::DefaultState, ConfigBuilder, ConfigError};
use serde::Deserialize;
use std::{env, path::PathBuf};

const ENV_PREFIX: &str = "CHAINTRACK";
const DEFAULT_CONFIG_FILE: &str = "chaintrack.toml";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub model_dir: PathBuf,
    pub pipeline_artifact: String,
    pub linear_artifact: String,
    pub fee_default_gwei: f64,
    pub fee_jitter_gwei: f64,
    pub metrics_enabled: bool,
}

impl Config {
    /// Defaults, then an optional TOML file, then `CHAINTRACK_*` variables.
    pub fn load() -> Result<Self, ConfigError> {
        let file = env::var("CHAINTRACK_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());

        Self::defaults()?
            .add_source(::config::File::with_name(&file).required(false))
            .add_source(::config::Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?
            .try_deserialize()
    }

    fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        ::config::Config::builder()
            .set_default("host", "0.0.0.0")?
            .set_default("port", 8000)?
            .set_default("model_dir", "models")?
            .set_default("pipeline_artifact", "anomaly_iforest.json")?
            .set_default("linear_artifact", "precomputed_model.json")?
            .set_default("fee_default_gwei", 30.0)?
            .set_default("fee_jitter_gwei", 2.0)?
            .set_default("metrics_enabled", true)
    }

    pub fn pipeline_path(&self) -> PathBuf {
        self.model_dir.join(&self.pipeline_artifact)
    }

    pub fn linear_path(&self) -> PathBuf {
        self.model_dir.join(&self.linear_artifact)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            model_dir: PathBuf::from("models"),
            pipeline_artifact: "anomaly_iforest.json".to_string(),
            linear_artifact: "precomputed_model.json".to_string(),
            fee_default_gwei: 30.0,
            fee_jitter_gwei: 2.0,
            metrics_enabled: true,
        }
    }
}
