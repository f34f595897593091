//! Service configuration
//!
//! Layered, later sources win:
//! 1. Built-in defaults
//! 2. TOML file (`config/default.toml`, or the path in `FACE_QUALITY_CONFIG`)
//! 3. `FACE_QUALITY__*` environment variables, `__` between nested keys
//!    (e.g. `FACE_QUALITY__ANALYSIS__UPSAMPLE=true`)
//! 4. `PORT`, which replaces the port of `bind_addr`

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use ::config::{Config, ConfigError, Environment, File};
use face_analysis::AnalysisConfig;
use face_geometry::MAX_DECIMALS;
use face_models::{DetectorSettings, ModelPaths};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// Environment variable naming an alternative config file
pub const CONFIG_PATH_ENV: &str = "FACE_QUALITY_CONFIG";
const DEFAULT_CONFIG_FILE: &str = "config/default";
const ENV_PREFIX: &str = "FACE_QUALITY";

/// Everything the server reads at start-up
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Listen address
    pub bind_addr: String,
    pub detector_model_path: PathBuf,
    pub landmark_model_path: PathBuf,
    /// Largest accepted upload
    pub max_upload_bytes: usize,
    /// Default tracing filter when `RUST_LOG` is unset
    pub log_level: String,
    /// Emit logs as JSON lines
    pub log_json: bool,
    pub detector: DetectorSettings,
    pub analysis: AnalysisConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
            detector_model_path: PathBuf::from("models/seeta_fd_frontal_v1.0.bin"),
            landmark_model_path: PathBuf::from("models/landmarks_68.onnx"),
            max_upload_bytes: 16 * 1024 * 1024,
            log_level: "info".to_string(),
            log_json: false,
            detector: DetectorSettings::default(),
            analysis: AnalysisConfig::default(),
        }
    }
}

impl ServiceConfig {
    /// Load from the default file location (or `FACE_QUALITY_CONFIG`) and the
    /// environment
    pub fn load() -> Result<Self, ConfigError> {
        match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) => Self::load_from(Some(Path::new(&path))),
            Err(_) => Self::load_from(None),
        }
    }

    /// Load with an explicit file, which must then exist
    pub fn load_from(path: Option<&Path>) -> Result<Self, ConfigError> {
        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };
        Config::builder()
            .add_source(file)
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize::<Self>()?
            .validated()
    }

    fn validated(self) -> Result<Self, ConfigError> {
        if self.analysis.decimal_precision > MAX_DECIMALS {
            return Err(ConfigError::Message(format!(
                "analysis.decimal_precision {} exceeds {}",
                self.analysis.decimal_precision, MAX_DECIMALS
            )));
        }
        Ok(self)
    }

    pub fn model_paths(&self) -> ModelPaths {
        ModelPaths {
            detector: self.detector_model_path.clone(),
            landmarks: self.landmark_model_path.clone(),
        }
    }

    /// Listen address, with the port replaced by `port` when given
    pub fn resolve_bind_addr(&self, port: Option<&str>) -> Result<SocketAddr, ApiError> {
        let mut addr: SocketAddr = self.bind_addr.parse().map_err(|e| {
            ApiError::Config(format!("invalid bind_addr {:?}: {}", self.bind_addr, e))
        })?;
        if let Some(port) = port {
            let port: u16 = port
                .trim()
                .parse()
                .map_err(|e| ApiError::Config(format!("invalid PORT {:?}: {}", port, e)))?;
            addr.set_port(port);
        }
        Ok(addr)
    }
}
