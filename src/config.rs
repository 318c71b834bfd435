use serde::Deserialize;
use std::{
    env, fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};

use crate::features::{DEFAULT_CITY_PREFIX, DEFAULT_FACILITY_PREFIX};

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ServiceConfig {
    pub port: u16,
    pub artifacts_dir: PathBuf,
    pub regression_model: PathBuf,
    pub regression_meta: PathBuf,
    pub classification_model: PathBuf,
    pub classification_meta: PathBuf,
    pub day_encoder: PathBuf,
    pub time_encoder: PathBuf,
    pub static_data: PathBuf,
    pub city_prefix: String,
    pub facility_prefix: String,
    pub log_features: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            artifacts_dir: PathBuf::from("artifacts"),
            regression_model: PathBuf::from("parking_spots_reg_model.pt"),
            regression_meta: PathBuf::from("parking_spots_reg_meta.json"),
            classification_model: PathBuf::from("parking_clf_model.pt"),
            classification_meta: PathBuf::from("parking_clf_meta.json"),
            day_encoder: PathBuf::from("day_of_week_encoder.json"),
            time_encoder: PathBuf::from("time_of_day_encoder.json"),
            static_data: PathBuf::from("parking_static_data.csv"),
            city_prefix: DEFAULT_CITY_PREFIX.to_string(),
            facility_prefix: DEFAULT_FACILITY_PREFIX.to_string(),
            log_features: false,
        }
    }
}

impl ServiceConfig {
    /// Reads the JSON file named by `PARKING_CONFIG` (if set), then applies
    /// `PORT`, `ARTIFACTS_DIR` and `LOG_PRED` from the environment.
    pub fn load() -> Result<Self> {
        let mut cfg = match env::var("PARKING_CONFIG") {
            Ok(path) => Self::from_file(&path)?,
            Err(_) => Self::default(),
        };
        cfg.apply_env(|key| env::var(key).ok())?;
        Ok(cfg)
    }

    pub fn from_file(path: &str) -> Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("failed to read config at {}", path))?;
        serde_json::from_str(&data).with_context(|| format!("invalid config JSON in {}", path))
    }

    pub fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(port) = var("PORT") {
            self.port = port
                .parse()
                .with_context(|| format!("invalid PORT '{}'", port))?;
        }
        if let Some(dir) = var("ARTIFACTS_DIR") {
            self.artifacts_dir = PathBuf::from(dir);
        }
        if var("LOG_PRED").as_deref() == Some("1") {
            self.log_features = true;
        }
        Ok(())
    }

    /// Relative artifact paths are taken relative to `artifacts_dir`.
    pub fn artifact(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.artifacts_dir.join(path)
        }
    }
}
