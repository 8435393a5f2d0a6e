//! Dashboard configuration.
//!
//! Every field has a default so an empty TOML file (or no file at all) is a
//! valid configuration.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::Result;

#[derive(Debug, Clone, Deserialize)]
pub struct DashboardConfig {
    /// Directory the two data files are resolved against.
    #[serde(default = "default_base_path")]
    pub base_path: PathBuf,

    #[serde(default = "default_metrics_file")]
    pub metrics_file: String,

    #[serde(default = "default_testing_file")]
    pub testing_file: String,

    /// strftime format of the `date` column in both files.
    #[serde(default = "default_date_format")]
    pub date_format: String,
}

fn default_base_path() -> PathBuf {
    PathBuf::from(".")
}

fn default_metrics_file() -> String {
    "covid_main_database.csv".to_string()
}

fn default_testing_file() -> String {
    "covid_second_database.csv".to_string()
}

fn default_date_format() -> String {
    "%Y-%m-%d".to_string()
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            base_path: default_base_path(),
            metrics_file: default_metrics_file(),
            testing_file: default_testing_file(),
            date_format: default_date_format(),
        }
    }
}

impl DashboardConfig {
    pub fn with_base_path(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
            ..Self::default()
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load from a TOML file. A relative `base_path` inside the file is
    /// resolved against the file's own directory.
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut config = Self::from_toml_str(&content)?;
        if config.base_path.is_relative() {
            if let Some(parent) = path.parent() {
                config.base_path = parent.join(&config.base_path);
            }
        }
        tracing::debug!(path = %path.display(), base_path = %config.base_path.display(), "Loaded dashboard config");
        Ok(config)
    }

    pub fn metrics_path(&self) -> PathBuf {
        self.base_path.join(&self.metrics_file)
    }

    pub fn testing_path(&self) -> PathBuf {
        self.base_path.join(&self.testing_file)
    }
}
