//! CLI configuration file.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use simplelog::LevelFilter;
use valmgr_lib::ManagerConfig;

use crate::error::CliError;

/// Contents of the optional `--config` JSON file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    pub manager: ManagerConfig,
    /// One of `off`, `error`, `warn`, `info`, `debug`, `trace`.
    pub log_level: String,
    /// Also write the log to this file.
    pub log_file: Option<PathBuf>,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            manager: ManagerConfig::default(),
            log_level: "info".to_string(),
            log_file: None,
        }
    }
}

impl CliConfig {
    /// Reads a config file. Missing keys fall back to defaults.
    pub fn load(path: &Path) -> Result<Self, CliError> {
        let text = fs::read_to_string(path).map_err(|source| CliError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| CliError::Config {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Parsed log level, raised by `verbosity` steps.
    pub fn level_filter(&self, verbosity: u8) -> Result<LevelFilter, CliError> {
        let base: LevelFilter = self
            .log_level
            .parse()
            .map_err(|_| CliError::LogLevel(self.log_level.clone()))?;
        let levels = [
            LevelFilter::Off,
            LevelFilter::Error,
            LevelFilter::Warn,
            LevelFilter::Info,
            LevelFilter::Debug,
            LevelFilter::Trace,
        ];
        let index = levels.iter().position(|l| *l == base).unwrap_or(3);
        let raised = (index + verbosity as usize).min(levels.len() - 1);
        Ok(levels[raised])
    }
}
