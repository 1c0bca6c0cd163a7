// ABOUTME: Configuration management for the ctmpl application
// ABOUTME: Handles loading and merging configuration from files and environment variables

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::kv::config::parse_bool;
use crate::kv::ConsulConfig;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub consul: ConsulConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Hold output until the whole template rendered
    #[serde(default)]
    pub buffered: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from file path or default locations
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        let config_path = match path {
            Some(p) if !p.exists() => {
                anyhow::bail!("Configuration file not found: {}", p.display())
            }
            Some(p) => Some(p),
            None => Self::find_config_file(),
        };

        let mut config = match config_path {
            Some(config_path) => Self::from_file(&config_path)?,
            None => Config::default(),
        };

        config.merge_env()?;
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Reading configuration {}", path.display()))?;
        serde_yaml::from_str(&contents)
            .with_context(|| format!("Parsing configuration {}", path.display()))
    }

    /// Find configuration file in standard locations
    fn find_config_file() -> Option<PathBuf> {
        let possible_paths = [
            PathBuf::from("ctmpl.yaml"),
            PathBuf::from("ctmpl.yml"),
            PathBuf::from(".ctmpl.yaml"),
            PathBuf::from(".ctmpl.yml"),
        ];

        if let Some(path) = possible_paths.into_iter().find(|p| p.exists()) {
            return Some(path);
        }

        dirs::home_dir()
            .map(|home| home.join(".ctmpl").join("config.yaml"))
            .filter(|p| p.exists())
    }

    /// Merge environment variables into configuration
    fn merge_env(&mut self) -> Result<()> {
        self.merge_env_with(|name| std::env::var(name).ok())
    }

    fn merge_env_with<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(level) = lookup("CTMPL_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = lookup("CTMPL_LOG_FORMAT") {
            self.logging.format = format;
        }
        if let Some(buffered) = lookup("CTMPL_BUFFERED") {
            self.output.buffered = parse_bool(&buffered)
                .with_context(|| format!("Invalid CTMPL_BUFFERED value {:?}", buffered))?;
        }

        self.consul.merge_env_with(lookup);
        Ok(())
    }
}
