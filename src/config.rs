//! Configuration management for patchgrid

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::grid::GridConfig;
use crate::sampler::SamplerConfig;
use crate::workflow::Workflow;

/// Default scoring settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct QualityConfig {
    /// Workflow key; unknown keys fall back to DCP
    pub workflow: String,
    /// Captures are film negatives
    pub negative: bool,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            workflow: Workflow::DEFAULT.as_str().to_string(),
            negative: false,
        }
    }
}

impl QualityConfig {
    /// Effective workflow after key resolution and film conversion
    pub fn workflow(&self) -> Workflow {
        let (workflow, _) = Workflow::resolve(&self.workflow);
        workflow.for_film(self.negative)
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub sampler: SamplerConfig,

    #[serde(default)]
    pub grid: GridConfig,

    #[serde(default)]
    pub quality: QualityConfig,
}

impl Config {
    /// Load configuration from a file, or create default if it doesn't exist
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {:?}", path))?;
            let config: Config = toml::from_str(&content)
                .with_context(|| format!("Failed to parse config from {:?}", path))?;
            tracing::info!("Loaded configuration from {:?}", path);
            Ok(config)
        } else {
            let config = Config::default();
            config.save(path)?;
            tracing::info!("Created default configuration at {:?}", path);
            Ok(config)
        }
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .context("Failed to serialize configuration")?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory {:?}", parent))?;
        }

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config to {:?}", path))?;

        tracing::info!("Saved configuration to {:?}", path);
        Ok(())
    }
}
