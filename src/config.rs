use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::cli::Cli;
use crate::core::edges::DEFAULT_EDGE_THRESHOLD;
use crate::core::mode::ProcessingMode;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

/// Pipeline settings: defaults, then the JSON file, then CLI flags
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub capture_width: u32,
    pub capture_height: u32,
    pub capture_fps: u32,
    pub row_padding: u32,
    pub edges_enabled: bool,
    pub edge_threshold: u16,
    pub show_hud: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            capture_width: 640,
            capture_height: 480,
            capture_fps: 30,
            row_padding: 0,
            edges_enabled: true,
            edge_threshold: DEFAULT_EDGE_THRESHOLD,
            show_hud: true,
        }
    }
}

impl PipelineConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// Resolve the full configuration for a command line
    pub fn from_cli(cli: &Cli) -> Result<Self, ConfigError> {
        let mut config = match &cli.config {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        config.apply_cli(cli);
        config.validate()?;
        Ok(config)
    }

    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(width) = cli.width {
            self.capture_width = width;
        }
        if let Some(height) = cli.height {
            self.capture_height = height;
        }
        if let Some(fps) = cli.fps {
            self.capture_fps = fps;
        }
        if let Some(padding) = cli.row_padding {
            self.row_padding = padding;
        }
        if let Some(threshold) = cli.threshold {
            self.edge_threshold = threshold;
        }
        if cli.raw {
            self.edges_enabled = false;
        }
        if cli.no_ui {
            self.show_hud = false;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capture_width == 0 {
            return Err(ConfigError::Zero("capture_width"));
        }
        if self.capture_height == 0 {
            return Err(ConfigError::Zero("capture_height"));
        }
        if self.capture_fps == 0 {
            return Err(ConfigError::Zero("capture_fps"));
        }
        Ok(())
    }

    pub fn initial_mode(&self) -> ProcessingMode {
        ProcessingMode::from_edges(self.edges_enabled)
    }
}
