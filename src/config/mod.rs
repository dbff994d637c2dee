//! Explorer configuration.
//!
//! Settings are read from an optional JSON file; every key may be omitted and
//! falls back to [`ExplorerConfig::default`]. Command-line flags override
//! whatever the file provides.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::corpus::Corpus;
use crate::query::OrderKey;

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration file is not valid JSON for this schema
    #[error("Failed to parse config file: {0}")]
    Parse(String),

    /// A setting has an unusable value
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Runtime settings for the explorer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplorerConfig {
    /// JSONL corpus file
    pub data_path: PathBuf,

    /// Maximum number of hits shown per query
    pub max_results: usize,

    /// Ordering used when the caller does not choose one
    pub default_order: OrderKey,

    /// Runs tried in order when picking the initial clustering run
    pub preferred_runs: Vec<String>,

    /// Highest tag rank offered for rank windows
    pub tag_rank_limit: usize,

    /// Default 1-based inclusive tag rank window
    pub default_tag_window: [usize; 2],
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("out/merged_for_app.jsonl"),
            max_results: 200,
            default_order: OrderKey::NewestFirst,
            preferred_runs: ["leaf_0.55", "leaf_0.5", "leaf_0.6", "leaf", "eom"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            tag_rank_limit: 200,
            default_tag_window: [1, 20],
        }
    }
}

impl ExplorerConfig {
    /// Load and validate a configuration file.
    pub async fn from_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        info!("Loading config from {}", path.display());

        let contents = tokio::fs::read_to_string(path).await?;
        let config = Self::from_json(&contents)?;
        debug!("Loaded config: {:?}", config);
        Ok(config)
    }

    /// Parse and validate configuration from a JSON string.
    pub fn from_json(contents: &str) -> ConfigResult<Self> {
        let config: Self =
            serde_json::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check that every setting is usable.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.max_results == 0 {
            return Err(ConfigError::Invalid(
                "max_results must be at least 1".to_string(),
            ));
        }
        if self.tag_rank_limit == 0 {
            return Err(ConfigError::Invalid(
                "tag_rank_limit must be at least 1".to_string(),
            ));
        }
        let [start, end] = self.default_tag_window;
        if start == 0 || start > end {
            return Err(ConfigError::Invalid(format!(
                "default_tag_window [{}, {}] must satisfy 1 <= start <= end",
                start, end
            )));
        }
        Ok(())
    }

    /// The default tag window, with its end capped at `tag_rank_limit`.
    pub fn tag_window(&self) -> (usize, usize) {
        let [start, end] = self.default_tag_window;
        (start, end.min(self.tag_rank_limit))
    }

    /// Pick the run a session starts with: the first preferred run present
    /// in the corpus, otherwise the alphabetically first run.
    pub fn pick_default_run<'a>(&self, corpus: &'a Corpus) -> Option<&'a str> {
        self.preferred_runs
            .iter()
            .find_map(|preferred| corpus.runs().find(|run| *run == preferred.as_str()))
            .or_else(|| corpus.runs().next())
    }
}
