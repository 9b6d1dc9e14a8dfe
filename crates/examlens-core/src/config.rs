use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{ExamLensError, Result};

/// Top-level configuration for ExamLens.
///
/// Loaded from `~/.examlens/config.toml` by default. The clustering and
/// priority sections are handed to the orchestrator as an immutable value
/// per run, so concurrent scopes never share mutable tuning state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExamLensConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub clustering: ClusteringConfig,
    #[serde(default)]
    pub priority: PriorityConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

impl ExamLensConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read, parsed, or fails validation.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: ExamLensConfig = toml::from_str(&content)?;
        config.validate()?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }

    /// Check value ranges and cross-field constraints.
    pub fn validate(&self) -> Result<()> {
        self.clustering.validate()?;
        self.priority.validate()
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Data directory for the SQLite database.
    pub data_dir: String,
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            data_dir: "~/.examlens/data".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// Which similarity backend a run may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendPreference {
    /// Embeddings when every question in scope carries one, keywords otherwise.
    Auto,
    /// Always use keyword overlap, even when embeddings are present.
    Keyword,
}

/// Similarity thresholds and display bounds for the clustering engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusteringConfig {
    /// Minimum Jaccard overlap for two questions to be linked.
    pub keyword_threshold: f64,
    /// Minimum cosine similarity for two questions to be linked.
    pub embedding_threshold: f64,
    /// Average similarity at which a cluster counts as a duplicate set.
    pub duplicate_threshold: f64,
    /// Maximum characters kept in a cluster's representative text.
    pub representative_max_chars: usize,
    /// Maximum characters kept in a cluster's topic name.
    pub topic_name_max_chars: usize,
    pub backend: BackendPreference,
    /// Expected embedding dimension. `None` accepts any uniform dimension.
    pub embedding_dim: Option<usize>,
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            keyword_threshold: 0.70,
            embedding_threshold: 0.75,
            duplicate_threshold: 0.95,
            representative_max_chars: 200,
            topic_name_max_chars: 80,
            backend: BackendPreference::Auto,
            embedding_dim: None,
        }
    }
}

impl ClusteringConfig {
    fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("keyword_threshold", self.keyword_threshold),
            ("embedding_threshold", self.embedding_threshold),
            ("duplicate_threshold", self.duplicate_threshold),
        ] {
            if !(value > 0.0 && value <= 1.0) {
                return Err(ExamLensError::Config(format!(
                    "clustering.{} must be in (0, 1], got {}",
                    name, value
                )));
            }
        }
        if self.representative_max_chars == 0 || self.topic_name_max_chars == 0 {
            return Err(ExamLensError::Config(
                "clustering display lengths must be non-zero".to_string(),
            ));
        }
        if self.embedding_dim == Some(0) {
            return Err(ExamLensError::Config(
                "clustering.embedding_dim must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Repetition cutoffs for the four priority tiers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PriorityConfig {
    /// Minimum repetitions for Tier 1 (top priority).
    pub tier_1_min: u32,
    /// Minimum repetitions for Tier 2 (high priority).
    pub tier_2_min: u32,
    /// Minimum repetitions for Tier 3 (medium priority).
    pub tier_3_min: u32,
    /// A topic is evergreen when its years span more than this many years.
    pub recency_window_years: u32,
}

impl Default for PriorityConfig {
    fn default() -> Self {
        Self {
            tier_1_min: 4,
            tier_2_min: 3,
            tier_3_min: 2,
            recency_window_years: 2,
        }
    }
}

impl PriorityConfig {
    fn validate(&self) -> Result<()> {
        if self.tier_3_min < 2 {
            return Err(ExamLensError::Config(format!(
                "priority.tier_3_min must be at least 2, got {}",
                self.tier_3_min
            )));
        }
        if !(self.tier_1_min > self.tier_2_min && self.tier_2_min > self.tier_3_min) {
            return Err(ExamLensError::Config(format!(
                "priority cutoffs must be strictly decreasing, got {} / {} / {}",
                self.tier_1_min, self.tier_2_min, self.tier_3_min
            )));
        }
        Ok(())
    }
}

/// Storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite file name, relative to `general.data_dir`.
    pub db_file: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_file: "examlens.db".to_string(),
        }
    }
}
