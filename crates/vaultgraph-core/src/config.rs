//! Engine configuration.
//!
//! Follows a builder pattern for complex configuration with validation.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default on-disk location of the content store
pub const DEFAULT_DATABASE_PATH: &str = "~/.config/vaultgraph/vault.db";

/// Configuration shared by ingestion, resolution and graph analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Store location; `None` keeps the store in memory
    pub database_path: Option<PathBuf>,
    /// Subdirectory that marks a directory as a vault
    pub marker_dir: String,
    /// Extension of note files, without the dot
    pub note_extension: String,
    /// Notes written per ingestion batch
    pub batch_size: usize,

    // Derived view defaults
    pub hub_threshold: usize,
    pub cluster_min_size: usize,
    pub neighborhood_radius: usize,

    // PageRank tuning
    pub pagerank_damping: f64,
    pub pagerank_max_iterations: usize,
    pub pagerank_tolerance: f64,

    pub log_level: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            database_path: Some(PathBuf::from(DEFAULT_DATABASE_PATH)),
            marker_dir: ".obsidian".to_string(),
            note_extension: "md".to_string(),
            batch_size: 50,
            hub_threshold: 10,
            cluster_min_size: 3,
            neighborhood_radius: 1,
            pagerank_damping: 0.85,
            pagerank_max_iterations: 100,
            pagerank_tolerance: 1e-6,
            log_level: "INFO".to_string(),
        }
    }
}

impl EngineConfig {
    /// Create new configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a builder from defaults
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::new()
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(Error::config_error("batch_size must be greater than zero"));
        }

        if !(self.pagerank_damping > 0.0 && self.pagerank_damping < 1.0) {
            return Err(Error::config_error(format!(
                "pagerank_damping must be in (0, 1), got {}",
                self.pagerank_damping
            )));
        }

        if self.pagerank_max_iterations == 0 {
            return Err(Error::config_error(
                "pagerank_max_iterations must be greater than zero",
            ));
        }

        if self.pagerank_tolerance.is_nan() || self.pagerank_tolerance <= 0.0 {
            return Err(Error::config_error("pagerank_tolerance must be positive"));
        }

        let extension = self.note_extension.trim_start_matches('.');
        if extension.is_empty() {
            return Err(Error::config_error("note_extension cannot be empty"));
        }

        if self.marker_dir.is_empty() || self.marker_dir.contains(['/', '\\']) {
            return Err(Error::config_error(format!(
                "marker_dir must be a single directory name, got {:?}",
                self.marker_dir
            )));
        }

        Ok(())
    }

    /// Note extension without a leading dot
    pub fn extension(&self) -> &str {
        self.note_extension.trim_start_matches('.')
    }

    /// Whether the store should live in memory
    pub fn is_in_memory(&self) -> bool {
        self.database_path.is_none()
    }

    /// Database path with `~` and environment variables expanded
    pub fn resolved_database_path(&self) -> Option<PathBuf> {
        self.database_path.as_deref().map(expand_path)
    }

    /// Save configuration to a YAML file
    pub async fn save(&self, path: &Path) -> Result<()> {
        let yaml = serde_yaml::to_string(self)
            .map_err(|e| Error::config_error(format!("Failed to serialize config: {}", e)))?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        tokio::fs::write(path, yaml).await.map_err(|e| {
            Error::config_error(format!(
                "Failed to save config to {}: {}",
                path.display(),
                e
            ))
        })
    }

    /// Load configuration from a YAML file; a missing file yields defaults
    pub async fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            Error::config_error(format!(
                "Failed to load config from {}: {}",
                path.display(),
                e
            ))
        })?;

        let config: Self = serde_yaml::from_str(&content)
            .map_err(|e| Error::config_error(format!("Invalid configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }
}

/// Expand `~` and `$VARS` in a path, leaving it untouched on failure
pub fn expand_path(path: &Path) -> PathBuf {
    let raw = path.to_string_lossy();
    match shellexpand::full(&raw) {
        Ok(expanded) => PathBuf::from(expanded.into_owned()),
        Err(e) => {
            log::warn!("Could not expand {}: {}", raw, e);
            path.to_path_buf()
        }
    }
}

/// Builder for EngineConfig
#[derive(Debug, Clone, Default)]
pub struct EngineConfigBuilder {
    config: EngineConfig,
}

impl EngineConfigBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self::default()
    }

    pub fn database_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.database_path = Some(path.into());
        self
    }

    /// Keep the store in memory
    pub fn in_memory(mut self) -> Self {
        self.config.database_path = None;
        self
    }

    pub fn marker_dir(mut self, marker: impl Into<String>) -> Self {
        self.config.marker_dir = marker.into();
        self
    }

    pub fn note_extension(mut self, extension: impl Into<String>) -> Self {
        self.config.note_extension = extension.into();
        self
    }

    pub fn batch_size(mut self, size: usize) -> Self {
        self.config.batch_size = size;
        self
    }

    pub fn hub_threshold(mut self, threshold: usize) -> Self {
        self.config.hub_threshold = threshold;
        self
    }

    pub fn cluster_min_size(mut self, size: usize) -> Self {
        self.config.cluster_min_size = size;
        self
    }

    pub fn neighborhood_radius(mut self, radius: usize) -> Self {
        self.config.neighborhood_radius = radius;
        self
    }

    pub fn pagerank_damping(mut self, damping: f64) -> Self {
        self.config.pagerank_damping = damping;
        self
    }

    pub fn pagerank_max_iterations(mut self, iterations: usize) -> Self {
        self.config.pagerank_max_iterations = iterations;
        self
    }

    pub fn pagerank_tolerance(mut self, tolerance: f64) -> Self {
        self.config.pagerank_tolerance = tolerance;
        self
    }

    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.config.log_level = level.into();
        self
    }

    /// Build and validate
    pub fn build(self) -> Result<EngineConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_are_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.batch_size, 50);
        assert_eq!(config.hub_threshold, 10);
        assert_eq!(config.cluster_min_size, 3);
        assert_eq!(config.extension(), "md");
        assert!(!config.is_in_memory());
    }

    #[test]
    fn test_builder_validation() {
        assert!(EngineConfig::builder().batch_size(0).build().is_err());
        assert!(EngineConfig::builder().pagerank_damping(1.0).build().is_err());
        assert!(EngineConfig::builder().note_extension(".").build().is_err());
        assert!(EngineConfig::builder().marker_dir("a/b").build().is_err());

        let config = EngineConfig::builder()
            .in_memory()
            .note_extension(".markdown")
            .batch_size(5)
            .build()
            .unwrap();
        assert!(config.is_in_memory());
        assert_eq!(config.extension(), "markdown");
    }

    #[test]
    fn test_tilde_expansion() {
        let config = EngineConfig::default();
        let resolved = config.resolved_database_path().unwrap();
        if std::env::var_os("HOME").is_some() {
            assert!(!resolved.to_string_lossy().starts_with('~'));
        }
        assert!(resolved.ends_with("vaultgraph/vault.db"));
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("config.yaml");

        let config = EngineConfig::builder()
            .database_path(temp.path().join("db.sqlite"))
            .hub_threshold(4)
            .build()
            .unwrap();
        config.save(&path).await.unwrap();

        let loaded = EngineConfig::load(&path).await.unwrap();
        assert_eq!(loaded, config);
    }

    #[tokio::test]
    async fn test_load_missing_file_yields_defaults() {
        let temp = TempDir::new().unwrap();
        let loaded = EngineConfig::load(&temp.path().join("absent.yaml"))
            .await
            .unwrap();
        assert_eq!(loaded, EngineConfig::default());
    }

    #[tokio::test]
    async fn test_load_partial_file_fills_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.yaml");
        tokio::fs::write(&path, "batch_size: 7\n").await.unwrap();

        let loaded = EngineConfig::load(&path).await.unwrap();
        assert_eq!(loaded.batch_size, 7);
        assert_eq!(loaded.marker_dir, ".obsidian");
    }
}
