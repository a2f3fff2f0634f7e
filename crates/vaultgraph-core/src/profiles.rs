//! Pre-configured profiles for different deployment scenarios
//!
//! - Development: Verbose logging, small batches
//! - Production: Default tuning, on-disk store
//! - Testing: In-memory store, tiny batches, quiet logging

use crate::config::EngineConfig;

/// Profile selector for pre-configured deployments
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigProfile {
    /// Development: debug logging, frequent progress reports
    Development,
    /// Production: defaults tuned for large vaults
    Production,
    /// Testing: in-memory store, no disk side effects
    Testing,
}

impl ConfigProfile {
    /// Create an EngineConfig from this profile
    pub fn create_config(self) -> EngineConfig {
        let mut config = EngineConfig::new();

        match self {
            Self::Development => {
                config.log_level = "DEBUG".to_string();
                config.batch_size = 10; // progress after every few notes
            }

            Self::Production => {
                config.log_level = "INFO".to_string();
                config.batch_size = 50;
                config.pagerank_max_iterations = 200;
            }

            Self::Testing => {
                config.log_level = "WARN".to_string();
                config.database_path = None;
                config.batch_size = 2; // exercise batch boundaries
            }
        }

        config
    }

    /// Get profile name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
            Self::Testing => "testing",
        }
    }

    /// Parse profile from string
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "development" | "dev" => Some(Self::Development),
            "production" | "prod" => Some(Self::Production),
            "testing" | "test" => Some(Self::Testing),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profiles_validate() {
        for profile in [
            ConfigProfile::Development,
            ConfigProfile::Production,
            ConfigProfile::Testing,
        ] {
            assert!(profile.create_config().validate().is_ok(), "{}", profile.name());
            assert_eq!(ConfigProfile::parse(profile.name()), Some(profile));
        }
    }

    #[test]
    fn test_testing_profile_is_in_memory() {
        assert!(ConfigProfile::Testing.create_config().is_in_memory());
        assert!(!ConfigProfile::Production.create_config().is_in_memory());
    }

    #[test]
    fn test_parse_aliases() {
        assert_eq!(ConfigProfile::parse("DEV"), Some(ConfigProfile::Development));
        assert_eq!(ConfigProfile::parse("staging"), None);
    }
}
