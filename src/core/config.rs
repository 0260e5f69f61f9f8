//! Configuration module for token-locker
//!
//! Manages user configuration including classifier settings.
//! Configuration is stored in `config.toml` inside the vault directory.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::core::classifier::{CandidateMatch, Category};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Classifier-specific settings
    pub classifier: ClassifierSettings,
}

/// Settings for credential reporting surfaces (`scan`, add-time tagging).
/// The classification engine itself is unconfigurable; these settings
/// only filter what gets reported.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierSettings {
    /// Whether scanning is enabled at all
    pub enabled: bool,

    /// Candidates below this confidence are not reported
    pub min_confidence: f32,

    /// Include heuristic (generic) findings, not just recognized providers
    pub heuristics: bool,

    /// Maximum number of candidates to report per scan (0 = no limit)
    pub max_matches: usize,
}

impl Default for ClassifierSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            min_confidence: 0.5,
            heuristics: true,
            max_matches: 100,
        }
    }
}

impl ClassifierSettings {
    /// Filters raw classifier output down to what should be reported.
    pub fn apply(&self, candidates: Vec<CandidateMatch>) -> Vec<CandidateMatch> {
        if !self.enabled {
            return Vec::new();
        }
        let limit = if self.max_matches == 0 {
            usize::MAX
        } else {
            self.max_matches
        };
        candidates
            .into_iter()
            .filter(|c| c.confidence >= self.min_confidence)
            .filter(|c| self.heuristics || c.category != Category::Generic)
            .take(limit)
            .collect()
    }
}

impl Config {
    /// Load configuration from the vault directory
    /// Creates default config if it doesn't exist
    pub fn load(vault_dir: &Path) -> Result<Self> {
        let config_path = vault_dir.join("config.toml");

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = toml::from_str(&content).unwrap_or_else(|e| {
                eprintln!(
                    "Warning: Failed to parse config.toml: {}. Using defaults.",
                    e
                );
                Config::default()
            });
            Ok(config)
        } else {
            // Create default config file for user reference
            let config = Config::default();
            config.save(vault_dir)?;
            Ok(config)
        }
    }

    /// Load configuration if a vault exists, otherwise fall back to
    /// defaults without touching the filesystem. Lets `scan` run before
    /// any vault is initialized.
    pub fn load_or_default(vault_dir: &Path) -> Self {
        if vault_dir.join("config.toml").exists() {
            Self::load(vault_dir).unwrap_or_default()
        } else {
            Self::default()
        }
    }

    /// Save configuration to the vault directory
    pub fn save(&self, vault_dir: &Path) -> Result<()> {
        let config_path = vault_dir.join("config.toml");
        let content = Self::generate_config_with_comments(self)?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }

    /// Generate TOML content with helpful comments
    fn generate_config_with_comments(config: &Config) -> Result<String> {
        let toml_content = toml::to_string_pretty(config)?;

        let header = r#"# Token-Locker Configuration
#
# This file controls the behavior of token-locker.
# Edit these settings to customize credential scanning.

"#;

        let classifier_comment = r#"
# Credential Scan Settings
# The scanner reports substrings that look like API credentials.
#
# Tips:
#   - Raise min_confidence to silence heuristic findings
#   - Set heuristics = false to only report recognized provider formats
#   - Set enabled = false to disable scanning entirely

"#;

        let content = format!("{}{}{}", header, classifier_comment, toml_content);

        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::classifier::classify;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.classifier.enabled);
        assert!(config.classifier.heuristics);
        assert_eq!(config.classifier.max_matches, 100);
        assert!((config.classifier.min_confidence - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn test_config_save_load() {
        let dir = TempDir::new().unwrap();
        let config = Config {
            classifier: ClassifierSettings {
                min_confidence: 0.8,
                heuristics: false,
                ..Default::default()
            },
        };

        config.save(dir.path()).unwrap();
        let loaded = Config::load(dir.path()).unwrap();

        assert!((loaded.classifier.min_confidence - 0.8).abs() < f32::EPSILON);
        assert!(!loaded.classifier.heuristics);
    }

    #[test]
    fn test_load_creates_default_file() {
        let dir = TempDir::new().unwrap();

        Config::load(dir.path()).unwrap();

        assert!(dir.path().join("config.toml").exists());
    }

    #[test]
    fn test_load_or_default_without_vault() {
        let dir = TempDir::new().unwrap();

        let config = Config::load_or_default(dir.path());

        assert!(config.classifier.enabled);
        assert!(!dir.path().join("config.toml").exists());
    }

    #[test]
    fn test_apply_filters_by_confidence() {
        let settings = ClassifierSettings {
            min_confidence: 0.9,
            ..Default::default()
        };
        // One exact match (0.95) and one heuristic match (0.6).
        let candidates = classify(
            "sk-abcdEFGH12345678901234 and deploy_9f8e7d6c5b4a3f2e1d0c9b8a",
        );
        assert_eq!(candidates.len(), 2);

        let reported = settings.apply(candidates);

        assert_eq!(reported.len(), 1);
        assert_eq!(reported[0].provider, "OpenAI");
    }

    #[test]
    fn test_apply_disabled_reports_nothing() {
        let settings = ClassifierSettings {
            enabled: false,
            ..Default::default()
        };

        let reported = settings.apply(classify("sk-abcdEFGH12345678901234"));

        assert!(reported.is_empty());
    }

    #[test]
    fn test_apply_heuristics_toggle() {
        let settings = ClassifierSettings {
            heuristics: false,
            ..Default::default()
        };

        let reported = settings.apply(classify("deploy_9f8e7d6c5b4a3f2e1d0c9b8a"));

        assert!(reported.is_empty());
    }
}
