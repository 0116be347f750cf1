//! Configuration management for mull
//!
//! This module provides the repository-level settings: report guard thresholds,
//! loop pacing, and where the workspace and versioned reports live.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::{MullError, Result};

/// Repository-level mull configuration
///
/// Loaded from `.mull/config.toml` in the project root.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MullConfig {
    /// Report guard thresholds
    #[serde(default)]
    pub guard: GuardConfig,

    /// Loop pacing
    #[serde(default)]
    pub loop_settings: LoopSettings,

    /// Workspace and output locations
    #[serde(default)]
    pub paths: PathsConfig,
}

/// Thresholds for the two report guards
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuardConfig {
    /// Guard 1: new perspectives required since the last report
    #[serde(default = "default_min_conversations")]
    pub min_conversations_for_report: usize,

    /// Guard 2: Jaccard distance (0.0 - 1.0) that counts as a shift
    #[serde(default = "default_shift_threshold")]
    pub shift_detection_threshold: f64,

    /// Below this many current themes a shift is not yet measurable
    #[serde(default = "default_min_perspectives")]
    pub min_perspectives_for_shift_detection: usize,
}

/// Loop pacing parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoopSettings {
    /// Sleep between iterations
    #[serde(default = "default_iteration_sleep")]
    pub iteration_sleep_seconds: u64,

    /// Stop after this many iterations (0 = run until interrupted)
    #[serde(default)]
    pub max_iterations: usize,
}

/// Directory layout, relative to the project root unless absolute
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// State and collected perspectives
    #[serde(default = "default_workspace_dir")]
    pub workspace_dir: PathBuf,

    /// Versioned reports and the evolution log
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

// Default value providers
fn default_min_conversations() -> usize {
    3
}

fn default_shift_threshold() -> f64 {
    0.3
}

fn default_min_perspectives() -> usize {
    5
}

fn default_iteration_sleep() -> u64 {
    600
}

fn default_workspace_dir() -> PathBuf {
    PathBuf::from("workspace")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

impl MullConfig {
    /// Load configuration from `.mull/config.toml` or use defaults
    pub fn load_or_default(root: &Path) -> Result<Self> {
        let config_path = Self::config_path(root);

        let config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content)
                .map_err(|e| MullError::Config(format!("Failed to parse config file: {}", e)))?
        } else {
            Self::default()
        };

        config.validate()?;
        Ok(config)
    }

    /// Write default configuration to `.mull/config.toml`
    pub fn write_default(root: &Path) -> Result<()> {
        let config_path = Self::config_path(root);
        if let Some(dir) = config_path.parent() {
            std::fs::create_dir_all(dir)?;
        }

        let content = toml::to_string_pretty(&Self::default())
            .map_err(|e| MullError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }

    pub fn config_path(root: &Path) -> PathBuf {
        root.join(".mull/config.toml")
    }

    /// Reject thresholds the guard cannot interpret
    pub fn validate(&self) -> Result<()> {
        let threshold = self.guard.shift_detection_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(MullError::Config(format!(
                "shift_detection_threshold must be within [0, 1], got {}",
                threshold
            )));
        }
        Ok(())
    }

    pub fn workspace_dir(&self, root: &Path) -> PathBuf {
        root.join(&self.paths.workspace_dir)
    }

    pub fn output_dir(&self, root: &Path) -> PathBuf {
        root.join(&self.paths.output_dir)
    }

    pub fn perspectives_dir(&self, root: &Path) -> PathBuf {
        self.workspace_dir(root).join("perspectives")
    }

    pub fn state_file(&self, root: &Path) -> PathBuf {
        self.workspace_dir(root).join("state.json")
    }

    pub fn exploration_log(&self, root: &Path) -> PathBuf {
        self.workspace_dir(root).join("exploration.log")
    }

    pub fn evolution_log(&self, root: &Path) -> PathBuf {
        self.output_dir(root).join("evolution_log.json")
    }
}

impl Default for MullConfig {
    fn default() -> Self {
        Self {
            guard: GuardConfig::default(),
            loop_settings: LoopSettings::default(),
            paths: PathsConfig::default(),
        }
    }
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            min_conversations_for_report: default_min_conversations(),
            shift_detection_threshold: default_shift_threshold(),
            min_perspectives_for_shift_detection: default_min_perspectives(),
        }
    }
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self {
            iteration_sleep_seconds: default_iteration_sleep(),
            max_iterations: 0,
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            workspace_dir: default_workspace_dir(),
            output_dir: default_output_dir(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config = MullConfig::default();
        assert_eq!(config.guard.min_conversations_for_report, 3);
        assert_eq!(config.guard.shift_detection_threshold, 0.3);
        assert_eq!(config.guard.min_perspectives_for_shift_detection, 5);
        assert_eq!(config.loop_settings.iteration_sleep_seconds, 600);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let config = MullConfig::load_or_default(dir.path()).unwrap();
        assert_eq!(config.guard.min_conversations_for_report, 3);
    }

    #[test]
    fn test_write_then_load() {
        let dir = tempdir().unwrap();
        MullConfig::write_default(dir.path()).unwrap();
        assert!(MullConfig::config_path(dir.path()).exists());

        let config = MullConfig::load_or_default(dir.path()).unwrap();
        assert_eq!(config.paths.workspace_dir, PathBuf::from("workspace"));
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join(".mull")).unwrap();
        std::fs::write(
            MullConfig::config_path(dir.path()),
            "[guard]\nmin_conversations_for_report = 20\n",
        )
        .unwrap();

        let config = MullConfig::load_or_default(dir.path()).unwrap();
        assert_eq!(config.guard.min_conversations_for_report, 20);
        assert_eq!(config.guard.shift_detection_threshold, 0.3);
        assert_eq!(config.loop_settings.max_iterations, 0);
    }

    #[test]
    fn test_threshold_out_of_range_rejected() {
        let dir = tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join(".mull")).unwrap();
        std::fs::write(
            MullConfig::config_path(dir.path()),
            "[guard]\nshift_detection_threshold = 1.5\n",
        )
        .unwrap();

        let err = MullConfig::load_or_default(dir.path()).unwrap_err();
        assert!(matches!(err, MullError::Config(_)));
    }

    #[test]
    fn test_derived_paths() {
        let config = MullConfig::default();
        let root = Path::new("/tmp/project");
        assert_eq!(
            config.perspectives_dir(root),
            PathBuf::from("/tmp/project/workspace/perspectives")
        );
        assert_eq!(
            config.evolution_log(root),
            PathBuf::from("/tmp/project/output/evolution_log.json")
        );
    }
}
