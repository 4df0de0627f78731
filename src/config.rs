use serde::{Deserialize, Serialize};

use crate::error::{Result, WatchtowerError};

/// Configuration for a monitoring session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Loop score at or above which a step is considered alerting (0.0-1.0)
    #[serde(default = "default_threshold")]
    pub threshold: f64,
    /// Number of recent steps analysed for repetition
    #[serde(default = "default_window_size")]
    pub window_size: usize,
    /// Steps that must be processed before the hero alert may fire
    #[serde(default = "default_min_steps")]
    pub min_steps: usize,
    /// Consecutive pattern repetitions required before the hero alert may fire
    #[serde(default = "default_min_repeats")]
    pub min_repeats: usize,
    /// Suppress human-facing output (callbacks still fire)
    #[serde(default)]
    pub silent: bool,
    /// Framework name shown in the start banner
    #[serde(default = "default_framework")]
    pub framework: String,
}

fn default_threshold() -> f64 {
    0.7
}

fn default_window_size() -> usize {
    10
}

fn default_min_steps() -> usize {
    5
}

fn default_min_repeats() -> usize {
    3
}

fn default_framework() -> String {
    "LangGraph".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
            window_size: default_window_size(),
            min_steps: default_min_steps(),
            min_repeats: default_min_repeats(),
            silent: false,
            framework: default_framework(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(WatchtowerError::ConfigFileError)?;
        toml::from_str(&content).map_err(|e| WatchtowerError::ConfigError(e.to_string()))
    }

    /// Merge CLI arguments into this configuration
    /// CLI arguments take precedence over config file values
    pub fn merge_cli_args(
        &mut self,
        threshold: Option<f64>,
        window_size: Option<usize>,
        min_steps: Option<usize>,
        silent: bool,
    ) {
        if let Some(t) = threshold {
            self.threshold = t;
        }
        if let Some(w) = window_size {
            self.window_size = w;
        }
        if let Some(m) = min_steps {
            self.min_steps = m;
        }
        if silent {
            self.silent = true;
        }
    }

    /// Check value ranges before a session starts
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(WatchtowerError::ConfigError(format!(
                "threshold must be between 0.0 and 1.0, got {}",
                self.threshold
            )));
        }
        if self.window_size < 3 {
            return Err(WatchtowerError::ConfigError(format!(
                "window_size must be at least 3, got {}",
                self.window_size
            )));
        }
        if self.min_steps < 1 {
            return Err(WatchtowerError::ConfigError(
                "min_steps must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.threshold, 0.7);
        assert_eq!(config.window_size, 10);
        assert_eq!(config.min_steps, 5);
        assert_eq!(config.min_repeats, 3);
        assert!(!config.silent);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: Config = toml::from_str("threshold = 0.9\nsilent = true").unwrap();
        assert_eq!(config.threshold, 0.9);
        assert!(config.silent);
        assert_eq!(config.window_size, 10);
        assert_eq!(config.framework, "LangGraph");
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("watchtower.toml");
        std::fs::write(&path, "window_size = 6\nmin_steps = 2\n").unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.window_size, 6);
        assert_eq!(config.min_steps, 2);
    }

    #[test]
    fn test_from_missing_file() {
        let result = Config::from_file(std::path::Path::new("/nonexistent/watchtower.toml"));
        assert!(matches!(result, Err(WatchtowerError::ConfigFileError(_))));
    }

    #[test]
    fn test_cli_args_take_precedence() {
        let mut config = Config {
            threshold: 0.5,
            ..Config::default()
        };
        config.merge_cli_args(Some(0.8), None, Some(3), false);
        assert_eq!(config.threshold, 0.8);
        assert_eq!(config.window_size, 10);
        assert_eq!(config.min_steps, 3);
        assert!(!config.silent);
    }

    #[test]
    fn test_validate_rejects_out_of_range() {
        let bad_threshold = Config {
            threshold: 1.5,
            ..Config::default()
        };
        assert!(bad_threshold.validate().is_err());

        let small_window = Config {
            window_size: 2,
            ..Config::default()
        };
        assert!(small_window.validate().is_err());

        let zero_min_steps = Config {
            min_steps: 0,
            ..Config::default()
        };
        assert!(zero_min_steps.validate().is_err());
    }
}
