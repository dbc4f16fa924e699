//! Configuration module for edgecast-server.
//!
//! Loads the TOML file, applies CLI overrides, validates, and converts the
//! sections into the core runtime configuration types.

pub mod file;

use crate::config::file::FileConfig;
use edgecast_core::config::{DetectorConfig, HubConfig, ScorerSpec};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("validation error: {0}")]
    ValidationError(String),
}

/// Fully validated configuration.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub listen: SocketAddr,
    pub detector: DetectorConfig,
    pub hub: HubConfig,
    pub alert_log: Option<PathBuf>,
}

/// Configuration loader that handles the complete loading process.
pub struct ConfigLoader {
    config_path: PathBuf,
    listen_override: Option<SocketAddr>,
}

impl ConfigLoader {
    pub fn new(config_path: impl AsRef<Path>, listen_override: Option<SocketAddr>) -> Self {
        Self {
            config_path: config_path.as_ref().to_path_buf(),
            listen_override,
        }
    }

    /// Load and process the configuration.
    ///
    /// A missing file is not an error: every section has defaults.
    pub fn load(&self) -> Result<LoadedConfig, ConfigError> {
        let file_config = match std::fs::read_to_string(&self.config_path) {
            Ok(content) => toml::from_str(&content)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(path = ?self.config_path, "Config file not found, using defaults");
                FileConfig::default()
            }
            Err(e) => return Err(e.into()),
        };
        self.build(file_config)
    }

    /// Apply overrides, validate and convert.
    pub fn build(&self, mut file_config: FileConfig) -> Result<LoadedConfig, ConfigError> {
        if let Some(listen) = self.listen_override {
            file_config.server.listen = listen;
        }

        validate(&file_config)?;

        let detector = DetectorConfig {
            buffer_capacity: file_config.detector.buffer_capacity,
            history_window: file_config.detector.history_window,
            evaluation: file_config.detector.evaluation,
            scorers: file_config.detector.scorers,
        };
        let hub = HubConfig {
            queue_capacity: file_config.hub.queue_capacity,
            heartbeat_timeout: Duration::from_secs(file_config.hub.heartbeat_timeout_secs),
            reap_interval: Duration::from_secs(file_config.hub.reap_interval_secs),
            metrics_interval: Duration::from_secs(file_config.hub.metrics_interval_secs),
        };

        Ok(LoadedConfig {
            listen: file_config.server.listen,
            detector,
            hub,
            alert_log: file_config.audit.path,
        })
    }
}

fn validate(config: &FileConfig) -> Result<(), ConfigError> {
    let invalid = |msg: String| Err(ConfigError::ValidationError(msg));

    if config.detector.buffer_capacity == 0 {
        return invalid("detector.buffer_capacity must be at least 1".into());
    }
    if config.hub.queue_capacity == 0 {
        return invalid("hub.queue_capacity must be at least 1".into());
    }
    for (name, secs) in [
        ("hub.heartbeat_timeout_secs", config.hub.heartbeat_timeout_secs),
        ("hub.reap_interval_secs", config.hub.reap_interval_secs),
        ("hub.metrics_interval_secs", config.hub.metrics_interval_secs),
    ] {
        if secs == 0 {
            return invalid(format!("{name} must be at least 1"));
        }
    }
    for spec in &config.detector.scorers {
        let threshold = spec.threshold();
        if !(0.0..=1.0).contains(&threshold) {
            return invalid(format!("scorer threshold {threshold} is outside [0, 1]"));
        }
        if spec.is_experimental() {
            tracing::warn!("Experimental scorer enabled, its alerts are randomized");
        }
        // Runs are counted inside the history window, and streaks shorter
        // than 2 are raised to 2.
        if let ScorerSpec::Streak { length, .. } = spec {
            let needed = (*length).max(2);
            if needed > config.detector.history_window {
                return invalid(format!(
                    "streak length {needed} exceeds detector.history_window {}",
                    config.detector.history_window
                ));
            }
        }
    }
    if config.detector.history_window == 0 {
        tracing::warn!("detector.history_window is 0, matchup history is disabled");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listen_override() {
        let loader = ConfigLoader::new("unused.toml", Some("127.0.0.1:9999".parse().unwrap()));
        let loaded = loader.build(FileConfig::default()).unwrap();
        assert_eq!(loaded.listen.port(), 9999);
        assert_eq!(loaded.hub.heartbeat_timeout, Duration::from_secs(60));
        assert_eq!(loaded.detector.history_window, 10);
    }

    #[test]
    fn test_rejects_zero_capacity() {
        let mut config = FileConfig::default();
        config.hub.queue_capacity = 0;
        let loader = ConfigLoader::new("unused.toml", None);
        assert!(matches!(
            loader.build(config),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_rejects_threshold_out_of_range() {
        let mut config = FileConfig::default();
        config.detector.scorers = vec![ScorerSpec::Revenge { threshold: 1.5 }];
        let loader = ConfigLoader::new("unused.toml", None);
        assert!(loader.build(config).is_err());
    }

    #[test]
    fn test_rejects_streak_longer_than_history() {
        let loader = ConfigLoader::new("unused.toml", None);

        let mut config = FileConfig::default();
        config.detector.history_window = 4;
        config.detector.scorers = vec![ScorerSpec::Streak { threshold: 0.5, length: 5 }];
        assert!(matches!(
            loader.build(config),
            Err(ConfigError::ValidationError(msg)) if msg.contains("history_window")
        ));

        let mut config = FileConfig::default();
        config.detector.history_window = 0;
        config.detector.scorers = vec![ScorerSpec::Streak { threshold: 0.5, length: 1 }];
        assert!(loader.build(config).is_err());

        let mut config = FileConfig::default();
        config.detector.history_window = 5;
        config.detector.scorers = vec![ScorerSpec::Streak { threshold: 0.5, length: 5 }];
        assert!(loader.build(config).is_ok());
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let loader = ConfigLoader::new("/nonexistent/edgecast.toml", None);
        let loaded = loader.load().unwrap();
        assert_eq!(loaded.listen.port(), 8080);
        assert!(loaded.alert_log.is_none());
    }
}
