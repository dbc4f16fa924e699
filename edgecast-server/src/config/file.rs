//! TOML file configuration structures.
//!
//! These structs directly map to the `edgecast.toml` file format. Every
//! section is optional and falls back to its defaults.

use edgecast_core::config::{EvaluationMode, ScorerSpec};
use serde::{Deserialize, Serialize};
use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;

/// Root configuration structure as read from the TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub detector: DetectorConfig,
    #[serde(default)]
    pub hub: HubConfig,
    #[serde(default)]
    pub audit: AuditConfig,
}

/// Server configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// The address and port to listen on (e.g., "0.0.0.0:8080").
    #[serde(default = "default_listen_addr")]
    pub listen: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen_addr(),
        }
    }
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from((Ipv4Addr::UNSPECIFIED, 8080))
}

/// Stream detector section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorConfig {
    #[serde(default = "default_buffer_capacity")]
    pub buffer_capacity: usize,
    #[serde(default = "default_history_window")]
    pub history_window: usize,
    #[serde(default)]
    pub evaluation: EvaluationMode,
    /// `[[detector.scorers]]` tables. The deterministic built-in set when
    /// omitted.
    #[serde(default = "ScorerSpec::defaults")]
    pub scorers: Vec<ScorerSpec>,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            buffer_capacity: default_buffer_capacity(),
            history_window: default_history_window(),
            evaluation: EvaluationMode::default(),
            scorers: ScorerSpec::defaults(),
        }
    }
}

fn default_buffer_capacity() -> usize {
    4096
}

fn default_history_window() -> usize {
    10
}

/// Broadcast hub section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HubConfig {
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    #[serde(default = "default_heartbeat_timeout_secs")]
    pub heartbeat_timeout_secs: u64,
    #[serde(default = "default_reap_interval_secs")]
    pub reap_interval_secs: u64,
    #[serde(default = "default_metrics_interval_secs")]
    pub metrics_interval_secs: u64,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
            heartbeat_timeout_secs: default_heartbeat_timeout_secs(),
            reap_interval_secs: default_reap_interval_secs(),
            metrics_interval_secs: default_metrics_interval_secs(),
        }
    }
}

fn default_queue_capacity() -> usize {
    256
}

fn default_heartbeat_timeout_secs() -> u64 {
    60
}

fn default_reap_interval_secs() -> u64 {
    10
}

fn default_metrics_interval_secs() -> u64 {
    15
}

/// Optional alert log section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuditConfig {
    /// JSON-lines file alerts are appended to. Disabled when unset.
    pub path: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_config_parsing() {
        let toml_str = r#"
[server]
listen = "127.0.0.1:3000"

[detector]
buffer_capacity = 1024
history_window = 5
evaluation = "sequential"

[[detector.scorers]]
kind = "blowout"
threshold = 0.6
min_margin = 25

[[detector.scorers]]
kind = "streak"
length = 4

[hub]
queue_capacity = 64
heartbeat_timeout_secs = 30

[audit]
path = "./alerts.jsonl"
"#;
        let config: FileConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.listen.port(), 3000);
        assert_eq!(config.detector.buffer_capacity, 1024);
        assert_eq!(config.detector.evaluation, EvaluationMode::Sequential);
        assert_eq!(
            config.detector.scorers,
            vec![
                ScorerSpec::Blowout {
                    threshold: 0.6,
                    min_margin: 25
                },
                ScorerSpec::Streak {
                    threshold: 0.5,
                    length: 4
                },
            ]
        );
        assert_eq!(config.hub.queue_capacity, 64);
        assert_eq!(config.hub.reap_interval_secs, 10);
        assert_eq!(config.audit.path, Some(PathBuf::from("./alerts.jsonl")));
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: FileConfig = toml::from_str("").unwrap();
        assert_eq!(config.server.listen.port(), 8080);
        assert_eq!(config.detector.scorers, ScorerSpec::defaults());
        assert_eq!(config.detector.evaluation, EvaluationMode::Parallel);
        assert_eq!(config.hub.heartbeat_timeout_secs, 60);
        assert!(config.audit.path.is_none());
    }

    #[test]
    fn test_unknown_scorer_kind_is_rejected() {
        let toml_str = r#"
[[detector.scorers]]
kind = "moon_phase"
"#;
        assert!(toml::from_str::<FileConfig>(toml_str).is_err());
    }
}
