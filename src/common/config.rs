//! Configuration for replkv components

use crate::common::{Error, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default config file, overridden by `REPLKV_CONFIG`
pub const DEFAULT_CONFIG_FILE: &str = "replkv.toml";

/// Name every participant is bound under unless configured otherwise
pub const DEFAULT_SERVICE_NAME: &str = "replkv";

/// Global configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Node ID (unique identifier)
    pub node_id: String,

    /// Role the file was written for. Binaries warn when started in another one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<NodeRole>,

    /// Coordinator-specific config
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coordinator: Option<CoordinatorConfig>,

    /// Participant-specific config
    #[serde(skip_serializing_if = "Option::is_none")]
    pub participant: Option<ParticipantConfig>,

    /// Single-process launcher config
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cluster: Option<ClusterConfig>,

    /// Logging level
    pub log_level: String,

    /// Append-only text log, in addition to stdout
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            node_id: "node-1".to_string(),
            role: None,
            coordinator: None,
            participant: None,
            cluster: None,
            log_level: default_log_level(),
            log_file: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_service_name() -> String {
    DEFAULT_SERVICE_NAME.to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeRole {
    Coordinator,
    Participant,
}

impl Config {
    /// Warn if this config was written for a different kind of node
    pub fn check_role(&self, expected: NodeRole) {
        if let Some(role) = self.role {
            if role != expected {
                tracing::warn!(
                    "Config is for a {:?} node but this is a {:?}; using its {:?} section only",
                    role,
                    expected,
                    expected
                );
            }
        }
    }
}

/// Coordinator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    /// Bind address for the coordinator RPC endpoint
    pub bind_addr: SocketAddr,

    /// Participants to connect to at startup, as `host:port`
    #[serde(default)]
    pub participants: Vec<String>,

    /// Service name the participants are bound under
    #[serde(default = "default_service_name")]
    pub service_name: String,

    /// Deadline for a single prepare call. Unset means wait for the transport.
    #[serde(default)]
    pub prepare_timeout_ms: Option<u64>,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 5000)),
            participants: Vec::new(),
            service_name: default_service_name(),
            prepare_timeout_ms: None,
        }
    }
}

impl CoordinatorConfig {
    pub fn prepare_timeout(&self) -> Option<Duration> {
        self.prepare_timeout_ms.map(Duration::from_millis)
    }
}

/// Participant configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParticipantConfig {
    /// Bind address for both the RPC and the client API
    pub bind_addr: SocketAddr,

    /// Base URL of the coordinator
    #[serde(default = "default_coordinator_url")]
    pub coordinator_url: String,

    /// Service name this participant answers lookups for
    #[serde(default = "default_service_name")]
    pub service_name: String,

    /// Deadline for calls to the coordinator. Unset means no deadline.
    #[serde(default)]
    pub rpc_timeout_ms: Option<u64>,
}

fn default_coordinator_url() -> String {
    "http://127.0.0.1:5000".to_string()
}

impl Default for ParticipantConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 5001)),
            coordinator_url: default_coordinator_url(),
            service_name: default_service_name(),
            rpc_timeout_ms: None,
        }
    }
}

impl ParticipantConfig {
    pub fn rpc_timeout(&self) -> Option<Duration> {
        self.rpc_timeout_ms.map(Duration::from_millis)
    }
}

/// Configuration for running a coordinator and its participants in one process
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterConfig {
    /// Host every server binds to
    #[serde(default = "default_host")]
    pub host: String,

    /// Coordinator port; participants take the following ports. 0 picks free ports.
    #[serde(default = "default_base_port")]
    pub base_port: u16,

    /// Number of participants
    #[serde(default = "default_participants")]
    pub participants: usize,

    #[serde(default = "default_service_name")]
    pub service_name: String,

    #[serde(default)]
    pub prepare_timeout_ms: Option<u64>,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_base_port() -> u16 {
    5000
}
fn default_participants() -> usize {
    5
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            base_port: default_base_port(),
            participants: default_participants(),
            service_name: default_service_name(),
            prepare_timeout_ms: None,
        }
    }
}

impl ClusterConfig {
    pub fn prepare_timeout(&self) -> Option<Duration> {
        self.prepare_timeout_ms.map(Duration::from_millis)
    }

    pub fn validate(&self) -> Result<()> {
        if self.participants == 0 {
            return Err(Error::InvalidConfig(
                "cluster needs at least one participant".into(),
            ));
        }
        if self.base_port != 0 && usize::from(self.base_port) + self.participants > 65535 {
            return Err(Error::InvalidConfig(format!(
                "{} participants do not fit above port {}",
                self.participants, self.base_port
            )));
        }
        Ok(())
    }
}

impl Config {
    /// Load from `REPLKV_CONFIG` (or `replkv.toml`) plus `REPLKV_*` environment.
    ///
    /// An unusable file yields the defaults together with the error, so the
    /// caller can report it once logging is up.
    pub fn load() -> (Self, Option<Error>) {
        let path = std::env::var("REPLKV_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_FILE.into());
        Self::load_from(path)
    }

    pub fn load_from(path: impl AsRef<Path>) -> (Self, Option<Error>) {
        let path = path.as_ref();
        match Self::from_file(path) {
            Ok(config) => (config, None),
            Err(e) => (
                Self::default(),
                Some(Error::InvalidConfig(format!("{}: {}", path.display(), e))),
            ),
        }
    }

    /// Load from an optional file plus environment overrides.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path.as_ref()).required(false))
            .add_source(
                config::Environment::with_prefix("REPLKV")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;
        Ok(settings.try_deserialize()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.log_level, "info");
        assert!(config.role.is_none());

        let coord = CoordinatorConfig::default();
        assert_eq!(coord.service_name, DEFAULT_SERVICE_NAME);
        assert!(coord.prepare_timeout().is_none());

        let cluster = ClusterConfig::default();
        assert_eq!(cluster.participants, 5);
        assert_eq!(cluster.base_port, 5000);
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = Config::from_file(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.node_id, "node-1");
        assert!(config.coordinator.is_none());
    }

    #[test]
    fn test_load_toml_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("replkv.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            r#"
node_id = "coord-1"
role = "coordinator"
log_level = "debug"

[coordinator]
bind_addr = "127.0.0.1:7000"
participants = ["127.0.0.1:7001", "127.0.0.1:7002"]
prepare_timeout_ms = 250
"#
        )
        .unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.node_id, "coord-1");
        assert_eq!(config.role, Some(NodeRole::Coordinator));
        assert_eq!(config.log_level, "debug");

        let coord = config.coordinator.unwrap();
        assert_eq!(coord.bind_addr.port(), 7000);
        assert_eq!(coord.participants.len(), 2);
        assert_eq!(coord.service_name, DEFAULT_SERVICE_NAME);
        assert_eq!(coord.prepare_timeout(), Some(Duration::from_millis(250)));
    }

    #[test]
    fn test_environment_overrides() {
        // Keys no other test here asserts on
        std::env::set_var("REPLKV_LOG_FILE", "/tmp/replkv-env.log");
        std::env::set_var("REPLKV_CLUSTER__PARTICIPANTS", "3");
        let dir = tempfile::TempDir::new().unwrap();
        let config = Config::from_file(dir.path().join("absent.toml"));
        std::env::remove_var("REPLKV_LOG_FILE");
        std::env::remove_var("REPLKV_CLUSTER__PARTICIPANTS");

        let config = config.unwrap();
        assert_eq!(config.log_file, Some(PathBuf::from("/tmp/replkv-env.log")));
        assert_eq!(config.cluster.unwrap().participants, 3);
    }

    #[test]
    fn test_unreadable_file_falls_back_with_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "node_id = [unterminated").unwrap();

        let (config, error) = Config::load_from(&path);
        assert_eq!(config.node_id, "node-1");
        let error = error.unwrap();
        assert!(matches!(error, Error::InvalidConfig(_)));
        assert!(error.to_string().contains("broken.toml"));

        let (_, error) = Config::load_from(dir.path().join("absent.toml"));
        assert!(error.is_none());
    }

    #[test]
    fn test_cluster_validation() {
        let mut cluster = ClusterConfig::default();
        assert!(cluster.validate().is_ok());

        cluster.participants = 0;
        assert!(cluster.validate().is_err());

        cluster.participants = 10;
        cluster.base_port = 65530;
        assert!(cluster.validate().is_err());

        cluster.base_port = 0;
        assert!(cluster.validate().is_ok());
    }
}
