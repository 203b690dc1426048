//! Configuration for fleet-daemon

use crate::scheduler::ScaleDownPolicy;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Main daemon configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Orchestration backend configuration
    #[serde(default)]
    pub backend: BackendConfig,

    /// Certificate, key and CA shared by the listener and the backend client
    #[serde(default)]
    pub tls: TlsConfig,

    /// Scheduler configuration
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address
    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,

    /// Serve the control surface over TLS and require client certificates
    #[serde(default = "default_true")]
    pub tls: bool,

    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Maximum request body size in bytes
    #[serde(default = "default_max_body_size")]
    pub max_body_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            tls: true,
            request_timeout_secs: default_request_timeout(),
            max_body_size: default_max_body_size(),
        }
    }
}

/// Which backend implementation drives the containers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendDriver {
    /// Docker Engine / Swarm manager REST API
    #[default]
    Docker,

    /// In-process fake (for development/testing)
    Memory,
}

/// Orchestration backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    #[serde(default)]
    pub driver: BackendDriver,

    /// Docker daemon or Swarm manager address (`tcp://`, `http://` or `https://`)
    #[serde(default = "default_backend_url")]
    pub url: String,

    /// Authenticate to the backend with the shared TLS material
    #[serde(default = "default_true")]
    pub tls: bool,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            driver: BackendDriver::Docker,
            url: default_backend_url(),
            tls: true,
            request_timeout_secs: default_request_timeout(),
        }
    }
}

/// Certificate, key and CA bundle
///
/// The same pair identifies the daemon to its callers and to the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TlsConfig {
    /// Trust certs signed only by this CA
    pub ca_cert: PathBuf,

    /// Client certificate (PEM)
    pub cert: PathBuf,

    /// Client private key (PEM)
    pub key: PathBuf,

    /// Skip verification of the backend's certificate
    #[serde(default)]
    pub insecure_skip_verify: bool,
}

impl Default for TlsConfig {
    fn default() -> Self {
        Self {
            ca_cert: PathBuf::from("~/.docker/ca.pem"),
            cert: PathBuf::from("~/.docker/cert.pem"),
            key: PathBuf::from("~/.docker/key.pem"),
            insecure_skip_verify: false,
        }
    }
}

/// Scheduler configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Reconciliation interval in seconds
    #[serde(default = "default_reconcile_interval")]
    pub reconcile_interval_secs: u64,

    /// Wait before retrying after a failed pass, in seconds
    #[serde(default = "default_retry_backoff")]
    pub retry_backoff_secs: u64,

    /// Maximum workloads reconciled concurrently within a pass
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_reconciliations: usize,

    /// Which containers survive a scale-down
    #[serde(default)]
    pub scale_down_policy: ScaleDownPolicy,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            reconcile_interval_secs: default_reconcile_interval(),
            retry_backoff_secs: default_retry_backoff(),
            max_concurrent_reconciliations: default_max_concurrent(),
            scale_down_policy: ScaleDownPolicy::default(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// JSON format
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// Default value helpers
fn default_true() -> bool {
    true
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 2476))
}

fn default_backend_url() -> String {
    "tcp://127.0.0.1:2376".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_max_body_size() -> usize {
    1024 * 1024
}

fn default_reconcile_interval() -> u64 {
    10
}

fn default_retry_backoff() -> u64 {
    5
}

fn default_max_concurrent() -> usize {
    10
}

fn default_log_level() -> String {
    "info".to_string()
}

impl DaemonConfig {
    /// Load configuration from defaults, an optional file and `FLEET_` env vars
    pub fn load(path: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();

        // Add default configuration
        builder = builder.add_source(config::Config::try_from(&DaemonConfig::default())?);

        // Add file configuration if provided
        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        // e.g. FLEET_SCHEDULER__RECONCILE_INTERVAL_SECS=30
        builder = builder.add_source(
            config::Environment::with_prefix("FLEET")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }

    /// Create a development configuration: in-memory driver, no TLS anywhere
    pub fn development() -> Self {
        Self {
            server: ServerConfig {
                tls: false,
                ..Default::default()
            },
            backend: BackendConfig {
                driver: BackendDriver::Memory,
                tls: false,
                ..Default::default()
            },
            ..Default::default()
        }
    }
}

/// Expand a leading `~/` using `$HOME`
pub fn expand_home(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => match std::env::var_os("HOME") {
            Some(home) => PathBuf::from(home).join(rest),
            None => path.to_path_buf(),
        },
        Err(_) => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DaemonConfig::default();
        assert_eq!(config.server.listen_addr.port(), 2476);
        assert_eq!(config.backend.driver, BackendDriver::Docker);
        assert_eq!(config.backend.url, "tcp://127.0.0.1:2376");
        assert!(config.server.tls);
        assert!(config.backend.tls);
        assert_eq!(config.tls, TlsConfig::default());
    }

    #[test]
    fn test_scheduler_defaults() {
        let config = SchedulerConfig::default();
        assert_eq!(config.reconcile_interval_secs, 10);
        assert_eq!(config.retry_backoff_secs, 5);
        assert_eq!(config.scale_down_policy, ScaleDownPolicy::KeepOldest);
    }

    #[test]
    fn test_development_config() {
        let config = DaemonConfig::development();
        assert_eq!(config.backend.driver, BackendDriver::Memory);
        assert!(!config.backend.tls);
        assert!(!config.server.tls);
    }

    #[test]
    fn test_file_can_disable_tls_and_set_logging() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fleetd.toml");
        std::fs::write(
            &path,
            r#"
[server]
tls = false

[backend]
tls = false
url = "tcp://swarm:2375"

[tls]
ca_cert = "/etc/fleet/ca.pem"
cert = "/etc/fleet/cert.pem"
key = "/etc/fleet/key.pem"

[logging]
level = "debug"
json = true
"#,
        )
        .unwrap();

        let config = DaemonConfig::load(path.to_str()).unwrap();
        assert!(!config.server.tls);
        assert!(!config.backend.tls);
        assert_eq!(config.backend.url, "tcp://swarm:2375");
        assert_eq!(config.tls.ca_cert, PathBuf::from("/etc/fleet/ca.pem"));
        assert!(!config.tls.insecure_skip_verify);
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.json);
        assert_eq!(config.server.listen_addr.port(), 2476);
    }

    #[test]
    fn test_load_without_file_uses_defaults() {
        let config = DaemonConfig::load(None).unwrap();
        assert_eq!(config.scheduler.reconcile_interval_secs, 10);
        assert_eq!(config.server.max_body_size, 1024 * 1024);
    }

    #[test]
    fn test_policy_deserializes_snake_case() {
        let config: SchedulerConfig =
            serde_json::from_str(r#"{"scale_down_policy": "backend_order"}"#).unwrap();
        assert_eq!(config.scale_down_policy, ScaleDownPolicy::BackendOrder);
        assert_eq!(config.reconcile_interval_secs, 10);
    }

    #[test]
    fn test_expand_home() {
        let absolute = Path::new("/etc/docker/ca.pem");
        assert_eq!(expand_home(absolute), absolute.to_path_buf());

        if let Some(home) = std::env::var_os("HOME") {
            assert_eq!(
                expand_home(Path::new("~/.docker/ca.pem")),
                PathBuf::from(home).join(".docker/ca.pem")
            );
        }
    }
}
