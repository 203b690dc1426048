//! Fleet Daemon - replica controller for containerized workloads
//!
//! The fleet daemon provides:
//! - REST API for submitting and removing workload desired state
//! - Reconciliation loop keeping each workload at its replica count
//! - Status reporting of live containers per workload

use clap::{Parser, ValueEnum};
use fleet_daemon::config::{BackendDriver, DaemonConfig, LoggingConfig};
use fleet_daemon::error::{DaemonError, DaemonResult};
use fleet_daemon::Server;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Fleet Daemon CLI
#[derive(Parser)]
#[command(name = "fleetd")]
#[command(about = "Fleet Daemon - keeps containerized workloads at their replica count", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "FLEET_CONFIG")]
    config: Option<String>,

    /// Listen address for the control surface
    #[arg(long, env = "FLEET_ADDR")]
    addr: Option<String>,

    /// Docker daemon or Swarm manager address
    #[arg(long, env = "FLEET_SWARM_MANAGER")]
    swarm_manager: Option<String>,

    /// Trust certs signed only by this CA
    #[arg(long)]
    tlscacert: Option<PathBuf>,

    /// Path to TLS certificate file
    #[arg(long)]
    tlscert: Option<PathBuf>,

    /// Path to TLS key file
    #[arg(long)]
    tlskey: Option<PathBuf>,

    /// Skip verification of the backend's certificate
    #[arg(long)]
    insecure_skip_verify: bool,

    /// Serve plain HTTP and talk to the backend without TLS (development only)
    #[arg(long, conflicts_with_all = ["tlscacert", "tlscert", "tlskey", "insecure_skip_verify"])]
    no_tls: bool,

    /// Backend driver
    #[arg(long, env = "FLEET_DRIVER", value_enum)]
    driver: Option<Driver>,

    /// Log level [default: logging.level from config, else info]
    #[arg(long, env = "FLEET_LOG_LEVEL")]
    log_level: Option<String>,

    /// Enable JSON logging
    #[arg(long, env = "FLEET_LOG_JSON")]
    json: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum Driver {
    Docker,
    Memory,
}

impl From<Driver> for BackendDriver {
    fn from(driver: Driver) -> Self {
        match driver {
            Driver::Docker => BackendDriver::Docker,
            Driver::Memory => BackendDriver::Memory,
        }
    }
}

impl Cli {
    /// Layer command-line flags over the loaded configuration
    fn apply(&self, config: &mut DaemonConfig) -> DaemonResult<()> {
        if let Some(addr) = &self.addr {
            config.server.listen_addr = addr
                .parse()
                .map_err(|e| DaemonError::Config(format!("Invalid listen address: {}", e)))?;
        }

        if let Some(url) = &self.swarm_manager {
            config.backend.url = url.clone();
        }

        if let Some(driver) = self.driver {
            config.backend.driver = driver.into();
        }

        if self.no_tls {
            config.server.tls = false;
            config.backend.tls = false;
        }
        if let Some(path) = &self.tlscacert {
            config.tls.ca_cert = path.clone();
        }
        if let Some(path) = &self.tlscert {
            config.tls.cert = path.clone();
        }
        if let Some(path) = &self.tlskey {
            config.tls.key = path.clone();
        }
        config.tls.insecure_skip_verify |= self.insecure_skip_verify;

        Ok(())
    }

    /// Effective log level and format; flags win over the config file
    fn logging(&self, config: &LoggingConfig) -> (String, bool) {
        let level = self
            .log_level
            .clone()
            .unwrap_or_else(|| config.level.clone());
        (level, self.json || config.json)
    }
}

#[tokio::main]
async fn main() -> DaemonResult<()> {
    let cli = Cli::parse();

    // Load configuration
    let mut config = DaemonConfig::load(cli.config.as_deref())
        .map_err(|e| DaemonError::Config(e.to_string()))?;

    cli.apply(&mut config)?;

    // Initialize tracing
    let (log_level, json) = cli.logging(&config.logging);
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| log_level.into());

    if json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    // Print startup banner
    println!(
        r#"
  fleetd - replica controller
  Version: {}
  Backend: {:?} ({}, tls: {})
  Listening: {} (tls: {})
"#,
        env!("CARGO_PKG_VERSION"),
        config.backend.driver,
        config.backend.url,
        config.backend.tls,
        config.server.listen_addr,
        config.server.tls
    );

    // Create and run server
    let server = Server::new(config).inspect_err(|e| {
        tracing::error!(error = %e, "Failed to start fleet daemon");
    })?;
    server.run().await
}
