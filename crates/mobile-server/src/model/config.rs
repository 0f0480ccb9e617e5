//! Configuration management for the mobile server
//!
//! Settings come from `conf/application.yml`, then `MOBILE`-prefixed
//! environment variables, then command line flags.

use std::fmt::{self, Display};
use std::path::PathBuf;
use std::str::FromStr;

use clap::Parser;
use config::{Config, Environment};

use mobile_common::{DEFAULT_NAMESPACE, MobileError};

use crate::startup::LoggingConfig;

pub const DEFAULT_SERVER_ADDRESS: &str = "0.0.0.0";
pub const DEFAULT_SERVER_PORT: u16 = 8080;
pub const DEFAULT_CONFIG_FILE: &str = "conf/application.yml";
pub const DEFAULT_SNAPSHOT_FILE: &str = "conf/catalog.yml";

pub const SERVER_ADDRESS_PROPERTY: &str = "server.address";
pub const SERVER_PORT_PROPERTY: &str = "server.port";
pub const NAMESPACE_PROPERTY: &str = "mobile.namespace";
pub const MODE_PROPERTY: &str = "mobile.mode";
pub const IN_CLUSTER_PROPERTY: &str = "mobile.kubernetes.in_cluster";
pub const SNAPSHOT_PROPERTY: &str = "mobile.standalone.snapshot";
pub const LOG_PATH_PROPERTY: &str = "mobile.logs.path";
pub const LOG_LEVEL_PROPERTY: &str = "mobile.logs.level";
pub const LOG_CONSOLE_PROPERTY: &str = "mobile.logs.console";
pub const LOG_FILE_PROPERTY: &str = "mobile.logs.file";
pub const LOG_ROTATION_PROPERTY: &str = "mobile.logs.rotation";
pub const SHUTDOWN_TIMEOUT_PROPERTY: &str = "server.shutdown_timeout";

/// Command line arguments for the server
#[derive(Debug, Default, Parser)]
#[command(version, about = "Bindable mobile services API")]
pub struct Cli {
    /// `kubernetes` or `standalone`
    #[arg(short = 'm', long = "mode")]
    pub mode: Option<String>,
    #[arg(short = 'n', long = "namespace", env = "MOBILE_NAMESPACE")]
    pub namespace: Option<String>,
    #[arg(short = 'p', long = "port")]
    pub port: Option<u16>,
    /// Catalog snapshot loaded in standalone mode
    #[arg(short = 's', long = "snapshot")]
    pub snapshot: Option<String>,
    #[arg(short = 'c', long = "config", default_value = DEFAULT_CONFIG_FILE)]
    pub config_file: String,
}

/// Where the catalog lives
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ServerMode {
    #[default]
    Kubernetes,
    /// In-memory catalog seeded from a snapshot file
    Standalone,
}

impl FromStr for ServerMode {
    type Err = MobileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "kubernetes" | "k8s" => Ok(ServerMode::Kubernetes),
            "standalone" => Ok(ServerMode::Standalone),
            other => Err(MobileError::ConfigError(format!(
                "unknown mode '{}', expected 'kubernetes' or 'standalone'",
                other
            ))),
        }
    }
}

impl Display for ServerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerMode::Kubernetes => write!(f, "kubernetes"),
            ServerMode::Standalone => write!(f, "standalone"),
        }
    }
}

/// Application configuration loaded from config files and environment
#[derive(Clone, Debug, Default)]
pub struct Configuration {
    pub config: Config,
}

impl Configuration {
    /// Build from the process arguments
    pub fn new() -> Result<Self, MobileError> {
        Self::from_cli(Cli::parse())
    }

    pub fn from_cli(args: Cli) -> Result<Self, MobileError> {
        let mut builder = Config::builder()
            .add_source(config::File::with_name(&args.config_file).required(false))
            .add_source(
                Environment::with_prefix("mobile")
                    .separator(".")
                    .try_parsing(true),
            );

        if let Some(v) = args.mode {
            builder = builder
                .set_override(MODE_PROPERTY, v)
                .map_err(config_error)?;
        }
        if let Some(v) = args.namespace {
            builder = builder
                .set_override(NAMESPACE_PROPERTY, v)
                .map_err(config_error)?;
        }
        if let Some(v) = args.port {
            builder = builder
                .set_override(SERVER_PORT_PROPERTY, i64::from(v))
                .map_err(config_error)?;
        }
        if let Some(v) = args.snapshot {
            builder = builder
                .set_override(SNAPSHOT_PROPERTY, v)
                .map_err(config_error)?;
        }

        let config = builder.build().map_err(config_error)?;
        Ok(Configuration { config })
    }

    // ========================================================================
    // Server
    // ========================================================================

    pub fn server_address(&self) -> String {
        self.config
            .get_string(SERVER_ADDRESS_PROPERTY)
            .unwrap_or(DEFAULT_SERVER_ADDRESS.to_string())
    }

    pub fn server_port(&self) -> u16 {
        self.config
            .get_int(SERVER_PORT_PROPERTY)
            .ok()
            .and_then(|port| u16::try_from(port).ok())
            .unwrap_or(DEFAULT_SERVER_PORT)
    }

    pub fn shutdown_timeout_seconds(&self) -> u64 {
        self.config
            .get_int(SHUTDOWN_TIMEOUT_PROPERTY)
            .ok()
            .and_then(|secs| u64::try_from(secs).ok())
            .unwrap_or(5)
    }

    // ========================================================================
    // Catalog
    // ========================================================================

    pub fn mode(&self) -> Result<ServerMode, MobileError> {
        match self.config.get_string(MODE_PROPERTY) {
            Ok(mode) => mode.parse(),
            Err(_) => Ok(ServerMode::default()),
        }
    }

    pub fn namespace(&self) -> String {
        self.config
            .get_string(NAMESPACE_PROPERTY)
            .ok()
            .filter(|ns| !ns.is_empty())
            .unwrap_or(DEFAULT_NAMESPACE.to_string())
    }

    pub fn in_cluster(&self) -> bool {
        self.config.get_bool(IN_CLUSTER_PROPERTY).unwrap_or(false)
    }

    pub fn snapshot_file(&self) -> PathBuf {
        PathBuf::from(
            self.config
                .get_string(SNAPSHOT_PROPERTY)
                .unwrap_or(DEFAULT_SNAPSHOT_FILE.to_string()),
        )
    }

    // ========================================================================
    // Logging
    // ========================================================================

    pub fn logging_config(&self) -> LoggingConfig {
        LoggingConfig::from_config(
            self.config.get_string(LOG_PATH_PROPERTY).ok(),
            self.config.get_bool(LOG_CONSOLE_PROPERTY).unwrap_or(true),
            self.config.get_bool(LOG_FILE_PROPERTY).unwrap_or(false),
            self.config
                .get_string(LOG_LEVEL_PROPERTY)
                .unwrap_or("info".to_string()),
            self.config.get_string(LOG_ROTATION_PROPERTY).ok(),
        )
    }
}

fn config_error(e: config::ConfigError) -> MobileError {
    MobileError::ConfigError(e.to_string())
}
