//! Command-line and environment configuration for the `calc-server` binary.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;

use crate::network::{NetworkConfig, TlsConfig, DEFAULT_PORT};
use crate::service::ServerConfig;
use crate::telemetry::LogFormat;

/// Stack calculator HTTP server.
#[derive(Parser, Debug, Clone)]
#[command(name = "calc-server", version, about)]
pub struct Cli {
    /// Address to bind.
    #[arg(long, env = "CALC_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on (0 picks a free port).
    #[arg(long, env = "CALC_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Log output format.
    #[arg(long, env = "CALC_LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,

    /// Filter for everything except the named calculator loggers.
    #[arg(long, env = "CALC_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Directory for `requests.log`, `stack.log` and `independent.log`.
    #[arg(long, env = "CALC_LOG_DIR", default_value = "logs")]
    pub log_dir: PathBuf,

    /// Log to the console only.
    #[arg(long, env = "CALC_NO_LOG_FILES")]
    pub no_log_files: bool,

    /// Whole-request timeout in seconds.
    #[arg(long, env = "CALC_REQUEST_TIMEOUT_SECS", default_value_t = 30)]
    pub request_timeout_secs: u64,

    /// Per-operation timeout in milliseconds (0 disables it).
    #[arg(long, env = "CALC_OPERATION_TIMEOUT_MS", default_value_t = 5_000)]
    pub operation_timeout_ms: u64,

    /// Operations allowed in flight before new ones are shed.
    #[arg(long, env = "CALC_MAX_CONCURRENT_OPERATIONS", default_value_t = 1_000)]
    pub max_concurrent_operations: u32,

    /// Allowed CORS origin; repeat for several, `*` for any.
    #[arg(long = "cors-origin", env = "CALC_CORS_ORIGINS", value_delimiter = ',', default_value = "*")]
    pub cors_origins: Vec<String>,

    /// PEM certificate chain; enables TLS together with `--tls-key`.
    #[arg(long, env = "CALC_TLS_CERT", requires = "tls_key")]
    pub tls_cert: Option<PathBuf>,

    /// PEM private key.
    #[arg(long, env = "CALC_TLS_KEY", requires = "tls_cert")]
    pub tls_key: Option<PathBuf>,

    /// Serve Prometheus metrics on this address (e.g. `0.0.0.0:9100`).
    #[arg(long, env = "CALC_METRICS_ADDR")]
    pub metrics_addr: Option<SocketAddr>,
}

impl Cli {
    /// Directory for the per-logger files, unless they are disabled.
    #[must_use]
    pub fn log_files_dir(&self) -> Option<&Path> {
        (!self.no_log_files).then_some(self.log_dir.as_path())
    }

    /// Transport settings.
    #[must_use]
    pub fn network_config(&self) -> NetworkConfig {
        let tls = match (&self.tls_cert, &self.tls_key) {
            (Some(cert_path), Some(key_path)) => Some(TlsConfig {
                cert_path: cert_path.clone(),
                key_path: key_path.clone(),
            }),
            _ => None,
        };
        NetworkConfig {
            host: self.host.clone(),
            port: self.port,
            tls,
            cors_origins: self.cors_origins.clone(),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            ..NetworkConfig::default()
        }
    }

    /// Operation pipeline settings.
    #[must_use]
    pub fn server_config(&self) -> ServerConfig {
        ServerConfig {
            default_operation_timeout_ms: self.operation_timeout_ms,
            max_concurrent_operations: self.max_concurrent_operations,
        }
    }
}
