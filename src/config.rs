//! Process configuration sourced from environment variables.
//!
//! Read once at startup. Missing variables fall back to defaults; present but
//! unparsable numeric values are fatal.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::vulnerability::SnapshotSource;

pub const ENV_WEBHOOK_PORT: &str = "WEBHOOK_PORT";
pub const ENV_TLS_CERT_FILE: &str = "TLS_CERT_FILE";
pub const ENV_TLS_KEY_FILE: &str = "TLS_KEY_FILE";
pub const ENV_VULNERABILITY_DB: &str = "VULNERABILITY_DB";
pub const ENV_VULNERABILITY_DB_FILE: &str = "VULNERABILITY_DB_FILE";
pub const ENV_METRICS_PORT: &str = "METRICS_PORT";
pub const ENV_SHUTDOWN_GRACE_PERIOD_SECS: &str = "SHUTDOWN_GRACE_PERIOD_SECS";

/// Default webhook listener port
pub const DEFAULT_WEBHOOK_PORT: u16 = 8443;
/// Default path to the TLS certificate
pub const DEFAULT_TLS_CERT_FILE: &str = "/etc/certs/tls.crt";
/// Default path to the TLS private key
pub const DEFAULT_TLS_KEY_FILE: &str = "/etc/certs/tls.key";
/// Default health/metrics server port
pub const DEFAULT_METRICS_PORT: u16 = 8080;
/// Default time allowed for in-flight requests to drain on shutdown
pub const DEFAULT_SHUTDOWN_GRACE_PERIOD_SECS: u64 = 5;

/// Errors raised while reading configuration
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// A variable was set but could not be parsed
    #[error("invalid value {value:?} for {name}: {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

/// Runtime configuration for the webhook
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub port: u16,
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
    pub vulnerability_source: SnapshotSource,
    pub metrics_port: u16,
    pub shutdown_grace_period: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_WEBHOOK_PORT,
            cert_path: PathBuf::from(DEFAULT_TLS_CERT_FILE),
            key_path: PathBuf::from(DEFAULT_TLS_KEY_FILE),
            vulnerability_source: SnapshotSource::Inline("{}".to_string()),
            metrics_port: DEFAULT_METRICS_PORT,
            shutdown_grace_period: Duration::from_secs(DEFAULT_SHUTDOWN_GRACE_PERIOD_SECS),
        }
    }
}

impl Config {
    /// Read configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read configuration through an arbitrary lookup function.
    ///
    /// Lets tests supply variables without touching the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let port = parse_var(&lookup, ENV_WEBHOOK_PORT)?.unwrap_or(defaults.port);
        let metrics_port =
            parse_var(&lookup, ENV_METRICS_PORT)?.unwrap_or(defaults.metrics_port);
        let shutdown_grace_period = parse_var::<u64, _>(&lookup, ENV_SHUTDOWN_GRACE_PERIOD_SECS)?
            .map(Duration::from_secs)
            .unwrap_or(defaults.shutdown_grace_period);

        let cert_path = lookup(ENV_TLS_CERT_FILE)
            .map(PathBuf::from)
            .unwrap_or(defaults.cert_path);
        let key_path = lookup(ENV_TLS_KEY_FILE)
            .map(PathBuf::from)
            .unwrap_or(defaults.key_path);

        let vulnerability_source = match lookup(ENV_VULNERABILITY_DB_FILE) {
            Some(path) if !path.is_empty() => SnapshotSource::File(PathBuf::from(path)),
            _ => lookup(ENV_VULNERABILITY_DB)
                .map(SnapshotSource::Inline)
                .unwrap_or(defaults.vulnerability_source),
        };

        Ok(Self {
            port,
            cert_path,
            key_path,
            vulnerability_source,
            metrics_port,
            shutdown_grace_period,
        })
    }

    /// Both TLS files exist on disk
    pub fn tls_available(&self) -> bool {
        self.cert_path.exists() && self.key_path.exists()
    }
}

fn parse_var<T, F>(lookup: &F, name: &'static str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        None => Ok(None),
        Some(value) => {
            value
                .trim()
                .parse()
                .map(Some)
                .map_err(|e: T::Err| ConfigError::Invalid {
                    name,
                    reason: e.to_string(),
                    value,
                })
        }
    }
}
