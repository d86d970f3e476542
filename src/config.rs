//! Configuration handling for the connectivity check.
//!
//! Connection parameters come from environment variables (or the matching CLI flags).
//! Empty values are treated the same as unset ones, so defaults apply to both.

use crate::error::{CheckError, CheckResult};
use crate::models::ConnectionDescriptor;
use clap::Parser;

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: &str = "1433";
pub const DEFAULT_DATABASE: &str = "master";

// Insecure demo defaults, overridable via ENCRYPT / TRUST_SERVER_CERTIFICATE
pub const DEFAULT_ENCRYPT: bool = false;
pub const DEFAULT_TRUST_SERVER_CERTIFICATE: bool = true;

pub const ENV_HOST: &str = "HOST";
pub const ENV_PORT: &str = "PORT";
pub const ENV_DATABASE: &str = "DATABASE";
pub const ENV_USERNAME: &str = "USERNAME";
pub const ENV_PASSWORD: &str = "PASSWORD";
pub const ENV_DOMAIN: &str = "DOMAIN";
pub const ENV_ENCRYPT: &str = "ENCRYPT";
pub const ENV_TRUST_SERVER_CERTIFICATE: &str = "TRUST_SERVER_CERTIFICATE";

/// Configuration for the connectivity check.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "mssql-conncheck",
    about = "Connectivity check for SQL Server - connects once, runs SELECT 1 and prints server metadata",
    version,
    author
)]
pub struct Config {
    /// SQL Server hostname (default: localhost)
    #[arg(long, env = ENV_HOST)]
    pub host: Option<String>,

    /// SQL Server port (default: 1433)
    #[arg(long, env = ENV_PORT)]
    pub port: Option<String>,

    /// Database name (default: master)
    #[arg(long, env = ENV_DATABASE)]
    pub database: Option<String>,

    /// Username for authentication (required)
    #[arg(long, env = ENV_USERNAME)]
    pub username: Option<String>,

    /// Password for authentication (required)
    #[arg(long, env = ENV_PASSWORD, hide_env_values = true)]
    pub password: Option<String>,

    /// Active Directory domain. When set, the user is qualified as DOMAIN\user
    #[arg(long, env = ENV_DOMAIN)]
    pub domain: Option<String>,

    /// Require an encrypted connection: true/false (default: false)
    #[arg(long, value_name = "BOOL", env = ENV_ENCRYPT)]
    pub encrypt: Option<String>,

    /// Accept the server certificate without validation: true/false (default: true)
    #[arg(long, value_name = "BOOL", env = ENV_TRUST_SERVER_CERTIFICATE)]
    pub trust_server_certificate: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "LOG_LEVEL")]
    pub log_level: String,

    /// Enable JSON logging format
    #[arg(long, env = "JSON_LOGS")]
    pub json_logs: bool,

    /// Enable logging output on stderr (disabled by default to keep the report readable)
    #[arg(long, env = "ENABLE_LOGS")]
    pub enable_logs: bool,
}

/// Returns the value when it is set and non-empty.
fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

/// Parse a boolean setting, accepting the usual spellings case-insensitively.
fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Some(true),
        "false" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}

/// Resolve a boolean setting: unset or empty means `default`.
fn bool_or_default(
    value: &Option<String>,
    variable: &'static str,
    default: bool,
) -> CheckResult<bool> {
    match non_empty(value) {
        Some(v) => parse_bool(v)
            .ok_or_else(|| CheckError::configuration(variable, "not a boolean (true/false)")),
        None => Ok(default),
    }
}

impl Config {
    /// Parse configuration from command line arguments and the environment.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Create a default configuration (useful for testing).
    pub fn default_config() -> Self {
        Self {
            host: None,
            port: None,
            database: None,
            username: None,
            password: None,
            domain: None,
            encrypt: None,
            trust_server_certificate: None,
            log_level: "info".to_string(),
            json_logs: false,
            enable_logs: false,
        }
    }

    /// Effective host.
    pub fn host_or_default(&self) -> &str {
        non_empty(&self.host).unwrap_or(DEFAULT_HOST)
    }

    /// Effective port.
    pub fn port_or_default(&self) -> &str {
        non_empty(&self.port).unwrap_or(DEFAULT_PORT)
    }

    /// Effective database.
    pub fn database_or_default(&self) -> &str {
        non_empty(&self.database).unwrap_or(DEFAULT_DATABASE)
    }

    /// Domain, if set and non-empty.
    pub fn domain(&self) -> Option<&str> {
        non_empty(&self.domain)
    }

    /// Effective encryption setting.
    pub fn encrypt_or_default(&self) -> CheckResult<bool> {
        bool_or_default(&self.encrypt, ENV_ENCRYPT, DEFAULT_ENCRYPT)
    }

    /// Effective certificate-trust setting.
    pub fn trust_server_certificate_or_default(&self) -> CheckResult<bool> {
        bool_or_default(
            &self.trust_server_certificate,
            ENV_TRUST_SERVER_CERTIFICATE,
            DEFAULT_TRUST_SERVER_CERTIFICATE,
        )
    }

    /// Validate the credentials and build the connection descriptor.
    ///
    /// Username is checked before password, then the security settings;
    /// no network activity happens here.
    pub fn descriptor(&self) -> CheckResult<ConnectionDescriptor> {
        let username = non_empty(&self.username)
            .ok_or_else(|| CheckError::configuration(ENV_USERNAME, "required"))?;
        let password = non_empty(&self.password)
            .ok_or_else(|| CheckError::configuration(ENV_PASSWORD, "required"))?;
        let encrypt = self.encrypt_or_default()?;
        let trust_server_certificate = self.trust_server_certificate_or_default()?;

        Ok(ConnectionDescriptor::new(
            self.host_or_default(),
            self.port_or_default(),
            self.database_or_default(),
            username,
            password,
            self.domain(),
        )
        .with_encrypt(encrypt)
        .with_trust_server_certificate(trust_server_certificate))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::default_config()
    }
}
