//! Connection descriptor.
//!
//! This module resolves the parameters for the single connection the check opens:
//! username qualification, authentication mode, the display connection string and
//! the driver configuration.

use crate::error::{CheckError, CheckResult};
use std::fmt;
use tiberius::{AuthMethod, EncryptionLevel};

/// Scheme used in the display connection string.
pub const CONNECTION_SCHEME: &str = "sqlserver";

/// Replaces the password in anything printed or logged.
pub const PASSWORD_MASK: &str = "***";

/// How the check authenticates against the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    /// SQL Server login (user + password)
    SqlServer,
    /// Domain-qualified credentials (DOMAIN\user), sent as a SQL Server login
    Domain,
}

impl AuthMode {
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::SqlServer => "sql-server",
            Self::Domain => "domain",
        }
    }
}

impl fmt::Display for AuthMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Qualify `username` with `domain` unless it is already qualified.
///
/// A username containing `@` (UPN form) or `\` (down-level form) is returned unchanged,
/// as is any username when the domain is absent or empty.
pub fn qualify_username(username: &str, domain: Option<&str>) -> String {
    match domain.filter(|d| !d.is_empty()) {
        Some(domain) if !username.contains('@') && !username.contains('\\') => {
            format!("{}\\{}", domain, username)
        }
        _ => username.to_string(),
    }
}

/// Escape a connection string value.
///
/// Values that would break `key=value;` parsing are wrapped in braces, with closing
/// braces doubled.
fn escape_value(value: &str) -> String {
    let needs_braces = value.contains([';', '=', '{', '}'])
        || value.starts_with(char::is_whitespace)
        || value.ends_with(char::is_whitespace);
    if needs_braces {
        format!("{{{}}}", value.replace('}', "}}"))
    } else {
        value.to_string()
    }
}

/// Resolved parameters for one database connection.
#[derive(Clone)]
pub struct ConnectionDescriptor {
    host: String,
    port: String,
    database: String,
    username: String,
    /// Contains sensitive data - never log
    password: String,
    domain: Option<String>,
    encrypt: bool,
    trust_server_certificate: bool,
}

impl ConnectionDescriptor {
    /// Create a descriptor with the demo security defaults
    /// (encryption disabled, server certificate trusted).
    pub fn new(
        host: impl Into<String>,
        port: impl Into<String>,
        database: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
        domain: Option<&str>,
    ) -> Self {
        Self {
            host: host.into(),
            port: port.into(),
            database: database.into(),
            username: username.into(),
            password: password.into(),
            domain: domain.filter(|d| !d.is_empty()).map(String::from),
            encrypt: crate::config::DEFAULT_ENCRYPT,
            trust_server_certificate: crate::config::DEFAULT_TRUST_SERVER_CERTIFICATE,
        }
    }

    pub fn with_encrypt(mut self, encrypt: bool) -> Self {
        self.encrypt = encrypt;
        self
    }

    pub fn with_trust_server_certificate(mut self, trust: bool) -> Self {
        self.trust_server_certificate = trust;
        self
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> &str {
        &self.port
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    /// Username as configured, before qualification.
    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn domain(&self) -> Option<&str> {
        self.domain.as_deref()
    }

    pub fn encrypt(&self) -> bool {
        self.encrypt
    }

    pub fn trust_server_certificate(&self) -> bool {
        self.trust_server_certificate
    }

    /// True when either security setting is left at its insecure demo value.
    pub fn uses_insecure_defaults(&self) -> bool {
        !self.encrypt || self.trust_server_certificate
    }

    pub fn auth_mode(&self) -> AuthMode {
        if self.domain.is_some() {
            AuthMode::Domain
        } else {
            AuthMode::SqlServer
        }
    }

    /// Username sent to the server.
    pub fn effective_username(&self) -> String {
        qualify_username(&self.username, self.domain())
    }

    /// `host:port`
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Full connection string, including the password.
    pub fn connection_string(&self) -> String {
        self.render_connection_string(&escape_value(&self.password))
    }

    /// Connection string safe for display: the password is replaced by a fixed mask.
    pub fn sanitized_connection_string(&self) -> String {
        self.render_connection_string(PASSWORD_MASK)
    }

    fn render_connection_string(&self, password: &str) -> String {
        let mut s = format!(
            "{}://{}:{};databaseName={};encrypt={};trustServerCertificate={}",
            CONNECTION_SCHEME,
            self.host,
            self.port,
            escape_value(&self.database),
            self.encrypt,
            self.trust_server_certificate,
        );
        if self.auth_mode() == AuthMode::Domain {
            s.push_str(";integratedSecurity=false");
        }
        s.push_str(";user=");
        s.push_str(&escape_value(&self.effective_username()));
        s.push_str(";password=");
        s.push_str(password);
        s
    }

    /// Build the driver configuration.
    ///
    /// Fails without touching the network if the port is not a valid TCP port.
    pub fn to_driver_config(&self) -> CheckResult<tiberius::Config> {
        let port: u16 = self.port.parse().map_err(|_| {
            CheckError::connect(
                format!("The port number {} is not valid.", self.port),
                Some(crate::error::SQLSTATE_UNABLE_TO_CONNECT),
            )
        })?;

        let mut config = tiberius::Config::new();
        config.host(&self.host);
        config.port(port);
        config.database(&self.database);
        config.encryption(if self.encrypt {
            EncryptionLevel::Required
        } else {
            // Login packet only
            EncryptionLevel::Off
        });
        if self.trust_server_certificate {
            config.trust_cert();
        }

        config.authentication(self.auth_method());

        Ok(config)
    }

    /// Driver login for this descriptor.
    ///
    /// Both modes log in with SQL Server credentials (`integratedSecurity=false`);
    /// domain mode differs only in carrying the qualified username.
    pub fn auth_method(&self) -> AuthMethod {
        AuthMethod::sql_server(self.effective_username(), &self.password)
    }
}

impl fmt::Debug for ConnectionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionDescriptor")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("username", &self.username)
            .field("password", &PASSWORD_MASK)
            .field("domain", &self.domain)
            .field("encrypt", &self.encrypt)
            .field("trust_server_certificate", &self.trust_server_certificate)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn descriptor(username: &str, password: &str, domain: Option<&str>) -> ConnectionDescriptor {
        ConnectionDescriptor::new("localhost", "1433", "master", username, password, domain)
    }

    #[test]
    fn test_qualify_without_domain() {
        assert_eq!(qualify_username("alice", None), "alice");
        assert_eq!(qualify_username("alice", Some("")), "alice");
    }

    #[test]
    fn test_qualify_with_domain() {
        assert_eq!(qualify_username("alice", Some("CORP")), "CORP\\alice");
    }

    #[test]
    fn test_qualify_keeps_upn() {
        assert_eq!(
            qualify_username("alice@example.com", Some("CORP")),
            "alice@example.com"
        );
    }

    #[test]
    fn test_qualify_keeps_down_level_name() {
        assert_eq!(qualify_username("OTHER\\alice", Some("CORP")), "OTHER\\alice");
    }

    #[test]
    fn test_empty_domain_is_dropped() {
        let d = descriptor("alice", "pw", Some(""));
        assert_eq!(d.domain(), None);
        assert_eq!(d.auth_mode(), AuthMode::SqlServer);
        assert_eq!(d.effective_username(), "alice");
    }

    #[test]
    fn test_domain_selects_domain_mode_even_for_upn() {
        let d = descriptor("alice@example.com", "pw", Some("CORP"));
        assert_eq!(d.auth_mode(), AuthMode::Domain);
        assert_eq!(d.effective_username(), "alice@example.com");
    }

    #[test]
    fn test_address() {
        let d = ConnectionDescriptor::new("db.internal", "14330", "sales", "sa", "pw", None);
        assert_eq!(d.address(), "db.internal:14330");
    }

    #[test]
    fn test_connection_string_sql_auth() {
        let d = descriptor("sa", "Pw1!", None);
        assert_eq!(
            d.connection_string(),
            "sqlserver://localhost:1433;databaseName=master;encrypt=false;\
             trustServerCertificate=true;user=sa;password=Pw1!"
        );
    }

    #[test]
    fn test_connection_string_domain_auth() {
        let d = descriptor("alice", "Pw1!", Some("CORP"));
        assert_eq!(
            d.connection_string(),
            "sqlserver://localhost:1433;databaseName=master;encrypt=false;\
             trustServerCertificate=true;integratedSecurity=false;user=CORP\\alice;password=Pw1!"
        );
    }

    #[test]
    fn test_connection_string_reflects_overrides() {
        let d = descriptor("sa", "pw", None)
            .with_encrypt(true)
            .with_trust_server_certificate(false);
        let s = d.connection_string();
        assert!(s.contains(";encrypt=true;"));
        assert!(s.contains(";trustServerCertificate=false"));
        assert!(!d.uses_insecure_defaults());
        assert!(descriptor("sa", "pw", None).uses_insecure_defaults());
    }

    #[test]
    fn test_connection_string_escapes_special_values() {
        let d = descriptor("sa", "a;b=c}", None);
        assert!(d.connection_string().ends_with(";password={a;b=c}}}"));
    }

    #[test]
    fn test_sanitized_connection_string() {
        let d = descriptor("sa", "Pw1!", None);
        let sanitized = d.sanitized_connection_string();
        assert!(sanitized.ends_with(";user=sa;password=***"));
        assert!(!sanitized.contains("Pw1!"));
    }

    #[test]
    fn test_sanitized_hides_password_with_separators() {
        let d = descriptor("sa", "x;password=leak", None);
        let sanitized = d.sanitized_connection_string();
        assert!(!sanitized.contains("leak"));
        assert_eq!(sanitized.matches("password=").count(), 1);
    }

    #[test]
    fn test_debug_masks_password() {
        let d = descriptor("sa", "TopSecret9", None);
        let debug = format!("{:?}", d);
        assert!(!debug.contains("TopSecret9"));
        assert!(debug.contains(PASSWORD_MASK));
    }

    #[test]
    fn test_driver_config_address() {
        let d = ConnectionDescriptor::new("db.internal", "14330", "sales", "sa", "pw", None);
        let config = d.to_driver_config().unwrap();
        assert_eq!(config.get_addr(), "db.internal:14330");
    }

    #[test]
    fn test_driver_config_rejects_invalid_port() {
        let d = ConnectionDescriptor::new("localhost", "abc", "master", "sa", "pw", None);
        let err = d.to_driver_config().unwrap_err();
        assert!(err.to_string().contains("abc"));
        assert_eq!(err.sql_state(), Some(crate::error::SQLSTATE_UNABLE_TO_CONNECT));
    }

    #[test]
    fn test_driver_config_rejects_out_of_range_port() {
        let d = ConnectionDescriptor::new("localhost", "70000", "master", "sa", "pw", None);
        assert!(d.to_driver_config().is_err());
    }

    #[test]
    fn test_driver_config_domain_mode() {
        let d = descriptor("alice", "pw", Some("CORP"));
        assert!(d.to_driver_config().is_ok());
        assert_eq!(d.auth_method(), AuthMethod::sql_server("CORP\\alice", "pw"));
    }

    #[test]
    fn test_auth_method_keeps_upn_in_domain_mode() {
        let d = descriptor("alice@example.com", "pw", Some("CORP"));
        assert_eq!(
            d.auth_method(),
            AuthMethod::sql_server("alice@example.com", "pw")
        );
    }

    #[test]
    fn test_auth_method_sql_login() {
        let d = descriptor("sa", "Pw1!", None);
        assert_eq!(d.auth_method(), AuthMethod::sql_server("sa", "Pw1!"));
    }

    proptest! {
        #[test]
        fn prop_sanitized_never_contains_password(suffix in "[A-Za-z0-9;=!{}@ ]{1,24}") {
            // The prefix cannot occur in any other component of the string
            let password = format!("Zq#{}", suffix);
            let d = descriptor("sa", &password, None);
            prop_assert!(!d.sanitized_connection_string().contains(&password));
        }

        #[test]
        fn prop_qualification_is_idempotent(
            user in "[a-z]{1,12}",
            domain in "[A-Z]{1,8}",
        ) {
            let once = qualify_username(&user, Some(&domain));
            let twice = qualify_username(&once, Some(&domain));
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn prop_no_domain_keeps_username(user in "[a-zA-Z0-9@._-]{1,20}") {
            prop_assert_eq!(qualify_username(&user, None), user);
        }
    }
}
