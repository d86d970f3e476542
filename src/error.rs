//! Error types for the connectivity check.
//!
//! There are two kinds of failure: a configuration error, detected before any network
//! activity, and a database error raised by the driver while connecting or querying.
//! Both are fatal and map to exit status 1.

use std::fmt;
use thiserror::Error;

/// SQLSTATE reported for I/O failures on the connection (communication link failure).
pub const SQLSTATE_LINK_FAILURE: &str = "08S01";

/// SQLSTATE reported when the client could not establish the session.
pub const SQLSTATE_UNABLE_TO_CONNECT: &str = "08001";

/// Where a database error happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Connect,
    Query,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connect => write!(f, "connect"),
            Self::Query => write!(f, "query"),
        }
    }
}

#[derive(Error, Debug)]
pub enum CheckError {
    #[error("{variable} environment variable is {reason}")]
    Configuration {
        variable: &'static str,
        reason: &'static str,
    },

    #[error("{message}")]
    Database {
        stage: Stage,
        message: String,
        /// e.g., "08S01" for a broken link, or the server's state byte
        sql_state: Option<String>,
        /// Server error number, when the server produced one
        code: Option<u32>,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl CheckError {
    /// Create a configuration error for a required variable.
    pub fn configuration(variable: &'static str, reason: &'static str) -> Self {
        Self::Configuration { variable, reason }
    }

    /// Create a connection error without an underlying driver error.
    pub fn connect(message: impl Into<String>, sql_state: Option<&str>) -> Self {
        Self::Database {
            stage: Stage::Connect,
            message: message.into(),
            sql_state: sql_state.map(String::from),
            code: None,
            source: None,
        }
    }

    /// Wrap a driver error raised while opening the session.
    pub fn from_connect(err: tiberius::error::Error) -> Self {
        Self::from_driver(Stage::Connect, err)
    }

    /// Wrap a driver error raised while running a statement.
    pub fn from_query(err: tiberius::error::Error) -> Self {
        Self::from_driver(Stage::Query, err)
    }

    /// Wrap a socket error from the TCP connect to `address`.
    pub fn from_io(address: &str, err: std::io::Error) -> Self {
        Self::Database {
            stage: Stage::Connect,
            message: format!("The TCP/IP connection to {} has failed: {}", address, err),
            sql_state: Some(SQLSTATE_LINK_FAILURE.to_string()),
            code: None,
            source: Some(Box::new(err)),
        }
    }

    fn from_driver(stage: Stage, err: tiberius::error::Error) -> Self {
        use tiberius::error::Error as Driver;

        let (message, sql_state, code) = match &err {
            Driver::Server(token) => (
                token.message().to_string(),
                Some(token.state().to_string()),
                Some(token.code()),
            ),
            Driver::Io { message, .. } => (
                message.clone(),
                Some(SQLSTATE_LINK_FAILURE.to_string()),
                None,
            ),
            Driver::Tls(message) => (
                format!("TLS handshake failed: {}", message),
                Some(SQLSTATE_UNABLE_TO_CONNECT.to_string()),
                None,
            ),
            Driver::Routing { host, port } => (
                format!("Server requested a redirect to {}:{}", host, port),
                Some(SQLSTATE_UNABLE_TO_CONNECT.to_string()),
                None,
            ),
            other if stage == Stage::Connect => (
                other.to_string(),
                Some(SQLSTATE_UNABLE_TO_CONNECT.to_string()),
                None,
            ),
            other => (other.to_string(), None, None),
        };

        Self::Database {
            stage,
            message,
            sql_state,
            code,
            source: Some(Box::new(err)),
        }
    }

    /// Vendor state code, if any.
    pub fn sql_state(&self) -> Option<&str> {
        match self {
            Self::Database { sql_state, .. } => sql_state.as_deref(),
            Self::Configuration { .. } => None,
        }
    }

    /// Vendor error number, if any.
    pub fn code(&self) -> Option<u32> {
        match self {
            Self::Database { code, .. } => *code,
            Self::Configuration { .. } => None,
        }
    }

    /// Stage of a database error; `None` for configuration errors.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::Database { stage, .. } => Some(*stage),
            Self::Configuration { .. } => None,
        }
    }

    /// Process exit status for this error.
    pub fn exit_code(&self) -> u8 {
        1
    }
}

/// Result type alias for the connectivity check.
pub type CheckResult<T> = Result<T, CheckError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;
    use std::io;

    #[test]
    fn test_configuration_display() {
        let err = CheckError::configuration("USERNAME", "required");
        assert_eq!(err.to_string(), "USERNAME environment variable is required");
        assert_eq!(err.sql_state(), None);
        assert_eq!(err.code(), None);
        assert_eq!(err.stage(), None);
    }

    #[test]
    fn test_io_error_maps_to_link_failure() {
        let io_err = io::Error::new(io::ErrorKind::ConnectionRefused, "connection refused");
        let err = CheckError::from_io("localhost:1433", io_err);
        assert_eq!(err.sql_state(), Some(SQLSTATE_LINK_FAILURE));
        assert_eq!(err.stage(), Some(Stage::Connect));
        assert!(err.to_string().contains("localhost:1433"));
        assert!(err.source().is_some());
    }

    #[test]
    fn test_driver_io_error_keeps_message() {
        let driver_err = tiberius::error::Error::from(io::Error::new(
            io::ErrorKind::BrokenPipe,
            "pipe closed",
        ));
        let err = CheckError::from_query(driver_err);
        assert_eq!(err.stage(), Some(Stage::Query));
        assert_eq!(err.sql_state(), Some(SQLSTATE_LINK_FAILURE));
        assert!(err.to_string().contains("pipe closed"));
    }

    #[test]
    fn test_driver_tls_error_during_connect() {
        let driver_err = tiberius::error::Error::Tls("bad certificate".to_string());
        let err = CheckError::from_connect(driver_err);
        assert_eq!(err.sql_state(), Some(SQLSTATE_UNABLE_TO_CONNECT));
        assert!(err.to_string().contains("bad certificate"));
    }

    #[test]
    fn test_driver_protocol_error_during_query_has_no_state() {
        let driver_err = tiberius::error::Error::Protocol("unexpected token".into());
        let err = CheckError::from_query(driver_err);
        assert_eq!(err.sql_state(), None);
        assert_eq!(err.code(), None);
    }

    #[test]
    fn test_connect_helper() {
        let err = CheckError::connect("invalid port number: abc", None);
        assert_eq!(err.stage(), Some(Stage::Connect));
        assert_eq!(err.to_string(), "invalid port number: abc");
        assert!(err.source().is_none());
    }

    #[test]
    fn test_exit_code_is_one() {
        assert_eq!(CheckError::configuration("PASSWORD", "required").exit_code(), 1);
        assert_eq!(CheckError::connect("boom", None).exit_code(), 1);
    }
}
