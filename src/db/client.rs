//! Driver session management.
//!
//! A [`Session`] owns the single connection the check opens. It is created from a
//! [`ConnectionDescriptor`] and must be released with [`Session::close`], which the
//! caller does on every exit path once the session exists.

use crate::error::{CheckError, CheckResult};
use crate::models::ConnectionDescriptor;
use tiberius::Client;
use tokio::net::TcpStream;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};
use tracing::{debug, info, warn};

/// Driver client over a tokio TCP stream.
pub type DriverClient = Client<Compat<TcpStream>>;

/// An open, authenticated connection.
pub struct Session {
    pub(crate) client: DriverClient,
    address: String,
}

impl Session {
    /// Open the TCP stream and log in.
    pub async fn open(descriptor: &ConnectionDescriptor) -> CheckResult<Self> {
        let config = descriptor.to_driver_config()?;
        let address = config.get_addr();

        info!(
            address = %address,
            database = %descriptor.database(),
            auth_mode = %descriptor.auth_mode(),
            "Connecting to SQL Server"
        );
        if descriptor.uses_insecure_defaults() {
            warn!(
                encrypt = descriptor.encrypt(),
                trust_server_certificate = descriptor.trust_server_certificate(),
                "Connection is not fully secured; set ENCRYPT=true and TRUST_SERVER_CERTIFICATE=false for production"
            );
        }

        let tcp = TcpStream::connect(&address)
            .await
            .map_err(|e| CheckError::from_io(&address, e))?;
        tcp.set_nodelay(true)
            .map_err(|e| CheckError::from_io(&address, e))?;
        debug!(address = %address, "TCP connection established");

        let client = Client::connect(config, tcp.compat_write())
            .await
            .map_err(CheckError::from_connect)?;
        info!(address = %address, "Login succeeded");

        Ok(Self { client, address })
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// Close the connection. A failure to close is logged, not reported.
    pub async fn close(self) {
        let address = self.address;
        match self.client.close().await {
            Ok(()) => debug!(address = %address, "Connection closed"),
            Err(e) => warn!(address = %address, error = %e, "Failed to close connection cleanly"),
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}
