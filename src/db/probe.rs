//! Probe and metadata queries.
//!
//! Every statement's result stream is consumed by value, so it is released before the
//! next statement is issued.

use crate::db::client::Session;
use crate::error::{CheckError, CheckResult};
use tracing::debug;

/// The fixed probe statement.
pub const TEST_QUERY: &str = "SELECT 1 AS TestValue";
pub const TEST_COLUMN: &str = "TestValue";

const METADATA_QUERY: &str = "SELECT \
    CAST(SERVERPROPERTY('ProductVersion') AS NVARCHAR(128)) AS ProductVersion, \
    CAST(SERVERPROPERTY('Edition') AS NVARCHAR(128)) AS Edition, \
    DB_NAME() AS Catalog";

pub const PRODUCT_NAME: &str = "Microsoft SQL Server";
pub const DRIVER_NAME: &str = "tiberius";
/// Release line of the driver this crate is built against.
pub const DRIVER_VERSION: &str = "0.12";

/// Server and driver information reported after a successful probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerMetadata {
    pub product_name: String,
    pub product_version: Option<String>,
    pub edition: Option<String>,
    pub driver_name: String,
    pub driver_version: String,
    pub catalog: Option<String>,
}

impl ServerMetadata {
    /// Metadata with the static product/driver fields filled in.
    pub fn new(
        product_version: Option<String>,
        edition: Option<String>,
        catalog: Option<String>,
    ) -> Self {
        Self {
            product_name: PRODUCT_NAME.to_string(),
            product_version,
            edition,
            driver_name: DRIVER_NAME.to_string(),
            driver_version: DRIVER_VERSION.to_string(),
            catalog,
        }
    }
}

impl Session {
    /// Run `SELECT 1 AS TestValue` and return the scalar, if a row came back.
    pub async fn test_query(&mut self) -> CheckResult<Option<i32>> {
        debug!(sql = TEST_QUERY, "Executing test query");
        let row = self
            .client
            .simple_query(TEST_QUERY)
            .await
            .map_err(CheckError::from_query)?
            .into_row()
            .await
            .map_err(CheckError::from_query)?;

        match row {
            Some(row) => row
                .try_get::<i32, _>(TEST_COLUMN)
                .map_err(CheckError::from_query),
            None => Ok(None),
        }
    }

    /// Read product version, edition and active catalog from the server.
    pub async fn metadata(&mut self) -> CheckResult<ServerMetadata> {
        let row = self
            .client
            .simple_query(METADATA_QUERY)
            .await
            .map_err(CheckError::from_query)?
            .into_row()
            .await
            .map_err(CheckError::from_query)?;

        let Some(row) = row else {
            return Ok(ServerMetadata::new(None, None, None));
        };

        let text = |column: &str| -> CheckResult<Option<String>> {
            row.try_get::<&str, _>(column)
                .map(|v| v.map(String::from))
                .map_err(CheckError::from_query)
        };

        Ok(ServerMetadata::new(
            text("ProductVersion")?,
            text("Edition")?,
            text("Catalog")?,
        ))
    }
}
