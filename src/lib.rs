//! SQL Server connectivity check.
//!
//! Reads connection parameters from the environment, opens one connection, runs
//! `SELECT 1`, prints server and driver metadata, and reports success or failure
//! through the process exit status.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod report;

pub use config::Config;
pub use error::{CheckError, CheckResult};
pub use models::ConnectionDescriptor;

use db::Session;
use std::io::Write;
use tracing::{info, warn};

/// Write one report section and flush it. A failed write is logged, not fatal.
fn emit(out: &mut impl Write, section: &str) -> bool {
    match out.write_all(section.as_bytes()).and_then(|()| out.flush()) {
        Ok(()) => true,
        Err(e) => {
            warn!(error = %e, "Failed to write report section");
            false
        }
    }
}

/// Run the whole check, writing the report to `out`.
///
/// Credentials are validated before any network activity. Once connected, the session
/// is closed whether the probe succeeds or fails.
pub async fn run(config: &Config, out: &mut impl Write) -> CheckResult<()> {
    emit(out, &report::banner());

    let descriptor = config.descriptor()?;
    emit(out, &report::configuration(&descriptor));
    emit(out, &report::connecting(&descriptor));

    let mut session = Session::open(&descriptor).await?;
    emit(out, &report::connected());

    let address = session.address().to_string();
    let outcome = probe(&mut session, out).await;
    session.close().await;
    outcome?;

    emit(out, &report::completed());
    info!(address = %address, "Connection check completed");
    Ok(())
}

async fn probe(session: &mut Session, out: &mut impl Write) -> CheckResult<()> {
    emit(out, &report::query_started());
    let value = session.test_query().await?;
    emit(out, &report::query_result(value));

    let metadata = session.metadata().await?;
    emit(out, &report::metadata(&metadata));
    Ok(())
}
