//! mssql-conncheck - Main entry point.
//!
//! Verifies that a SQL Server instance is reachable with the configured credentials.

use mssql_conncheck::{Config, report};
use std::process::ExitCode;
use tracing::error;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initialize the tracing subscriber for logging. Logs go to stderr.
fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if config.json_logs {
        subscriber
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        subscriber
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let config = Config::parse_args();

    if config.enable_logs {
        init_tracing(&config);
    }

    let mut stdout = std::io::stdout();
    match mssql_conncheck::run(&config, &mut stdout).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(
                error = %e,
                sql_state = e.sql_state().unwrap_or_default(),
                code = e.code().unwrap_or_default(),
                "Connection check failed"
            );
            eprint!("{}", report::failure(&e));
            ExitCode::from(e.exit_code())
        }
    }
}
