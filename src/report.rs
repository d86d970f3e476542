//! Human-readable report sections.
//!
//! Each function renders one section of the stdout/stderr report as a string;
//! the caller decides where it goes.

use crate::db::{ServerMetadata, TEST_QUERY};
use crate::error::{CheckError, Stage};
use crate::models::ConnectionDescriptor;
use std::fmt::Write;

const NOT_SET: &str = "(not set)";
const UNKNOWN: &str = "(unknown)";

pub fn banner() -> String {
    "=== SQL Server Connection Check ===\n\n".to_string()
}

/// Configuration summary. The password is never part of it.
pub fn configuration(descriptor: &ConnectionDescriptor) -> String {
    let mut s = String::from("Configuration:\n");
    let _ = writeln!(s, "  Host: {}", descriptor.host());
    let _ = writeln!(s, "  Port: {}", descriptor.port());
    let _ = writeln!(s, "  Database: {}", descriptor.database());
    let _ = writeln!(s, "  User: {}", descriptor.username());
    let _ = writeln!(s, "  Domain: {}", descriptor.domain().unwrap_or(NOT_SET));
    s.push('\n');
    s
}

pub fn connecting(descriptor: &ConnectionDescriptor) -> String {
    format!(
        "Connecting to SQL Server...\nConnection string: {}\n\n",
        descriptor.sanitized_connection_string()
    )
}

pub fn connected() -> String {
    "✓ Successfully connected to SQL Server!\n\n".to_string()
}

pub fn query_started() -> String {
    format!("Executing test query: {}\n", TEST_QUERY)
}

pub fn query_result(value: Option<i32>) -> String {
    match value {
        Some(value) => format!(
            "✓ Query executed successfully!\n  Result: TestValue = {}\n\n",
            value
        ),
        // No row came back; nothing to show
        None => "\n".to_string(),
    }
}

pub fn metadata(metadata: &ServerMetadata) -> String {
    let mut s = String::from("Database Information:\n");
    let _ = writeln!(s, "  Product Name: {}", metadata.product_name);
    let _ = writeln!(
        s,
        "  Product Version: {}",
        metadata.product_version.as_deref().unwrap_or(UNKNOWN)
    );
    if let Some(edition) = &metadata.edition {
        let _ = writeln!(s, "  Edition: {}", edition);
    }
    let _ = writeln!(s, "  Driver Name: {}", metadata.driver_name);
    let _ = writeln!(s, "  Driver Version: {}", metadata.driver_version);
    let _ = writeln!(
        s,
        "  Catalog: {}",
        metadata.catalog.as_deref().unwrap_or(UNKNOWN)
    );
    s
}

pub fn completed() -> String {
    "\n=== Connection Check Completed Successfully ===\n".to_string()
}

/// Stderr report for any failure.
pub fn failure(err: &CheckError) -> String {
    let CheckError::Database { stage, .. } = err else {
        return format!("ERROR: {}\n", err);
    };

    let mut s = String::new();
    match stage {
        Stage::Connect => s.push_str("✗ Failed to connect to SQL Server!\n\n"),
        Stage::Query => s.push_str("✗ Test query failed!\n\n"),
    }
    s.push_str("Error Details:\n");
    let _ = writeln!(s, "  Message: {}", err);
    let _ = writeln!(s, "  SQL State: {}", err.sql_state().unwrap_or("(none)"));
    let _ = writeln!(s, "  Error Code: {}", err.code().unwrap_or(0));
    if let Some(cause) = std::error::Error::source(err) {
        let _ = writeln!(s, "  Cause: {}", cause);
    }

    s.push_str("\nError Chain:\n");
    let mut current = Some(err as &dyn std::error::Error);
    let mut depth = 0;
    while let Some(e) = current {
        let _ = writeln!(s, "  {}: {}", depth, e);
        current = e.source();
        depth += 1;
    }
    s
}
