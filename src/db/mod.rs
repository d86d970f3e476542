//! Database access.
//!
//! - Session lifecycle (TCP connect, login, close)
//! - Probe query and metadata queries

pub mod client;
pub mod probe;

pub use client::{DriverClient, Session};
pub use probe::{DRIVER_NAME, DRIVER_VERSION, PRODUCT_NAME, ServerMetadata, TEST_QUERY};
