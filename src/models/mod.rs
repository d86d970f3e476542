//! Data models for the connectivity check.

pub mod connection;

pub use connection::{
    AuthMode, CONNECTION_SCHEME, ConnectionDescriptor, PASSWORD_MASK, qualify_username,
};
