/// Library crate entry point.
/// Exposes the ACL core and the HTTP layer for the binary and integration tests.

pub mod acl;
pub mod api;
pub mod config;
pub mod error;
pub mod metrics;
