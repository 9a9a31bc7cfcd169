//! # Baby Control Shared Library
//!
//! This crate contains the models, authentication primitives and domain logic
//! used by the Baby Control API server.
//!
//! ## Module Organization
//!
//! - `models`: Database models and their queries
//! - `auth`: Password/PIN hashing, JWT, request authentication, authorization
//! - `billing`: Stripe webhook verification and subscription reconciliation
//! - `activity`: Timeline merging, baby status and activity-tile settings
//! - `backup`: Whole-database JSON snapshots
//! - `db`: Connection pool and migrations
//! - `deployment`: Self-hosted vs SaaS deployment mode
//! - `units`: Unit-of-measure catalogue
//! - `validation`: Field validators shared by request types

pub mod activity;
pub mod auth;
pub mod backup;
pub mod billing;
pub mod db;
pub mod deployment;
pub mod models;
pub mod units;
pub mod validation;

/// Current version of the Baby Control shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
