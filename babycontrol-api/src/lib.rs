//! # Baby Control API Server Library
//!
//! HTTP API for tracking infant care: families, caretakers, babies and
//! their activity logs, plus Stripe billing for SaaS deployments and
//! backup/restore for self-hosted ones.
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `config`: Configuration from environment variables
//! - `error`: Error handling and HTTP response mapping
//! - `middleware`: Security headers, deployment-mode gating, subscription write gate
//! - `routes`: API route handlers
//! - `services`: Outbound email

pub mod app;
pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod services;
