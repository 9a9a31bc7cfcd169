/// Middleware modules for the API server
///
/// - `security`: security response headers
/// - `deployment`: 404s for routes the deployment mode does not serve
/// - `write_gate`: blocks writes for families whose SaaS account has lapsed

pub mod deployment;
pub mod security;
pub mod write_gate;
