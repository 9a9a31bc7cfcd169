/// Outbound integrations used by route handlers
///
/// - `email`: transactional email through the configured provider

pub mod email;
